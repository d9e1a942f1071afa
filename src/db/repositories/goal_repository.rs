use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::goal::WeeklyGoal;
use crate::utils::dates::{format_date, parse_date};

#[derive(Debug, Clone)]
pub struct WeeklyGoalRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub target_count: i64,
    pub week_start: String,
    pub created_at: String,
}

impl WeeklyGoalRow {
    pub fn into_record(self) -> AppResult<WeeklyGoal> {
        let target_count = u32::try_from(self.target_count).map_err(|_| {
            AppError::validation(format!("stored target out of range: {}", self.target_count))
        })?;

        Ok(WeeklyGoal {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            target_count,
            week_start: parse_date(&self.week_start)?,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for WeeklyGoalRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            target_count: row.get("target_count")?,
            week_start: row.get("week_start")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct GoalRepository;

impl GoalRepository {
    pub fn insert(conn: &Connection, goal: &WeeklyGoal) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO weekly_goals (id, user_id, title, target_count, week_start, created_at)
                VALUES (:id, :user_id, :title, :target_count, :week_start, :created_at)
            "#,
            named_params! {
                ":id": &goal.id,
                ":user_id": &goal.user_id,
                ":title": &goal.title,
                ":target_count": i64::from(goal.target_count),
                ":week_start": format_date(goal.week_start),
                ":created_at": &goal.created_at,
            },
        )?;
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<WeeklyGoal> {
        let row = conn
            .query_row(
                r#"
                    SELECT id, user_id, title, target_count, week_start, created_at
                    FROM weekly_goals
                    WHERE id = :id
                "#,
                named_params! {":id": id},
                |row| WeeklyGoalRow::try_from(row),
            )
            .optional()?;

        match row {
            Some(row) => row.into_record(),
            None => Err(AppError::not_found()),
        }
    }

    pub fn list_for_week(
        conn: &Connection,
        user_id: &str,
        week_start: NaiveDate,
    ) -> AppResult<Vec<WeeklyGoal>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, title, target_count, week_start, created_at
                FROM weekly_goals
                WHERE user_id = :user_id AND week_start = :week_start
                ORDER BY created_at ASC
            "#,
        )?;

        let goals = stmt
            .query_map(
                named_params! {":user_id": user_id, ":week_start": format_date(week_start)},
                |row| WeeklyGoalRow::try_from(row),
            )?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(goals)
    }

    /// Returns `false` when the day was already recorded.
    pub fn insert_progress(
        conn: &Connection,
        goal_id: &str,
        date: NaiveDate,
        created_at: &str,
    ) -> AppResult<bool> {
        let inserted = conn.execute(
            r#"
                INSERT OR IGNORE INTO goal_progress (goal_id, progress_date, created_at)
                VALUES (:goal_id, :progress_date, :created_at)
            "#,
            named_params! {
                ":goal_id": goal_id,
                ":progress_date": format_date(date),
                ":created_at": created_at,
            },
        )?;
        Ok(inserted == 1)
    }

    pub fn list_progress(conn: &Connection, goal_id: &str) -> AppResult<Vec<NaiveDate>> {
        let mut stmt = conn.prepare(
            "SELECT progress_date FROM goal_progress WHERE goal_id = :goal_id \
             ORDER BY progress_date ASC",
        )?;

        let dates = stmt
            .query_map(named_params! {":goal_id": goal_id}, |row| {
                row.get::<_, String>(0)
            })?
            .map(|value| {
                value
                    .map_err(AppError::from)
                    .and_then(|value| parse_date(&value))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(dates)
    }

    /// Goals whose recorded days have reached their target.
    pub fn count_completed(conn: &Connection, user_id: &str) -> AppResult<i64> {
        let count = conn.query_row(
            r#"
                SELECT COUNT(*)
                FROM weekly_goals g
                WHERE g.user_id = :user_id
                  AND (
                      SELECT COUNT(*) FROM goal_progress p WHERE p.goal_id = g.id
                  ) >= g.target_count
            "#,
            named_params! {":user_id": user_id},
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM weekly_goals WHERE id = :id",
            named_params! {":id": id},
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }
}
