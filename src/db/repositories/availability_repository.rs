use std::collections::BTreeSet;
use std::convert::TryFrom;

use rusqlite::{named_params, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::availability::WeeklyAvailabilityRule;
use crate::utils::dates::{format_time, parse_time};

#[derive(Debug, Clone)]
pub struct AvailabilityRuleRow {
    pub id: String,
    pub provider_id: String,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
}

impl AvailabilityRuleRow {
    pub fn into_record(self) -> AppResult<WeeklyAvailabilityRule> {
        let day_of_week = u8::try_from(self.day_of_week)
            .ok()
            .filter(|day| *day <= 6)
            .ok_or_else(|| {
                AppError::validation(format!("stored weekday out of range: {}", self.day_of_week))
            })?;

        Ok(WeeklyAvailabilityRule {
            id: self.id,
            provider_id: self.provider_id,
            day_of_week,
            start_time: parse_time(&self.start_time)?,
            end_time: parse_time(&self.end_time)?,
            is_active: self.is_active,
        })
    }
}

impl TryFrom<&Row<'_>> for AvailabilityRuleRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            provider_id: row.get("provider_id")?,
            day_of_week: row.get("day_of_week")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            is_active: row.get("is_active")?,
        })
    }
}

pub struct AvailabilityRepository;

impl AvailabilityRepository {
    pub fn insert(
        conn: &Connection,
        rule: &WeeklyAvailabilityRule,
        created_at: &str,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO availability_rules (
                    id, provider_id, day_of_week, start_time, end_time, is_active, created_at
                ) VALUES (
                    :id, :provider_id, :day_of_week, :start_time, :end_time, :is_active, :created_at
                )
            "#,
            named_params! {
                ":id": &rule.id,
                ":provider_id": &rule.provider_id,
                ":day_of_week": i64::from(rule.day_of_week),
                ":start_time": format_time(rule.start_time),
                ":end_time": format_time(rule.end_time),
                ":is_active": rule.is_active,
                ":created_at": created_at,
            },
        )?;
        Ok(())
    }

    pub fn list_by_provider(
        conn: &Connection,
        provider_id: &str,
    ) -> AppResult<Vec<WeeklyAvailabilityRule>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, provider_id, day_of_week, start_time, end_time, is_active
                FROM availability_rules
                WHERE provider_id = :provider_id
                ORDER BY day_of_week ASC, start_time ASC
            "#,
        )?;

        let rows = stmt.query_map(named_params! {":provider_id": provider_id}, |row| {
            AvailabilityRuleRow::try_from(row)
        })?;
        Self::collect(rows)
    }

    /// Active rules for one weekday, in insertion order.
    pub fn list_active_for_day(
        conn: &Connection,
        provider_id: &str,
        day_of_week: u8,
    ) -> AppResult<Vec<WeeklyAvailabilityRule>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, provider_id, day_of_week, start_time, end_time, is_active
                FROM availability_rules
                WHERE provider_id = :provider_id
                  AND day_of_week = :day_of_week
                  AND is_active = 1
                ORDER BY rowid ASC
            "#,
        )?;

        let rows = stmt.query_map(
            named_params! {":provider_id": provider_id, ":day_of_week": i64::from(day_of_week)},
            |row| AvailabilityRuleRow::try_from(row),
        )?;
        Self::collect(rows)
    }

    pub fn active_days(conn: &Connection, provider_id: &str) -> AppResult<BTreeSet<u8>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT DISTINCT day_of_week
                FROM availability_rules
                WHERE provider_id = :provider_id AND is_active = 1
            "#,
        )?;

        let days = stmt
            .query_map(named_params! {":provider_id": provider_id}, |row| {
                row.get::<_, i64>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|day| u8::try_from(day).ok())
            .filter(|day| *day <= 6)
            .collect();

        Ok(days)
    }

    pub fn set_active(conn: &Connection, id: &str, is_active: bool) -> AppResult<()> {
        let affected = conn.execute(
            "UPDATE availability_rules SET is_active = :is_active WHERE id = :id",
            named_params! {":id": id, ":is_active": is_active},
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    fn collect<I>(rows: I) -> AppResult<Vec<WeeklyAvailabilityRule>>
    where
        I: Iterator<Item = Result<AvailabilityRuleRow, rusqlite::Error>>,
    {
        rows.map(|row| {
            row.map_err(AppError::from)
                .and_then(|row| row.into_record())
        })
        .collect()
    }
}
