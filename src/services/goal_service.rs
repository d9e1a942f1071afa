use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::goal_repository::GoalRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::goal::{CreateWeeklyGoalRequest, WeeklyGoal, WeeklyGoalWithProgress};
use crate::utils::dates::sunday_on_or_before;

const MAX_TITLE_CHARS: usize = 120;
/// One check-in per day, so a week holds at most seven.
const MAX_TARGET_COUNT: u32 = 7;

/// Sunday opening the week that contains `date`.
pub fn week_start_for(date: NaiveDate) -> NaiveDate {
    sunday_on_or_before(date)
}

pub struct GoalService {
    db: DbPool,
}

impl GoalService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create_goal(&self, request: CreateWeeklyGoalRequest) -> AppResult<WeeklyGoal> {
        let user_id = request.user_id.trim();
        let title = request.title.trim();
        if user_id.is_empty() {
            return Err(AppError::validation("user id is required"));
        }
        if title.is_empty() {
            return Err(AppError::validation("goal title must not be empty"));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::validation(format!(
                "goal title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }
        if !(1..=MAX_TARGET_COUNT).contains(&request.target_count) {
            return Err(AppError::validation(format!(
                "target must be between 1 and {MAX_TARGET_COUNT} days"
            )));
        }

        let goal = WeeklyGoal {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            target_count: request.target_count,
            week_start: week_start_for(request.week_of),
            created_at: Utc::now().to_rfc3339(),
        };

        self.db.with_connection(|conn| GoalRepository::insert(conn, &goal))?;

        info!(
            target: "app::goals",
            goal_id = %goal.id,
            user_id = %goal.user_id,
            week_start = %goal.week_start,
            target = goal.target_count,
            "weekly goal created"
        );

        Ok(goal)
    }

    pub fn get_goal(&self, goal_id: &str) -> AppResult<WeeklyGoal> {
        self.db
            .with_connection(|conn| GoalRepository::find_by_id(conn, goal_id))
    }

    /// Goals of the week containing `week_of`.
    pub fn list_goals(&self, user_id: &str, week_of: NaiveDate) -> AppResult<Vec<WeeklyGoal>> {
        let week_start = week_start_for(week_of);
        self.db
            .with_connection(|conn| GoalRepository::list_for_week(conn, user_id, week_start))
    }

    /// Marks `on` as done for the goal. Returns `false` when the day was
    /// already recorded.
    pub fn record_progress(&self, goal_id: &str, on: NaiveDate) -> AppResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.db.with_transaction(|conn| {
            let goal = GoalRepository::find_by_id(conn, goal_id)?;
            let week_end = goal.week_start + Duration::days(6);
            if on < goal.week_start || on > week_end {
                return Err(AppError::validation(format!(
                    "{on} is outside the goal week {} to {week_end}",
                    goal.week_start
                )));
            }
            GoalRepository::insert_progress(conn, goal_id, on, &now)
        })?;

        debug!(target: "app::goals", %goal_id, %on, inserted, "goal progress recorded");
        Ok(inserted)
    }

    pub fn goal_with_progress(&self, goal_id: &str) -> AppResult<WeeklyGoalWithProgress> {
        let (goal, completed_days) = self.db.with_connection(|conn| {
            let goal = GoalRepository::find_by_id(conn, goal_id)?;
            let days = GoalRepository::list_progress(conn, goal_id)?;
            Ok((goal, days))
        })?;

        Ok(with_progress(goal, completed_days))
    }

    pub fn list_goals_with_progress(
        &self,
        user_id: &str,
        week_of: NaiveDate,
    ) -> AppResult<Vec<WeeklyGoalWithProgress>> {
        let week_start = week_start_for(week_of);
        self.db.with_connection(|conn| {
            GoalRepository::list_for_week(conn, user_id, week_start)?
                .into_iter()
                .map(|goal| {
                    let days = GoalRepository::list_progress(conn, &goal.id)?;
                    Ok(with_progress(goal, days))
                })
                .collect()
        })
    }

    pub fn delete_goal(&self, goal_id: &str) -> AppResult<()> {
        self.db.with_connection(|conn| GoalRepository::delete(conn, goal_id))?;
        info!(target: "app::goals", %goal_id, "weekly goal deleted");
        Ok(())
    }
}

fn with_progress(goal: WeeklyGoal, completed_days: Vec<NaiveDate>) -> WeeklyGoalWithProgress {
    let completed_count = u32::try_from(completed_days.len()).unwrap_or(u32::MAX);
    let progress_percentage = if goal.target_count == 0 {
        0.0
    } else {
        (completed_count as f32 / goal.target_count as f32 * 100.0).min(100.0)
    };

    WeeklyGoalWithProgress {
        is_completed: completed_count >= goal.target_count,
        goal,
        completed_count,
        progress_percentage,
        completed_days,
    }
}
