use serde::Deserialize;
use tracing::warn;

use crate::models::goal::{CreateWeeklyGoalRequest, WeeklyGoal, WeeklyGoalWithProgress};

use super::{date_or_today, run_blocking, today, AppState, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalPayload {
    pub user_id: String,
    pub title: String,
    pub target_count: u32,
    /// Any day of the target week; defaults to the current week.
    #[serde(default)]
    pub week_of: Option<String>,
}

pub async fn goals_create(
    state: &AppState,
    payload: CreateGoalPayload,
) -> CommandResult<WeeklyGoal> {
    let app_state = state.clone();
    run_blocking("goal", move || {
        let week_of = date_or_today(&app_state, payload.week_of.as_deref())?;
        app_state.goals().create_goal(CreateWeeklyGoalRequest {
            user_id: payload.user_id,
            title: payload.title,
            target_count: payload.target_count,
            week_of,
        })
    })
    .await
}

pub async fn goals_list(
    state: &AppState,
    user_id: String,
    week_of: Option<String>,
) -> CommandResult<Vec<WeeklyGoalWithProgress>> {
    let app_state = state.clone();
    run_blocking("goal", move || {
        let week_of = date_or_today(&app_state, week_of.as_deref())?;
        app_state.goals().list_goals_with_progress(&user_id, week_of)
    })
    .await
}

/// Ticks off a day and re-checks badges once the goal is met.
pub async fn goals_record_progress(
    state: &AppState,
    goal_id: String,
    date: Option<String>,
) -> CommandResult<WeeklyGoalWithProgress> {
    let app_state = state.clone();
    run_blocking("goal", move || {
        let on = date_or_today(&app_state, date.as_deref())?;
        let goals = app_state.goals();
        goals.record_progress(&goal_id, on)?;
        let progress = goals.goal_with_progress(&goal_id)?;

        if progress.is_completed {
            let today = today(&app_state)?;
            if let Err(err) = app_state
                .rewards()
                .evaluate_badges(&progress.goal.user_id, today)
            {
                warn!(target: "app::command", %goal_id, error = %err, "badge evaluation failed");
            }
        }

        Ok(progress)
    })
    .await
}

pub async fn goals_get_progress(
    state: &AppState,
    goal_id: String,
) -> CommandResult<WeeklyGoalWithProgress> {
    let app_state = state.clone();
    run_blocking("goal", move || app_state.goals().goal_with_progress(&goal_id)).await
}

pub async fn goals_delete(state: &AppState, goal_id: String) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking("goal", move || app_state.goals().delete_goal(&goal_id)).await
}
