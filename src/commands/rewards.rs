use crate::models::reward::{BadgeDefinition, PointsTransaction, RewardSummary};

use super::{run_blocking, today, AppState, CommandResult};

const DEFAULT_HISTORY_LIMIT: usize = 50;

pub async fn rewards_summary(state: &AppState, user_id: String) -> CommandResult<RewardSummary> {
    let app_state = state.clone();
    run_blocking("rewards", move || app_state.rewards().summary(&user_id)).await
}

pub async fn rewards_catalogue(state: &AppState) -> CommandResult<Vec<BadgeDefinition>> {
    let app_state = state.clone();
    run_blocking("rewards", move || Ok(app_state.rewards().catalogue())).await
}

pub async fn rewards_evaluate(
    state: &AppState,
    user_id: String,
) -> CommandResult<Vec<BadgeDefinition>> {
    let app_state = state.clone();
    run_blocking("rewards", move || {
        let today = today(&app_state)?;
        app_state.rewards().evaluate_badges(&user_id, today)
    })
    .await
}

pub async fn rewards_points_history(
    state: &AppState,
    user_id: String,
    limit: Option<usize>,
) -> CommandResult<Vec<PointsTransaction>> {
    let app_state = state.clone();
    run_blocking("rewards", move || {
        app_state
            .rewards()
            .points_history(&user_id, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
    })
    .await
}
