use serde::Serialize;
use tracing::warn;

use crate::models::diary::{CreateDiaryEntryRequest, DiaryEntry, EmotionCount};
use crate::models::reward::BadgeDefinition;
use crate::models::streak::StreakResult;
use crate::utils::dates::parse_date;

use super::{date_or_today, run_blocking, today, AppState, CommandResult};

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntryCreated {
    pub entry: DiaryEntry,
    pub streak: StreakResult,
    pub new_badges: Vec<BadgeDefinition>,
}

/// Saves an entry, then reports the refreshed streak and any badges it unlocked.
pub async fn diary_create(
    state: &AppState,
    payload: CreateDiaryEntryRequest,
) -> CommandResult<DiaryEntryCreated> {
    let app_state = state.clone();
    run_blocking("diary", move || {
        let entry = app_state.diary().create_entry(payload)?;
        let today = today(&app_state)?;
        let streak = app_state.diary().user_streak(&entry.user_id, today)?;
        let new_badges = match app_state.rewards().evaluate_badges(&entry.user_id, today) {
            Ok(badges) => badges,
            Err(err) => {
                warn!(
                    target: "app::command",
                    entry_id = %entry.id,
                    error = %err,
                    "badge evaluation failed"
                );
                Vec::new()
            }
        };

        Ok(DiaryEntryCreated {
            entry,
            streak,
            new_badges,
        })
    })
    .await
}

pub async fn diary_get(state: &AppState, id: String) -> CommandResult<DiaryEntry> {
    let app_state = state.clone();
    run_blocking("diary", move || app_state.diary().get_entry(&id)).await
}

pub async fn diary_list(
    state: &AppState,
    user_id: String,
    limit: Option<usize>,
) -> CommandResult<Vec<DiaryEntry>> {
    let app_state = state.clone();
    run_blocking("diary", move || {
        app_state
            .diary()
            .list_entries(&user_id, limit.unwrap_or(DEFAULT_LIST_LIMIT))
    })
    .await
}

pub async fn diary_delete(state: &AppState, id: String) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking("diary", move || app_state.diary().delete_entry(&id)).await
}

pub async fn diary_streak(
    state: &AppState,
    user_id: String,
    today: Option<String>,
) -> CommandResult<StreakResult> {
    let app_state = state.clone();
    run_blocking("diary", move || {
        let today = date_or_today(&app_state, today.as_deref())?;
        app_state.diary().user_streak(&user_id, today)
    })
    .await
}

pub async fn diary_emotion_summary(
    state: &AppState,
    user_id: String,
    from: String,
    to: String,
) -> CommandResult<Vec<EmotionCount>> {
    let app_state = state.clone();
    run_blocking("diary", move || {
        let from = parse_date(from.trim())?;
        let to = parse_date(to.trim())?;
        app_state.diary().emotion_summary(&user_id, from, to)
    })
    .await
}
