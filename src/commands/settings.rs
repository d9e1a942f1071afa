use serde::Deserialize;

use crate::models::notification::PlannedReminder;
use crate::models::settings::AppSettings;
use crate::services::settings_service::SettingsUpdateInput;

use super::{local_now, run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState) -> CommandResult<AppSettings> {
    let app_state = state.clone();
    run_blocking("settings", move || app_state.settings().get()).await
}

pub async fn settings_update(
    state: &AppState,
    payload: SettingsUpdatePayload,
) -> CommandResult<AppSettings> {
    let app_state = state.clone();
    let input = payload.into_input();
    run_blocking("settings", move || app_state.settings().update(input)).await
}

pub async fn settings_reset(state: &AppState) -> CommandResult<AppSettings> {
    let app_state = state.clone();
    run_blocking("settings", move || app_state.settings().reset()).await
}

/// Daily reminder plan on first launch; empty on every later call.
pub async fn notifications_initialize(state: &AppState) -> CommandResult<Vec<PlannedReminder>> {
    let app_state = state.clone();
    run_blocking("notification", move || {
        app_state.notifications().ensure_initialized(local_now())
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatePayload {
    #[serde(default)]
    pub timezone_policy: Option<String>,
    #[serde(default)]
    pub daily_reminder_time: Option<String>,
    #[serde(default)]
    pub appointment_reminder_minutes: Option<i64>,
    #[serde(default)]
    pub points_per_entry: Option<i64>,
    #[serde(default)]
    pub provider_id: Option<String>,
}

impl SettingsUpdatePayload {
    fn into_input(self) -> SettingsUpdateInput {
        SettingsUpdateInput {
            timezone_policy: self.timezone_policy,
            daily_reminder_time: self.daily_reminder_time,
            appointment_reminder_minutes: self.appointment_reminder_minutes,
            points_per_entry: self.points_per_entry,
            provider_id: self.provider_id,
        }
    }
}
