pub mod appointments;
pub mod chat;
pub mod diary;
pub mod goals;
pub mod rewards;
pub mod settings;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::error;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::appointment_service::AppointmentService;
use crate::services::chat_service::ChatService;
use crate::services::diary_service::DiaryService;
use crate::services::goal_service::GoalService;
use crate::services::notification_service::NotificationScheduler;
use crate::services::reward_service::RewardService;
use crate::services::settings_service::SettingsService;
use crate::utils::dates::parse_date;

/// Every service, wired once over one database.
#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    settings_service: Arc<SettingsService>,
    reward_service: Arc<RewardService>,
    diary_service: Arc<DiaryService>,
    appointment_service: Arc<AppointmentService>,
    goal_service: Arc<GoalService>,
    chat_service: Arc<ChatService>,
    notification_scheduler: Arc<NotificationScheduler>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> AppResult<Self> {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        // Fail early on an unreadable settings table.
        settings_service.get()?;

        let reward_service = Arc::new(RewardService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let diary_service = Arc::new(DiaryService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&reward_service),
        ));
        let appointment_service = Arc::new(AppointmentService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let goal_service = Arc::new(GoalService::new(db_pool.clone()));
        let chat_service = Arc::new(ChatService::new(db_pool.clone()));
        let notification_scheduler =
            Arc::new(NotificationScheduler::new(Arc::clone(&settings_service)));

        Ok(Self {
            db_pool,
            settings_service,
            reward_service,
            diary_service,
            appointment_service,
            goal_service,
            chat_service,
            notification_scheduler,
        })
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn rewards(&self) -> Arc<RewardService> {
        Arc::clone(&self.reward_service)
    }

    pub fn diary(&self) -> Arc<DiaryService> {
        Arc::clone(&self.diary_service)
    }

    pub fn appointments(&self) -> Arc<AppointmentService> {
        Arc::clone(&self.appointment_service)
    }

    pub fn goals(&self) -> Arc<GoalService> {
        Arc::clone(&self.goal_service)
    }

    pub fn chat(&self) -> Arc<ChatService> {
        Arc::clone(&self.chat_service)
    }

    pub fn notifications(&self) -> Arc<NotificationScheduler> {
        Arc::clone(&self.notification_scheduler)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "the requested record does not exist", None)
            }
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Runs blocking service work off the async executor.
pub(crate) async fn run_blocking<T: Send + 'static>(
    label: &'static str,
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("{label} task failed: {err}"), None))?
        .map_err(CommandError::from)
}

/// Device-local wall clock.
pub(crate) fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Today's civil date under the configured day-boundary policy.
pub(crate) fn today(state: &AppState) -> AppResult<NaiveDate> {
    let policy = state.settings().get()?.timezone_policy;
    Ok(policy.civil_date(&local_now()))
}

/// Parses an optional `YYYY-MM-DD` argument, falling back to today.
pub(crate) fn date_or_today(state: &AppState, value: Option<&str>) -> AppResult<NaiveDate> {
    match value {
        Some(raw) => parse_date(raw.trim()),
        None => today(state),
    }
}
