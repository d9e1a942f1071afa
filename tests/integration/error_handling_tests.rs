// Error mapping and edge cases across the service and command layers

use heartnote_app_lib::commands::chat::{chat_send, chat_unread_count};
use heartnote_app_lib::commands::diary::{diary_emotion_summary, diary_get};
use heartnote_app_lib::commands::goals::{goals_create, CreateGoalPayload};
use heartnote_app_lib::commands::settings::{settings_get, settings_update, SettingsUpdatePayload};
use heartnote_app_lib::commands::{AppState, CommandError};
use heartnote_app_lib::db::DbPool;
use heartnote_app_lib::error::AppError;
use tempfile::tempdir;

async fn setup_test_environment() -> (AppState, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("test.sqlite")).expect("db pool");
    let state = AppState::new(pool).expect("app state");
    (state, dir)
}

#[test]
fn app_errors_map_to_command_codes() {
    let validation: CommandError = AppError::validation("bad input").into();
    assert_eq!(validation.code, "VALIDATION_ERROR");
    assert_eq!(validation.message, "bad input");

    let detailed: CommandError =
        AppError::validation_with_details("bad month", serde_json::json!({"month": 13})).into();
    assert_eq!(detailed.details, Some(serde_json::json!({"month": 13})));

    let missing: CommandError = AppError::not_found().into();
    assert_eq!(missing.code, "NOT_FOUND");

    let conflict: CommandError = AppError::conflict("taken").into();
    assert_eq!(conflict.code, "CONFLICT");

    let other: CommandError = AppError::other("boom").into();
    assert_eq!(other.code, "UNKNOWN");
}

#[test]
fn command_errors_serialize_in_camel_case() {
    let error = CommandError::new("NOT_FOUND", "missing", None);
    let value = serde_json::to_value(&error).unwrap();
    assert_eq!(value, serde_json::json!({"code": "NOT_FOUND", "message": "missing"}));
}

#[tokio::test]
async fn missing_records_report_not_found() {
    let (state, _dir) = setup_test_environment().await;
    let error = diary_get(&state, "nope".to_string()).await.unwrap_err();
    assert_eq!(error.code, "NOT_FOUND");
}

#[tokio::test]
async fn malformed_arguments_are_validation_errors() {
    let (state, _dir) = setup_test_environment().await;

    let error = diary_emotion_summary(
        &state,
        "kid-1".to_string(),
        "2024-13-01".to_string(),
        "2024-06-30".to_string(),
    )
    .await
    .unwrap_err();
    assert_eq!(error.code, "VALIDATION_ERROR");

    let error = chat_send(&state, "kid-1".to_string(), "nurse".to_string(), "hi".to_string())
        .await
        .unwrap_err();
    assert_eq!(error.code, "VALIDATION_ERROR");

    let error = chat_send(&state, "kid-1".to_string(), "user".to_string(), "   ".to_string())
        .await
        .unwrap_err();
    assert_eq!(error.code, "VALIDATION_ERROR");

    let error = goals_create(
        &state,
        CreateGoalPayload {
            user_id: "kid-1".to_string(),
            title: "Sleep early".to_string(),
            target_count: 0,
            week_of: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(error.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn rejected_settings_leave_stored_values_alone() {
    let (state, _dir) = setup_test_environment().await;

    let error = settings_update(
        &state,
        SettingsUpdatePayload {
            daily_reminder_time: Some("25:00".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(error.code, "VALIDATION_ERROR");

    let settings = settings_get(&state).await.expect("settings");
    assert_eq!(settings.daily_reminder_time.format("%H:%M").to_string(), "19:00");
}

#[tokio::test]
async fn chat_commands_track_unread_messages() {
    let (state, _dir) = setup_test_environment().await;
    chat_send(&state, "kid-1".to_string(), "doctor".to_string(), "How was school?".to_string())
        .await
        .expect("send");

    let unread = chat_unread_count(&state, "kid-1".to_string(), "user".to_string())
        .await
        .expect("unread");
    assert_eq!(unread, 1);
}
