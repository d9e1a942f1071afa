use crate::error::AppError;
use crate::models::chat::{ChatMessage, Sender};

use super::{run_blocking, AppState, CommandResult};

const DEFAULT_THREAD_LIMIT: usize = 100;

fn parse_sender(value: &str) -> Result<Sender, AppError> {
    Sender::try_from(value.trim()).map_err(AppError::validation)
}

pub async fn chat_send(
    state: &AppState,
    user_id: String,
    sender: String,
    body: String,
) -> CommandResult<ChatMessage> {
    let app_state = state.clone();
    run_blocking("chat", move || {
        let sender = parse_sender(&sender)?;
        app_state.chat().send_message(&user_id, sender, &body)
    })
    .await
}

pub async fn chat_thread(
    state: &AppState,
    user_id: String,
    limit: Option<usize>,
) -> CommandResult<Vec<ChatMessage>> {
    let app_state = state.clone();
    run_blocking("chat", move || {
        app_state
            .chat()
            .list_thread(&user_id, limit.unwrap_or(DEFAULT_THREAD_LIMIT))
    })
    .await
}

pub async fn chat_mark_read(
    state: &AppState,
    user_id: String,
    reader: String,
) -> CommandResult<usize> {
    let app_state = state.clone();
    run_blocking("chat", move || {
        let reader = parse_sender(&reader)?;
        app_state.chat().mark_read(&user_id, reader)
    })
    .await
}

pub async fn chat_unread_count(
    state: &AppState,
    user_id: String,
    reader: String,
) -> CommandResult<i64> {
    let app_state = state.clone();
    run_blocking("chat", move || {
        let reader = parse_sender(&reader)?;
        app_state.chat().unread_count(&user_id, reader)
    })
    .await
}
