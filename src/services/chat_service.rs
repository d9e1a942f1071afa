use chrono::Utc;
use tracing::{debug, info};

use crate::db::repositories::chat_repository::ChatRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::chat::{ChatMessage, Sender};

const MAX_BODY_CHARS: usize = 2000;
const MAX_THREAD_LIMIT: usize = 500;

/// One thread per user, shared between the user and their doctor.
pub struct ChatService {
    db: DbPool,
}

impl ChatService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn send_message(
        &self,
        user_id: &str,
        sender: Sender,
        body: &str,
    ) -> AppResult<ChatMessage> {
        let user_id = user_id.trim();
        let body = body.trim();
        if user_id.is_empty() {
            return Err(AppError::validation("user id is required"));
        }
        if body.is_empty() {
            return Err(AppError::validation("message must not be empty"));
        }
        if body.chars().count() > MAX_BODY_CHARS {
            return Err(AppError::validation(format!(
                "message must be at most {MAX_BODY_CHARS} characters"
            )));
        }

        let sent_at = Utc::now().to_rfc3339();
        let message = self.db.with_transaction(|conn| {
            let id = ChatRepository::insert(conn, user_id, sender, body, &sent_at)?;
            ChatRepository::find_by_id(conn, id)
        })?;

        info!(target: "app::chat", message_id = message.id, %user_id, %sender, "message sent");
        Ok(message)
    }

    pub fn list_thread(&self, user_id: &str, limit: usize) -> AppResult<Vec<ChatMessage>> {
        let limit = limit.clamp(1, MAX_THREAD_LIMIT);
        self.db
            .with_connection(|conn| ChatRepository::list_thread(conn, user_id, limit))
    }

    /// `reader` has seen everything the other side wrote. Returns how many
    /// messages changed.
    pub fn mark_read(&self, user_id: &str, reader: Sender) -> AppResult<usize> {
        let read_at = Utc::now().to_rfc3339();
        let updated = self.db.with_connection(|conn| {
            ChatRepository::mark_read(conn, user_id, reader.counterpart(), &read_at)
        })?;
        debug!(target: "app::chat", %user_id, %reader, updated, "messages marked read");
        Ok(updated)
    }

    /// Messages waiting for `reader`.
    pub fn unread_count(&self, user_id: &str, reader: Sender) -> AppResult<i64> {
        self.db.with_connection(|conn| {
            ChatRepository::unread_count(conn, user_id, reader.counterpart())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_service() -> (ChatService, tempfile::TempDir) {
        let dir = tempdir().expect("temp dir");
        let pool = DbPool::new(dir.path().join("chat.sqlite")).expect("db pool");
        (ChatService::new(pool), dir)
    }

    #[test]
    fn blank_messages_are_rejected() {
        let (service, _dir) = create_test_service();
        assert!(service
            .send_message("kid-1", Sender::User, "   ")
            .unwrap_err()
            .is_validation());
        assert!(service.list_thread("kid-1", 10).unwrap().is_empty());
    }

    #[test]
    fn unread_tracking_is_per_side() {
        let (service, _dir) = create_test_service();
        service.send_message("kid-1", Sender::User, "I felt sad today").unwrap();
        service.send_message("kid-1", Sender::Doctor, "Want to talk about it?").unwrap();
        service.send_message("kid-1", Sender::Doctor, "I'm here tomorrow").unwrap();

        assert_eq!(service.unread_count("kid-1", Sender::User).unwrap(), 2);
        assert_eq!(service.unread_count("kid-1", Sender::Doctor).unwrap(), 1);

        assert_eq!(service.mark_read("kid-1", Sender::User).unwrap(), 2);
        assert_eq!(service.unread_count("kid-1", Sender::User).unwrap(), 0);
        assert_eq!(service.unread_count("kid-1", Sender::Doctor).unwrap(), 1);

        let thread = service.list_thread("kid-1", 2).unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].body, "Want to talk about it?");
        assert!(thread[1].read_at.is_some());
    }
}
