use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::chat::{ChatMessage, Sender};

#[derive(Debug, Clone)]
pub struct ChatMessageRow {
    pub id: i64,
    pub user_id: String,
    pub sender: String,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
}

impl ChatMessageRow {
    pub fn into_record(self) -> AppResult<ChatMessage> {
        let sender = Sender::try_from(self.sender.as_str()).map_err(AppError::validation)?;

        Ok(ChatMessage {
            id: self.id,
            user_id: self.user_id,
            sender,
            body: self.body,
            sent_at: self.sent_at,
            read_at: self.read_at,
        })
    }
}

impl TryFrom<&Row<'_>> for ChatMessageRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            sender: row.get("sender")?,
            body: row.get("body")?,
            sent_at: row.get("sent_at")?,
            read_at: row.get("read_at")?,
        })
    }
}

pub struct ChatRepository;

impl ChatRepository {
    pub fn insert(
        conn: &Connection,
        user_id: &str,
        sender: Sender,
        body: &str,
        sent_at: &str,
    ) -> AppResult<i64> {
        conn.execute(
            r#"
                INSERT INTO chat_messages (user_id, sender, body, sent_at)
                VALUES (:user_id, :sender, :body, :sent_at)
            "#,
            named_params! {
                ":user_id": user_id,
                ":sender": sender.as_str(),
                ":body": body,
                ":sent_at": sent_at,
            },
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<ChatMessage> {
        let row = conn
            .query_row(
                r#"
                    SELECT id, user_id, sender, body, sent_at, read_at
                    FROM chat_messages
                    WHERE id = :id
                "#,
                named_params! {":id": id},
                |row| ChatMessageRow::try_from(row),
            )
            .optional()?;

        match row {
            Some(row) => row.into_record(),
            None => Err(AppError::not_found()),
        }
    }

    /// The newest `limit` messages of a thread, oldest first.
    pub fn list_thread(
        conn: &Connection,
        user_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ChatMessage>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, sender, body, sent_at, read_at
                FROM (
                    SELECT id, user_id, sender, body, sent_at, read_at
                    FROM chat_messages
                    WHERE user_id = :user_id
                    ORDER BY id DESC
                    LIMIT :limit
                )
                ORDER BY id ASC
            "#,
        )?;

        let records = stmt
            .query_map(
                named_params! {":user_id": user_id, ":limit": limit as i64},
                |row| ChatMessageRow::try_from(row),
            )?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    /// Marks every unread message written by `sender` in the thread as read.
    pub fn mark_read(
        conn: &Connection,
        user_id: &str,
        sender: Sender,
        read_at: &str,
    ) -> AppResult<usize> {
        let affected = conn.execute(
            r#"
                UPDATE chat_messages
                SET read_at = :read_at
                WHERE user_id = :user_id AND sender = :sender AND read_at IS NULL
            "#,
            named_params! {
                ":user_id": user_id,
                ":sender": sender.as_str(),
                ":read_at": read_at,
            },
        )?;
        Ok(affected)
    }

    pub fn unread_count(conn: &Connection, user_id: &str, sender: Sender) -> AppResult<i64> {
        let count = conn.query_row(
            r#"
                SELECT COUNT(*)
                FROM chat_messages
                WHERE user_id = :user_id AND sender = :sender AND read_at IS NULL
            "#,
            named_params! {":user_id": user_id, ":sender": sender.as_str()},
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
