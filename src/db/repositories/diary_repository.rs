use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::diary::{DiaryEntry, Emotion};
use crate::models::streak::ActivityTimestamp;
use crate::utils::dates::{parse_datetime, utc_sort_key};

const SELECT_COLUMNS: &str =
    "id, user_id, emotion, description, intensity, occurred_at, created_at";

#[derive(Debug, Clone)]
pub struct DiaryEntryRow {
    pub id: String,
    pub user_id: String,
    pub emotion: String,
    pub description: String,
    pub intensity: i64,
    pub occurred_at: String,
    pub created_at: String,
}

impl DiaryEntryRow {
    pub fn from_entry(entry: &DiaryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            user_id: entry.user_id.clone(),
            emotion: entry.emotion.as_str().to_string(),
            description: entry.description.clone(),
            intensity: i64::from(entry.intensity),
            occurred_at: entry.occurred_at.to_rfc3339(),
            created_at: entry.created_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<DiaryEntry> {
        let emotion = Emotion::try_from(self.emotion.as_str()).map_err(AppError::validation)?;
        let intensity = u8::try_from(self.intensity).map_err(|_| {
            AppError::validation(format!("stored intensity out of range: {}", self.intensity))
        })?;

        Ok(DiaryEntry {
            id: self.id,
            user_id: self.user_id,
            emotion,
            description: self.description,
            intensity,
            occurred_at: parse_datetime(&self.occurred_at)?,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for DiaryEntryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            emotion: row.get("emotion")?,
            description: row.get("description")?,
            intensity: row.get("intensity")?,
            occurred_at: row.get("occurred_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct DiaryRepository;

impl DiaryRepository {
    pub fn insert(conn: &Connection, entry: &DiaryEntry) -> AppResult<()> {
        let row = DiaryEntryRow::from_entry(entry);

        conn.execute(
            r#"
                INSERT INTO diary_entries (
                    id, user_id, emotion, description, intensity,
                    occurred_at, occurred_at_utc, created_at
                ) VALUES (
                    :id, :user_id, :emotion, :description, :intensity,
                    :occurred_at, :occurred_at_utc, :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":emotion": &row.emotion,
                ":description": &row.description,
                ":intensity": row.intensity,
                ":occurred_at": &row.occurred_at,
                ":occurred_at_utc": utc_sort_key(&entry.occurred_at),
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<DiaryEntry> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM diary_entries WHERE id = :id");
        let row = conn
            .query_row(&sql, named_params! {":id": id}, |row| {
                DiaryEntryRow::try_from(row)
            })
            .optional()?;

        match row {
            Some(row) => row.into_record(),
            None => Err(AppError::not_found()),
        }
    }

    /// Most recent instant first, whatever offset each entry was written in.
    pub fn list_by_user(
        conn: &Connection,
        user_id: &str,
        limit: usize,
    ) -> AppResult<Vec<DiaryEntry>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM diary_entries WHERE user_id = :user_id \
             ORDER BY occurred_at_utc DESC LIMIT :limit"
        );
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(
                named_params! {":user_id": user_id, ":limit": limit as i64},
                |row| DiaryEntryRow::try_from(row),
            )?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    /// Every entry of a user, oldest first.
    pub fn list_all_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<DiaryEntry>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM diary_entries WHERE user_id = :user_id \
             ORDER BY occurred_at_utc ASC"
        );
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                DiaryEntryRow::try_from(row)
            })?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_activity_timestamps(
        conn: &Connection,
        user_id: &str,
    ) -> AppResult<Vec<ActivityTimestamp>> {
        let mut stmt = conn.prepare(
            "SELECT occurred_at FROM diary_entries WHERE user_id = :user_id \
             ORDER BY occurred_at_utc DESC",
        )?;

        let timestamps = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                row.get::<_, String>(0)
            })?
            .map(|value| {
                value
                    .map_err(AppError::from)
                    .and_then(|value| parse_datetime(&value))
                    .map(ActivityTimestamp::new)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(timestamps)
    }

    pub fn count_by_user(conn: &Connection, user_id: &str) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM diary_entries WHERE user_id = :user_id",
            named_params! {":user_id": user_id},
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM diary_entries WHERE id = :id",
            named_params! {":id": id},
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }
}
