use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::db::repositories::diary_repository::DiaryRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::diary::{CreateDiaryEntryRequest, DiaryEntry, Emotion, EmotionCount};
use crate::models::streak::StreakResult;
use crate::services::reward_service::RewardService;
use crate::services::settings_service::SettingsService;
use crate::services::streak_calculator::compute_streak;

const MAX_LIST_LIMIT: usize = 500;

pub struct DiaryService {
    db: DbPool,
    settings: Arc<SettingsService>,
    rewards: Arc<RewardService>,
}

impl DiaryService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>, rewards: Arc<RewardService>) -> Self {
        Self {
            db,
            settings,
            rewards,
        }
    }

    /// Stores an entry and credits the author with entry points. Both writes
    /// commit together or not at all.
    pub fn create_entry(&self, request: CreateDiaryEntryRequest) -> AppResult<DiaryEntry> {
        request.validate()?;

        let entry = DiaryEntry {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.trim().to_string(),
            emotion: request.emotion,
            description: request.description.trim().to_string(),
            intensity: request.intensity,
            occurred_at: request.occurred_at,
            created_at: Utc::now().to_rfc3339(),
        };

        let total_points = self.db.with_transaction(|conn| {
            DiaryRepository::insert(conn, &entry)?;
            self.rewards
                .award_entry_points_in(conn, &entry.user_id, &entry.created_at)
        })?;

        info!(
            target: "app::diary",
            entry_id = %entry.id,
            user_id = %entry.user_id,
            emotion = %entry.emotion,
            intensity = entry.intensity,
            total_points,
            "diary entry created"
        );

        Ok(entry)
    }

    pub fn get_entry(&self, id: &str) -> AppResult<DiaryEntry> {
        self.db
            .with_connection(|conn| DiaryRepository::find_by_id(conn, id))
    }

    pub fn list_entries(&self, user_id: &str, limit: usize) -> AppResult<Vec<DiaryEntry>> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        self.db
            .with_connection(|conn| DiaryRepository::list_by_user(conn, user_id, limit))
    }

    pub fn delete_entry(&self, id: &str) -> AppResult<()> {
        self.db.with_connection(|conn| DiaryRepository::delete(conn, id))?;
        info!(target: "app::diary", entry_id = %id, "diary entry deleted");
        Ok(())
    }

    pub fn user_streak(&self, user_id: &str, today: NaiveDate) -> AppResult<StreakResult> {
        let policy = self.settings.get()?.timezone_policy;
        let timestamps = self
            .db
            .with_connection(|conn| DiaryRepository::list_activity_timestamps(conn, user_id))?;

        Ok(compute_streak(&timestamps, today, &policy))
    }

    /// Entries per emotion over the inclusive civil-date range `from..=to`.
    /// Emotions with no entries are reported with a zero count.
    pub fn emotion_summary(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<EmotionCount>> {
        if to < from {
            return Err(AppError::validation("summary range ends before it starts"));
        }

        let policy = self.settings.get()?.timezone_policy;
        let entries = self
            .db
            .with_connection(|conn| DiaryRepository::list_all_by_user(conn, user_id))?;

        let mut counts = Emotion::ALL
            .iter()
            .map(|emotion| (*emotion, 0_i64))
            .collect::<BTreeMap<_, _>>();

        for entry in entries {
            let day = policy.civil_date(&entry.occurred_at);
            if (from..=to).contains(&day) {
                *counts.entry(entry.emotion).or_default() += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(emotion, count)| EmotionCount { emotion, count })
            .collect())
    }
}
