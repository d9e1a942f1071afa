use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::appointment_repository::AppointmentRepository;
use crate::db::repositories::diary_repository::DiaryRepository;
use crate::db::repositories::goal_repository::GoalRepository;
use crate::db::repositories::reward_repository::RewardRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::reward::{
    BadgeContext, BadgeDefinition, EarnedBadge, PointsTransaction, RewardSummary,
};
use crate::services::settings_service::SettingsService;
use crate::services::streak_calculator::compute_streak;

/// Decides whether a user has earned one badge.
pub trait BadgeCondition: Send + Sync {
    fn evaluate(&self, context: &BadgeContext) -> bool;
}

impl<F> BadgeCondition for F
where
    F: Fn(&BadgeContext) -> bool + Send + Sync,
{
    fn evaluate(&self, context: &BadgeContext) -> bool {
        self(context)
    }
}

struct RegisteredBadge {
    definition: BadgeDefinition,
    condition: Box<dyn BadgeCondition>,
}

/// Badge id to condition mapping, evaluated in registration order.
#[derive(Default)]
pub struct BadgeRegistry {
    badges: Vec<RegisteredBadge>,
}

impl BadgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(
                badge("first_entry", "First Feeling", "Wrote the first diary entry", 5),
                |ctx: &BadgeContext| ctx.entry_count >= 1,
            )
            .register(
                badge(
                    "streak_3",
                    "Three in a Row",
                    "Wrote in the diary three days running",
                    15,
                ),
                |ctx: &BadgeContext| ctx.longest_streak >= 3,
            )
            .register(
                badge(
                    "streak_7",
                    "Full Week",
                    "Wrote in the diary seven days running",
                    50,
                ),
                |ctx: &BadgeContext| ctx.longest_streak >= 7,
            )
            .register(
                badge("entries_10", "Storyteller", "Wrote ten diary entries", 20),
                |ctx: &BadgeContext| ctx.entry_count >= 10,
            )
            .register(
                badge(
                    "first_appointment",
                    "Check-in",
                    "Booked a visit with the doctor",
                    10,
                ),
                |ctx: &BadgeContext| ctx.appointment_count >= 1,
            )
            .register(
                badge("first_goal", "Goal Getter", "Completed a weekly goal", 25),
                |ctx: &BadgeContext| ctx.completed_goals >= 1,
            )
            .register(
                badge("points_100", "Century", "Collected 100 points", 0),
                |ctx: &BadgeContext| ctx.total_points >= 100,
            );
        registry
    }

    /// Adds a badge; a second registration with the same id replaces the first.
    pub fn register(
        &mut self,
        definition: BadgeDefinition,
        condition: impl BadgeCondition + 'static,
    ) -> &mut Self {
        let entry = RegisteredBadge {
            definition,
            condition: Box::new(condition),
        };
        match self
            .badges
            .iter_mut()
            .find(|existing| existing.definition.id == entry.definition.id)
        {
            Some(existing) => *existing = entry,
            None => self.badges.push(entry),
        }
        self
    }

    pub fn definitions(&self) -> Vec<BadgeDefinition> {
        self.badges
            .iter()
            .map(|badge| badge.definition.clone())
            .collect()
    }

    pub fn find(&self, badge_id: &str) -> Option<&BadgeDefinition> {
        self.badges
            .iter()
            .map(|badge| &badge.definition)
            .find(|definition| definition.id == badge_id)
    }

    /// Every badge whose condition holds for `context`.
    pub fn qualifying(&self, context: &BadgeContext) -> Vec<&BadgeDefinition> {
        self.badges
            .iter()
            .filter(|badge| badge.condition.evaluate(context))
            .map(|badge| &badge.definition)
            .collect()
    }
}

fn badge(id: &str, title: &str, description: &str, points: i64) -> BadgeDefinition {
    BadgeDefinition {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        points,
    }
}

pub struct RewardService {
    db: DbPool,
    settings: Arc<SettingsService>,
    registry: BadgeRegistry,
}

impl RewardService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self::with_registry(db, settings, BadgeRegistry::with_defaults())
    }

    pub fn with_registry(
        db: DbPool,
        settings: Arc<SettingsService>,
        registry: BadgeRegistry,
    ) -> Self {
        Self {
            db,
            settings,
            registry,
        }
    }

    pub fn catalogue(&self) -> Vec<BadgeDefinition> {
        self.registry.definitions()
    }

    /// Records a points change and returns the new balance.
    pub fn award_points(&self, user_id: &str, amount: i64, reason: &str) -> AppResult<i64> {
        if user_id.trim().is_empty() {
            return Err(AppError::validation("user id is required"));
        }
        if reason.trim().is_empty() {
            return Err(AppError::validation("a reason is required for points"));
        }

        let now = Utc::now().to_rfc3339();
        let total = self.db.with_transaction(|conn| {
            RewardRepository::insert_points(conn, user_id, amount, reason.trim(), &now)?;
            RewardRepository::total_points(conn, user_id)
        })?;

        debug!(target: "app::rewards", %user_id, amount, total, reason, "points awarded");
        Ok(total)
    }

    /// Credits entry points on the caller's connection, so the points share
    /// the transaction that stores the entry. Returns the new balance.
    pub fn award_entry_points_in(
        &self,
        conn: &Connection,
        user_id: &str,
        created_at: &str,
    ) -> AppResult<i64> {
        let points = self.settings.get()?.points_per_entry;
        if points != 0 {
            RewardRepository::insert_points(conn, user_id, points, "diary_entry", created_at)?;
        }
        let total = RewardRepository::total_points(conn, user_id)?;
        debug!(target: "app::rewards", %user_id, amount = points, total, "entry points awarded");
        Ok(total)
    }

    pub fn total_points(&self, user_id: &str) -> AppResult<i64> {
        self.db
            .with_connection(|conn| RewardRepository::total_points(conn, user_id))
    }

    pub fn points_history(&self, user_id: &str, limit: usize) -> AppResult<Vec<PointsTransaction>> {
        self.db
            .with_connection(|conn| RewardRepository::list_points(conn, user_id, limit))
    }

    pub fn build_context(&self, user_id: &str, today: NaiveDate) -> AppResult<BadgeContext> {
        let policy = self.settings.get()?.timezone_policy;

        self.db.with_connection(|conn| {
            let timestamps = DiaryRepository::list_activity_timestamps(conn, user_id)?;
            let streak = compute_streak(&timestamps, today, &policy);

            Ok(BadgeContext {
                user_id: user_id.to_string(),
                entry_count: DiaryRepository::count_by_user(conn, user_id)?,
                current_streak: streak.current_streak,
                longest_streak: streak.longest_streak,
                appointment_count: AppointmentRepository::count_kept_by_user(conn, user_id)?,
                completed_goals: GoalRepository::count_completed(conn, user_id)?,
                total_points: RewardRepository::total_points(conn, user_id)?,
            })
        })
    }

    /// Awards every badge the user now qualifies for but does not hold yet,
    /// together with its bonus points. Returns only the new badges.
    pub fn evaluate_badges(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> AppResult<Vec<BadgeDefinition>> {
        let context = self.build_context(user_id, today)?;
        let qualifying = self.registry.qualifying(&context);
        if qualifying.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now().to_rfc3339();
        let newly_earned = self.db.with_transaction(|conn| {
            let mut earned = Vec::new();
            for definition in qualifying {
                if !RewardRepository::award_badge(conn, user_id, &definition.id, &now)? {
                    continue;
                }
                if definition.points != 0 {
                    let reason = format!("badge:{}", definition.id);
                    RewardRepository::insert_points(
                        conn,
                        user_id,
                        definition.points,
                        &reason,
                        &now,
                    )?;
                }
                earned.push(definition.clone());
            }
            Ok(earned)
        })?;

        if !newly_earned.is_empty() {
            info!(
                target: "app::rewards",
                %user_id,
                badges = ?newly_earned.iter().map(|badge| badge.id.as_str()).collect::<Vec<_>>(),
                "badges earned"
            );
        }

        Ok(newly_earned)
    }

    pub fn badges(&self, user_id: &str) -> AppResult<Vec<EarnedBadge>> {
        self.db
            .with_connection(|conn| RewardRepository::list_badges(conn, user_id))
    }

    pub fn summary(&self, user_id: &str) -> AppResult<RewardSummary> {
        self.db.with_connection(|conn| {
            Ok(RewardSummary {
                total_points: RewardRepository::total_points(conn, user_id)?,
                badges: RewardRepository::list_badges(conn, user_id)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> BadgeContext {
        BadgeContext {
            user_id: "kid-1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn default_registry_dispatches_by_condition() {
        let registry = BadgeRegistry::with_defaults();
        assert!(registry.qualifying(&context()).is_empty());

        let ctx = BadgeContext {
            entry_count: 3,
            longest_streak: 3,
            current_streak: 2,
            ..context()
        };
        let ids = registry
            .qualifying(&ctx)
            .into_iter()
            .map(|badge| badge.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["first_entry", "streak_3"]);
    }

    #[test]
    fn custom_condition_can_be_registered_and_replaced() {
        let mut registry = BadgeRegistry::new();
        registry.register(badge("calm", "Calm", "", 0), |_: &BadgeContext| false);
        assert!(registry.qualifying(&context()).is_empty());

        registry.register(badge("calm", "Calm", "", 0), |_: &BadgeContext| true);
        assert_eq!(registry.definitions().len(), 1);
        assert_eq!(registry.qualifying(&context()).len(), 1);
        assert!(registry.find("calm").is_some());
        assert!(registry.find("missing").is_none());
    }
}
