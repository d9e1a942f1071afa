use std::convert::TryFrom;

use rusqlite::{named_params, Connection, Row};

use crate::error::AppResult;
use crate::models::reward::{EarnedBadge, PointsTransaction};

impl TryFrom<&Row<'_>> for PointsTransaction {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            amount: row.get("amount")?,
            reason: row.get("reason")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl TryFrom<&Row<'_>> for EarnedBadge {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            badge_id: row.get("badge_id")?,
            user_id: row.get("user_id")?,
            earned_at: row.get("earned_at")?,
        })
    }
}

pub struct RewardRepository;

impl RewardRepository {
    pub fn insert_points(
        conn: &Connection,
        user_id: &str,
        amount: i64,
        reason: &str,
        created_at: &str,
    ) -> AppResult<i64> {
        conn.execute(
            r#"
                INSERT INTO points_ledger (user_id, amount, reason, created_at)
                VALUES (:user_id, :amount, :reason, :created_at)
            "#,
            named_params! {
                ":user_id": user_id,
                ":amount": amount,
                ":reason": reason,
                ":created_at": created_at,
            },
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn total_points(conn: &Connection, user_id: &str) -> AppResult<i64> {
        let total = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM points_ledger WHERE user_id = :user_id",
            named_params! {":user_id": user_id},
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn list_points(
        conn: &Connection,
        user_id: &str,
        limit: usize,
    ) -> AppResult<Vec<PointsTransaction>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, amount, reason, created_at
                FROM points_ledger
                WHERE user_id = :user_id
                ORDER BY id DESC
                LIMIT :limit
            "#,
        )?;

        let rows = stmt
            .query_map(
                named_params! {":user_id": user_id, ":limit": limit as i64},
                |row| PointsTransaction::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Returns `true` only the first time a badge is stored for a user.
    pub fn award_badge(
        conn: &Connection,
        user_id: &str,
        badge_id: &str,
        earned_at: &str,
    ) -> AppResult<bool> {
        let inserted = conn.execute(
            r#"
                INSERT OR IGNORE INTO earned_badges (user_id, badge_id, earned_at)
                VALUES (:user_id, :badge_id, :earned_at)
            "#,
            named_params! {
                ":user_id": user_id,
                ":badge_id": badge_id,
                ":earned_at": earned_at,
            },
        )?;
        Ok(inserted == 1)
    }

    pub fn list_badges(conn: &Connection, user_id: &str) -> AppResult<Vec<EarnedBadge>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT user_id, badge_id, earned_at
                FROM earned_badges
                WHERE user_id = :user_id
                ORDER BY earned_at ASC, badge_id ASC
            "#,
        )?;

        let rows = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                EarnedBadge::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
