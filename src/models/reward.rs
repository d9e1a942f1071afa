use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Bonus points granted when the badge is earned.
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadge {
    pub badge_id: String,
    pub user_id: String,
    pub earned_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsTransaction {
    pub id: i64,
    pub user_id: String,
    pub amount: i64,
    pub reason: String,
    pub created_at: String,
}

/// Facts about a user that badge conditions are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeContext {
    pub user_id: String,
    pub entry_count: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub appointment_count: i64,
    pub completed_goals: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    pub total_points: i64,
    pub badges: Vec<EarnedBadge>,
}
