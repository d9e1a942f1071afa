use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyGoal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub target_count: u32,
    /// Sunday that opens the goal's week.
    pub week_start: NaiveDate,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWeeklyGoalRequest {
    pub user_id: String,
    pub title: String,
    pub target_count: u32,
    /// Any day inside the target week.
    pub week_of: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyGoalWithProgress {
    #[serde(flatten)]
    pub goal: WeeklyGoal,
    pub completed_count: u32,
    pub progress_percentage: f32,
    pub is_completed: bool,
    pub completed_days: Vec<NaiveDate>,
}
