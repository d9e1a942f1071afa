use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One cell of a six-week month view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day_of_month: u32,
    pub is_current_month: bool,
    pub is_today: bool,
    pub is_past: bool,
    pub has_available_slots: bool,
}
