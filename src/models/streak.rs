use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// An instant at which a user did something that counts towards a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTimestamp {
    pub occurred_at: DateTime<FixedOffset>,
}

impl ActivityTimestamp {
    pub fn new(occurred_at: DateTime<FixedOffset>) -> Self {
        Self { occurred_at }
    }
}

impl From<DateTime<FixedOffset>> for ActivityTimestamp {
    fn from(occurred_at: DateTime<FixedOffset>) -> Self {
        Self { occurred_at }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakResult {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_entry_date: Option<NaiveDate>,
}
