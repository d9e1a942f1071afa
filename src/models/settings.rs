use chrono::NaiveTime;
use serde::Serialize;

use crate::utils::dates::DayBoundaryPolicy;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(serialize_with = "serialize_policy")]
    pub timezone_policy: DayBoundaryPolicy,
    pub daily_reminder_time: NaiveTime,
    pub appointment_reminder_minutes: i64,
    pub points_per_entry: i64,
    pub provider_id: String,
    pub updated_at: String,
}

fn serialize_policy<S>(policy: &DayBoundaryPolicy, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(policy)
}
