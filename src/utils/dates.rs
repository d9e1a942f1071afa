use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Timelike, Utc,
};
use chrono_tz::Tz;
use serde_json::json;

use crate::error::{AppError, AppResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

pub fn parse_datetime(value: &str) -> AppResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|err| {
        AppError::validation_with_details(
            "invalid timestamp",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

/// Fixed-width UTC rendering of an instant, so text order matches time order.
pub fn utc_sort_key(instant: &DateTime<FixedOffset>) -> String {
    instant
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid date, expected YYYY-MM-DD",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|err| {
            AppError::validation_with_details(
                "invalid time, expected HH:MM",
                json!({"value": value, "error": err.to_string()}),
            )
        })
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Sunday-based weekday index, 0 = Sunday .. 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn sunday_on_or_before(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(day_of_week(date)))
}

pub fn ensure_window(start: NaiveTime, end: NaiveTime) -> AppResult<()> {
    if end <= start {
        Err(AppError::validation("window end must be after its start"))
    } else {
        Ok(())
    }
}

pub fn is_whole_hour(time: NaiveTime) -> bool {
    time.minute() == 0 && time.second() == 0 && time.nanosecond() == 0
}

/// How an instant is mapped onto the calendar day it counts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayBoundaryPolicy {
    /// Use the offset the timestamp was recorded with, i.e. the device-local
    /// time at the moment of writing.
    #[default]
    RecordedOffset,
    /// Re-project every timestamp into one IANA zone before truncating.
    Zone(Tz),
}

impl DayBoundaryPolicy {
    pub const RECORDED_OFFSET: &'static str = "recorded_offset";

    pub fn civil_date(&self, instant: &DateTime<FixedOffset>) -> NaiveDate {
        match self {
            DayBoundaryPolicy::RecordedOffset => instant.date_naive(),
            DayBoundaryPolicy::Zone(tz) => instant.with_timezone(tz).date_naive(),
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::RECORDED_OFFSET) {
            return Ok(DayBoundaryPolicy::RecordedOffset);
        }

        trimmed
            .parse::<Tz>()
            .map(DayBoundaryPolicy::Zone)
            .map_err(|err| {
                AppError::validation_with_details(
                    "unknown timezone",
                    json!({"value": value, "error": err.to_string()}),
                )
            })
    }
}

impl fmt::Display for DayBoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayBoundaryPolicy::RecordedOffset => f.write_str(Self::RECORDED_OFFSET),
            DayBoundaryPolicy::Zone(tz) => f.write_str(tz.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_of_week_is_sunday_based() {
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(day_of_week(sunday), 0);
        assert_eq!(day_of_week(saturday), 6);
        assert_eq!(sunday_on_or_before(saturday), sunday);
        assert_eq!(sunday_on_or_before(sunday), sunday);
    }

    #[test]
    fn utc_sort_key_orders_mixed_offsets() {
        let later = parse_datetime("2024-06-10T23:00:00-05:00").unwrap();
        let earlier = parse_datetime("2024-06-11T01:00:00+00:00").unwrap();
        assert_eq!(utc_sort_key(&later), "2024-06-11T04:00:00.000000000Z");
        assert!(utc_sort_key(&earlier) < utc_sort_key(&later));
        assert!(earlier.to_rfc3339() > later.to_rfc3339());
    }

    #[test]
    fn recorded_offset_keeps_local_day() {
        // 23:30 in New York is already the next day in UTC.
        let instant = parse_datetime("2024-06-10T23:30:00-04:00").unwrap();
        let policy = DayBoundaryPolicy::default();
        assert_eq!(
            policy.civil_date(&instant),
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
        );

        let utc = DayBoundaryPolicy::parse("UTC").unwrap();
        assert_eq!(
            utc.civil_date(&instant),
            NaiveDate::from_ymd_opt(2024, 6, 11).unwrap()
        );
    }

    #[test]
    fn policy_parse_rejects_unknown_zone() {
        assert_eq!(
            DayBoundaryPolicy::parse("recorded_offset").unwrap(),
            DayBoundaryPolicy::RecordedOffset
        );
        assert!(DayBoundaryPolicy::parse("Mars/Olympus").is_err());
        assert_eq!(
            DayBoundaryPolicy::parse("Europe/Berlin").unwrap().to_string(),
            "Europe/Berlin"
        );
    }

    #[test]
    fn parse_time_accepts_seconds() {
        assert_eq!(
            parse_time("09:00:00").unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(format_time(parse_time("14:30").unwrap()), "14:30");
        assert!(parse_time("9am").is_err());
    }
}
