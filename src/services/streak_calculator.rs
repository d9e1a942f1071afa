//! Consecutive-day activity streaks.
//!
//! Everything here works on civil dates. Timestamps are reduced to the day
//! they count for (see [`DayBoundaryPolicy`]) and deduplicated before any
//! counting happens, so several entries on one day still count once.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::models::streak::{ActivityTimestamp, StreakResult};
use crate::utils::dates::DayBoundaryPolicy;

pub fn compute_streak(
    timestamps: &[ActivityTimestamp],
    today: NaiveDate,
    policy: &DayBoundaryPolicy,
) -> StreakResult {
    let dates = timestamps
        .iter()
        .map(|timestamp| policy.civil_date(&timestamp.occurred_at))
        .collect::<BTreeSet<_>>();

    compute_streak_from_dates(&dates, today)
}

pub fn compute_streak_from_dates(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakResult {
    let Some(&last_entry_date) = dates.iter().next_back() else {
        return StreakResult::default();
    };

    let current_streak = current_run(dates, today);
    let longest_streak = longest_run(dates);

    debug!(
        target: "app::streak",
        distinct_days = dates.len(),
        current_streak,
        longest_streak,
        %last_entry_date,
        "streak computed"
    );

    StreakResult {
        current_streak,
        longest_streak,
        last_entry_date: Some(last_entry_date),
    }
}

/// Length of the run ending today, or yesterday when today has no entry yet.
fn current_run(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let yesterday = today - Duration::days(1);
    let anchor = if dates.contains(&today) {
        today
    } else if dates.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 1;
    let mut cursor = anchor - Duration::days(1);
    while dates.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

fn longest_run(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &date in dates {
        run = match previous {
            Some(prev) if date - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::dates::parse_datetime;

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn at(value: &str) -> ActivityTimestamp {
        ActivityTimestamp::new(parse_datetime(value).expect("valid timestamp"))
    }

    fn streak(values: &[&str], today: NaiveDate) -> StreakResult {
        let timestamps = values.iter().map(|value| at(value)).collect::<Vec<_>>();
        compute_streak(&timestamps, today, &DayBoundaryPolicy::RecordedOffset)
    }

    #[test]
    fn empty_input_yields_zero() {
        let result = streak(&[], day(2024, 6, 11));
        assert_eq!(result, StreakResult::default());
        assert!(result.last_entry_date.is_none());
    }

    #[test]
    fn single_entry_today() {
        let result = streak(&["2024-06-11T08:00:00Z"], day(2024, 6, 11));
        assert_eq!(result.current_streak, 1);
        assert_eq!(result.longest_streak, 1);
    }

    #[test]
    fn today_and_yesterday() {
        let result = streak(
            &["2024-06-10T20:00:00Z", "2024-06-11T07:30:00Z"],
            day(2024, 6, 11),
        );
        assert_eq!(
            result,
            StreakResult {
                current_streak: 2,
                longest_streak: 2,
                last_entry_date: Some(day(2024, 6, 11)),
            }
        );
    }

    #[test]
    fn gap_before_today_breaks_streak() {
        let result = streak(&["2024-06-09T12:00:00Z"], day(2024, 6, 11));
        assert_eq!(
            result,
            StreakResult {
                current_streak: 0,
                longest_streak: 1,
                last_entry_date: Some(day(2024, 6, 9)),
            }
        );
    }

    #[test]
    fn yesterday_anchors_when_today_is_empty() {
        let result = streak(
            &[
                "2024-06-10T09:00:00Z",
                "2024-06-09T09:00:00Z",
                "2024-06-08T09:00:00Z",
            ],
            day(2024, 6, 11),
        );
        assert_eq!(
            result,
            StreakResult {
                current_streak: 3,
                longest_streak: 3,
                last_entry_date: Some(day(2024, 6, 10)),
            }
        );
    }

    #[test]
    fn several_entries_on_one_day_count_once() {
        let result = streak(
            &[
                "2024-06-11T07:00:00Z",
                "2024-06-11T12:00:00Z",
                "2024-06-11T21:00:00Z",
                "2024-06-10T21:00:00Z",
            ],
            day(2024, 6, 11),
        );
        assert_eq!(result.current_streak, 2);
        assert_eq!(result.longest_streak, 2);
    }

    #[test]
    fn longest_run_can_be_in_the_past() {
        let result = streak(
            &[
                "2024-05-01T09:00:00Z",
                "2024-05-02T09:00:00Z",
                "2024-05-03T09:00:00Z",
                "2024-05-04T09:00:00Z",
                "2024-06-10T09:00:00Z",
                "2024-06-11T09:00:00Z",
            ],
            day(2024, 6, 11),
        );
        assert_eq!(result.current_streak, 2);
        assert_eq!(result.longest_streak, 4);
        assert!(result.longest_streak >= result.current_streak);
    }

    #[test]
    fn run_spans_month_and_year_boundaries() {
        let result = streak(
            &[
                "2023-12-30T09:00:00Z",
                "2023-12-31T09:00:00Z",
                "2024-01-01T09:00:00Z",
            ],
            day(2024, 1, 1),
        );
        assert_eq!(result.current_streak, 3);
        assert_eq!(result.longest_streak, 3);
    }

    #[test]
    fn local_evening_entry_counts_for_local_day() {
        // Written at 22:00 in UTC-5, which is already tomorrow in UTC.
        let entries = ["2024-06-10T22:00:00-05:00", "2024-06-09T10:00:00-05:00"];
        let local = streak(&entries, day(2024, 6, 10));
        assert_eq!(local.current_streak, 2);

        let timestamps = entries.iter().map(|value| at(value)).collect::<Vec<_>>();
        let utc = compute_streak(
            &timestamps,
            day(2024, 6, 10),
            &DayBoundaryPolicy::Zone(chrono_tz::UTC),
        );
        assert_eq!(utc.last_entry_date, Some(day(2024, 6, 11)));
        assert_eq!(utc.current_streak, 1);
        assert_eq!(utc.longest_streak, 1);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let entries = ["2024-06-10T09:00:00Z", "2024-06-11T09:00:00Z"];
        let first = streak(&entries, day(2024, 6, 11));
        let second = streak(&entries, day(2024, 6, 11));
        assert_eq!(first, second);
    }

    #[test]
    fn longest_never_trails_current_for_any_ten_day_history() {
        let window = (0..10)
            .map(|offset| day(2024, 6, 1) + Duration::days(offset))
            .collect::<Vec<_>>();
        let todays = [
            day(2024, 5, 31),
            day(2024, 6, 1),
            day(2024, 6, 5),
            day(2024, 6, 10),
            day(2024, 6, 11),
            day(2024, 6, 12),
            day(2024, 6, 30),
        ];

        for mask in 0_u32..(1 << window.len()) {
            let dates = window
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, date)| *date)
                .collect::<BTreeSet<_>>();

            for today in todays {
                let result = compute_streak_from_dates(&dates, today);
                assert!(
                    result.longest_streak >= result.current_streak,
                    "mask {mask:#012b} today {today}: {result:?}"
                );
                assert!(result.longest_streak as usize <= dates.len());
                assert_eq!(result.last_entry_date, dates.iter().next_back().copied());
            }
        }
    }
}
