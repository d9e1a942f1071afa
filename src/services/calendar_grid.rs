use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::calendar::CalendarDay;
use crate::utils::dates::{day_of_week, sunday_on_or_before};

pub const GRID_CELLS: usize = 42;

/// Six full weeks starting from the Sunday on or before the 1st of `month`.
pub fn build_month_grid(
    year: i32,
    month: u32,
    today: NaiveDate,
    available_days_of_week: &BTreeSet<u8>,
) -> AppResult<Vec<CalendarDay>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        AppError::validation_with_details(
            "invalid calendar month",
            json!({"year": year, "month": month}),
        )
    })?;
    let start = sunday_on_or_before(first);

    let grid = (0..GRID_CELLS as i64)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let is_current_month = date.year() == year && date.month() == month;
            let is_past = date < today;
            CalendarDay {
                date,
                day_of_month: date.day(),
                is_current_month,
                is_today: date == today,
                is_past,
                has_available_slots: is_current_month
                    && !is_past
                    && available_days_of_week.contains(&day_of_week(date)),
            }
        })
        .collect();

    Ok(grid)
}
