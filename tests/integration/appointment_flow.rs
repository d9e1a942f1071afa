// Availability rules, slot generation, month grid and booking end to end

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use heartnote_app_lib::commands::appointments::{
    appointment_book, appointment_cancel, appointment_reminders, appointment_slots,
    availability_rule_add, AvailabilityRulePayload, BookAppointmentPayload,
};
use heartnote_app_lib::commands::AppState;
use heartnote_app_lib::db::DbPool;
use heartnote_app_lib::error::AppError;
use heartnote_app_lib::models::availability::{
    AppointmentStatus, BookAppointmentRequest, CreateAvailabilityRuleRequest,
};
use heartnote_app_lib::services::appointment_service::AppointmentService;
use heartnote_app_lib::services::calendar_grid::GRID_CELLS;
use heartnote_app_lib::services::settings_service::SettingsService;
use heartnote_app_lib::utils::dates::{day_of_week, format_date};
use tempfile::tempdir;

fn setup() -> (AppointmentService, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("appointments.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::new(pool.clone()));
    (AppointmentService::new(pool, settings), dir)
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).expect("time")
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).expect("date")
}

fn add_rule(service: &AppointmentService, weekday: u8, start: u32, end: u32) {
    service
        .add_rule(CreateAvailabilityRuleRequest {
            provider_id: "doctor".to_string(),
            day_of_week: weekday,
            start_time: hour(start),
            end_time: hour(end),
        })
        .expect("add rule");
}

fn book(
    service: &AppointmentService,
    user: &str,
    date: NaiveDate,
    h: u32,
) -> Result<String, AppError> {
    service
        .book(
            BookAppointmentRequest {
                user_id: user.to_string(),
                provider_id: "doctor".to_string(),
                date,
                time: hour(h),
                note: Some("  check-in  ".to_string()),
            },
            day(1),
        )
        .map(|appointment| appointment.id)
}

#[test]
fn monday_morning_slots_reflect_bookings() {
    let (service, _dir) = setup();
    add_rule(&service, 1, 9, 12);

    let booked_id = book(&service, "kid-1", day(10), 10).expect("book");
    let slots = service.available_slots("doctor", day(10)).unwrap();

    let times = slots.iter().map(|slot| slot.time).collect::<Vec<_>>();
    assert_eq!(times, vec![hour(9), hour(10), hour(11)]);
    assert!(slots[0].available);
    assert!(!slots[1].available);
    assert_eq!(slots[1].booking_id.as_deref(), Some(booked_id.as_str()));
    assert!(slots[2].available);

    // Tuesday has no rule.
    assert!(service.available_slots("doctor", day(11)).unwrap().is_empty());
}

#[test]
fn overlapping_rules_keep_duplicate_slots() {
    let (service, _dir) = setup();
    add_rule(&service, 1, 9, 11);
    add_rule(&service, 1, 10, 12);

    let times = service
        .available_slots("doctor", day(10))
        .unwrap()
        .into_iter()
        .map(|slot| slot.time)
        .collect::<Vec<_>>();
    assert_eq!(times, vec![hour(9), hour(10), hour(10), hour(11)]);
}

#[test]
fn double_booking_is_a_conflict_until_cancelled() {
    let (service, _dir) = setup();
    add_rule(&service, 1, 9, 12);

    let first = book(&service, "kid-1", day(10), 9).expect("first booking");
    assert!(matches!(
        book(&service, "kid-2", day(10), 9),
        Err(AppError::Conflict { .. })
    ));

    let cancelled = service.cancel(&first).unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(book(&service, "kid-2", day(10), 9).is_ok());

    let mine = service.list_for_user("kid-1").unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].note.as_deref(), Some("check-in"));
}

#[test]
fn month_grid_marks_bookable_days() {
    let (service, _dir) = setup();
    add_rule(&service, 1, 9, 12);
    add_rule(&service, 3, 13, 15);

    let grid = service.month_calendar("doctor", 2024, 6, day(12)).unwrap();
    assert_eq!(grid.len(), GRID_CELLS);
    assert_eq!(grid[0].date, NaiveDate::from_ymd_opt(2024, 5, 26).unwrap());

    let bookable = grid
        .iter()
        .filter(|cell| cell.has_available_slots)
        .map(|cell| cell.day_of_month)
        .collect::<Vec<_>>();
    // Mondays and Wednesdays from the 12th onward.
    assert_eq!(bookable, vec![12, 17, 19, 24, 26]);

    let today = grid.iter().find(|cell| cell.is_today).unwrap();
    assert_eq!(today.date, day(12));
    assert!(!today.is_past);

    assert!(service
        .month_calendar("doctor", 2024, 13, day(12))
        .unwrap_err()
        .is_validation());
}

#[tokio::test]
async fn commands_book_and_remind() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("commands.sqlite")).expect("db pool");
    let state = AppState::new(pool).expect("app state");

    let visit_day = Local::now().date_naive() + Duration::days(30);
    availability_rule_add(
        &state,
        AvailabilityRulePayload {
            provider_id: None,
            day_of_week: day_of_week(visit_day),
            start_time: "09:00".to_string(),
            end_time: "11:00".to_string(),
        },
    )
    .await
    .expect("rule add");

    let appointment = appointment_book(
        &state,
        BookAppointmentPayload {
            user_id: "kid-1".to_string(),
            provider_id: None,
            date: format_date(visit_day),
            time: "10:00".to_string(),
            note: None,
        },
    )
    .await
    .expect("book");
    assert_eq!(appointment.provider_id, "doctor");

    let slots = appointment_slots(&state, None, format_date(visit_day))
        .await
        .expect("slots");
    assert_eq!(slots.iter().filter(|slot| slot.available).count(), 1);

    let reminders = appointment_reminders(&state, "kid-1".to_string())
        .await
        .expect("reminders");
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].reference_id.as_deref(), Some(appointment.id.as_str()));

    let error = appointment_book(
        &state,
        BookAppointmentPayload {
            user_id: "kid-2".to_string(),
            provider_id: None,
            date: format_date(visit_day),
            time: "10:00".to_string(),
            note: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(error.code, "CONFLICT");

    appointment_cancel(&state, appointment.id.clone())
        .await
        .expect("cancel");
    let reminders = appointment_reminders(&state, "kid-1".to_string())
        .await
        .expect("reminders");
    assert!(reminders.is_empty());
}
