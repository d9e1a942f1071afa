use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::appointment_repository::AppointmentRepository;
use crate::db::repositories::availability_repository::AvailabilityRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::availability::{
    Appointment, AppointmentStatus, BookAppointmentRequest, CreateAvailabilityRuleRequest,
    TimeSlot, WeeklyAvailabilityRule,
};
use crate::models::calendar::CalendarDay;
use crate::services::calendar_grid::build_month_grid;
use crate::services::settings_service::SettingsService;
use crate::services::slot_generator::generate_slots;
use crate::utils::dates::{day_of_week, ensure_window, format_time, is_whole_hour};

const MAX_NOTE_CHARS: usize = 500;

pub struct AppointmentService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl AppointmentService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    /// Provider used when a caller does not name one.
    pub fn default_provider(&self) -> AppResult<String> {
        Ok(self.settings.get()?.provider_id)
    }

    pub fn add_rule(
        &self,
        request: CreateAvailabilityRuleRequest,
    ) -> AppResult<WeeklyAvailabilityRule> {
        let provider_id = request.provider_id.trim();
        if provider_id.is_empty() {
            return Err(AppError::validation("provider id is required"));
        }
        if request.day_of_week > 6 {
            return Err(AppError::validation(format!(
                "day of week must be 0 (Sunday) to 6 (Saturday), got {}",
                request.day_of_week
            )));
        }
        ensure_window(request.start_time, request.end_time)?;
        if !is_whole_hour(request.start_time) || !is_whole_hour(request.end_time) {
            return Err(AppError::validation(
                "availability windows must start and end on the hour",
            ));
        }

        let rule = WeeklyAvailabilityRule {
            id: Uuid::new_v4().to_string(),
            provider_id: provider_id.to_string(),
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            is_active: true,
        };

        let created_at = Utc::now().to_rfc3339();
        self.db
            .with_connection(|conn| AvailabilityRepository::insert(conn, &rule, &created_at))?;

        info!(
            target: "app::availability",
            rule_id = %rule.id,
            provider_id = %rule.provider_id,
            day_of_week = rule.day_of_week,
            start = %format_time(rule.start_time),
            end = %format_time(rule.end_time),
            "availability rule added"
        );

        Ok(rule)
    }

    pub fn list_rules(&self, provider_id: &str) -> AppResult<Vec<WeeklyAvailabilityRule>> {
        self.db
            .with_connection(|conn| AvailabilityRepository::list_by_provider(conn, provider_id))
    }

    pub fn deactivate_rule(&self, rule_id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| AvailabilityRepository::set_active(conn, rule_id, false))?;
        info!(target: "app::availability", %rule_id, "availability rule deactivated");
        Ok(())
    }

    pub fn available_slots(&self, provider_id: &str, date: NaiveDate) -> AppResult<Vec<TimeSlot>> {
        self.db
            .with_connection(|conn| load_slots(conn, provider_id, date))
    }

    pub fn month_calendar(
        &self,
        provider_id: &str,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> AppResult<Vec<CalendarDay>> {
        let days = self
            .db
            .with_connection(|conn| AvailabilityRepository::active_days(conn, provider_id))?;
        build_month_grid(year, month, today, &days)
    }

    /// Books a free slot. The check and the insert share one transaction and
    /// the live-slot unique index backs them up against concurrent writers.
    pub fn book(
        &self,
        request: BookAppointmentRequest,
        today: NaiveDate,
    ) -> AppResult<Appointment> {
        let user_id = request.user_id.trim();
        let provider_id = request.provider_id.trim();
        if user_id.is_empty() {
            return Err(AppError::validation("user id is required"));
        }
        if provider_id.is_empty() {
            return Err(AppError::validation("provider id is required"));
        }
        if request.date < today {
            return Err(AppError::validation("appointments cannot be booked in the past"));
        }

        let note = request
            .note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .map(str::to_string);
        if note
            .as_ref()
            .is_some_and(|note| note.chars().count() > MAX_NOTE_CHARS)
        {
            return Err(AppError::validation(format!(
                "note must be at most {MAX_NOTE_CHARS} characters"
            )));
        }

        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            provider_id: provider_id.to_string(),
            appointment_date: request.date,
            appointment_time: request.time,
            status: AppointmentStatus::Scheduled,
            note,
            created_at: Utc::now().to_rfc3339(),
        };

        self.db.with_transaction(|conn| {
            let slots = load_slots(conn, provider_id, request.date)?;
            let matching = slots
                .iter()
                .filter(|slot| slot.time == request.time)
                .collect::<Vec<_>>();

            if matching.is_empty() {
                return Err(AppError::validation(format!(
                    "{} is not offered on {}",
                    format_time(request.time),
                    request.date
                )));
            }
            if !matching.iter().any(|slot| slot.available) {
                return Err(AppError::conflict(format!(
                    "{} on {} is already booked",
                    format_time(request.time),
                    request.date
                )));
            }

            AppointmentRepository::insert(conn, &appointment)
        })?;

        info!(
            target: "app::appointments",
            appointment_id = %appointment.id,
            user_id = %appointment.user_id,
            provider_id = %appointment.provider_id,
            date = %appointment.appointment_date,
            time = %format_time(appointment.appointment_time),
            "appointment booked"
        );

        Ok(appointment)
    }

    pub fn cancel(&self, appointment_id: &str) -> AppResult<Appointment> {
        let appointment = self.db.with_transaction(|conn| {
            let current = AppointmentRepository::find_by_id(conn, appointment_id)?;
            if current.status == AppointmentStatus::Cancelled {
                return Ok(current);
            }
            if current.status == AppointmentStatus::Completed {
                return Err(AppError::validation("completed appointments cannot be cancelled"));
            }
            AppointmentRepository::update_status(
                conn,
                appointment_id,
                AppointmentStatus::Cancelled,
            )?;
            AppointmentRepository::find_by_id(conn, appointment_id)
        })?;

        info!(target: "app::appointments", %appointment_id, "appointment cancelled");
        Ok(appointment)
    }

    pub fn get(&self, appointment_id: &str) -> AppResult<Appointment> {
        self.db
            .with_connection(|conn| AppointmentRepository::find_by_id(conn, appointment_id))
    }

    pub fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Appointment>> {
        self.db
            .with_connection(|conn| AppointmentRepository::list_by_user(conn, user_id))
    }
}

fn load_slots(conn: &Connection, provider_id: &str, date: NaiveDate) -> AppResult<Vec<TimeSlot>> {
    let rules = AvailabilityRepository::list_active_for_day(conn, provider_id, day_of_week(date))?;
    let booked = AppointmentRepository::list_booked_for_date(conn, provider_id, date)?;
    debug!(
        target: "app::availability",
        %provider_id,
        %date,
        rules = rules.len(),
        booked = booked.len(),
        "loading slots"
    );
    Ok(generate_slots(&rules, &booked, date))
}
