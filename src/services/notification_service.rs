use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::availability::Appointment;
use crate::models::notification::{PlannedReminder, ReminderKind};
use crate::services::settings_service::SettingsService;
use crate::utils::dates::format_time;

const DAILY_TITLE: &str = "How are you feeling?";
const DAILY_BODY: &str = "Take a minute to write in your diary.";
const APPOINTMENT_TITLE: &str = "Upcoming appointment";

/// Whether the recurring reminders were already handed to the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerState {
    pub initialized: bool,
}

/// Works out which local notifications the host should register. Delivery
/// itself happens outside this crate.
pub struct NotificationScheduler {
    settings: Arc<SettingsService>,
    state: Mutex<SchedulerState>,
}

impl NotificationScheduler {
    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            settings,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    pub fn state(&self) -> AppResult<SchedulerState> {
        let guard = self
            .state
            .lock()
            .map_err(|_| AppError::other("notification scheduler state poisoned"))?;
        Ok(*guard)
    }

    /// First call returns the recurring reminder plan; later calls return
    /// nothing until [`reset`](Self::reset).
    pub fn ensure_initialized(
        &self,
        now: DateTime<FixedOffset>,
    ) -> AppResult<Vec<PlannedReminder>> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| AppError::other("notification scheduler state poisoned"))?;
        if guard.initialized {
            debug!(target: "app::notifications", "scheduler already initialized");
            return Ok(Vec::new());
        }

        let daily = self.daily_reminder(now)?;
        guard.initialized = true;

        info!(
            target: "app::notifications",
            fire_at = %daily.fire_at,
            "daily diary reminder planned"
        );
        Ok(vec![daily])
    }

    pub fn reset(&self) -> AppResult<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| AppError::other("notification scheduler state poisoned"))?;
        *guard = SchedulerState::default();
        Ok(())
    }

    /// Next occurrence of the configured reminder time, in `now`'s offset.
    pub fn daily_reminder(&self, now: DateTime<FixedOffset>) -> AppResult<PlannedReminder> {
        let time = self.settings.get()?.daily_reminder_time;
        let today = now.date_naive().and_time(time);
        let mut fire_at = localize(now.offset(), today)?;
        if fire_at <= now {
            fire_at = localize(now.offset(), today + Duration::days(1))?;
        }

        Ok(PlannedReminder {
            kind: ReminderKind::DailyDiary,
            fire_at,
            title: DAILY_TITLE.to_string(),
            body: DAILY_BODY.to_string(),
            reference_id: None,
            repeats_daily: true,
        })
    }

    /// One reminder per live appointment that has not started yet. Appointment
    /// times are read in `now`'s offset; a reminder whose lead time has
    /// already passed fires immediately.
    pub fn appointment_reminders(
        &self,
        appointments: &[Appointment],
        now: DateTime<FixedOffset>,
    ) -> AppResult<Vec<PlannedReminder>> {
        let lead = Duration::minutes(self.settings.get()?.appointment_reminder_minutes);

        let mut reminders = appointments
            .iter()
            .filter(|appointment| appointment.status.occupies_slot())
            .map(|appointment| {
                let starts_at = localize(
                    now.offset(),
                    appointment
                        .appointment_date
                        .and_time(appointment.appointment_time),
                )?;
                Ok((appointment, starts_at))
            })
            .collect::<AppResult<Vec<_>>>()?
            .into_iter()
            .filter(|(_, starts_at)| *starts_at > now)
            .map(|(appointment, starts_at)| PlannedReminder {
                kind: ReminderKind::Appointment,
                fire_at: (starts_at - lead).max(now),
                title: APPOINTMENT_TITLE.to_string(),
                body: format!(
                    "You see {} on {} at {}.",
                    appointment.provider_id,
                    appointment.appointment_date,
                    format_time(appointment.appointment_time)
                ),
                reference_id: Some(appointment.id.clone()),
                repeats_daily: false,
            })
            .collect::<Vec<_>>();

        reminders.sort_by_key(|reminder| reminder.fire_at);
        debug!(
            target: "app::notifications",
            planned = reminders.len(),
            "appointment reminders planned"
        );
        Ok(reminders)
    }
}

fn localize(offset: &FixedOffset, local: NaiveDateTime) -> AppResult<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| AppError::other(format!("cannot place {local} at offset {offset}")))
}
