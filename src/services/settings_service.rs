use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{NaiveTime, Utc};
use tracing::{info, warn};

use crate::db::repositories::settings_repository::{AppSettingRow, SettingsRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::AppSettings;
use crate::utils::dates::{format_time, parse_time, DayBoundaryPolicy};

const KEY_TIMEZONE_POLICY: &str = "timezone_policy";
const KEY_DAILY_REMINDER_TIME: &str = "daily_reminder_time";
const KEY_APPOINTMENT_REMINDER_MINUTES: &str = "appointment_reminder_minutes";
const KEY_POINTS_PER_ENTRY: &str = "points_per_entry";
const KEY_PROVIDER_ID: &str = "provider_id";

const DEFAULT_REMINDER_HOUR: u32 = 19;
const DEFAULT_APPOINTMENT_REMINDER_MINUTES: i64 = 60;
const DEFAULT_POINTS_PER_ENTRY: i64 = 10;
const DEFAULT_PROVIDER_ID: &str = "doctor";
const MAX_APPOINTMENT_REMINDER_MINUTES: i64 = 7 * 24 * 60;
const MAX_POINTS_PER_ENTRY: i64 = 1000;

#[derive(Debug, Default, Clone)]
pub struct SettingsUpdateInput {
    pub timezone_policy: Option<String>,
    pub daily_reminder_time: Option<String>,
    pub appointment_reminder_minutes: Option<i64>,
    pub points_per_entry: Option<i64>,
    pub provider_id: Option<String>,
}

pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<AppSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<AppSettings> {
        let mut current = self.get()?;
        let mut changes: Vec<(&str, String)> = Vec::new();

        if let Some(raw) = input.timezone_policy.as_ref() {
            let policy = DayBoundaryPolicy::parse(raw)?;
            current.timezone_policy = policy;
            changes.push((KEY_TIMEZONE_POLICY, policy.to_string()));
        }

        if let Some(raw) = input.daily_reminder_time.as_ref() {
            let time = parse_time(raw.trim())?;
            current.daily_reminder_time = time;
            changes.push((KEY_DAILY_REMINDER_TIME, format_time(time)));
        }

        if let Some(minutes) = input.appointment_reminder_minutes {
            if !(0..=MAX_APPOINTMENT_REMINDER_MINUTES).contains(&minutes) {
                return Err(AppError::validation(format!(
                    "appointment reminder must be between 0 and {MAX_APPOINTMENT_REMINDER_MINUTES} minutes"
                )));
            }
            current.appointment_reminder_minutes = minutes;
            changes.push((KEY_APPOINTMENT_REMINDER_MINUTES, minutes.to_string()));
        }

        if let Some(points) = input.points_per_entry {
            if !(0..=MAX_POINTS_PER_ENTRY).contains(&points) {
                return Err(AppError::validation(format!(
                    "points per entry must be between 0 and {MAX_POINTS_PER_ENTRY}"
                )));
            }
            current.points_per_entry = points;
            changes.push((KEY_POINTS_PER_ENTRY, points.to_string()));
        }

        if let Some(provider) = input.provider_id.as_ref() {
            let provider = provider.trim();
            if provider.is_empty() {
                return Err(AppError::validation("provider id must not be empty"));
            }
            current.provider_id = provider.to_string();
            changes.push((KEY_PROVIDER_ID, provider.to_string()));
        }

        if changes.is_empty() {
            return Ok(current);
        }

        let now = Utc::now().to_rfc3339();
        self.db.with_transaction(|conn| {
            for (key, value) in &changes {
                SettingsRepository::upsert(conn, key, value, &now)?;
            }
            Ok(())
        })?;
        current.updated_at = now;

        info!(target: "app::settings", changed = changes.len(), "settings updated");

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }

        Ok(current)
    }

    /// Drops every stored override so defaults apply again.
    pub fn reset(&self) -> AppResult<AppSettings> {
        self.db.with_connection(|conn| {
            for key in [
                KEY_TIMEZONE_POLICY,
                KEY_DAILY_REMINDER_TIME,
                KEY_APPOINTMENT_REMINDER_MINUTES,
                KEY_POINTS_PER_ENTRY,
                KEY_PROVIDER_ID,
            ] {
                SettingsRepository::delete(conn, key)?;
            }
            Ok(())
        })?;

        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }
        self.get()
    }

    fn load_settings_from_db(&self) -> AppResult<AppSettings> {
        let rows = self.db.with_connection(SettingsRepository::load_all)?;
        let mut settings = default_settings();

        if let Some(row) = rows.get(KEY_TIMEZONE_POLICY) {
            match DayBoundaryPolicy::parse(&row.value) {
                Ok(policy) => settings.timezone_policy = policy,
                Err(_) => warn!(
                    target: "app::settings",
                    value = %row.value,
                    "ignoring stored timezone policy"
                ),
            }
        }

        if let Some(row) = rows.get(KEY_DAILY_REMINDER_TIME) {
            match parse_time(&row.value) {
                Ok(time) => settings.daily_reminder_time = time,
                Err(_) => warn!(
                    target: "app::settings",
                    value = %row.value,
                    "ignoring stored reminder time"
                ),
            }
        }

        if let Some(value) = parse_stored_i64(&rows, KEY_APPOINTMENT_REMINDER_MINUTES) {
            settings.appointment_reminder_minutes = value;
        }

        if let Some(value) = parse_stored_i64(&rows, KEY_POINTS_PER_ENTRY) {
            settings.points_per_entry = value;
        }

        if let Some(row) = rows.get(KEY_PROVIDER_ID) {
            if !row.value.trim().is_empty() {
                settings.provider_id = row.value.clone();
            }
        }

        if let Some(latest) = rows.values().map(|row| row.updated_at.as_str()).max() {
            settings.updated_at = latest.to_string();
        }

        Ok(settings)
    }
}

fn parse_stored_i64(rows: &HashMap<String, AppSettingRow>, key: &str) -> Option<i64> {
    let row = rows.get(key)?;
    match row.value.trim().parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(target: "app::settings", key, value = %row.value, "ignoring non-numeric setting");
            None
        }
    }
}

fn default_settings() -> AppSettings {
    AppSettings {
        timezone_policy: DayBoundaryPolicy::default(),
        daily_reminder_time: NaiveTime::from_hms_opt(DEFAULT_REMINDER_HOUR, 0, 0)
            .unwrap_or(NaiveTime::MIN),
        appointment_reminder_minutes: DEFAULT_APPOINTMENT_REMINDER_MINUTES,
        points_per_entry: DEFAULT_POINTS_PER_ENTRY,
        provider_id: DEFAULT_PROVIDER_ID.to_string(),
        updated_at: String::new(),
    }
}
