use serde::Deserialize;

use crate::error::AppError;
use crate::models::availability::{
    Appointment, BookAppointmentRequest, CreateAvailabilityRuleRequest, TimeSlot,
    WeeklyAvailabilityRule,
};
use crate::models::calendar::CalendarDay;
use crate::models::notification::PlannedReminder;
use crate::utils::dates::{parse_date, parse_time};

use super::{local_now, run_blocking, today, AppState, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRulePayload {
    #[serde(default)]
    pub provider_id: Option<String>,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

impl AvailabilityRulePayload {
    fn into_request(
        self,
        default_provider: String,
    ) -> Result<CreateAvailabilityRuleRequest, AppError> {
        Ok(CreateAvailabilityRuleRequest {
            provider_id: self.provider_id.unwrap_or(default_provider),
            day_of_week: self.day_of_week,
            start_time: parse_time(self.start_time.trim())?,
            end_time: parse_time(self.end_time.trim())?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentPayload {
    pub user_id: String,
    #[serde(default)]
    pub provider_id: Option<String>,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl BookAppointmentPayload {
    fn into_request(self, default_provider: String) -> Result<BookAppointmentRequest, AppError> {
        Ok(BookAppointmentRequest {
            user_id: self.user_id,
            provider_id: self.provider_id.unwrap_or(default_provider),
            date: parse_date(self.date.trim())?,
            time: parse_time(self.time.trim())?,
            note: self.note,
        })
    }
}

pub async fn availability_rule_add(
    state: &AppState,
    payload: AvailabilityRulePayload,
) -> CommandResult<WeeklyAvailabilityRule> {
    let app_state = state.clone();
    run_blocking("availability", move || {
        let service = app_state.appointments();
        let request = payload.into_request(service.default_provider()?)?;
        service.add_rule(request)
    })
    .await
}

pub async fn availability_rules_list(
    state: &AppState,
    provider_id: Option<String>,
) -> CommandResult<Vec<WeeklyAvailabilityRule>> {
    let app_state = state.clone();
    run_blocking("availability", move || {
        let service = app_state.appointments();
        let provider_id = match provider_id {
            Some(id) => id,
            None => service.default_provider()?,
        };
        service.list_rules(&provider_id)
    })
    .await
}

pub async fn availability_rule_deactivate(state: &AppState, rule_id: String) -> CommandResult<()> {
    let app_state = state.clone();
    run_blocking("availability", move || {
        app_state.appointments().deactivate_rule(&rule_id)
    })
    .await
}

pub async fn appointment_slots(
    state: &AppState,
    provider_id: Option<String>,
    date: String,
) -> CommandResult<Vec<TimeSlot>> {
    let app_state = state.clone();
    run_blocking("availability", move || {
        let service = app_state.appointments();
        let provider_id = match provider_id {
            Some(id) => id,
            None => service.default_provider()?,
        };
        service.available_slots(&provider_id, parse_date(date.trim())?)
    })
    .await
}

pub async fn appointment_calendar(
    state: &AppState,
    provider_id: Option<String>,
    year: i32,
    month: u32,
) -> CommandResult<Vec<CalendarDay>> {
    let app_state = state.clone();
    run_blocking("calendar", move || {
        let service = app_state.appointments();
        let provider_id = match provider_id {
            Some(id) => id,
            None => service.default_provider()?,
        };
        service.month_calendar(&provider_id, year, month, today(&app_state)?)
    })
    .await
}

pub async fn appointment_book(
    state: &AppState,
    payload: BookAppointmentPayload,
) -> CommandResult<Appointment> {
    let app_state = state.clone();
    run_blocking("appointment", move || {
        let service = app_state.appointments();
        let request = payload.into_request(service.default_provider()?)?;
        service.book(request, today(&app_state)?)
    })
    .await
}

pub async fn appointment_cancel(
    state: &AppState,
    appointment_id: String,
) -> CommandResult<Appointment> {
    let app_state = state.clone();
    run_blocking("appointment", move || {
        app_state.appointments().cancel(&appointment_id)
    })
    .await
}

pub async fn appointments_list(
    state: &AppState,
    user_id: String,
) -> CommandResult<Vec<Appointment>> {
    let app_state = state.clone();
    run_blocking("appointment", move || {
        app_state.appointments().list_for_user(&user_id)
    })
    .await
}

/// Reminders the host should register for the user's upcoming visits.
pub async fn appointment_reminders(
    state: &AppState,
    user_id: String,
) -> CommandResult<Vec<PlannedReminder>> {
    let app_state = state.clone();
    run_blocking("notification", move || {
        let appointments = app_state.appointments().list_for_user(&user_id)?;
        app_state
            .notifications()
            .appointment_reminders(&appointments, local_now())
    })
    .await
}
