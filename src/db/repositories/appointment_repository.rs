use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::availability::{Appointment, AppointmentStatus, BookedInstant};
use crate::utils::dates::{format_date, format_time, parse_date, parse_time};

const SELECT_COLUMNS: &str =
    "id, user_id, provider_id, appointment_date, appointment_time, status, note, created_at";

#[derive(Debug, Clone)]
pub struct AppointmentRow {
    pub id: String,
    pub user_id: String,
    pub provider_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub status: String,
    pub note: Option<String>,
    pub created_at: String,
}

impl AppointmentRow {
    pub fn into_record(self) -> AppResult<Appointment> {
        let status =
            AppointmentStatus::try_from(self.status.as_str()).map_err(AppError::validation)?;

        Ok(Appointment {
            id: self.id,
            user_id: self.user_id,
            provider_id: self.provider_id,
            appointment_date: parse_date(&self.appointment_date)?,
            appointment_time: parse_time(&self.appointment_time)?,
            status,
            note: self.note,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for AppointmentRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            provider_id: row.get("provider_id")?,
            appointment_date: row.get("appointment_date")?,
            appointment_time: row.get("appointment_time")?,
            status: row.get("status")?,
            note: row.get("note")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct AppointmentRepository;

impl AppointmentRepository {
    pub fn insert(conn: &Connection, appointment: &Appointment) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO appointments (
                    id, user_id, provider_id, appointment_date, appointment_time,
                    status, note, created_at
                ) VALUES (
                    :id, :user_id, :provider_id, :appointment_date, :appointment_time,
                    :status, :note, :created_at
                )
            "#,
            named_params! {
                ":id": &appointment.id,
                ":user_id": &appointment.user_id,
                ":provider_id": &appointment.provider_id,
                ":appointment_date": format_date(appointment.appointment_date),
                ":appointment_time": format_time(appointment.appointment_time),
                ":status": appointment.status.as_str(),
                ":note": &appointment.note,
                ":created_at": &appointment.created_at,
            },
        )?;
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Appointment> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM appointments WHERE id = :id");
        let row = conn
            .query_row(&sql, named_params! {":id": id}, |row| {
                AppointmentRow::try_from(row)
            })
            .optional()?;

        match row {
            Some(row) => row.into_record(),
            None => Err(AppError::not_found()),
        }
    }

    /// Times on `date` held by a scheduled or confirmed appointment.
    /// Cancelled and completed appointments never appear here.
    pub fn list_booked_for_date(
        conn: &Connection,
        provider_id: &str,
        date: NaiveDate,
    ) -> AppResult<Vec<BookedInstant>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, appointment_time, status
                FROM appointments
                WHERE provider_id = :provider_id
                  AND appointment_date = :appointment_date
                  AND status IN ('scheduled', 'confirmed')
                ORDER BY appointment_time ASC
            "#,
        )?;

        let booked = stmt
            .query_map(
                named_params! {
                    ":provider_id": provider_id,
                    ":appointment_date": format_date(date),
                },
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )?
            .map(|row| -> AppResult<BookedInstant> {
                let (booking_id, time, status) = row?;
                Ok(BookedInstant {
                    booking_id,
                    time: parse_time(&time)?,
                    status: AppointmentStatus::try_from(status.as_str())
                        .map_err(AppError::validation)?,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(booked)
    }

    pub fn list_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM appointments WHERE user_id = :user_id \
             ORDER BY appointment_date ASC, appointment_time ASC"
        );
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                AppointmentRow::try_from(row)
            })?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_record())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    /// Appointments that were not cancelled.
    pub fn count_kept_by_user(conn: &Connection, user_id: &str) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM appointments WHERE user_id = :user_id AND status != 'cancelled'",
            named_params! {":user_id": user_id},
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn update_status(conn: &Connection, id: &str, status: AppointmentStatus) -> AppResult<()> {
        let affected = conn.execute(
            "UPDATE appointments SET status = :status WHERE id = :id",
            named_params! {":id": id, ":status": status.as_str()},
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }
}
