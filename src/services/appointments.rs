use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{
    Appointment, AppointmentLocation, AppointmentPatch, AppointmentStatus, BookingRequest,
    DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES,
};
use crate::services::booking;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses a client supplied start time. RFC 3339 values are normalised to
/// UTC; naive values are taken as UTC already. Sub-second precision is dropped
/// to match the storage format.
pub fn parse_appointment_date(field: &str, raw: &str) -> Result<NaiveDateTime, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation(field, "is required"));
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).naive_utc())
        .ok()
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        })
        .ok_or_else(|| AppError::validation(field, format!("'{raw}' is not a valid date")))?;

    if !db::is_storable(&parsed) {
        return Err(AppError::validation(
            field,
            format!("'{raw}' is outside years 0000 to 9999"),
        ));
    }

    Ok(parsed.with_nanosecond(0).unwrap_or(parsed))
}

fn parse_duration(raw: Option<&serde_json::Value>) -> Result<i32, AppError> {
    let Some(value) = raw else {
        return Ok(DEFAULT_DURATION_MINUTES);
    };

    let minutes = value.as_i64().ok_or_else(|| {
        AppError::validation(
            "duration",
            format!("must be a whole number of minutes, got {value}"),
        )
    })?;

    if !(1..=i64::from(MAX_DURATION_MINUTES)).contains(&minutes) {
        return Err(AppError::validation(
            "duration",
            format!("must be between 1 and {MAX_DURATION_MINUTES} minutes, got {minutes}"),
        ));
    }
    Ok(minutes as i32)
}

/// The whole `[date, date + duration)` interval has to stay inside the range
/// the overlap queries can compare.
fn ensure_slot_in_range(date: &NaiveDateTime, duration_minutes: i32) -> Result<(), AppError> {
    let end = date.checked_add_signed(Duration::minutes(i64::from(duration_minutes)));
    match end {
        Some(end) if end <= db::latest_storable() => Ok(()),
        _ => Err(AppError::validation(
            "date",
            "appointment must end before the year 10000",
        )),
    }
}

fn parse_location(raw: &str) -> Result<AppointmentLocation, AppError> {
    AppointmentLocation::parse(&raw.trim().to_lowercase()).ok_or_else(|| {
        AppError::validation("location", format!("'{raw}' is not one of home, center, virtual"))
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a booking request and fills in defaults. The returned
/// appointment has a fresh id and is not yet persisted.
pub fn build_appointment(
    user_id: &str,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> Result<Appointment, AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::validation("userId", "is required"));
    }

    let appointment_type = non_empty(request.appointment_type.as_deref())
        .ok_or_else(|| AppError::validation("appointmentType", "is required"))?;

    let date = match request.date.as_deref() {
        Some(raw) => parse_appointment_date("date", raw)?,
        None => return Err(AppError::validation("date", "is required")),
    };

    let duration_minutes = parse_duration(request.duration.as_ref())?;
    ensure_slot_in_range(&date, duration_minutes)?;

    let location = match non_empty(request.location.as_deref()) {
        Some(raw) => parse_location(&raw)?,
        None => AppointmentLocation::default(),
    };

    Ok(Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        care_provider_id: non_empty(request.care_provider_id.as_deref()),
        appointment_type,
        date,
        duration_minutes,
        location,
        status: AppointmentStatus::Scheduled,
        notes: non_empty(request.notes.as_deref()),
        created_at: now,
        updated_at: now,
    })
}

pub fn get(conn: &Connection, id: &str) -> Result<Appointment, AppError> {
    queries::get_appointment(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))
}

/// Loads an appointment only if it belongs to `user_id`. Someone else's
/// appointment is reported as missing.
pub fn get_for_user(conn: &Connection, user_id: &str, id: &str) -> Result<Appointment, AppError> {
    let appt = get(conn, id)?;
    if appt.user_id != user_id {
        return Err(AppError::NotFound(format!("appointment {id}")));
    }
    Ok(appt)
}

pub fn list_by_user(conn: &Connection, user_id: &str) -> Result<Vec<Appointment>, AppError> {
    Ok(queries::list_appointments_for_user(conn, user_id)?)
}

pub fn list_upcoming_by_user(
    conn: &Connection,
    user_id: &str,
    now: NaiveDateTime,
) -> Result<Vec<Appointment>, AppError> {
    Ok(queries::list_upcoming_for_user(conn, user_id, &now)?)
}

fn apply_patch(
    current: &Appointment,
    patch: &AppointmentPatch,
    now: NaiveDateTime,
) -> Result<Appointment, AppError> {
    let mut merged = current.clone();

    if let Some(raw) = patch.appointment_type.as_deref() {
        merged.appointment_type = non_empty(Some(raw))
            .ok_or_else(|| AppError::validation("appointmentType", "must not be empty"))?;
    }
    if let Some(raw) = patch.date.as_deref() {
        merged.date = parse_appointment_date("date", raw)?;
    }
    if patch.duration.is_some() {
        merged.duration_minutes = parse_duration(patch.duration.as_ref())?;
    }
    if patch.date.is_some() || patch.duration.is_some() {
        ensure_slot_in_range(&merged.date, merged.duration_minutes)?;
    }
    if let Some(raw) = patch.care_provider_id.as_deref() {
        // An empty id unassigns the provider
        merged.care_provider_id = non_empty(Some(raw));
    }
    if let Some(raw) = patch.location.as_deref() {
        merged.location = parse_location(raw)?;
    }
    if let Some(raw) = patch.status.as_deref() {
        merged.status = AppointmentStatus::parse(&raw.trim().to_lowercase()).ok_or_else(|| {
            AppError::validation(
                "status",
                format!("'{raw}' is not one of scheduled, completed, cancelled"),
            )
        })?;
    }
    if let Some(raw) = patch.notes.as_deref() {
        merged.notes = non_empty(Some(raw));
    }

    merged.updated_at = now;
    Ok(merged)
}

/// Merges `patch` into the caller's appointment. When the result still
/// occupies a provider's time and its slot moved, the new slot is checked
/// against other scheduled appointments in the same transaction as the write.
pub fn update(
    conn: &mut Connection,
    user_id: &str,
    id: &str,
    patch: &AppointmentPatch,
    now: NaiveDateTime,
) -> Result<Appointment, AppError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin update transaction")?;

    let current = get_for_user(&tx, user_id, id)?;
    let merged = apply_patch(&current, patch, now)?;

    let provider_changed = merged.care_provider_id != current.care_provider_id;
    let slot_changed = provider_changed
        || merged.date != current.date
        || merged.duration_minutes != current.duration_minutes
        || merged.status != current.status;

    if let Some(provider_id) = merged.care_provider_id.as_deref() {
        if merged.status == AppointmentStatus::Scheduled {
            if provider_changed {
                booking::ensure_provider_bookable(&tx, provider_id)?;
            }
            if slot_changed {
                booking::ensure_slot_free(&tx, provider_id, &merged.date, &merged.end(), Some(id))?;
            }
        } else if provider_changed {
            // Closed appointments may point at an inactive provider, not a missing one
            booking::find_provider(&tx, provider_id)?;
        }
    }

    if !queries::update_appointment(&tx, &merged)? {
        return Err(AppError::NotFound(format!("appointment {id}")));
    }
    tx.commit().context("failed to commit appointment update")?;

    tracing::info!(appointment_id = %id, status = merged.status.as_str(), "appointment updated");
    Ok(merged)
}

/// Marks the caller's appointment cancelled. Cancelling twice is not an
/// error.
pub fn cancel(
    conn: &Connection,
    user_id: &str,
    id: &str,
    now: NaiveDateTime,
) -> Result<Appointment, AppError> {
    let mut appt = get_for_user(conn, user_id, id)?;

    queries::set_appointment_status(conn, id, AppointmentStatus::Cancelled, &now)?;
    if appt.status != AppointmentStatus::Cancelled {
        tracing::info!(appointment_id = %id, "appointment cancelled");
    }

    appt.status = AppointmentStatus::Cancelled;
    appt.updated_at = now;
    Ok(appt)
}
