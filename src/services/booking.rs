use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, BookingRequest, CareProvider};
use crate::services::appointments;

pub fn find_provider(conn: &Connection, provider_id: &str) -> Result<CareProvider, AppError> {
    queries::get_care_provider(conn, provider_id)?
        .ok_or_else(|| AppError::NotFound(format!("care provider {provider_id}")))
}

pub fn ensure_provider_bookable(
    conn: &Connection,
    provider_id: &str,
) -> Result<CareProvider, AppError> {
    let provider = find_provider(conn, provider_id)?;

    if !provider.is_active {
        return Err(AppError::validation(
            "careProviderId",
            format!("care provider {provider_id} is not accepting appointments"),
        ));
    }
    Ok(provider)
}

/// Fails with `SlotConflict` when any scheduled appointment of the provider
/// intersects `[start, end)`. `exclude_id` skips the appointment being moved.
pub fn ensure_slot_free(
    conn: &Connection,
    provider_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let conflicts = queries::scheduled_overlapping(conn, provider_id, start, end, exclude_id)?;

    if let Some(existing) = conflicts.first() {
        tracing::warn!(
            provider_id = %provider_id,
            conflicting_appointment = %existing.id,
            requested_start = %start,
            "slot conflict"
        );
        return Err(AppError::SlotConflict {
            provider_id: provider_id.to_string(),
            start: *start,
            end: *end,
        });
    }
    Ok(())
}

/// Validates and commits a booking. The conflict check and the insert share
/// one immediate transaction, so a concurrent booking for the same slot
/// either sees this one or waits for it.
pub fn book_appointment(
    conn: &mut Connection,
    user_id: &str,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> Result<Appointment, AppError> {
    let appointment = appointments::build_appointment(user_id, request, now)?;

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin booking transaction")?;

    if let Some(provider_id) = appointment.care_provider_id.as_deref() {
        let provider = ensure_provider_bookable(&tx, provider_id)?;
        ensure_slot_free(&tx, provider_id, &appointment.date, &appointment.end(), None)?;
        tracing::debug!(provider = %provider.display_name(), "slot is free");
    }

    queries::insert_appointment(&tx, &appointment)?;
    tx.commit().context("failed to commit booking")?;

    tracing::info!(
        appointment_id = %appointment.id,
        user_id = %appointment.user_id,
        provider_id = ?appointment.care_provider_id,
        date = %appointment.date,
        duration_minutes = appointment.duration_minutes,
        "appointment booked"
    );
    Ok(appointment)
}
