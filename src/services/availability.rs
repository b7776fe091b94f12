use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus, AvailabilityEntry};
use crate::services::appointments::parse_appointment_date;
use crate::services::booking;

/// Accepts `YYYY-MM-DD` or anything `parse_appointment_date` understands,
/// keeping only the calendar day.
pub fn parse_window_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| parse_appointment_date(field, raw).map(|dt| dt.date()))
        .map_err(|_| AppError::validation(field, format!("'{raw}' is not a valid date")))?;

    if !(0..=9999).contains(&date.year()) {
        return Err(AppError::validation(
            field,
            format!("'{raw}' is outside years 0000 to 9999"),
        ));
    }
    Ok(date)
}

/// Day-by-day free/busy calendar for a provider over `[start, end]`
/// inclusive. A day is busy when any scheduled appointment's interval touches
/// it, however briefly.
pub fn compute_availability(
    conn: &Connection,
    provider_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    max_days: i64,
) -> Result<Vec<AvailabilityEntry>, AppError> {
    booking::find_provider(conn, provider_id)?;

    if start > end {
        return Ok(vec![]);
    }

    let days = (end - start).num_days() + 1;
    if days > max_days {
        return Err(AppError::validation(
            "end",
            format!("availability window spans {days} days, the limit is {max_days}"),
        ));
    }

    let window_start = start.and_time(NaiveTime::MIN);
    let window_end = end
        .succ_opt()
        .map(|d| d.and_time(NaiveTime::MIN))
        .filter(db::is_storable)
        .unwrap_or_else(db::latest_storable);

    let booked =
        queries::scheduled_overlapping(conn, provider_id, &window_start, &window_end, None)?;

    tracing::debug!(
        provider_id = %provider_id,
        %start,
        %end,
        booked = booked.len(),
        "computed availability"
    );
    Ok(resolve_days(start, end, &booked))
}

/// Pure day resolution over an already fetched set of appointments. Only
/// scheduled appointments occupy a day; several on one day collapse to a
/// single busy entry.
pub fn resolve_days(
    start: NaiveDate,
    end: NaiveDate,
    appointments: &[Appointment],
) -> Vec<AvailabilityEntry> {
    if start > end {
        return vec![];
    }

    let mut occupied = HashSet::new();
    for appt in appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled)
    {
        // Last instant inside the half-open interval
        let last_instant = appt.end() - Duration::seconds(1);
        let first = appt.date.date().max(start);
        let last = last_instant.date().min(end);

        for day in first.iter_days().take_while(|d| *d <= last) {
            occupied.insert(day);
        }
    }

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| AvailabilityEntry {
            date,
            available: !occupied.contains(&date),
        })
        .collect()
}
