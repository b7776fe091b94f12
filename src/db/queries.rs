use anyhow::Context;
use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection};

use super::TIMESTAMP_FORMAT;
use crate::models::{
    Appointment, AppointmentLocation, AppointmentStatus, CareMilestone, CareProvider,
    ContactSubmission, MilestoneStatus, MAX_DURATION_MINUTES,
};

const APPOINTMENT_COLUMNS: &str = "id, user_id, care_provider_id, appointment_type, date, duration_minutes, location, status, notes, created_at, updated_at";

fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .with_context(|| format!("malformed stored timestamp: {s}"))
}

// ── Appointments ──

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, user_id, care_provider_id, appointment_type, date, duration_minutes, location, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            appt.id,
            appt.user_id,
            appt.care_provider_id,
            appt.appointment_type,
            fmt_ts(&appt.date),
            appt.duration_minutes,
            appt.location.as_str(),
            appt.status.as_str(),
            appt.notes,
            fmt_ts(&appt.created_at),
            fmt_ts(&appt.updated_at),
        ],
    )?;
    Ok(())
}

/// Writes every mutable column of an already merged appointment.
pub fn update_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET
           care_provider_id = ?1,
           appointment_type = ?2,
           date = ?3,
           duration_minutes = ?4,
           location = ?5,
           status = ?6,
           notes = ?7,
           updated_at = ?8
         WHERE id = ?9",
        params![
            appt.care_provider_id,
            appt.appointment_type,
            fmt_ts(&appt.date),
            appt.duration_minutes,
            appt.location.as_str(),
            appt.status.as_str(),
            appt.notes,
            fmt_ts(&appt.updated_at),
            appt.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn set_appointment_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), fmt_ts(now), id],
    )?;
    Ok(count > 0)
}

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
        params![id],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appt) => Ok(Some(appt?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_appointments_for_user(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE user_id = ?1 ORDER BY date DESC"
    ))?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn list_upcoming_for_user(
    conn: &Connection,
    user_id: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE user_id = ?1 AND date >= ?2
         ORDER BY date ASC"
    ))?;

    let rows = stmt.query_map(params![user_id, fmt_ts(now)], |row| {
        Ok(parse_appointment_row(row))
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

/// Scheduled appointments of `provider_id` whose `[date, date + duration)`
/// interval intersects `[start, end)`. SQL narrows the candidates by start
/// time; the end of each interval is compared in Rust.
pub fn scheduled_overlapping(
    conn: &Connection,
    provider_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    exclude_id: Option<&str>,
) -> anyhow::Result<Vec<Appointment>> {
    // No stored appointment starting at or before this can reach `start`
    let earliest = start
        .checked_sub_signed(Duration::minutes(i64::from(MAX_DURATION_MINUTES)))
        .unwrap_or(NaiveDateTime::MIN);

    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE care_provider_id = ?1
           AND status = 'scheduled'
           AND date > ?2
           AND date < ?3
           AND (?4 IS NULL OR id != ?4)
         ORDER BY date ASC"
    ))?;

    let rows = stmt.query_map(
        params![provider_id, fmt_ts(&earliest), fmt_ts(end), exclude_id],
        |row| Ok(parse_appointment_row(row)),
    )?;

    let mut appointments = vec![];
    for row in rows {
        let appt = row??;
        if appt.overlaps(start, end) {
            appointments.push(appt);
        }
    }
    Ok(appointments)
}

pub fn list_all_appointments(
    conn: &Connection,
    status_filter: Option<AppointmentStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE status = ?1 ORDER BY date DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.as_str()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY date DESC LIMIT ?1"),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let care_provider_id: Option<String> = row.get(2)?;
    let appointment_type: String = row.get(3)?;
    let date_str: String = row.get(4)?;
    let duration_minutes: i32 = row.get(5)?;
    let location_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let notes: Option<String> = row.get(8)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    let location = AppointmentLocation::parse(&location_str)
        .with_context(|| format!("unknown location '{location_str}' on appointment {id}"))?;
    let status = AppointmentStatus::parse(&status_str)
        .with_context(|| format!("unknown status '{status_str}' on appointment {id}"))?;

    Ok(Appointment {
        date: parse_ts(&date_str)?,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
        id,
        user_id,
        care_provider_id,
        appointment_type,
        duration_minutes,
        location,
        status,
        notes,
    })
}

// ── Care Providers ──

pub fn insert_care_provider(conn: &Connection, provider: &CareProvider) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO care_providers (id, first_name, last_name, title, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            provider.id,
            provider.first_name,
            provider.last_name,
            provider.title,
            provider.is_active as i32,
            fmt_ts(&provider.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_care_provider(conn: &Connection, id: &str) -> anyhow::Result<Option<CareProvider>> {
    let result = conn.query_row(
        "SELECT id, first_name, last_name, title, is_active, created_at FROM care_providers WHERE id = ?1",
        params![id],
        |row| Ok(parse_care_provider_row(row)),
    );

    match result {
        Ok(provider) => Ok(Some(provider?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_care_providers(
    conn: &Connection,
    active_only: bool,
) -> anyhow::Result<Vec<CareProvider>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, title, is_active, created_at FROM care_providers
         WHERE (?1 = 0 OR is_active = 1)
         ORDER BY last_name ASC, first_name ASC",
    )?;

    let rows = stmt.query_map(params![active_only as i32], |row| {
        Ok(parse_care_provider_row(row))
    })?;

    let mut providers = vec![];
    for row in rows {
        providers.push(row??);
    }
    Ok(providers)
}

fn parse_care_provider_row(row: &rusqlite::Row) -> anyhow::Result<CareProvider> {
    let created_at_str: String = row.get(5)?;
    Ok(CareProvider {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        title: row.get(3)?,
        is_active: row.get::<_, i32>(4)? != 0,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Care Journey ──

pub fn insert_milestone(conn: &Connection, milestone: &CareMilestone) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO care_milestones (id, user_id, position, title, description, status, completed_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            milestone.id,
            milestone.user_id,
            milestone.position,
            milestone.title,
            milestone.description,
            milestone.status.as_str(),
            milestone.completed_at.as_ref().map(fmt_ts),
            fmt_ts(&milestone.created_at),
        ],
    )?;
    Ok(())
}

pub fn list_milestones_for_user(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Vec<CareMilestone>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, position, title, description, status, completed_at, created_at
         FROM care_milestones WHERE user_id = ?1 ORDER BY position ASC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_milestone_row(row)))?;

    let mut milestones = vec![];
    for row in rows {
        milestones.push(row??);
    }
    Ok(milestones)
}

pub fn get_milestone(conn: &Connection, id: &str) -> anyhow::Result<Option<CareMilestone>> {
    let result = conn.query_row(
        "SELECT id, user_id, position, title, description, status, completed_at, created_at
         FROM care_milestones WHERE id = ?1",
        params![id],
        |row| Ok(parse_milestone_row(row)),
    );

    match result {
        Ok(milestone) => Ok(Some(milestone?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_milestone_status(
    conn: &Connection,
    id: &str,
    status: MilestoneStatus,
    completed_at: Option<&NaiveDateTime>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE care_milestones SET status = ?1, completed_at = ?2 WHERE id = ?3",
        params![status.as_str(), completed_at.map(fmt_ts), id],
    )?;
    Ok(count > 0)
}

fn parse_milestone_row(row: &rusqlite::Row) -> anyhow::Result<CareMilestone> {
    let status_str: String = row.get(5)?;
    let completed_at_str: Option<String> = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    Ok(CareMilestone {
        id: row.get(0)?,
        user_id: row.get(1)?,
        position: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: MilestoneStatus::parse(&status_str),
        completed_at: completed_at_str.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Contact Submissions ──

pub fn insert_contact(conn: &Connection, contact: &ContactSubmission) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO contact_submissions (id, name, email, phone, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            contact.id,
            contact.name,
            contact.email,
            contact.phone,
            contact.message,
            fmt_ts(&contact.created_at),
        ],
    )?;
    Ok(())
}

pub fn list_contacts(conn: &Connection, limit: i64) -> anyhow::Result<Vec<ContactSubmission>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, phone, message, created_at
         FROM contact_submissions ORDER BY created_at DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        let created_at_str: String = row.get(5)?;
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
            created_at_str,
        ))
    })?;

    let mut contacts = vec![];
    for row in rows {
        let (id, name, email, phone, message, created_at_str) = row?;
        contacts.push(ContactSubmission {
            id,
            name,
            email,
            phone,
            message,
            created_at: parse_ts(&created_at_str)?,
        });
    }
    Ok(contacts)
}
