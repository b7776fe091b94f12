use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{ContactSubmission, NewContactSubmission};

const MAX_MESSAGE_LEN: usize = 5000;

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn submit(
    conn: &Connection,
    new: &NewContactSubmission,
    now: NaiveDateTime,
) -> Result<ContactSubmission, AppError> {
    let name = new.name.trim();
    let email = new.email.trim();
    let message = new.message.trim();

    if name.is_empty() {
        return Err(AppError::validation("name", "is required"));
    }
    if !looks_like_email(email) {
        return Err(AppError::validation("email", "must be a valid email address"));
    }
    if message.is_empty() {
        return Err(AppError::validation("message", "is required"));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::validation(
            "message",
            format!("must be at most {MAX_MESSAGE_LEN} characters"),
        ));
    }

    let submission = ContactSubmission {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        phone: new
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
        message: message.to_string(),
        created_at: now,
    };
    queries::insert_contact(conn, &submission)?;

    tracing::info!(contact_id = %submission.id, "contact submission stored");
    Ok(submission)
}

pub fn list(conn: &Connection, limit: i64) -> Result<Vec<ContactSubmission>, AppError> {
    Ok(queries::list_contacts(conn, limit)?)
}
