use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::auth::check_admin;
use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus, CareProvider, ContactSubmission, NewCareProvider};
use crate::services::contact;
use crate::state::AppState;

// GET /api/admin/care-providers
pub async fn list_care_providers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CareProvider>>, AppError> {
    check_admin(&headers, &state.config.admin_token)?;

    let db = state.conn()?;
    Ok(Json(queries::list_care_providers(&db, false)?))
}

// POST /api/admin/care-providers
pub async fn create_care_provider(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewCareProvider>,
) -> Result<(StatusCode, Json<CareProvider>), AppError> {
    check_admin(&headers, &state.config.admin_token)?;

    let first_name = body.first_name.trim();
    let last_name = body.last_name.trim();
    if first_name.is_empty() {
        return Err(AppError::validation("firstName", "is required"));
    }
    if last_name.is_empty() {
        return Err(AppError::validation("lastName", "is required"));
    }

    let provider = CareProvider {
        id: uuid::Uuid::new_v4().to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        title: body.title.trim().to_string(),
        is_active: body.is_active,
        created_at: db::now(),
    };

    {
        let db = state.conn()?;
        queries::insert_care_provider(&db, &provider)?;
    }

    tracing::info!(provider_id = %provider.id, name = %provider.display_name(), "care provider created");
    Ok((StatusCode::CREATED, Json(provider)))
}

// GET /api/admin/appointments
#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_admin(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let status_filter = match query.status.as_deref() {
        Some(raw) => Some(AppointmentStatus::parse(raw).ok_or_else(|| {
            AppError::validation("status", format!("'{raw}' is not a known status"))
        })?),
        None => None,
    };

    let db = state.conn()?;
    Ok(Json(queries::list_all_appointments(&db, status_filter, limit)?))
}

// GET /api/admin/contacts
#[derive(Deserialize)]
pub struct ContactsQuery {
    pub limit: Option<i64>,
}

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ContactsQuery>,
) -> Result<Json<Vec<ContactSubmission>>, AppError> {
    check_admin(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let db = state.conn()?;
    Ok(Json(contact::list(&db, limit)?))
}
