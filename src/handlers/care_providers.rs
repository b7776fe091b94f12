use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AvailabilityEntry, AvailabilityQuery, CareProvider};
use crate::services::availability;
use crate::state::AppState;

// GET /api/care-providers
pub async fn list_active(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CareProvider>>, AppError> {
    let db = state.conn()?;
    Ok(Json(queries::list_care_providers(&db, true)?))
}

// GET /api/care-providers/:id/availability?start=..&end=..
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<AvailabilityEntry>>, AppError> {
    let start = match query.start.as_deref() {
        Some(raw) => availability::parse_window_date("start", raw)?,
        None => return Err(AppError::validation("start", "is required")),
    };
    let end = match query.end.as_deref() {
        Some(raw) => availability::parse_window_date("end", raw)?,
        None => return Err(AppError::validation("end", "is required")),
    };

    let db = state.conn()?;
    let entries = availability::compute_availability(
        &db,
        &provider_id,
        start,
        end,
        state.config.max_availability_days,
    )?;
    Ok(Json(entries))
}
