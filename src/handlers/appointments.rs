use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::auth::UserContext;
use crate::db;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentPatch, BookingRequest};
use crate::services::{appointments, booking};
use crate::state::AppState;

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Json(body): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let now = db::now();
    let appointment = {
        let mut db = state.conn()?;
        booking::book_appointment(&mut db, &ctx.user_id, &body, now)?
    };
    Ok((StatusCode::CREATED, Json(appointment)))
}

// GET /api/appointments
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let db = state.conn()?;
    Ok(Json(appointments::list_by_user(&db, &ctx.user_id)?))
}

// GET /api/appointments/upcoming
pub async fn list_upcoming(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let now = db::now();
    let db = state.conn()?;
    Ok(Json(appointments::list_upcoming_by_user(&db, &ctx.user_id, now)?))
}

// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let db = state.conn()?;
    Ok(Json(appointments::get_for_user(&db, &ctx.user_id, &id)?))
}

// PATCH /api/appointments/:id
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<String>,
    Json(patch): Json<AppointmentPatch>,
) -> Result<Json<Appointment>, AppError> {
    let now = db::now();
    let mut db = state.conn()?;
    Ok(Json(appointments::update(&mut db, &ctx.user_id, &id, &patch, now)?))
}

// POST /api/appointments/:id/cancel
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let now = db::now();
    let db = state.conn()?;
    Ok(Json(appointments::cancel(&db, &ctx.user_id, &id, now)?))
}
