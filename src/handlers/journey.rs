use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::auth::UserContext;
use crate::db;
use crate::errors::AppError;
use crate::models::CareMilestone;
use crate::services::journey;
use crate::state::AppState;

// GET /api/care-journey
pub async fn get_journey(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
) -> Result<Json<Vec<CareMilestone>>, AppError> {
    let now = db::now();
    let mut db = state.conn()?;
    Ok(Json(journey::journey_for_user(&mut db, &ctx.user_id, now)?))
}

// POST /api/care-journey/milestones/:id/complete
pub async fn complete_milestone(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<String>,
) -> Result<Json<CareMilestone>, AppError> {
    let now = db::now();
    let mut db = state.conn()?;
    Ok(Json(journey::complete_milestone(&mut db, &ctx.user_id, &id, now)?))
}
