use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::db;
use crate::errors::AppError;
use crate::models::{ContactSubmission, NewContactSubmission};
use crate::services::contact;
use crate::state::AppState;

// POST /api/contact
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewContactSubmission>,
) -> Result<(StatusCode, Json<ContactSubmission>), AppError> {
    let now = db::now();
    let submission = {
        let db = state.conn()?;
        contact::submit(&db, &body, now)?
    };
    Ok((StatusCode::CREATED, Json(submission)))
}
