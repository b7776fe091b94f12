pub mod admin;
pub mod appointments;
pub mod care_providers;
pub mod contact;
pub mod health;
pub mod journey;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route("/api/appointments/upcoming", get(appointments::list_upcoming))
        .route(
            "/api/appointments/:id",
            get(appointments::get_appointment).patch(appointments::update_appointment),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(appointments::cancel_appointment),
        )
        .route("/api/care-providers", get(care_providers::list_active))
        .route(
            "/api/care-providers/:id/availability",
            get(care_providers::get_availability),
        )
        .route("/api/care-journey", get(journey::get_journey))
        .route(
            "/api/care-journey/milestones/:id/complete",
            post(journey::complete_milestone),
        )
        .route("/api/contact", post(contact::submit_contact))
        .route(
            "/api/admin/care-providers",
            get(admin::list_care_providers).post(admin::create_care_provider),
        )
        .route("/api/admin/appointments", get(admin::list_appointments))
        .route("/api/admin/contacts", get(admin::list_contacts))
        .with_state(state)
}
