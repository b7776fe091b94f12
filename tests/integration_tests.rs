use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use carebook::config::AppConfig;
use carebook::db;
use carebook::handlers;
use carebook::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        cors_origin: None,
        max_availability_days: 366,
    }
}

fn test_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState::new(conn, test_config()))
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn user_request(method: &str, uri: &str, user: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-User-Id", user);
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn admin_request(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token");
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn create_provider(state: &Arc<AppState>) -> String {
    let res = test_app(state.clone())
        .oneshot(admin_request(
            "POST",
            "/api/admin/care-providers",
            Some(r#"{"firstName":"Ada","lastName":"Lovelace","title":"RN"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let json = body_json(res).await;
    json["id"].as_str().unwrap().to_string()
}

async fn book(state: &Arc<AppState>, user: &str, body: &str) -> axum::response::Response {
    test_app(state.clone())
        .oneshot(user_request("POST", "/api/appointments", user, Some(body)))
        .await
        .unwrap()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let res = test_app(test_state())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "ok");
}

// ── Appointments ──

#[tokio::test]
async fn test_appointments_require_user_context() {
    let res = test_app(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/appointments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_appointment_defaults() {
    let state = test_state();
    let res = book(
        &state,
        "user-1",
        r#"{"appointmentType":"consultation","date":"2030-06-10T09:00:00"}"#,
    )
    .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let json = body_json(res).await;
    assert_eq!(json["userId"], "user-1");
    assert_eq!(json["status"], "scheduled");
    assert_eq!(json["durationMinutes"], 60);
    assert_eq!(json["location"], "home");
    assert_eq!(json["date"], "2030-06-10T09:00:00");
    assert!(json["careProviderId"].is_null());
}

#[tokio::test]
async fn test_create_appointment_validation_error() {
    let state = test_state();
    let res = book(
        &state,
        "user-1",
        r#"{"appointmentType":"consultation","date":"sometime soon"}"#,
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert_eq!(json["field"], "date");
}

#[tokio::test]
async fn test_create_appointment_unknown_provider() {
    let state = test_state();
    let res = book(
        &state,
        "user-1",
        r#"{"appointmentType":"visit","date":"2030-06-10T09:00:00","careProviderId":"ghost"}"#,
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_double_booking_returns_conflict() {
    let state = test_state();
    let provider = create_provider(&state).await;

    let first = book(
        &state,
        "user-1",
        &format!(r#"{{"appointmentType":"visit","date":"2030-06-10T09:00:00","duration":60,"careProviderId":"{provider}"}}"#),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = book(
        &state,
        "user-2",
        &format!(r#"{{"appointmentType":"visit","date":"2030-06-10T09:30:00","duration":30,"careProviderId":"{provider}"}}"#),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    // Nothing was written for the rejected request
    let res = test_app(state.clone())
        .oneshot(user_request("GET", "/api/appointments", "user-2", None))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_malformed_duration_is_a_validation_error() {
    let state = test_state();
    for duration in [r#""sixty""#, "99999999999", "2147483647", "0"] {
        let res = book(
            &state,
            "user-1",
            &format!(r#"{{"appointmentType":"visit","date":"2030-06-10T09:00:00","duration":{duration}}}"#),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "duration {duration}");
        assert_eq!(body_json(res).await["field"], "duration");
    }
}

#[tokio::test]
async fn test_dates_beyond_year_9999_are_rejected() {
    let state = test_state();
    let provider = create_provider(&state).await;

    for date in ["+10000-01-01T09:00", "9999-12-31T23:30"] {
        for _ in 0..2 {
            let res = book(
                &state,
                "user-1",
                &format!(r#"{{"appointmentType":"visit","date":"{date}","duration":60,"careProviderId":"{provider}"}}"#),
            )
            .await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "date {date}");
            assert_eq!(body_json(res).await["field"], "date");
        }
    }

    let first = book(
        &state,
        "user-1",
        &format!(r#"{{"appointmentType":"visit","date":"9000-01-01T00:00","duration":1440,"careProviderId":"{provider}"}}"#),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let overlapping = book(
        &state,
        "user-2",
        &format!(r#"{{"appointmentType":"visit","date":"9000-01-01T23:00","duration":60,"careProviderId":"{provider}"}}"#),
    )
    .await;
    assert_eq!(overlapping.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_created_timestamps_match_stored_record() {
    let state = test_state();
    let res = book(
        &state,
        "user-1",
        r#"{"appointmentType":"visit","date":"2030-06-10T09:00:00"}"#,
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = body_json(res).await;
    let id = created["id"].as_str().unwrap();

    let res = test_app(state)
        .oneshot(user_request("GET", &format!("/api/appointments/{id}"), "user-1", None))
        .await
        .unwrap();
    let fetched = body_json(res).await;
    assert_eq!(fetched["createdAt"], created["createdAt"]);
    assert_eq!(fetched["updatedAt"], created["updatedAt"]);
    assert!(!created["createdAt"].as_str().unwrap().contains('.'));
}

#[tokio::test]
async fn test_same_day_later_slot_books_but_day_stays_busy() {
    let state = test_state();
    let provider = create_provider(&state).await;

    let first = book(
        &state,
        "user-1",
        &format!(r#"{{"appointmentType":"visit","date":"2024-06-10T09:00:00","duration":60,"careProviderId":"{provider}"}}"#),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/api/care-providers/{provider}/availability?start=2024-06-10&end=2024-06-10"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json, serde_json::json!([{ "date": "2024-06-10", "available": false }]));

    let later = book(
        &state,
        "user-2",
        &format!(r#"{{"appointmentType":"visit","date":"2024-06-10T10:00:00","duration":30,"careProviderId":"{provider}"}}"#),
    )
    .await;
    assert_eq!(later.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_list_and_upcoming_ordering() {
    let state = test_state();
    for date in ["2020-01-01T09:00:00", "2031-03-01T09:00:00", "2030-03-01T09:00:00"] {
        let res = book(
            &state,
            "user-1",
            &format!(r#"{{"appointmentType":"visit","date":"{date}"}}"#),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = test_app(state.clone())
        .oneshot(user_request("GET", "/api/appointments", "user-1", None))
        .await
        .unwrap();
    let all = body_json(res).await;
    let dates: Vec<_> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["date"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        dates,
        vec!["2031-03-01T09:00:00", "2030-03-01T09:00:00", "2020-01-01T09:00:00"]
    );

    let res = test_app(state.clone())
        .oneshot(user_request("GET", "/api/appointments/upcoming", "user-1", None))
        .await
        .unwrap();
    let upcoming = body_json(res).await;
    let dates: Vec<_> = upcoming
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["date"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(dates, vec!["2030-03-01T09:00:00", "2031-03-01T09:00:00"]);
}

#[tokio::test]
async fn test_cancel_is_idempotent_over_http() {
    let state = test_state();
    let res = book(
        &state,
        "user-1",
        r#"{"appointmentType":"visit","date":"2030-06-10T09:00:00"}"#,
    )
    .await;
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let res = test_app(state.clone())
            .oneshot(user_request(
                "POST",
                &format!("/api/appointments/{id}/cancel"),
                "user-1",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "cancelled");
    }

    let res = test_app(state)
        .oneshot(user_request(
            "POST",
            "/api/appointments/missing/cancel",
            "user-1",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_users_appointment_is_hidden() {
    let state = test_state();
    let res = book(
        &state,
        "user-1",
        r#"{"appointmentType":"visit","date":"2030-06-10T09:00:00"}"#,
    )
    .await;
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(user_request("GET", &format!("/api/appointments/{id}"), "user-1", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state)
        .oneshot(user_request("GET", &format!("/api/appointments/{id}"), "user-2", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_appointment() {
    let state = test_state();
    let res = book(
        &state,
        "user-1",
        r#"{"appointmentType":"visit","date":"2030-06-10T09:00:00"}"#,
    )
    .await;
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = test_app(state)
        .oneshot(user_request(
            "PATCH",
            &format!("/api/appointments/{id}"),
            "user-1",
            Some(r#"{"duration":45,"location":"virtual","notes":"video link by email"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["durationMinutes"], 45);
    assert_eq!(json["location"], "virtual");
    assert_eq!(json["notes"], "video link by email");
}

#[tokio::test]
async fn test_patch_to_unknown_provider_is_not_found() {
    let state = test_state();
    let res = book(
        &state,
        "user-1",
        r#"{"appointmentType":"visit","date":"2030-06-10T09:00:00"}"#,
    )
    .await;
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = test_app(state)
        .oneshot(user_request(
            "PATCH",
            &format!("/api/appointments/{id}"),
            "user-1",
            Some(r#"{"careProviderId":"ghost","status":"cancelled"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upcoming_includes_cancelled_and_completed_can_be_cancelled() {
    let state = test_state();
    let res = book(
        &state,
        "user-1",
        r#"{"appointmentType":"visit","date":"2030-06-10T09:00:00"}"#,
    )
    .await;
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(user_request(
            "PATCH",
            &format!("/api/appointments/{id}"),
            "user-1",
            Some(r#"{"status":"completed"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state.clone())
        .oneshot(user_request(
            "POST",
            &format!("/api/appointments/{id}/cancel"),
            "user-1",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "cancelled");

    let res = test_app(state)
        .oneshot(user_request("GET", "/api/appointments/upcoming", "user-1", None))
        .await
        .unwrap();
    let upcoming = body_json(res).await;
    assert_eq!(upcoming.as_array().unwrap().len(), 1);
    assert_eq!(upcoming[0]["status"], "cancelled");
}

// ── Availability ──

#[tokio::test]
async fn test_availability_window_edges() {
    let state = test_state();
    let provider = create_provider(&state).await;

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/api/care-providers/{provider}/availability?start=2024-06-12&end=2024-06-10"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, serde_json::json!([]));

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/api/care-providers/{provider}/availability?start=2024-06-12"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["field"], "end");

    let res = test_app(state)
        .oneshot(
            Request::builder()
                .uri("/api/care-providers/ghost/availability?start=2024-06-10&end=2024-06-10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Care providers & admin ──

#[tokio::test]
async fn test_admin_requires_token() {
    let res = test_app(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/admin/appointments")
                .header("Authorization", "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_providers_hidden_from_public_list() {
    let state = test_state();
    create_provider(&state).await;
    let res = test_app(state.clone())
        .oneshot(admin_request(
            "POST",
            "/api/admin/care-providers",
            Some(r#"{"firstName":"Old","lastName":"Timer","isActive":false}"#),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri("/api/care-providers")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let public = body_json(res).await;
    assert_eq!(public.as_array().unwrap().len(), 1);
    assert_eq!(public[0]["lastName"], "Lovelace");

    let res = test_app(state)
        .oneshot(admin_request("GET", "/api/admin/care-providers", None))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_lists_appointments_by_status() {
    let state = test_state();
    for user in ["user-1", "user-2"] {
        book(
            &state,
            user,
            r#"{"appointmentType":"visit","date":"2030-06-10T09:00:00"}"#,
        )
        .await;
    }
    let res = test_app(state.clone())
        .oneshot(user_request("GET", "/api/appointments", "user-1", None))
        .await
        .unwrap();
    let id = body_json(res).await[0]["id"].as_str().unwrap().to_string();
    test_app(state.clone())
        .oneshot(user_request(
            "POST",
            &format!("/api/appointments/{id}/cancel"),
            "user-1",
            None,
        ))
        .await
        .unwrap();

    let res = test_app(state.clone())
        .oneshot(admin_request("GET", "/api/admin/appointments", None))
        .await
        .unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 2);

    let res = test_app(state.clone())
        .oneshot(admin_request("GET", "/api/admin/appointments?status=cancelled", None))
        .await
        .unwrap();
    let cancelled = body_json(res).await;
    assert_eq!(cancelled.as_array().unwrap().len(), 1);
    assert_eq!(cancelled[0]["userId"], "user-1");

    let res = test_app(state)
        .oneshot(admin_request("GET", "/api/admin/appointments?status=lost", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Care journey ──

#[tokio::test]
async fn test_care_journey_seeds_and_completes() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(user_request("GET", "/api/care-journey", "user-1", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let journey = body_json(res).await;
    let first_id = journey[0]["id"].as_str().unwrap().to_string();
    assert_eq!(journey[0]["status"], "in_progress");

    let res = test_app(state.clone())
        .oneshot(user_request(
            "POST",
            &format!("/api/care-journey/milestones/{first_id}/complete"),
            "user-1",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "completed");

    let res = test_app(state)
        .oneshot(user_request("GET", "/api/care-journey", "user-1", None))
        .await
        .unwrap();
    let journey = body_json(res).await;
    assert_eq!(journey[0]["status"], "completed");
    assert_eq!(journey[1]["status"], "in_progress");
}

// ── Contact ──

#[tokio::test]
async fn test_contact_submission_flow() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/contact")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"name":"June","email":"june@example.com","message":"Do you visit on Sundays?"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/contact")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"name":"June","email":"nope","message":"hi"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = test_app(state)
        .oneshot(admin_request("GET", "/api/admin/contacts", None))
        .await
        .unwrap();
    let contacts = body_json(res).await;
    assert_eq!(contacts.as_array().unwrap().len(), 1);
    assert_eq!(contacts[0]["email"], "june@example.com");
}
