//! Admin login, session expiry and CSRF protection

mod common;

use common::{admin_get, create_test_server, create_test_server_with, login, test_settings, SESSION_COOKIE};
use serde_json::{json, Value};

/// Test: correct password opens a session with a CSRF token
#[tokio::test]
async fn test_login_success() {
    let app = create_test_server();

    let admin = login(&app.server).await;
    assert!(!admin.csrf.is_empty());

    let response = admin_get(&app.server, &admin, "/api/admin/session").await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["csrf_token"], admin.csrf.as_str());
}

/// Test: wrong password is rejected without a cookie
#[tokio::test]
async fn test_login_wrong_password() {
    let app = create_test_server();

    let response = app
        .server
        .post("/api/admin/login")
        .json(&json!({ "password": "nope" }))
        .await;

    assert_eq!(response.status_code(), 401);
    assert!(response.maybe_cookie(SESSION_COOKIE).is_none());
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "Invalid credentials");
}

/// Test: admin endpoints require a session
#[tokio::test]
async fn test_admin_requires_session() {
    let app = create_test_server();

    let response = app.server.get("/api/admin/bookings").await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .server
        .get("/api/admin/bookings")
        .add_cookie(cookie::Cookie::new(SESSION_COOKIE, "forged"))
        .await;
    assert_eq!(response.status_code(), 401);
}

/// Test: mutations without the CSRF header are forbidden
#[tokio::test]
async fn test_mutation_requires_csrf() {
    let app = create_test_server();
    let admin = login(&app.server).await;

    let response = app
        .server
        .post("/api/admin/slots")
        .add_cookie(admin.cookie())
        .json(&json!({
            "day_of_week": 1,
            "is_recurring": true,
            "start_time": "09:00",
            "end_time": "10:00",
        }))
        .await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .server
        .post("/api/admin/slots")
        .add_cookie(admin.cookie())
        .add_header(
            axum::http::HeaderName::from_static("x-csrf-token"),
            axum::http::HeaderValue::from_static("wrong-token"),
        )
        .json(&json!({
            "day_of_week": 1,
            "is_recurring": true,
            "start_time": "09:00",
            "end_time": "10:00",
        }))
        .await;
    assert_eq!(response.status_code(), 403);
}

/// Test: logout revokes the session server-side
#[tokio::test]
async fn test_logout_revokes_session() {
    let app = create_test_server();
    let admin = login(&app.server).await;

    let response = app
        .server
        .post("/api/admin/logout")
        .add_cookie(admin.cookie())
        .await;
    assert_eq!(response.status_code(), 200);

    // The old cookie value no longer works
    let response = admin_get(&app.server, &admin, "/api/admin/bookings").await;
    assert_eq!(response.status_code(), 401);
}

/// Test: an expired session is refused and reported as expired
#[tokio::test]
async fn test_expired_session_rejected() {
    let mut settings = test_settings();
    settings.session_ttl = chrono::Duration::seconds(-1);
    let app = create_test_server_with(settings);

    let admin = login(&app.server).await;

    let response = admin_get(&app.server, &admin, "/api/admin/bookings").await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["reason"], "Session expired");

    let response = admin_get(&app.server, &admin, "/api/admin/session").await;
    let body: Value = response.json();
    assert_eq!(body["authenticated"], false);
}
