//! Standard bookings, card payment round trip and staff status changes

mod common;

use booking_server::store::{BookingStore, NotificationStore, OutboxStatus};
use common::{
    admin_get, admin_post, booking_body, create_test_server, login, publish_slot, STAFF_EMAIL,
};
use serde_json::{json, Value};

const DATE: &str = "2030-06-10";

/// Test: a transfer booking on an offered window is created pending
#[tokio::test]
async fn test_transfer_booking_created_pending() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;

    let response = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["booking"]["payment_status"], "pending");
    assert_eq!(body["booking"]["payment_method"], "transfer");
    assert_eq!(body["booking"]["amount_cents"], 9000);
    assert_eq!(body["booking"]["start_time"], "09:00");
    assert!(body.get("warning").is_none());

    // Client and staff were both emailed
    assert_eq!(app.emails.sent_to("camille@example.com").len(), 1);
    assert_eq!(app.emails.sent_to(STAFF_EMAIL).len(), 1);

    // Staff got a dashboard notification
    let notifications = app.state.store.list_notifications(false).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].booking_id.as_deref(), body["booking"]["id"].as_str());
}

/// Test: a window that is not published cannot be booked
#[tokio::test]
async fn test_unpublished_window_rejected() {
    let app = create_test_server();

    let response = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;

    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

/// Test: the second booking of the same window is refused
#[tokio::test]
async fn test_double_booking_rejected() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;

    let first = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;
    assert_eq!(first.status_code(), 200);

    let second = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;
    assert_eq!(second.status_code(), 409);

    // The window disappears from availability
    let response = app
        .server
        .get("/api/availability")
        .add_query_param("date", DATE)
        .await;
    let body: Value = response.json();
    assert_eq!(body["windows"].as_array().unwrap().len(), 0);
}

/// Test: missing customer fields are a validation error
#[tokio::test]
async fn test_missing_fields_rejected() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;

    let mut body = booking_body(DATE, "09:00", "10:00", "transfer");
    body["customer_name"] = json!("  ");

    let response = app.server.post("/api/bookings").json(&body).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(app.emails.count(), 0);
}

/// Test: card payment goes through the gateway and returns to a paid booking
#[tokio::test]
async fn test_card_payment_round_trip() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "14:00", "15:00").await;

    let response = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "14:00", "15:00", "card"))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body.get("booking").is_none());
    assert_eq!(
        body["redirect_url"],
        "http://localhost:3000/api/payments/success?session_id=cs_test_1"
    );

    let checkout = app.payments.last_request().unwrap();
    assert_eq!(checkout.amount_cents, 9000);
    assert!(!checkout.is_priority);

    // Nothing is booked until the client comes back
    assert!(app.state.store.get_booking_by_payment_session("cs_test_1").unwrap().is_none());

    let response = app
        .server
        .get("/api/payments/success")
        .add_query_param("session_id", "cs_test_1")
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["booking"]["payment_status"], "completed");
    assert_eq!(body["booking"]["payment_method"], "card");
    assert_eq!(body["booking"]["payment_session_id"], "cs_test_1");
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    // Returning again finds the same booking
    let response = app
        .server
        .get("/api/payments/success")
        .add_query_param("session_id", "cs_test_1")
        .await;
    let body: Value = response.json();
    assert_eq!(body["booking"]["id"], booking_id.as_str());
    assert_eq!(app.emails.sent_to("camille@example.com").len(), 1);
}

/// Test: an unknown payment session has no booking data
#[tokio::test]
async fn test_payment_success_without_data() {
    let app = create_test_server();

    let response = app
        .server
        .get("/api/payments/success")
        .add_query_param("session_id", "cs_unknown")
        .await;

    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["reason"], "Booking data not found");
}

/// Test: a gateway failure surfaces as 502 and stores nothing
#[tokio::test]
async fn test_payment_gateway_failure() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "14:00", "15:00").await;
    app.payments
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let response = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "14:00", "15:00", "card"))
        .await;

    assert_eq!(response.status_code(), 502);
    assert!(app.state.store.get_temp_booking("cs_test_1").unwrap().is_none());
}

/// Test: email failure keeps the booking and returns a warning
#[tokio::test]
async fn test_email_failure_is_soft() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;
    app.emails.set_failing(true);

    let response = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body["warning"].as_str().unwrap().contains("retried"));

    let failed = app.state.store.list_outbox(Some(OutboxStatus::Failed)).unwrap();
    assert_eq!(failed.len(), 2);
}

/// Test: staff confirm a booking, repeat it as a no-op, and cannot reopen it
#[tokio::test]
async fn test_admin_status_transitions() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;

    let response = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;
    let body: Value = response.json();
    let id = body["booking"]["id"].as_str().unwrap().to_string();
    let path = format!("/api/admin/bookings/{id}/status");

    let response = admin_post(&app.server, &admin, &path, json!({ "status": "confirmed" })).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["booking"]["payment_status"], "confirmed");
    assert_eq!(app.emails.sent_to("camille@example.com").len(), 2);

    // Same terminal status again: accepted, nobody emailed
    let response = admin_post(&app.server, &admin, &path, json!({ "status": "confirmed" })).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(app.emails.sent_to("camille@example.com").len(), 2);

    let response = admin_post(&app.server, &admin, &path, json!({ "status": "cancelled" })).await;
    assert_eq!(response.status_code(), 409);

    let response = admin_post(&app.server, &admin, &path, json!({ "status": "paid" })).await;
    assert_eq!(response.status_code(), 400);
}

/// Test: cancelling a booking frees its window
#[tokio::test]
async fn test_cancelled_booking_frees_window() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;

    let response = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;
    let body: Value = response.json();
    let id = body["booking"]["id"].as_str().unwrap().to_string();

    admin_post(
        &app.server,
        &admin,
        &format!("/api/admin/bookings/{id}/status"),
        json!({ "status": "cancelled" }),
    )
    .await;

    let response = app
        .server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;
    assert_eq!(response.status_code(), 200);
}

/// Test: staff list bookings filtered by status
#[tokio::test]
async fn test_admin_list_bookings_by_status() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;
    publish_slot(&app.server, &admin, DATE, "11:00", "12:00").await;

    for (start, end) in [("09:00", "10:00"), ("11:00", "12:00")] {
        app.server
            .post("/api/bookings")
            .json(&booking_body(DATE, start, end, "transfer"))
            .await;
    }
    let body: Value = admin_get(&app.server, &admin, "/api/admin/bookings").await.json();
    let first_id = body["bookings"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(body["bookings"].as_array().unwrap().len(), 2);

    admin_post(
        &app.server,
        &admin,
        &format!("/api/admin/bookings/{first_id}/status"),
        json!({ "status": "confirmed" }),
    )
    .await;

    let body: Value = admin_get(&app.server, &admin, "/api/admin/bookings?status=confirmed")
        .await
        .json();
    let bookings = body["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["id"], first_id.as_str());
}
