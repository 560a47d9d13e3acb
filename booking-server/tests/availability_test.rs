//! Availability resolution and calendar views over HTTP

mod common;

use common::{admin_get, admin_post, booking_body, create_test_server, login, publish_slot};
use serde_json::{json, Value};

// A Monday
const DATE: &str = "2030-06-10";

fn cell<'a>(body: &'a Value, date: &str) -> &'a Value {
    body["cells"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["date"] == date)
        .expect("Date not in grid")
}

/// Test: a day without slots offers nothing
#[tokio::test]
async fn test_empty_day() {
    let app = create_test_server();

    let response = app
        .server
        .get("/api/availability")
        .add_query_param("date", DATE)
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["date"], DATE);
    assert_eq!(body["windows"], json!([]));
}

/// Test: recurring and one-off slots combine, sorted and deduplicated
#[tokio::test]
async fn test_recurring_and_dated_slots_combine() {
    let app = create_test_server();
    let admin = login(&app.server).await;

    // Every Monday 14:00-15:00
    let response = admin_post(
        &app.server,
        &admin,
        "/api/admin/slots",
        json!({
            "day_of_week": 1,
            "start_time": "14:00",
            "end_time": "15:00",
            "is_recurring": true,
        }),
    )
    .await;
    assert_eq!(response.status_code(), 200);

    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;
    publish_slot(&app.server, &admin, DATE, "14:00", "15:00").await;

    let body: Value = app
        .server
        .get("/api/availability")
        .add_query_param("date", DATE)
        .await
        .json();
    assert_eq!(
        body["windows"],
        json!([
            { "start_time": "09:00", "end_time": "10:00" },
            { "start_time": "14:00", "end_time": "15:00" },
        ])
    );

    // The recurring slot shows up the following Monday, the dated one does not
    let body: Value = app
        .server
        .get("/api/availability")
        .add_query_param("date", "2030-06-17")
        .await
        .json();
    assert_eq!(
        body["windows"],
        json!([{ "start_time": "14:00", "end_time": "15:00" }])
    );
}

/// Test: a disabled slot is not offered
#[tokio::test]
async fn test_disabled_slot_hidden() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    let id = publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;

    admin_post(
        &app.server,
        &admin,
        &format!("/api/admin/slots/{id}/toggle"),
        json!({}),
    )
    .await;

    let body: Value = app
        .server
        .get("/api/availability")
        .add_query_param("date", DATE)
        .await
        .json();
    assert_eq!(body["windows"], json!([]));
}

/// Test: an invalid date is a client error
#[tokio::test]
async fn test_invalid_date_rejected() {
    let app = create_test_server();

    let response = app
        .server
        .get("/api/availability")
        .add_query_param("date", "2030-13-01")
        .await;

    assert_eq!(response.status_code(), 400);
}

/// Test: the public month highlights days that still have an open window
#[tokio::test]
async fn test_public_month_highlights_open_days() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;
    publish_slot(&app.server, &admin, "2030-06-12", "09:00", "10:00").await;

    let body: Value = app
        .server
        .get("/api/calendar/month?year=2030&month=6")
        .await
        .json();
    assert_eq!(body["cells"].as_array().unwrap().len(), 42);
    assert_eq!(cell(&body, DATE)["is_highlighted"], true);
    assert_eq!(cell(&body, "2030-06-12")["is_highlighted"], true);
    assert_eq!(cell(&body, "2030-06-11")["is_highlighted"], false);
    assert_eq!(cell(&body, "2030-05-31")["in_month"], false);

    // Booking the only window of a day clears its highlight
    app.server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;

    let body: Value = app
        .server
        .get("/api/calendar/month?year=2030&month=6")
        .await
        .json();
    assert_eq!(cell(&body, DATE)["is_highlighted"], false);
    assert_eq!(cell(&body, "2030-06-12")["is_highlighted"], true);
}

/// Test: an out of range month is rejected
#[tokio::test]
async fn test_public_month_invalid_month() {
    let app = create_test_server();

    let response = app.server.get("/api/calendar/month?year=2030&month=13").await;

    assert_eq!(response.status_code(), 400);
}

/// Test: a month whose grid runs past the last representable date is rejected
#[tokio::test]
async fn test_public_month_at_end_of_calendar() {
    let app = create_test_server();

    let response = app
        .server
        .get("/api/calendar/month?year=262142&month=12")
        .await;

    assert_eq!(response.status_code(), 400);
}

/// Test: a week at the edge of the date range is rejected
#[tokio::test]
async fn test_admin_week_at_end_of_calendar() {
    let app = create_test_server();
    let admin = login(&app.server).await;

    // The last representable day is a Monday
    let response = app
        .server
        .get("/api/admin/calendar/week")
        .add_cookie(admin.cookie())
        .add_query_param("date", "+262142-12-31")
        .await;
    assert_eq!(response.status_code(), 400);

    let response = admin_get(
        &app.server,
        &admin,
        "/api/admin/calendar/month?year=262142&month=12",
    )
    .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: staff calendars show bookings by day and as week bars
#[tokio::test]
async fn test_admin_calendars_show_bookings() {
    let app = create_test_server();
    let admin = login(&app.server).await;
    publish_slot(&app.server, &admin, DATE, "09:00", "10:00").await;
    app.server
        .post("/api/bookings")
        .json(&booking_body(DATE, "09:00", "10:00", "transfer"))
        .await;

    let body: Value = admin_get(&app.server, &admin, "/api/admin/calendar/month?year=2030&month=6")
        .await
        .json();
    assert_eq!(cell(&body, DATE)["is_highlighted"], true);
    assert_eq!(cell(&body, "2030-06-12")["is_highlighted"], false);

    let body: Value = admin_get(&app.server, &admin, "/api/admin/calendar/week?date=2030-06-13")
        .await
        .json();
    let days = body["days"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["date"], DATE);

    let bars = body["bars"].as_array().unwrap();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0]["day_index"], 0);
    assert_eq!(bars[0]["customer_name"], "Camille Durand");
}

/// Test: staff calendars need a session
#[tokio::test]
async fn test_admin_calendar_requires_session() {
    let app = create_test_server();

    let response = app.server.get("/api/admin/calendar/week").await;

    assert_eq!(response.status_code(), 401);
}
