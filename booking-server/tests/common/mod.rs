//! Common test utilities for booking service integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use booking_server::crypto::hash_password_with_cost;
use booking_server::payment::{CheckoutRequest, CheckoutSession, SESSION_ID_PLACEHOLDER};
use booking_server::{
    routes, AppState, Config, EmailMessage, EmailSender, InMemorySessionStore, InMemoryStore,
    PaymentGateway, Settings,
};
use serde_json::{json, Value};

pub const ADMIN_PASSWORD: &str = "staff-password";
pub const SESSION_COOKIE: &str = "admin_session";
pub const STAFF_EMAIL: &str = "staff@example.com";

/// Mock email sender that captures messages
#[derive(Default, Clone)]
pub struct MockEmailSender {
    pub sent: Arc<RwLock<Vec<EmailMessage>>>,
    pub fail: Arc<AtomicBool>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail (or succeed again)
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages delivered to an address
    pub fn sent_to(&self, to: &str) -> Vec<EmailMessage> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.to == to)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.read().unwrap().len()
    }
}

impl EmailSender for MockEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("mock transport down".to_string());
        }
        self.sent.write().unwrap().push(message.clone());
        Ok(())
    }
}

/// Mock payment gateway that hands out sequential session ids
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    pub requests: Arc<RwLock<Vec<CheckoutRequest>>>,
    pub counter: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_request(&self) -> Option<CheckoutRequest> {
        self.requests.read().unwrap().last().cloned()
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("gateway unavailable".to_string());
        }
        self.requests.write().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("cs_test_{n}");
        Ok(CheckoutSession {
            redirect_url: request.success_url.replace(SESSION_ID_PLACEHOLDER, &session_id),
            session_id,
        })
    }
}

pub type TestState = AppState<InMemoryStore, InMemorySessionStore, MockEmailSender, MockPaymentGateway>;

pub struct TestApp {
    pub server: TestServer,
    pub emails: MockEmailSender,
    pub payments: MockPaymentGateway,
    pub state: Arc<TestState>,
}

pub fn test_settings() -> Settings {
    let config = Config {
        staff_email: Some(STAFF_EMAIL.to_string()),
        public_url: "http://localhost:3000".to_string(),
        ..Config::default()
    };
    let hash = hash_password_with_cost(ADMIN_PASSWORD, 4).expect("Failed to hash password");
    Settings::from_config(&config, hash)
}

/// Create a test server with mock email sender and payment gateway
pub fn create_test_server() -> TestApp {
    create_test_server_with(test_settings())
}

pub fn create_test_server_with(settings: Settings) -> TestApp {
    let emails = MockEmailSender::new();
    let payments = MockPaymentGateway::new();

    let state = Arc::new(AppState::new(
        InMemoryStore::new(),
        InMemorySessionStore::new(),
        emails.clone(),
        payments.clone(),
        settings,
    ));

    let app = routes::create_router(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        emails,
        payments,
        state,
    }
}

/// Admin credentials for authenticated requests
pub struct Admin {
    pub session: String,
    pub csrf: String,
}

impl Admin {
    pub fn cookie(&self) -> cookie::Cookie<'static> {
        cookie::Cookie::new(SESSION_COOKIE, self.session.clone())
    }

    pub fn csrf_name(&self) -> HeaderName {
        HeaderName::from_static("x-csrf-token")
    }

    pub fn csrf_value(&self) -> HeaderValue {
        HeaderValue::from_str(&self.csrf).expect("Invalid CSRF header")
    }
}

/// Log in as staff and return the session cookie and CSRF token
pub async fn login(server: &TestServer) -> Admin {
    let response = server
        .post("/api/admin/login")
        .json(&json!({ "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    let csrf = body["csrf_token"]
        .as_str()
        .expect("No CSRF token")
        .to_string();
    let session = response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie")
        .value()
        .to_string();

    Admin { session, csrf }
}

/// POST as staff with cookie and CSRF header
pub async fn admin_post(
    server: &TestServer,
    admin: &Admin,
    path: &str,
    body: Value,
) -> axum_test::TestResponse {
    server
        .post(path)
        .add_cookie(admin.cookie())
        .add_header(admin.csrf_name(), admin.csrf_value())
        .json(&body)
        .await
}

/// GET as staff
pub async fn admin_get(server: &TestServer, admin: &Admin, path: &str) -> axum_test::TestResponse {
    server.get(path).add_cookie(admin.cookie()).await
}

/// Publish a one-off slot and return its id
pub async fn publish_slot(
    server: &TestServer,
    admin: &Admin,
    date: &str,
    start: &str,
    end: &str,
) -> String {
    let response = admin_post(
        server,
        admin,
        "/api/admin/slots",
        json!({
            "specific_date": date,
            "start_time": start,
            "end_time": end,
        }),
    )
    .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    body["slot"]["id"].as_str().expect("No slot id").to_string()
}

/// A standard booking request body
pub fn booking_body(date: &str, start: &str, end: &str, method: &str) -> Value {
    json!({
        "date": date,
        "start_time": start,
        "end_time": end,
        "topic": "Career change",
        "customer_name": "Camille Durand",
        "email": "camille@example.com",
        "message": "Looking forward to it",
        "payment_method": method,
    })
}
