//! Hosted payment sessions

pub mod console;
pub mod http;

pub use console::ConsolePaymentGateway;
pub use http::HttpPaymentGateway;

use booking_core::booking::BookingRequest;
use serde::{Deserialize, Serialize};

/// Placeholder the gateway replaces with its session id in `success_url`
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// What the client is about to pay for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub booking: BookingRequest,
    pub amount_cents: i64,
    pub is_priority: bool,
    /// Return URL; contains [`SESSION_ID_PLACEHOLDER`]
    pub success_url: String,
    pub cancel_url: String,
}

/// A created payment session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    #[serde(alias = "sessionId")]
    pub session_id: String,
    #[serde(alias = "url")]
    pub redirect_url: String,
}

/// Trait for creating hosted payment sessions
///
/// Implementations may block; handlers call them from a blocking task.
pub trait PaymentGateway: Send + Sync {
    fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, String>;
}

/// Allow using Box<dyn PaymentGateway> as a PaymentGateway
impl PaymentGateway for Box<dyn PaymentGateway> {
    fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, String> {
        (**self).create_session(request)
    }
}
