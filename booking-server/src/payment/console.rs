//! Development payment gateway

use super::{CheckoutRequest, CheckoutSession, PaymentGateway, SESSION_ID_PLACEHOLDER};

/// Gateway that approves everything and sends the client straight back
/// to the success URL
pub struct ConsolePaymentGateway;

impl ConsolePaymentGateway {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsolePaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentGateway for ConsolePaymentGateway {
    fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, String> {
        let session_id = format!("cs_dev_{}", uuid::Uuid::new_v4().simple());
        let redirect_url = request.success_url.replace(SESSION_ID_PLACEHOLDER, &session_id);

        tracing::info!(
            session_id = %session_id,
            amount_cents = request.amount_cents,
            email = %request.booking.email,
            "Payment session created (console)"
        );

        Ok(CheckoutSession {
            session_id,
            redirect_url,
        })
    }
}
