//! Payment gateway backed by a remote payment-session function

use std::time::Duration;

use reqwest::blocking::Client;

use super::{CheckoutRequest, CheckoutSession, PaymentGateway};

/// POSTs the checkout request as JSON and expects `{session_id, url}` back
pub struct HttpPaymentGateway {
    client: Client,
    endpoint: String,
}

impl HttpPaymentGateway {
    pub fn new(endpoint: String) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, endpoint })
    }
}

impl PaymentGateway for HttpPaymentGateway {
    fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|e| format!("Payment function request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Payment function error: {}", response.status()));
        }

        let session: CheckoutSession = response
            .json()
            .map_err(|e| format!("Invalid payment function response: {}", e))?;

        tracing::info!(session_id = %session.session_id, "Payment session created");
        Ok(session)
    }
}
