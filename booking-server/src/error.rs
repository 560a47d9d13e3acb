//! Service error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Time slot not found")]
    SlotNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Booking data not found")]
    BookingDataNotFound,

    #[error("Application not found")]
    ApplicationNotFound,

    #[error("Notification not found")]
    NotificationNotFound,

    #[error("Outbox message not found")]
    OutboxMessageNotFound,

    #[error("This time slot is already booked")]
    SlotAlreadyBooked,

    #[error("This time slot is not available")]
    SlotUnavailable,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid CSRF token")]
    InvalidCsrf,

    #[error("{0}")]
    Domain(#[from] booking_core::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Payment session failed: {0}")]
    PaymentGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::SlotNotFound
            | ApiError::BookingNotFound
            | ApiError::ApplicationNotFound
            | ApiError::NotificationNotFound
            | ApiError::OutboxMessageNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::BookingDataNotFound => {
                tracing::warn!("Payment return without stored booking data");
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::SlotAlreadyBooked | ApiError::SlotUnavailable => {
                (StatusCode::CONFLICT, self.to_string())
            }
            ApiError::NotAuthenticated | ApiError::SessionExpired => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::InvalidCsrf => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Domain(err) => {
                let status = match err {
                    booking_core::Error::InvalidTransition { .. } => StatusCode::CONFLICT,
                    booking_core::Error::SessionNotFound { .. } => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, err.to_string())
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::PaymentGateway(msg) => {
                tracing::error!("Payment gateway error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Payment session could not be created".to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}
