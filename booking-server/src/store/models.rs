//! Records persisted alongside bookings, slots and applications

use booking_core::booking::BookingRequest;
use booking_core::PaymentStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A card booking waiting for its payment round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempBookingData {
    pub id: String,
    pub payment_session_id: String,
    pub request: BookingRequest,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// What a dashboard notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewBooking,
    PriorityBooking,
    BookingPaid,
    NewApplication,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewBooking => "new_booking",
            NotificationKind::PriorityBooking => "priority_booking",
            NotificationKind::BookingPaid => "booking_paid",
            NotificationKind::NewApplication => "new_application",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new_booking" => Some(NotificationKind::NewBooking),
            "priority_booking" => Some(NotificationKind::PriorityBooking),
            "booking_paid" => Some(NotificationKind::BookingPaid),
            "new_application" => Some(NotificationKind::NewApplication),
            _ => None,
        }
    }
}

/// An in-app notification for staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub booking_id: Option<String>,
    pub application_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Delivery state of an outbox email
///
/// `Pending` means a delivery attempt is in flight. Only `Failed` messages
/// are picked up again by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OutboxStatus::Pending),
            "sent" => Some(OutboxStatus::Sent),
            "failed" => Some(OutboxStatus::Failed),
            _ => None,
        }
    }
}

/// An email waiting to be delivered (or already delivered)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: String,
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub status: OutboxStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboxMessage {
    /// Whether the relay should try this message again
    pub fn is_due(&self, max_attempts: i64) -> bool {
        self.status == OutboxStatus::Failed && self.attempts < max_attempts
    }
}

/// Unique admin session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// An authenticated staff session
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub id: SessionId,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Filter for booking listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<PaymentStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &booking_core::Booking) -> bool {
        if let Some(status) = self.status {
            if booking.payment_status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if booking.date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if booking.date > to {
                return false;
            }
        }
        true
    }
}

