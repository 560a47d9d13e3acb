//! Bookings and their payment status

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::TimeWindow;
use crate::{Error, Result};

/// Payment status of a booking
///
/// `Pending` is the only state staff can move a booking out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Confirmed,
    Cancelled,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Whether a booking in this state occupies its time window
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Pending | PaymentStatus::Completed | PaymentStatus::Confirmed
        )
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (
                PaymentStatus::Pending,
                PaymentStatus::Completed
                    | PaymentStatus::Confirmed
                    | PaymentStatus::Cancelled
                    | PaymentStatus::Rejected
            )
        )
    }

    /// Validate a transition. Re-applying the current terminal status is a no-op.
    pub fn transition(self, next: PaymentStatus) -> Result<PaymentStatus> {
        if self == next && self.is_terminal() {
            return Ok(self);
        }
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "confirmed" => Ok(PaymentStatus::Confirmed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            "rejected" => Ok(PaymentStatus::Rejected),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

/// How the client pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Hosted payment session, booking persisted after the redirect round trip
    Card,
    /// Bank transfer, booking persisted as pending and confirmed by staff
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

/// A consultation booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub date: NaiveDate,
    #[serde(with = "crate::time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::time_format")]
    pub end_time: NaiveTime,
    pub topic: String,
    pub customer_name: String,
    pub email: String,
    pub message: Option<String>,
    pub payment_status: PaymentStatus,
    pub is_priority: bool,
    pub payment_method: PaymentMethod,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Option<String>,
    pub payment_session_id: Option<String>,
}

impl Booking {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Booking details submitted by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub date: NaiveDate,
    #[serde(with = "crate::time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::time_format")]
    pub end_time: NaiveTime,
    pub topic: String,
    pub customer_name: String,
    pub email: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<()> {
        if self.customer_name.trim().is_empty() {
            return Err(Error::MissingField("customer_name"));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(Error::MissingField("email"));
        }
        if self.topic.trim().is_empty() {
            return Err(Error::MissingField("topic"));
        }
        if self.start_time >= self.end_time {
            return Err(Error::InvalidTimeRange {
                start: crate::time_format::format_time(&self.start_time),
                end: crate::time_format::format_time(&self.end_time),
            });
        }
        Ok(())
    }

    /// Turn the request into a booking record
    pub fn into_booking(
        self,
        id: String,
        payment_method: PaymentMethod,
        amount_cents: i64,
        is_priority: bool,
        now: DateTime<Utc>,
    ) -> Booking {
        Booking {
            id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            topic: self.topic,
            customer_name: self.customer_name,
            email: self.email,
            message: self.message.filter(|m| !m.trim().is_empty()),
            payment_status: PaymentStatus::Pending,
            is_priority,
            payment_method,
            amount_cents,
            created_at: now,
            updated_at: now,
            user_id: None,
            payment_session_id: None,
        }
    }
}
