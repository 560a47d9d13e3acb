//! Error types for the booking core

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid time range: start {start} must precede end {end}")]
    InvalidTimeRange { start: String, end: String },

    #[error("Invalid day of week: {0} (expected 0-6)")]
    InvalidDayOfWeek(u8),

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("Priority bookings need at least 48 hours of notice (earliest date is {earliest})")]
    LeadTimeTooShort { earliest: NaiveDate },

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("A rejection reason is required")]
    MissingRejectionReason,

    #[error("A payment link is required")]
    MissingPaymentLink,

    #[error("Proposed schedule is empty")]
    EmptySchedule,

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("No schedule has been proposed")]
    NoSchedule,

    #[error("Session {index} not found in {collection} sessions")]
    SessionNotFound { collection: String, index: usize },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
