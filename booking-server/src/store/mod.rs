//! Storage abstractions for the booking service

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::{InMemorySessionStore, InMemoryStore};
pub use models::*;
pub use sqlite::SqliteStore;

use booking_core::slot::SlotDraft;
use booking_core::{Application, ApplicationStatus, Booking, TimeSlot};
use chrono::Duration;

use crate::error::ApiError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ApiError>;

/// Trait for time slots, bookings and pending card bookings
pub trait BookingStore: Send + Sync {
    /// List every slot, ordered by start time
    fn list_slots(&self) -> StoreResult<Vec<TimeSlot>>;

    /// Get a slot by ID
    fn get_slot(&self, id: &str) -> StoreResult<Option<TimeSlot>>;

    /// Create a slot from validated fields
    fn create_slot(&self, draft: SlotDraft) -> StoreResult<TimeSlot>;

    /// Overwrite a slot
    fn update_slot(&self, slot: &TimeSlot) -> StoreResult<()>;

    /// Delete a slot
    fn delete_slot(&self, id: &str) -> StoreResult<()>;

    /// Insert a booking
    ///
    /// Fails with `SlotAlreadyBooked` when another slot-holding booking
    /// starts at the same date and time.
    fn create_booking(&self, booking: &Booking) -> StoreResult<()>;

    /// Get a booking by ID
    fn get_booking(&self, id: &str) -> StoreResult<Option<Booking>>;

    /// Get the booking created from a payment session
    fn get_booking_by_payment_session(&self, session_id: &str) -> StoreResult<Option<Booking>>;

    /// List bookings matching a filter, ordered by date then start time
    fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;

    /// Overwrite a booking
    fn update_booking(&self, booking: &Booking) -> StoreResult<()>;

    /// Store the payload of a card booking awaiting payment
    fn create_temp_booking(&self, data: TempBookingData) -> StoreResult<()>;

    /// Look up a pending card booking by payment session
    fn get_temp_booking(&self, payment_session_id: &str) -> StoreResult<Option<TempBookingData>>;

    /// Delete a pending card booking
    fn delete_temp_booking(&self, id: &str) -> StoreResult<()>;
}

/// Trait for political launch applications
pub trait ApplicationStore: Send + Sync {
    fn create_application(&self, application: &Application) -> StoreResult<()>;

    fn get_application(&self, id: &str) -> StoreResult<Option<Application>>;

    /// List applications, newest first
    fn list_applications(&self, status: Option<ApplicationStatus>) -> StoreResult<Vec<Application>>;

    /// Overwrite an application, including its whole proposed schedule
    fn update_application(&self, application: &Application) -> StoreResult<()>;
}

/// Trait for staff notifications and the email outbox
pub trait NotificationStore: Send + Sync {
    fn create_notification(&self, notification: Notification) -> StoreResult<()>;

    /// List notifications, newest first
    fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>>;

    fn mark_notification_read(&self, id: &str) -> StoreResult<()>;

    /// Record an email to deliver
    fn enqueue_email(&self, message: &OutboxMessage) -> StoreResult<()>;

    /// Overwrite an outbox message (status, attempts, last error)
    fn update_outbox(&self, message: &OutboxMessage) -> StoreResult<()>;

    /// List outbox messages, oldest first
    fn list_outbox(&self, status: Option<OutboxStatus>) -> StoreResult<Vec<OutboxMessage>>;

    /// Failed messages with fewer than `max_attempts` attempts, oldest first
    fn due_outbox(&self, max_attempts: i64) -> StoreResult<Vec<OutboxMessage>>;

    /// Move a due message back to `pending` for one delivery attempt
    ///
    /// Returns false when the message is no longer due, e.g. another relay
    /// pass claimed it first.
    fn claim_outbox(&self, id: &str, max_attempts: i64) -> StoreResult<bool>;
}

/// Everything the request handlers need from persistence
pub trait DataStore: BookingStore + ApplicationStore + NotificationStore {}

impl<T: BookingStore + ApplicationStore + NotificationStore> DataStore for T {}

/// Trait for admin session storage
pub trait SessionStore: Send + Sync {
    /// Create a new session valid for `ttl`
    fn create(&self, ttl: Duration) -> StoreResult<AdminSession>;

    /// Get a session by ID (expired sessions included)
    fn get(&self, session_id: &SessionId) -> StoreResult<Option<AdminSession>>;

    /// Delete a session
    fn delete(&self, session_id: &SessionId) -> StoreResult<()>;

    /// Delete expired sessions
    fn cleanup_expired(&self) -> StoreResult<u64>;
}
