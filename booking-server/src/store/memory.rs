//! In-memory storage implementations

use std::collections::HashMap;
use std::sync::RwLock;

use booking_core::slot::SlotDraft;
use booking_core::{Application, ApplicationStatus, Booking, TimeSlot};
use chrono::{Duration, Utc};

use super::{
    AdminSession, ApplicationStore, BookingFilter, BookingStore, Notification, NotificationStore,
    OutboxMessage, OutboxStatus, SessionId, SessionStore, StoreResult, TempBookingData,
};
use crate::crypto::{generate_csrf_token, generate_id};
use crate::error::ApiError;

/// In-memory store for slots, bookings, applications and notifications
pub struct InMemoryStore {
    slots: RwLock<HashMap<String, TimeSlot>>,
    bookings: RwLock<HashMap<String, Booking>>,
    temp_bookings: RwLock<HashMap<String, TempBookingData>>,
    applications: RwLock<HashMap<String, Application>>,
    notifications: RwLock<Vec<Notification>>,
    outbox: RwLock<Vec<OutboxMessage>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            bookings: RwLock::new(HashMap::new()),
            temp_bookings: RwLock::new(HashMap::new()),
            applications: RwLock::new(HashMap::new()),
            notifications: RwLock::new(Vec::new()),
            outbox: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore for InMemoryStore {
    fn list_slots(&self) -> StoreResult<Vec<TimeSlot>> {
        let mut slots: Vec<TimeSlot> = self.slots.read().unwrap().values().cloned().collect();
        slots.sort_by(|a, b| {
            (a.specific_date, a.day_of_week, a.start_time)
                .cmp(&(b.specific_date, b.day_of_week, b.start_time))
        });
        Ok(slots)
    }

    fn get_slot(&self, id: &str) -> StoreResult<Option<TimeSlot>> {
        Ok(self.slots.read().unwrap().get(id).cloned())
    }

    fn create_slot(&self, draft: SlotDraft) -> StoreResult<TimeSlot> {
        let slot = draft.into_slot(generate_id())?;
        self.slots
            .write()
            .unwrap()
            .insert(slot.id.clone(), slot.clone());
        Ok(slot)
    }

    fn update_slot(&self, slot: &TimeSlot) -> StoreResult<()> {
        let mut slots = self.slots.write().unwrap();
        match slots.get_mut(&slot.id) {
            Some(existing) => {
                *existing = slot.clone();
                Ok(())
            }
            None => Err(ApiError::SlotNotFound),
        }
    }

    fn delete_slot(&self, id: &str) -> StoreResult<()> {
        self.slots
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or(ApiError::SlotNotFound)
    }

    fn create_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut bookings = self.bookings.write().unwrap();
        if let Some(session_id) = &booking.payment_session_id {
            if bookings
                .values()
                .any(|b| b.payment_session_id.as_ref() == Some(session_id))
            {
                return Err(ApiError::SlotAlreadyBooked);
            }
        }
        if booking.payment_status.holds_slot() {
            let taken = bookings.values().any(|b| {
                b.payment_status.holds_slot()
                    && b.date == booking.date
                    && b.start_time == booking.start_time
            });
            if taken {
                return Err(ApiError::SlotAlreadyBooked);
            }
        }
        bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    fn get_booking(&self, id: &str) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.read().unwrap().get(id).cloned())
    }

    fn get_booking_by_payment_session(&self, session_id: &str) -> StoreResult<Option<Booking>> {
        Ok(self
            .bookings
            .read()
            .unwrap()
            .values()
            .find(|b| b.payment_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .read()
            .unwrap()
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        Ok(bookings)
    }

    fn update_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut bookings = self.bookings.write().unwrap();
        match bookings.get_mut(&booking.id) {
            Some(existing) => {
                *existing = booking.clone();
                Ok(())
            }
            None => Err(ApiError::BookingNotFound),
        }
    }

    fn create_temp_booking(&self, data: TempBookingData) -> StoreResult<()> {
        self.temp_bookings
            .write()
            .unwrap()
            .insert(data.id.clone(), data);
        Ok(())
    }

    fn get_temp_booking(&self, payment_session_id: &str) -> StoreResult<Option<TempBookingData>> {
        Ok(self
            .temp_bookings
            .read()
            .unwrap()
            .values()
            .find(|t| t.payment_session_id == payment_session_id)
            .cloned())
    }

    fn delete_temp_booking(&self, id: &str) -> StoreResult<()> {
        self.temp_bookings.write().unwrap().remove(id);
        Ok(())
    }
}

impl ApplicationStore for InMemoryStore {
    fn create_application(&self, application: &Application) -> StoreResult<()> {
        self.applications
            .write()
            .unwrap()
            .insert(application.id.clone(), application.clone());
        Ok(())
    }

    fn get_application(&self, id: &str) -> StoreResult<Option<Application>> {
        Ok(self.applications.read().unwrap().get(id).cloned())
    }

    fn list_applications(&self, status: Option<ApplicationStatus>) -> StoreResult<Vec<Application>> {
        let mut applications: Vec<Application> = self
            .applications
            .read()
            .unwrap()
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    fn update_application(&self, application: &Application) -> StoreResult<()> {
        let mut applications = self.applications.write().unwrap();
        match applications.get_mut(&application.id) {
            Some(existing) => {
                *existing = application.clone();
                Ok(())
            }
            None => Err(ApiError::ApplicationNotFound),
        }
    }
}

impl NotificationStore for InMemoryStore {
    fn create_notification(&self, notification: Notification) -> StoreResult<()> {
        self.notifications.write().unwrap().push(notification);
        Ok(())
    }

    fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>> {
        let notifications = self.notifications.read().unwrap();
        Ok(notifications
            .iter()
            .rev()
            .filter(|n| !unread_only || !n.is_read)
            .cloned()
            .collect())
    }

    fn mark_notification_read(&self, id: &str) -> StoreResult<()> {
        let mut notifications = self.notifications.write().unwrap();
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(ApiError::NotificationNotFound)?;
        notification.is_read = true;
        Ok(())
    }

    fn enqueue_email(&self, message: &OutboxMessage) -> StoreResult<()> {
        self.outbox.write().unwrap().push(message.clone());
        Ok(())
    }

    fn update_outbox(&self, message: &OutboxMessage) -> StoreResult<()> {
        let mut outbox = self.outbox.write().unwrap();
        let existing = outbox
            .iter_mut()
            .find(|m| m.id == message.id)
            .ok_or(ApiError::OutboxMessageNotFound)?;
        *existing = message.clone();
        Ok(())
    }

    fn list_outbox(&self, status: Option<OutboxStatus>) -> StoreResult<Vec<OutboxMessage>> {
        Ok(self
            .outbox
            .read()
            .unwrap()
            .iter()
            .filter(|m| status.map_or(true, |s| m.status == s))
            .cloned()
            .collect())
    }

    fn due_outbox(&self, max_attempts: i64) -> StoreResult<Vec<OutboxMessage>> {
        Ok(self
            .outbox
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.is_due(max_attempts))
            .cloned()
            .collect())
    }

    fn claim_outbox(&self, id: &str, max_attempts: i64) -> StoreResult<bool> {
        let mut outbox = self.outbox.write().unwrap();
        match outbox.iter_mut().find(|m| m.id == id) {
            Some(message) if message.is_due(max_attempts) => {
                message.status = OutboxStatus::Pending;
                message.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory admin session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, AdminSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, ttl: Duration) -> StoreResult<AdminSession> {
        let now = Utc::now();
        let session = AdminSession {
            id: SessionId(generate_id()),
            csrf_token: generate_csrf_token(),
            created_at: now,
            expires_at: now + ttl,
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<AdminSession>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(session_id);
        Ok(())
    }

    fn cleanup_expired(&self) -> StoreResult<u64> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}
