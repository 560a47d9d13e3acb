//! Shared application state

use std::sync::Arc;

use booking_core::{OccupancyPolicy, PriorityRule, ProgramShape};
use chrono::Duration;

use crate::config::Config;
use crate::email::EmailSender;
use crate::payment::PaymentGateway;
use crate::store::{DataStore, SessionStore};

/// Business settings the handlers read
#[derive(Debug, Clone)]
pub struct Settings {
    pub admin_password_hash: String,
    pub session_ttl: Duration,
    pub staff_email: Option<String>,
    pub public_url: String,
    pub standard_price_cents: i64,
    pub priority_price_cents: i64,
    pub occupancy: OccupancyPolicy,
    pub program_shape: ProgramShape,
    pub priority_rule: PriorityRule,
    pub outbox_max_attempts: i64,
}

impl Settings {
    pub fn from_config(config: &Config, admin_password_hash: String) -> Self {
        Self {
            admin_password_hash,
            session_ttl: Duration::minutes(config.session_ttl_minutes),
            staff_email: config.staff_email.clone(),
            public_url: config.public_url.clone(),
            standard_price_cents: config.standard_price_cents,
            priority_price_cents: config.priority_price_cents,
            occupancy: OccupancyPolicy::default(),
            program_shape: ProgramShape::default(),
            priority_rule: PriorityRule::default(),
            outbox_max_attempts: config.outbox_max_attempts,
        }
    }
}

/// Application state shared across handlers
pub struct AppState<D, S, E, P>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    pub store: Arc<D>,
    pub session_store: Arc<S>,
    pub email_sender: Arc<E>,
    pub payments: Arc<P>,
    pub settings: Settings,
}

impl<D, S, E, P> AppState<D, S, E, P>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    pub fn new(store: D, session_store: S, email_sender: E, payments: P, settings: Settings) -> Self {
        Self {
            store: Arc::new(store),
            session_store: Arc::new(session_store),
            email_sender: Arc::new(email_sender),
            payments: Arc::new(payments),
            settings,
        }
    }
}
