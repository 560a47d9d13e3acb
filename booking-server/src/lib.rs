//! Booking service
//!
//! HTTP backend for a consulting practice: published slots, standard and
//! priority bookings with hosted card payments, staff administration and
//! the political launch coaching program.

pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod outbox;
pub mod payment;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use email::{ConsoleEmailSender, EmailMessage, EmailSender, SmtpConfig, SmtpEmailSender};
pub use error::ApiError;
pub use payment::{ConsolePaymentGateway, HttpPaymentGateway, PaymentGateway};
pub use state::{AppState, Settings};
pub use store::{
    DataStore, InMemorySessionStore, InMemoryStore, NotificationStore, SessionStore, SqliteStore,
};
