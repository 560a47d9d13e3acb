//! Email sending abstractions

pub mod console;
pub mod smtp;
pub mod templates;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// A rendered email, ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Trait for delivering notification emails
pub trait EmailSender: Send + Sync {
    /// Deliver one message; the error is a human-readable reason
    fn send(&self, message: &EmailMessage) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send(&self, message: &EmailMessage) -> Result<(), String> {
        (**self).send(message)
    }
}
