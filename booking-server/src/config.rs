//! Service configuration

use std::fmt;

use crate::crypto::{generate_password, hash_password};

#[derive(Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// SQLite database file; in-memory storage when unset
    pub database_path: Option<String>,

    /// bcrypt hash of the staff password
    pub admin_password_hash: Option<String>,

    /// Plain staff password, hashed at startup when no hash is given
    pub admin_password: Option<String>,

    /// Lifetime of an admin session
    pub session_ttl_minutes: i64,

    /// Address that receives staff notifications
    pub staff_email: Option<String>,

    /// Public base URL, used for payment return links
    pub public_url: String,

    /// Price of a standard consultation, in cents
    pub standard_price_cents: i64,

    /// Price of a priority consultation, in cents
    pub priority_price_cents: i64,

    /// Payment-session function endpoint; console gateway when unset
    pub payment_function_url: Option<String>,

    /// Seconds between outbox relay passes
    pub outbox_interval_secs: u64,

    /// Delivery attempts before an email stays failed
    pub outbox_max_attempts: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_path: None,
            admin_password_hash: None,
            admin_password: None,
            session_ttl_minutes: 720,
            staff_email: None,
            public_url: "http://localhost:3000".to_string(),
            standard_price_cents: 9000,
            priority_price_cents: 15000,
            payment_function_url: None,
            outbox_interval_secs: 60,
            outbox_max_attempts: 5,
        }
    }
}

// Secrets stay out of the logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("admin_password_hash", &self.admin_password_hash.as_ref().map(|_| "<set>"))
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<set>"))
            .field("session_ttl_minutes", &self.session_ttl_minutes)
            .field("staff_email", &self.staff_email)
            .field("public_url", &self.public_url)
            .field("standard_price_cents", &self.standard_price_cents)
            .field("priority_price_cents", &self.priority_price_cents)
            .field("payment_function_url", &self.payment_function_url)
            .field("outbox_interval_secs", &self.outbox_interval_secs)
            .field("outbox_max_attempts", &self.outbox_max_attempts)
            .finish()
    }
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match get_env(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parse_env("PORT", defaults.port),
            database_path: get_env("DATABASE_PATH"),
            admin_password_hash: get_env("ADMIN_PASSWORD_HASH"),
            admin_password: get_env("ADMIN_PASSWORD"),
            session_ttl_minutes: parse_env("SESSION_TTL_MINUTES", defaults.session_ttl_minutes),
            staff_email: get_env("STAFF_EMAIL"),
            public_url: get_env("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url),
            standard_price_cents: parse_env("STANDARD_PRICE_CENTS", defaults.standard_price_cents),
            priority_price_cents: parse_env("PRIORITY_PRICE_CENTS", defaults.priority_price_cents),
            payment_function_url: get_env("PAYMENT_FUNCTION_URL"),
            outbox_interval_secs: parse_env("OUTBOX_INTERVAL_SECS", defaults.outbox_interval_secs),
            outbox_max_attempts: parse_env("OUTBOX_MAX_ATTEMPTS", defaults.outbox_max_attempts),
        }
    }

    /// The bcrypt hash staff log in against
    ///
    /// Uses `ADMIN_PASSWORD_HASH` as is, hashes `ADMIN_PASSWORD`, or
    /// generates a one-off password and logs it when neither is set.
    pub fn resolve_admin_password_hash(&self) -> Result<String, bcrypt::BcryptError> {
        if let Some(hash) = &self.admin_password_hash {
            return Ok(hash.clone());
        }
        if let Some(password) = &self.admin_password {
            return hash_password(password);
        }

        let password = generate_password();
        tracing::warn!(
            password = %password,
            "No admin password configured, generated one for this run"
        );
        hash_password(&password)
    }
}
