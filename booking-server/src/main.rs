//! Booking service entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_server::{
    outbox, routes, AppState, Config, ConsoleEmailSender, ConsolePaymentGateway, DataStore,
    EmailSender, HttpPaymentGateway, InMemorySessionStore, InMemoryStore, PaymentGateway,
    SessionStore, Settings, SmtpConfig, SmtpEmailSender, SqliteStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booking_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    let settings = Settings::from_config(&config, config.resolve_admin_password_hash()?);

    let email_sender: Box<dyn EmailSender> = match SmtpConfig::from_env() {
        Some(smtp) => Box::new(SmtpEmailSender::new(smtp).map_err(anyhow::Error::msg)?),
        None => {
            tracing::warn!("SMTP not configured, emails will be printed to the console");
            Box::new(ConsoleEmailSender::new())
        }
    };

    let payments: Box<dyn PaymentGateway> = match &config.payment_function_url {
        Some(url) => Box::new(HttpPaymentGateway::new(url.clone()).map_err(anyhow::Error::msg)?),
        None => {
            tracing::warn!("PAYMENT_FUNCTION_URL not set, card payments succeed immediately");
            Box::new(ConsolePaymentGateway::new())
        }
    };

    match &config.database_path {
        Some(path) => {
            let db = Arc::new(SqliteStore::open(path)?);
            tracing::info!(path = %path, "Using SQLite storage");
            serve(&config, db.clone(), db, email_sender, payments, settings).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, data lives in memory only");
            serve(
                &config,
                InMemoryStore::new(),
                InMemorySessionStore::new(),
                email_sender,
                payments,
                settings,
            )
            .await
        }
    }
}

async fn serve<D, S>(
    config: &Config,
    store: D,
    session_store: S,
    email_sender: Box<dyn EmailSender>,
    payments: Box<dyn PaymentGateway>,
    settings: Settings,
) -> Result<()>
where
    D: DataStore + 'static,
    S: SessionStore + 'static,
{
    let state = Arc::new(AppState::new(
        store,
        session_store,
        email_sender,
        payments,
        settings,
    ));

    tokio::spawn(outbox::run_relay(
        state.store.clone(),
        state.email_sender.clone(),
        Duration::from_secs(config.outbox_interval_secs.max(1)),
        config.outbox_max_attempts,
    ));

    let app = routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Booking service listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
