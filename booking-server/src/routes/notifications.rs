//! Staff notifications and the email outbox

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::session::{require_admin, require_admin_csrf};
use crate::crypto::generate_id;
use crate::email::EmailSender;
use crate::error::ApiError;
use crate::outbox::{self, RelayReport};
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::{
    DataStore, Notification, NotificationKind, NotificationStore, OutboxMessage, OutboxStatus,
    SessionStore,
};

#[derive(Deserialize)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Deserialize)]
pub struct OutboxQuery {
    pub status: Option<OutboxStatus>,
}

#[derive(Serialize)]
pub struct NotificationsResponse {
    pub success: bool,
    pub unread_count: usize,
    pub notifications: Vec<Notification>,
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct OutboxResponse {
    pub success: bool,
    pub messages: Vec<OutboxMessage>,
}

#[derive(Serialize)]
pub struct FlushResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: RelayReport,
}

/// Record a dashboard notification
///
/// Failures are logged and reported as a warning, never as an error.
pub(crate) fn record_notification<D: NotificationStore + ?Sized>(
    store: &D,
    kind: NotificationKind,
    title: &str,
    message: String,
    booking_id: Option<String>,
    application_id: Option<String>,
) -> Option<String> {
    let notification = Notification {
        id: generate_id(),
        kind,
        title: title.to_string(),
        message,
        booking_id,
        application_id,
        is_read: false,
        created_at: Utc::now(),
    };

    match store.create_notification(notification) {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(kind = kind.as_str(), error = %e, "Failed to record notification");
            Some("Staff notification could not be recorded".to_string())
        }
    }
}

/// Join optional warnings into one
pub(crate) fn join_warnings<I>(warnings: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let warnings: Vec<String> = warnings.into_iter().flatten().collect();
    if warnings.is_empty() {
        None
    } else {
        Some(warnings.join("; "))
    }
}

/// GET /api/admin/notifications?unread=true
pub async fn list_notifications<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<NotificationsResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    let notifications = state.store.list_notifications(query.unread)?;
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();

    Ok(Json(NotificationsResponse {
        success: true,
        unread_count,
        notifications,
    }))
}

/// POST /api/admin/notifications/:id/read
pub async fn mark_notification_read<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<MarkReadResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    state.store.mark_notification_read(&id)?;

    Ok(Json(MarkReadResponse { success: true }))
}

/// GET /api/admin/outbox?status=failed
pub async fn list_outbox<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Query(query): Query<OutboxQuery>,
) -> Result<Json<OutboxResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    Ok(Json(OutboxResponse {
        success: true,
        messages: state.store.list_outbox(query.status)?,
    }))
}

/// POST /api/admin/outbox/flush - run one relay pass now
pub async fn flush_outbox<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
) -> Result<Json<FlushResponse>, ApiError>
where
    D: DataStore + 'static,
    S: SessionStore + 'static,
    E: EmailSender + 'static,
    P: PaymentGateway + 'static,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    let store = state.store.clone();
    let sender = state.email_sender.clone();
    let max_attempts = state.settings.outbox_max_attempts;
    let report = tokio::task::spawn_blocking(move || {
        outbox::relay_due(store.as_ref(), sender.as_ref(), max_attempts)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?;

    tracing::info!(
        attempted = report.attempted,
        sent = report.sent,
        failed = report.failed,
        "Manual outbox flush"
    );

    Ok(Json(FlushResponse {
        success: true,
        report,
    }))
}
