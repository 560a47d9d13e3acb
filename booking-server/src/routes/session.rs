//! Admin session endpoints and guards

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};

use crate::crypto::verify_password;
use crate::email::EmailSender;
use crate::error::ApiError;
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::{AdminSession, DataStore, SessionId, SessionStore};

pub const SESSION_COOKIE: &str = "admin_session";
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionResponse {
    fn authenticated(session: AdminSession) -> Self {
        Self {
            success: true,
            authenticated: true,
            csrf_token: Some(session.csrf_token),
            expires_at: Some(session.expires_at),
        }
    }

    fn anonymous() -> Self {
        Self {
            success: true,
            authenticated: false,
            csrf_token: None,
            expires_at: None,
        }
    }
}

/// POST /api/admin/login
pub async fn login<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    let valid = verify_password(&req.password, &state.settings.admin_password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if !valid {
        tracing::warn!("Rejected admin login");
        return Err(ApiError::InvalidCredentials);
    }

    let removed = state.session_store.cleanup_expired()?;
    if removed > 0 {
        tracing::debug!(removed, "Removed expired admin sessions");
    }

    let session = state.session_store.create(state.settings.session_ttl)?;
    set_session_cookie(&cookies, &session.id.0, state.settings.session_ttl);
    tracing::info!(expires_at = %session.expires_at, "Admin logged in");

    Ok(Json(SessionResponse::authenticated(session)))
}

/// POST /api/admin/logout
pub async fn logout<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
) -> Result<Json<SessionResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    if let Some(session) = get_session_from_cookies(&cookies, state.session_store.as_ref()) {
        state.session_store.delete(&session.id)?;
        tracing::info!("Admin logged out");
    }

    clear_session_cookie(&cookies);

    Ok(Json(SessionResponse::anonymous()))
}

/// GET /api/admin/session
pub async fn get_session<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
) -> Json<SessionResponse>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    match require_admin(&cookies, state.session_store.as_ref()) {
        Ok(session) => Json(SessionResponse::authenticated(session)),
        Err(_) => Json(SessionResponse::anonymous()),
    }
}

/// Helper to get the admin session named by the cookie, expired or not
pub fn get_session_from_cookies<S: SessionStore>(
    cookies: &Cookies,
    session_store: &S,
) -> Option<AdminSession> {
    cookies.get(SESSION_COOKIE).and_then(|c| {
        let session_id = SessionId(c.value().to_string());
        session_store.get(&session_id).ok().flatten()
    })
}

/// Require a live admin session
///
/// Expired sessions are deleted on sight.
pub fn require_admin<S: SessionStore>(
    cookies: &Cookies,
    session_store: &S,
) -> Result<AdminSession, ApiError> {
    let session_id = cookies
        .get(SESSION_COOKIE)
        .map(|c| SessionId(c.value().to_string()))
        .ok_or(ApiError::NotAuthenticated)?;

    let session = session_store
        .get(&session_id)?
        .ok_or(ApiError::NotAuthenticated)?;

    if session.is_expired(Utc::now()) {
        session_store.delete(&session.id)?;
        return Err(ApiError::SessionExpired);
    }

    Ok(session)
}

/// Require a live admin session and a matching CSRF header
pub fn require_admin_csrf<S: SessionStore>(
    cookies: &Cookies,
    headers: &HeaderMap,
    session_store: &S,
) -> Result<AdminSession, ApiError> {
    let session = require_admin(cookies, session_store)?;

    let token = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::InvalidCsrf)?;

    if token != session.csrf_token {
        return Err(ApiError::InvalidCsrf);
    }

    Ok(session)
}

/// Helper to set session cookie
pub fn set_session_cookie(cookies: &Cookies, session_id: &str, ttl: chrono::Duration) {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(tower_cookies::cookie::SameSite::Strict)
        .max_age(tower_cookies::cookie::time::Duration::seconds(ttl.num_seconds().max(0)))
        .build();
    cookies.add(cookie);
}

/// Helper to clear session cookie
pub fn clear_session_cookie(cookies: &Cookies) {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}
