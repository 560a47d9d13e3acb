//! Political launch applications and their session programs

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use booking_core::application::ApplicationForm;
use booking_core::{
    Application, ApplicationStatus, ProgramProgress, ProposedSchedule, SessionCollection,
};
use chrono::{Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::notifications::{join_warnings, record_notification};
use super::session::{require_admin, require_admin_csrf};
use crate::crypto::generate_id;
use crate::email::{templates, EmailSender};
use crate::error::ApiError;
use crate::outbox;
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::{DataStore, NotificationKind, SessionStore};

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<ApplicationStatus>,
}

#[derive(Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

/// Draft parameters for a generated program
#[derive(Deserialize)]
pub struct DraftRequest {
    pub first_date: NaiveDate,
    #[serde(with = "booking_core::time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "booking_core::time_format")]
    pub end_time: NaiveTime,
}

/// Either an explicit schedule or draft parameters
#[derive(Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub schedule: Option<ProposedSchedule>,
    #[serde(default)]
    pub draft: Option<DraftRequest>,
}

#[derive(Deserialize)]
pub struct PaymentLinkRequest {
    #[serde(default)]
    pub payment_link: String,
}

#[derive(Deserialize)]
pub struct SessionUpdateRequest {
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ProgressQuery {
    pub today: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct ApplicationResponse {
    pub success: bool,
    pub application: Application,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Serialize)]
pub struct ApplicationsResponse {
    pub success: bool,
    pub applications: Vec<Application>,
}

#[derive(Serialize)]
pub struct ProgressResponse {
    pub success: bool,
    pub application_id: String,
    #[serde(flatten)]
    pub progress: ProgramProgress,
}

/// POST /api/applications
pub async fn submit_application<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    Json(form): Json<ApplicationForm>,
) -> Result<Json<ApplicationResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    let application = Application::submit(generate_id(), form, Utc::now())?;
    state.store.create_application(&application)?;
    tracing::info!(application_id = %application.id, "Application submitted");

    let notification_warning = record_notification(
        state.store.as_ref(),
        NotificationKind::NewApplication,
        "Nouvelle candidature",
        format!("{} ({})", application.full_name(), application.form.city),
        None,
        Some(application.id.clone()),
    );

    let mut emails = vec![templates::application_received(&application)];
    if let Some(staff) = state.settings.staff_email.as_deref() {
        emails.push(templates::staff_application_alert(&application, staff));
    }
    let email_warning =
        outbox::dispatch_all(state.store.as_ref(), state.email_sender.as_ref(), emails);

    Ok(Json(ApplicationResponse {
        success: true,
        application,
        warning: join_warnings([notification_warning, email_warning]),
    }))
}

/// GET /api/admin/applications?status=
pub async fn list_applications<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApplicationsResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    Ok(Json(ApplicationsResponse {
        success: true,
        applications: state.store.list_applications(query.status)?,
    }))
}

/// GET /api/admin/applications/:id
pub async fn get_application<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Path(id): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    let application = state
        .store
        .get_application(&id)?
        .ok_or(ApiError::ApplicationNotFound)?;

    Ok(Json(ApplicationResponse {
        success: true,
        application,
        warning: None,
    }))
}

/// Load, change, persist, then tell the applicant
fn apply_change<D, E, F>(
    store: &D,
    sender: &E,
    id: &str,
    change: F,
) -> Result<ApplicationResponse, ApiError>
where
    D: DataStore + ?Sized,
    E: EmailSender + ?Sized,
    F: FnOnce(&mut Application) -> booking_core::Result<()>,
{
    let mut application = store
        .get_application(id)?
        .ok_or(ApiError::ApplicationNotFound)?;
    let previous = application.status;

    change(&mut application)?;
    store.update_application(&application)?;
    tracing::info!(
        application_id = %application.id,
        from = %previous,
        to = %application.status,
        "Application updated"
    );

    let warning = templates::application_update(&application)
        .and_then(|email| outbox::dispatch(store, sender, email));

    Ok(ApplicationResponse {
        success: true,
        application,
        warning,
    })
}

/// POST /api/admin/applications/:id/approve
pub async fn approve_application<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    apply_change(
        state.store.as_ref(),
        state.email_sender.as_ref(),
        &id,
        |app| app.approve(Utc::now()),
    )
    .map(Json)
}

/// POST /api/admin/applications/:id/reject
pub async fn reject_application<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<ApplicationResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    apply_change(
        state.store.as_ref(),
        state.email_sender.as_ref(),
        &id,
        |app| app.reject(&req.reason, Utc::now()),
    )
    .map(Json)
}

/// POST /api/admin/applications/:id/schedule
///
/// Takes an explicit schedule, or draft parameters from which the default
/// program shape is generated.
pub async fn propose_schedule<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ApplicationResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    let shape = state.settings.program_shape;
    let schedule = match (req.schedule, req.draft) {
        (Some(schedule), _) => schedule,
        (None, Some(draft)) => shape.draft(draft.first_date, draft.start_time, draft.end_time)?,
        (None, None) => {
            return Err(ApiError::ValidationError(
                "Either schedule or draft is required".to_string(),
            ))
        }
    };

    apply_change(
        state.store.as_ref(),
        state.email_sender.as_ref(),
        &id,
        |app| app.propose_schedule(schedule, &shape, Utc::now()),
    )
    .map(Json)
}

/// POST /api/admin/applications/:id/validate
pub async fn validate_schedule<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    apply_change(
        state.store.as_ref(),
        state.email_sender.as_ref(),
        &id,
        |app| app.validate_schedule(Utc::now()),
    )
    .map(Json)
}

/// POST /api/admin/applications/:id/payment-link
pub async fn send_payment_link<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<PaymentLinkRequest>,
) -> Result<Json<ApplicationResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    apply_change(
        state.store.as_ref(),
        state.email_sender.as_ref(),
        &id,
        |app| app.send_payment_link(&req.payment_link, Utc::now()),
    )
    .map(Json)
}

/// POST /api/admin/applications/:id/paid
pub async fn mark_paid<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApplicationResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    apply_change(
        state.store.as_ref(),
        state.email_sender.as_ref(),
        &id,
        |app| app.mark_paid(Utc::now()),
    )
    .map(Json)
}

/// POST /api/admin/applications/:id/sessions/:collection/:index
///
/// Marks one session done or not done and writes the whole program back.
pub async fn update_session<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path((id, collection, index)): Path<(String, String, usize)>,
    Json(req): Json<SessionUpdateRequest>,
) -> Result<Json<ApplicationResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    let collection: SessionCollection = collection.parse()?;
    let mut application = state
        .store
        .get_application(&id)?
        .ok_or(ApiError::ApplicationNotFound)?;

    application
        .schedule_mut()?
        .set_completed(collection, index, req.completed, req.notes)?;
    application.updated_at = Utc::now();
    state.store.update_application(&application)?;

    tracing::info!(
        application_id = %application.id,
        collection = %collection,
        index,
        completed = req.completed,
        "Session updated"
    );

    Ok(Json(ApplicationResponse {
        success: true,
        application,
        warning: None,
    }))
}

/// GET /api/admin/applications/:id/progress?today=YYYY-MM-DD
pub async fn get_progress<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    Path(id): Path<String>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    let application = state
        .store
        .get_application(&id)?
        .ok_or(ApiError::ApplicationNotFound)?;
    let schedule = application
        .proposed_schedule
        .as_ref()
        .ok_or(booking_core::Error::NoSchedule)?;
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());

    Ok(Json(ProgressResponse {
        success: true,
        application_id: application.id.clone(),
        progress: schedule.progress(today),
    }))
}
