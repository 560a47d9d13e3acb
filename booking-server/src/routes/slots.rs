//! Admin time slot management

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use booking_core::slot::{bulk_drafts, SlotDraft};
use booking_core::TimeSlot;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::session::{require_admin, require_admin_csrf};
use crate::email::EmailSender;
use crate::error::ApiError;
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::{DataStore, SessionStore};

/// Upper bound on slots created by one bulk request
const MAX_BULK_SLOTS: usize = 500;

#[derive(Deserialize)]
pub struct BulkSlotsRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Days to fill, 0 = Sunday
    pub weekdays: Vec<u8>,
    #[serde(with = "booking_core::time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "booking_core::time_format")]
    pub end_time: NaiveTime,
}

#[derive(Serialize)]
pub struct SlotResponse {
    pub success: bool,
    pub slot: TimeSlot,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub success: bool,
    pub slots: Vec<TimeSlot>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// GET /api/admin/slots
pub async fn list_slots<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
) -> Result<Json<SlotsResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin(&cookies, state.session_store.as_ref())?;

    Ok(Json(SlotsResponse {
        success: true,
        slots: state.store.list_slots()?,
    }))
}

/// POST /api/admin/slots
pub async fn create_slot<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Json(draft): Json<SlotDraft>,
) -> Result<Json<SlotResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    let slot = state.store.create_slot(draft)?;
    tracing::info!(slot_id = %slot.id, "Created time slot");

    Ok(Json(SlotResponse {
        success: true,
        slot,
    }))
}

/// PUT /api/admin/slots/:id
pub async fn update_slot<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(draft): Json<SlotDraft>,
) -> Result<Json<SlotResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    let mut slot = state.store.get_slot(&id)?.ok_or(ApiError::SlotNotFound)?;
    slot.apply(draft)?;
    state.store.update_slot(&slot)?;
    tracing::info!(slot_id = %slot.id, "Updated time slot");

    Ok(Json(SlotResponse {
        success: true,
        slot,
    }))
}

/// DELETE /api/admin/slots/:id
pub async fn delete_slot<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    state.store.delete_slot(&id)?;
    tracing::info!(slot_id = %id, "Deleted time slot");

    Ok(Json(DeleteResponse { success: true }))
}

/// POST /api/admin/slots/:id/toggle
pub async fn toggle_slot<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SlotResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    let mut slot = state.store.get_slot(&id)?.ok_or(ApiError::SlotNotFound)?;
    slot.is_available = !slot.is_available;
    state.store.update_slot(&slot)?;
    tracing::info!(slot_id = %slot.id, available = slot.is_available, "Toggled time slot");

    Ok(Json(SlotResponse {
        success: true,
        slot,
    }))
}

/// POST /api/admin/slots/bulk - one dated slot per matching day in the range
pub async fn bulk_create_slots<D, S, E, P>(
    State(state): State<Arc<AppState<D, S, E, P>>>,
    cookies: Cookies,
    headers: HeaderMap,
    Json(req): Json<BulkSlotsRequest>,
) -> Result<Json<SlotsResponse>, ApiError>
where
    D: DataStore,
    S: SessionStore,
    E: EmailSender,
    P: PaymentGateway,
{
    require_admin_csrf(&cookies, &headers, state.session_store.as_ref())?;

    let drafts = bulk_drafts(req.from, req.to, &req.weekdays, req.start_time, req.end_time)?;
    if drafts.len() > MAX_BULK_SLOTS {
        return Err(ApiError::ValidationError(format!(
            "Bulk creation is limited to {} slots, request would create {}",
            MAX_BULK_SLOTS,
            drafts.len()
        )));
    }

    let slots = drafts
        .into_iter()
        .map(|draft| state.store.create_slot(draft))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(count = slots.len(), from = %req.from, to = %req.to, "Bulk created time slots");

    Ok(Json(SlotsResponse {
        success: true,
        slots,
    }))
}
