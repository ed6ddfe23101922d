use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};

use atithi_core::model::{GuestRecord, RegistrationStatus};
use atithi_shared::RecordId;

use crate::error::AppError;
use crate::state::AppState;
use crate::summary;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    total: usize,
    showing: usize,
    pending: usize,
    approved: usize,
    rejected: usize,
    registrations: Vec<GuestRecord>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: RegistrationStatus,
}

#[derive(Debug, Serialize)]
struct StatusUpdateResponse {
    id: RecordId,
    status: RegistrationStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/registrations", get(list_registrations))
        .route("/v1/admin/registrations/summary", get(summary::get_registration_summary))
        .route("/v1/admin/registrations/export", get(export_registrations))
        .route("/v1/admin/registrations/{id}/status", patch(update_status))
        .route(
            "/v1/admin/registrations/{id}",
            axum::routing::delete(delete_registration),
        )
}

// ============================================================================
// Moderation Handlers
// ============================================================================

/// GET /v1/admin/registrations
///
/// One full fetch, newest first, then in-handler filtering the way the panel
/// applies it: free-text search over name/contact/nationality plus a status
/// filter.
async fn list_registrations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let records = state.guests.list().await.map_err(AppError::store)?;

    let count = |status: RegistrationStatus| records.iter().filter(|r| r.status == status).count();
    let total = records.len();
    let pending = count(RegistrationStatus::Pending);
    let approved = count(RegistrationStatus::Approved);
    let rejected = count(RegistrationStatus::Rejected);

    let filtered = apply_filters(records, &query)?;

    Ok(Json(ListResponse {
        total,
        showing: filtered.len(),
        pending,
        approved,
        rejected,
        registrations: filtered,
    }))
}

/// PATCH /v1/admin/registrations/{id}/status
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    let id = RecordId::from(id);
    state
        .guests
        .update_status(&id, req.status)
        .await
        .map_err(AppError::store)?;
    tracing::info!(record = %id, status = req.status.as_str(), "registration status updated");
    Ok(Json(StatusUpdateResponse {
        id,
        status: req.status,
    }))
}

/// DELETE /v1/admin/registrations/{id}
async fn delete_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = RecordId::from(id);
    state.guests.delete(&id).await.map_err(AppError::store)?;
    tracing::info!(record = %id, "registration deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// GET /v1/admin/registrations/export
///
/// CSV attachment over the same filtered view the panel is showing.
async fn export_registrations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let records = state.guests.list().await.map_err(AppError::store)?;
    let filtered = apply_filters(records, &query)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Name",
        "No. of Guests",
        "Contact Number",
        "Nationality",
        "ID Type",
        "ID Number",
        "Check-in Date",
        "Check-out Date",
        "Status",
        "Registration Date",
        "Documents",
    ])?;
    for record in &filtered {
        writer.write_record([
            record.name.clone(),
            record.number_of_guests.to_string(),
            record.contact_number.0.clone(),
            record.nationality.clone(),
            record.id_type.label().to_string(),
            record.id_number.0.clone(),
            record.checkin_date.to_string(),
            record.checkout_date.to_string(),
            record.status.as_str().to_string(),
            record.registration_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.identity_document_url.join("; "),
        ])?;
    }
    let body = String::from_utf8(writer.into_inner().map_err(|e| anyhow::anyhow!(e.to_string()))?)?;

    let filename = format!("guest_registrations_{}.csv", Local::now().date_naive());
    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, body).into_response())
}

fn apply_filters(records: Vec<GuestRecord>, query: &ListQuery) -> Result<Vec<GuestRecord>, AppError> {
    let status = match query.status.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(
            RegistrationStatus::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status filter: {raw}")))?,
        ),
    };
    let search = query
        .search
        .as_deref()
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty());

    Ok(records
        .into_iter()
        .filter(|record| status.map_or(true, |s| record.status == s))
        .filter(|record| {
            search.as_deref().map_or(true, |term| {
                record.name.to_lowercase().contains(term)
                    || record.contact_number.0.contains(term)
                    || record.nationality.to_lowercase().contains(term)
            })
        })
        .collect())
}
