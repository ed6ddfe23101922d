use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use atithi_core::document::UploadFile;
use atithi_registration::{FileOutcome, GuestPatch, GuestSlot, PrimaryPatch};
use atithi_shared::RecordId;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct SessionResponse {
    session_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct GuestCountRequest {
    number_of_guests: i64,
}

#[derive(Debug, Deserialize)]
struct SlotQuery {
    slot: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadReport {
    name: String,
    stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    record_id: RecordId,
    registration_date: DateTime<Utc>,
    status: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/registrations", post(open_session))
        .route(
            "/v1/registrations/{id}",
            get(get_session).delete(abandon_session),
        )
        .route("/v1/registrations/{id}/fields", patch(patch_fields))
        .route("/v1/registrations/{id}/guest-count", put(set_guest_count))
        .route("/v1/registrations/{id}/guests/{index}", patch(patch_guest))
        .route("/v1/registrations/{id}/documents", post(upload_documents))
        .route(
            "/v1/registrations/{id}/documents/{index}",
            axum::routing::delete(remove_document),
        )
        .route("/v1/registrations/{id}/submit", post(submit_registration))
        // Transport cap only; the per-file limit is the configured policy.
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
}

async fn open_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session_id = state.registry.open().await;
    Json(SessionResponse { session_id })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let snapshot = state.registry.snapshot(id).await.map_err(AppError::session)?;
    Ok(Json(snapshot))
}

async fn abandon_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.registry.abandon(id).await.map_err(AppError::session)?;
    Ok(Json(serde_json::json!({ "abandoned": true })))
}

async fn patch_fields(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<PrimaryPatch>,
) -> Result<Json<Value>, AppError> {
    state
        .registry
        .patch_primary(id, patch)
        .await
        .map_err(AppError::session)?;
    let snapshot = state.registry.snapshot(id).await.map_err(AppError::session)?;
    Ok(Json(snapshot))
}

/// Changing the declared guest count re-derives the additional-guest list;
/// entries that survive keep their data.
async fn set_guest_count(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<GuestCountRequest>,
) -> Result<Json<Value>, AppError> {
    state
        .registry
        .set_guest_count(id, req.number_of_guests)
        .await
        .map_err(AppError::session)?;
    let snapshot = state.registry.snapshot(id).await.map_err(AppError::session)?;
    Ok(Json(snapshot))
}

async fn patch_guest(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(patch): Json<GuestPatch>,
) -> Result<Json<Value>, AppError> {
    state
        .registry
        .patch_guest(id, index, patch)
        .await
        .map_err(AppError::session)?;
    let snapshot = state.registry.snapshot(id).await.map_err(AppError::session)?;
    Ok(Json(snapshot))
}

/// Accepts one or more files for the slot named by `?slot=` ("primary" or an
/// additional-guest index). Files are processed independently; the response
/// reports each one.
async fn upload_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadReport>>, AppError> {
    let slot = parse_slot(&query)?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field
            .file_name()
            .map(str::to_owned)
            .unwrap_or_else(|| "document".to_string());
        let content_type = field
            .content_type()
            .map(str::to_owned)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        files.push(UploadFile {
            name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    if files.is_empty() {
        return Err(AppError::BadRequest("no files in request".to_string()));
    }

    let outcomes = state
        .registry
        .upload_documents(id, slot, files)
        .await
        .map_err(AppError::session)?;

    Ok(Json(outcomes.iter().map(report).collect()))
}

async fn remove_document(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slot = parse_slot(&query)?;
    state
        .registry
        .remove_document(id, slot, index)
        .await
        .map_err(AppError::session)?;
    let snapshot = state.registry.snapshot(id).await.map_err(AppError::session)?;
    Ok(Json(snapshot))
}

async fn submit_registration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmitResponse>, AppError> {
    // Date rules run against the caller's local date, time truncated
    let today = Local::now().date_naive();
    let created = state
        .registry
        .submit(id, today)
        .await
        .map_err(AppError::session)?;

    Ok(Json(SubmitResponse {
        record_id: created.id,
        registration_date: created.registration_date,
        status: "pending",
    }))
}

fn parse_slot(query: &SlotQuery) -> Result<GuestSlot, AppError> {
    let raw = query.slot.as_deref().unwrap_or("primary");
    GuestSlot::parse(raw)
        .ok_or_else(|| AppError::BadRequest(format!("unknown guest slot: {raw}")))
}

fn report(outcome: &FileOutcome) -> UploadReport {
    match &outcome.result {
        Ok(doc) => UploadReport {
            name: outcome.name.clone(),
            stored: true,
            remote: Some(doc.remote),
            url: Some(doc.url.clone()),
            error: None,
        },
        Err(err) => UploadReport {
            name: outcome.name.clone(),
            stored: false,
            remote: None,
            url: None,
            error: Some(err.to_string()),
        },
    }
}
