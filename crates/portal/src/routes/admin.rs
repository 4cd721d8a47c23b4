//! Administration routes. Every handler requires [`AdminCredential`].

use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use pharmaguard_core::{HealthPost, HealthPostUpdate, NewHealthPost, PostId};

use crate::error::{ApiMessage, Result};
use crate::middleware::{AdminCredential, ApiJson, ApiPath};
use crate::services::DeleteOutcome;
use crate::state::AppState;

/// Result of a roster upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct RosterUploadResponse {
    pub success: bool,
    pub message: String,
    pub weeks: usize,
    pub pharmacies: usize,
}

/// Replace the whole roster with the uploaded JSON document.
///
/// The body is read as raw bytes so a malformed document is reported by the
/// roster service rather than by the JSON extractor.
pub async fn replace_roster(
    State(state): State<AppState>,
    AdminCredential(credential): AdminCredential,
    body: Bytes,
) -> Result<Json<RosterUploadResponse>> {
    let report = state
        .roster()
        .replace_from_document(&credential, &body)
        .await?;

    Ok(Json(RosterUploadResponse {
        success: true,
        message: format!("Roster updated with {} week(s)", report.weeks),
        weeks: report.weeks,
        pharmacies: report.pharmacies,
    }))
}

/// Create a post.
pub async fn create_post(
    State(state): State<AppState>,
    AdminCredential(credential): AdminCredential,
    ApiJson(post): ApiJson<NewHealthPost>,
) -> Result<(StatusCode, Json<HealthPost>)> {
    let created = state.feed().create_post(&credential, post).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a post.
pub async fn update_post(
    State(state): State<AppState>,
    AdminCredential(credential): AdminCredential,
    ApiPath(id): ApiPath<PostId>,
    ApiJson(update): ApiJson<HealthPostUpdate>,
) -> Result<Json<HealthPost>> {
    let updated = state.feed().update_post(&credential, id, update).await?;
    Ok(Json(updated))
}

/// Delete a post. Deleting an already-deleted post still succeeds.
pub async fn delete_post(
    State(state): State<AppState>,
    AdminCredential(credential): AdminCredential,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<ApiMessage>> {
    let message = match state.feed().delete_post(&credential, id).await? {
        DeleteOutcome::Deleted => "Post deleted",
        DeleteOutcome::AlreadyDeleted => "Post already deleted",
    };
    Ok(Json(ApiMessage::ok(message)))
}
