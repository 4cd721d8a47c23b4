//! Visitor feedback route.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use pharmaguard_core::FeedbackKind;

use crate::error::{ApiMessage, Result};
use crate::middleware::ApiJson;
use crate::state::AppState;

/// Feedback submission body. `kind` is `review` (or `avis`) or `suggestion`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub kind: FeedbackKind,
    pub content: String,
}

/// Store a review or suggestion.
pub async fn submit(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FeedbackRequest>,
) -> Result<(StatusCode, Json<ApiMessage>)> {
    state
        .feed()
        .submit_feedback(request.kind, &request.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiMessage::ok("Thank you for your feedback")),
    ))
}
