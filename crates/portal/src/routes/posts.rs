//! Public health feed routes: listing, likes and comments.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use pharmaguard_core::{Comment, HealthPost, PostId};

use crate::error::Result;
use crate::middleware::{ApiJson, ApiPath};
use crate::state::AppState;

/// Like count after a like or unlike.
#[derive(Debug, Serialize, Deserialize)]
pub struct LikesResponse {
    pub likes: u32,
}

/// Comment submission body.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewCommentRequest {
    pub body: String,
}

/// Published posts, newest first.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<HealthPost>>> {
    Ok(Json(state.feed().visible_posts(Utc::now()).await?))
}

pub async fn like(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<LikesResponse>> {
    let likes = state.feed().like(id).await?;
    Ok(Json(LikesResponse { likes }))
}

pub async fn unlike(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<LikesResponse>> {
    let likes = state.feed().unlike(id).await?;
    Ok(Json(LikesResponse { likes }))
}

/// Comments on a post, oldest first.
pub async fn comments(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<Vec<Comment>>> {
    Ok(Json(state.feed().comments(id).await?))
}

/// Add a comment (1-300 characters).
pub async fn add_comment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<PostId>,
    ApiJson(request): ApiJson<NewCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = state.feed().add_comment(id, &request.body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
