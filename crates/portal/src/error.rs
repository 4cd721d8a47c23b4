//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding. Every failure response has the same JSON shape:
//! `{ "success": false, "message": "..." }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::{FeedError, RosterError};
use crate::store::StoreError;

/// Application-level error type for the portal.
#[derive(Debug, Error)]
pub enum AppError {
    /// Roster operation failed.
    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    /// Feed operation failed.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong admin credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body of simple success and failure responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Roster(err) => match err {
                RosterError::Unauthorized => StatusCode::UNAUTHORIZED,
                RosterError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
                RosterError::ReplaceFailed(_)
                | RosterError::PartiallyReplaced { .. }
                | RosterError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Feed(err) => match err {
                FeedError::Unauthorized => StatusCode::UNAUTHORIZED,
                FeedError::Invalid(_) => StatusCode::BAD_REQUEST,
                FeedError::NotFound(_) => StatusCode::NOT_FOUND,
                FeedError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            Self::Roster(err) => match err {
                RosterError::Unauthorized => "Invalid admin credential".to_string(),
                RosterError::InvalidDocument(reason) => format!("Invalid roster file: {reason}"),
                RosterError::ReplaceFailed(_) => {
                    "Roster update failed; the previous roster is unchanged".to_string()
                }
                RosterError::PartiallyReplaced { weeks_written, .. } => format!(
                    "Roster update interrupted after {weeks_written} week(s); the stored roster \
                     is incomplete and the file must be uploaded again"
                ),
                RosterError::Store(_) => "Internal server error".to_string(),
            },
            Self::Feed(err) => match err {
                FeedError::Unauthorized => "Invalid admin credential".to_string(),
                FeedError::Invalid(reason) => reason.to_string(),
                FeedError::NotFound(id) => format!("Post {id} not found"),
                FeedError::Store(_) => "Internal server error".to_string(),
            },
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(ApiMessage::failed(self.public_message()))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use pharmaguard_core::{PostId, ValidationError};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(RosterError::Unauthorized.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(RosterError::InvalidDocument("x".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                RosterError::PartiallyReplaced {
                    weeks_written: 2,
                    source: StoreError::Unavailable("down".to_string()),
                }
                .into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(FeedError::NotFound(PostId::new(1)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(FeedError::Invalid(ValidationError::Empty { field: "comment" }).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Store(StoreError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_partial_replace_message_asks_for_reupload() {
        let err = AppError::from(RosterError::PartiallyReplaced {
            weeks_written: 3,
            source: StoreError::Unavailable("down".to_string()),
        });
        let message = err.public_message();
        assert!(message.contains("3 week(s)"));
        assert!(message.contains("uploaded again"));
    }

    #[test]
    fn test_store_details_not_exposed() {
        let err = AppError::from(FeedError::Store(StoreError::DataCorruption(
            "negative like count".to_string(),
        )));
        assert_eq!(err.public_message(), "Internal server error");
    }
}
