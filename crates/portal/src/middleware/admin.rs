//! Administrator credential extractor.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the shared administrator password.
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Extractor that requires the administrator credential.
///
/// Rejects with 401 before the request body is read. The verified value is
/// handed on so the services can check it again.
///
/// # Example
///
/// ```rust,ignore
/// async fn replace_roster(
///     State(state): State<AppState>,
///     AdminCredential(credential): AdminCredential,
///     body: Bytes,
/// ) -> Result<Json<ReplaceReport>> {
///     Ok(Json(state.roster().replace_from_document(&credential, &body).await?))
/// }
/// ```
pub struct AdminCredential(pub String);

impl FromRequestParts<AppState> for AdminCredential {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Missing or non-ASCII headers count as an empty credential
        let credential = parts
            .headers
            .get(ADMIN_PASSWORD_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if !state.admin_password().verify(credential) {
            tracing::warn!(path = %parts.uri.path(), "Rejected admin request");
            return Err(AppError::Unauthorized(
                "Invalid admin credential".to_string(),
            ));
        }

        Ok(Self(credential.to_owned()))
    }
}
