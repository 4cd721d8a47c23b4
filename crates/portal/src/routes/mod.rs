//! HTTP route handlers for the portal.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                       - Liveness check
//! GET    /health/ready                 - Readiness check (store reachable)
//!
//! # Roster
//! GET    /api/roster                   - All weeks plus the active week index
//!
//! # Health feed
//! GET    /api/posts                    - Published posts, newest first
//! POST   /api/posts/{id}/likes         - Add a like
//! DELETE /api/posts/{id}/likes         - Remove a like
//! GET    /api/posts/{id}/comments      - Comments, oldest first
//! POST   /api/posts/{id}/comments      - Add a comment
//! POST   /api/feedback                 - Submit a review or suggestion
//!
//! # Administration (requires X-Admin-Password)
//! PUT    /api/admin/roster             - Replace the whole roster from a JSON file
//! POST   /api/admin/posts              - Create a post
//! PUT    /api/admin/posts/{id}         - Update a post
//! DELETE /api/admin/posts/{id}         - Delete a post and its comments
//! ```

pub mod admin;
pub mod feedback;
pub mod posts;
pub mod roster;

use axum::{
    Router,
    extract::State,
    http::{HeaderName, Method, StatusCode, header},
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::ADMIN_PASSWORD_HEADER;
use crate::state::AppState;

/// Create the public API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/roster", get(roster::show))
        .route("/posts", get(posts::index))
        .route("/posts/{id}/likes", post(posts::like).delete(posts::unlike))
        .route(
            "/posts/{id}/comments",
            get(posts::comments).post(posts::add_comment),
        )
        .route("/feedback", post(feedback::submit))
        .nest("/admin", admin_routes())
}

/// Create the administration routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/roster", put(admin::replace_roster))
        .route("/posts", post(admin::create_post))
        .route(
            "/posts/{id}",
            put(admin::update_post).delete(admin::delete_post),
        )
}

/// Build the full application router.
///
/// Sentry layers are added by the binary so tests can drive this router
/// without a Sentry hub.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(ADMIN_PASSWORD_HEADER),
        ]);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
