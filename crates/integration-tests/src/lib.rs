//! Integration tests for PharmaGuard.
//!
//! The portal router is driven in-process with `tower::ServiceExt::oneshot`
//! over a [`MemoryStore`], so no database or running server is needed.
//!
//! ```bash
//! cargo test -p pharmaguard-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `roster_api` - Roster listing and administrator replacement
//! - `feed_api` - Posts, likes, comments and feedback
//! - `ledger_over_http` - Device ledger against the real routes

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::NaiveTime;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use pharmaguard_core::{Comment, CommentBody, EngagementRemote, PostId, RemoteError};
use pharmaguard_portal::config::PortalConfig;
use pharmaguard_portal::middleware::ADMIN_PASSWORD_HEADER;
use pharmaguard_portal::routes;
use pharmaguard_portal::state::AppState;
use pharmaguard_portal::store::MemoryStore;

/// Administrator password configured for every test context.
pub const ADMIN_PASSWORD: &str = "garde-2024";

/// A roster document in the historical French field names.
pub const ROSTER_DOCUMENT: &str = r#"[
    {
        "semaine": "01/01/24 au 07/01/24",
        "pharmacies": [
            { "nom": "Pharmacie du Centre", "localisation": "Place de la Mairie", "contact1": "0102030405", "contact2": "" },
            { "nom": "Pharmacie de la Gare", "localisation": "Avenue de la Gare", "contact1": "0102030406", "contact2": "0607080910" }
        ]
    },
    {
        "semaine": "08/01/24 au 14/01/24",
        "pharmacies": [
            { "nom": "Pharmacie du Marché", "localisation": "Rue du Marché", "contact1": "0102030407", "contact2": "" }
        ]
    }
]"#;

/// Response status plus the decoded body.
///
/// Non-JSON bodies are returned as a JSON string.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The `message` field of a `{ success, message }` body.
    #[must_use]
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

/// Router plus the in-memory store behind it.
#[derive(Clone)]
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store.clone());
        Self {
            store,
            router: routes::router(state),
        }
    }

    /// Send one request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    #[allow(clippy::unwrap_used)]
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        admin_password: Option<&str>,
        body: Option<String>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(password) = admin_password {
            builder = builder.header(ADMIN_PASSWORD_HEADER, password);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.request(Method::POST, uri, None, Some(body.to_string()))
            .await
    }

    /// Send an administrator request with the correct password.
    pub async fn admin(&self, method: Method, uri: &str, body: Option<String>) -> TestResponse {
        self.request(method, uri, Some(ADMIN_PASSWORD), body).await
    }

    /// Create a published post and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the portal refuses the post.
    pub async fn create_post(&self, title: &str) -> PostId {
        let body = serde_json::json!({ "title": title, "body": "Pensez à bien vous hydrater." });
        let response = self
            .admin(Method::POST, "/api/admin/posts", Some(body.to_string()))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        let id = response.body["id"].as_i64().unwrap_or_default();
        PostId::new(i32::try_from(id).unwrap_or_default())
    }
}

fn test_config() -> PortalConfig {
    PortalConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        admin_password: SecretString::from(ADMIN_PASSWORD),
        roster_cutover: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
        cache_ttl: Duration::from_secs(60),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// [`EngagementRemote`] that calls the portal routes in-process.
pub struct RouterRemote {
    ctx: TestContext,
}

impl RouterRemote {
    #[must_use]
    pub const fn new(ctx: TestContext) -> Self {
        Self { ctx }
    }

    fn check(post: PostId, response: &TestResponse) -> Result<(), RemoteError> {
        if response.status.is_success() {
            Ok(())
        } else if response.status == StatusCode::NOT_FOUND {
            Err(RemoteError::NotFound(post))
        } else {
            Err(RemoteError::Rejected {
                status: response.status.as_u16(),
                message: response.message().to_owned(),
            })
        }
    }
}

#[async_trait]
impl EngagementRemote for RouterRemote {
    async fn increment_likes(&self, post: PostId) -> Result<(), RemoteError> {
        let response = self
            .ctx
            .request(Method::POST, &format!("/api/posts/{post}/likes"), None, None)
            .await;
        Self::check(post, &response)
    }

    async fn decrement_likes(&self, post: PostId) -> Result<(), RemoteError> {
        let response = self
            .ctx
            .request(Method::DELETE, &format!("/api/posts/{post}/likes"), None, None)
            .await;
        Self::check(post, &response)
    }

    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, RemoteError> {
        let response = self.ctx.get(&format!("/api/posts/{post}/comments")).await;
        Self::check(post, &response)?;
        serde_json::from_value(response.body).map_err(|e| RemoteError::Transport(e.to_string()))
    }

    async fn insert_comment(&self, post: PostId, body: &CommentBody) -> Result<(), RemoteError> {
        let response = self
            .ctx
            .post_json(
                &format!("/api/posts/{post}/comments"),
                &serde_json::json!({ "body": body.as_str() }),
            )
            .await;
        Self::check(post, &response)
    }
}
