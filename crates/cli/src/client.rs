//! HTTP client for the portal API.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use pharmaguard_core::{Comment, CommentBody, EngagementRemote, HealthPost, PostId, RemoteError};
use pharmaguard_portal::middleware::ADMIN_PASSWORD_HEADER;
use pharmaguard_portal::routes::admin::RosterUploadResponse;
use pharmaguard_portal::routes::posts::{LikesResponse, NewCommentRequest};
use pharmaguard_portal::routes::roster::RosterResponse;

/// Portal URL used when `PHARMAGUARD_PORTAL_URL` is unset.
pub const DEFAULT_PORTAL_URL: &str = "http://127.0.0.1:3000";

/// Errors talking to the portal.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response.
    #[error("portal request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The portal answered with an error status.
    #[error("portal returned {status}: {message}")]
    Rejected { status: StatusCode, message: String },
}

impl ClientError {
    fn into_remote(self, post: PostId) -> RemoteError {
        match self {
            Self::Http(e) => RemoteError::Transport(e.to_string()),
            Self::Rejected { status, .. } if status == StatusCode::NOT_FOUND => {
                RemoteError::NotFound(post)
            }
            Self::Rejected { status, message } => RemoteError::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Portal API client.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
}

impl PortalClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Client for `PHARMAGUARD_PORTAL_URL`, or the local default.
    #[must_use]
    pub fn from_env() -> Self {
        let url = std::env::var("PHARMAGUARD_PORTAL_URL")
            .unwrap_or_else(|_| DEFAULT_PORTAL_URL.to_owned());
        Self::new(&url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Turn error statuses into [`ClientError::Rejected`] with the portal's message.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        Err(ClientError::Rejected { status, message })
    }

    /// All weeks with the portal's active week index.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the portal is unreachable or answers with an error.
    pub async fn roster(&self) -> Result<RosterResponse, ClientError> {
        let response = self.http.get(self.url("/api/roster")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Replace the roster with a raw JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rejected` with the portal's explanation on failure.
    pub async fn upload_roster(
        &self,
        password: &str,
        document: Vec<u8>,
    ) -> Result<RosterUploadResponse, ClientError> {
        let response = self
            .http
            .put(self.url("/api/admin/roster"))
            .header(ADMIN_PASSWORD_HEADER, password)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(document)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Published posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the portal is unreachable or answers with an error.
    pub async fn posts(&self) -> Result<Vec<HealthPost>, ClientError> {
        let response = self.http.get(self.url("/api/posts")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn likes(&self, post: PostId, method: reqwest::Method) -> Result<u32, ClientError> {
        let response = self
            .http
            .request(method, self.url(&format!("/api/posts/{post}/likes")))
            .send()
            .await?;
        let body: LikesResponse = Self::check(response).await?.json().await?;
        Ok(body.likes)
    }

    async fn fetch_comments(&self, post: PostId) -> Result<Vec<Comment>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/posts/{post}/comments")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_comment(&self, post: PostId, body: &CommentBody) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/posts/{post}/comments")))
            .json(&NewCommentRequest {
                body: body.as_str().to_owned(),
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl EngagementRemote for PortalClient {
    async fn increment_likes(&self, post: PostId) -> Result<(), RemoteError> {
        self.likes(post, reqwest::Method::POST)
            .await
            .map(|_| ())
            .map_err(|e| e.into_remote(post))
    }

    async fn decrement_likes(&self, post: PostId) -> Result<(), RemoteError> {
        self.likes(post, reqwest::Method::DELETE)
            .await
            .map(|_| ())
            .map_err(|e| e.into_remote(post))
    }

    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, RemoteError> {
        self.fetch_comments(post)
            .await
            .map_err(|e| e.into_remote(post))
    }

    async fn insert_comment(&self, post: PostId, body: &CommentBody) -> Result<(), RemoteError> {
        self.post_comment(post, body)
            .await
            .map_err(|e| e.into_remote(post))
    }
}
