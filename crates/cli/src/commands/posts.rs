//! Health feed commands.
//!
//! Likes and comments go through [`EngagementLedger`], so this device's liked
//! set is kept in `PHARMAGUARD_DEVICE_FILE` and a post is liked at most once
//! per device: liking an already-liked post removes the like.

use std::sync::Arc;

use thiserror::Error;

use pharmaguard_core::{EngagementLedger, LedgerError, LikedPosts, PostId};

use super::emit;
use crate::client::{ClientError, PortalClient};
use crate::device::FileDeviceStorage;
use crate::render;

/// Errors from feed commands.
#[derive(Debug, Error)]
pub enum PostsCommandError {
    #[error("Post {0} not found")]
    PostNotFound(PostId),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

struct Session {
    client: Arc<PortalClient>,
    storage: Arc<FileDeviceStorage>,
    ledger: EngagementLedger,
}

impl Session {
    fn from_env() -> Self {
        let client = Arc::new(PortalClient::from_env());
        let storage = Arc::new(FileDeviceStorage::from_env());
        let ledger = EngagementLedger::new(client.clone(), storage.clone());
        Self {
            client,
            storage,
            ledger,
        }
    }
}

/// List published posts.
///
/// # Errors
///
/// Returns `PostsCommandError::Client` if the portal cannot be reached.
pub async fn list() -> Result<(), PostsCommandError> {
    let session = Session::from_env();
    let posts = session.client.posts().await?;
    let liked = LikedPosts::load(session.storage.as_ref());
    emit(&render::posts(&posts, &liked));
    Ok(())
}

/// Like a post, or remove this device's like.
///
/// # Errors
///
/// Returns `PostsCommandError::PostNotFound` for unknown or unpublished
/// posts, or `PostsCommandError::Ledger` if the change was rolled back.
pub async fn toggle_like(id: PostId) -> Result<(), PostsCommandError> {
    let session = Session::from_env();
    let post = session
        .client
        .posts()
        .await?
        .into_iter()
        .find(|post| post.id == id)
        .ok_or(PostsCommandError::PostNotFound(id))?;

    session.ledger.track_post(id, post.likes);
    let state = session.ledger.toggle_like(id).await?;
    emit(&render::like_state(state));
    Ok(())
}

/// Show the comments on a post.
///
/// # Errors
///
/// Returns `PostsCommandError::Ledger` if the comments cannot be loaded.
pub async fn comments(id: PostId) -> Result<(), PostsCommandError> {
    let session = Session::from_env();
    let comments = session.ledger.open_comments(id).await?;
    emit(&render::comments(&comments));
    Ok(())
}

/// Add a comment and show the updated thread.
///
/// # Errors
///
/// Returns `PostsCommandError::Ledger` if the comment is invalid or the
/// portal refused it.
pub async fn comment(id: PostId, body: &str) -> Result<(), PostsCommandError> {
    let session = Session::from_env();
    session.ledger.open_comments(id).await?;
    session.ledger.add_comment(id, body).await?;

    let comments = session.ledger.comments(id).unwrap_or_default();
    emit(&render::comments(&comments));
    Ok(())
}
