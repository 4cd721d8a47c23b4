//! Health feed: posts, likes, comments and visitor feedback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use pharmaguard_core::{
    Comment, CommentBody, Feedback, FeedbackContent, FeedbackKind, HealthPost, HealthPostUpdate,
    NewFeedback, NewHealthPost, PostId, ValidationError,
};

use super::AdminPassword;
use crate::cache::{CacheKey, ListingCache};
use crate::store::{PortalStore, StoreError};

/// Errors from feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The supplied admin credential did not match.
    #[error("invalid admin credential")]
    Unauthorized,

    /// Input failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The post does not exist.
    #[error("post {0} not found")]
    NotFound(PostId),

    /// The store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of deleting a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    AlreadyDeleted,
}

/// Map a store error on `post`, turning `NotFound` into [`FeedError::NotFound`].
fn on_post(post: PostId) -> impl FnOnce(StoreError) -> FeedError {
    move |e| match e {
        StoreError::NotFound => FeedError::NotFound(post),
        other => FeedError::Store(other),
    }
}

/// Feed service.
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn PortalStore>,
    cache: ListingCache,
    admin: AdminPassword,
}

impl FeedService {
    #[must_use]
    pub fn new(store: Arc<dyn PortalStore>, cache: ListingCache, admin: AdminPassword) -> Self {
        Self {
            store,
            cache,
            admin,
        }
    }

    fn authorize(&self, credential: &str) -> Result<(), FeedError> {
        if self.admin.verify(credential) {
            Ok(())
        } else {
            warn!("Rejected post administration with invalid credential");
            Err(FeedError::Unauthorized)
        }
    }

    async fn all_posts(&self) -> Result<Arc<Vec<HealthPost>>, FeedError> {
        if let Some(posts) = self.cache.posts().await {
            debug!("Cache hit for posts");
            return Ok(posts);
        }

        let generation = self.cache.generation(CacheKey::Posts);
        let posts = Arc::new(self.store.list_posts().await?);
        self.cache.put_posts(posts.clone(), generation).await;
        Ok(posts)
    }

    /// Posts visible at `now`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Store` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn visible_posts(&self, now: DateTime<Utc>) -> Result<Vec<HealthPost>, FeedError> {
        Ok(self
            .all_posts()
            .await?
            .iter()
            .filter(|post| post.is_visible(now))
            .cloned()
            .collect())
    }

    /// Create a post.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Unauthorized` or `FeedError::Invalid` without
    /// touching the store, or `FeedError::Store` if the insert fails.
    #[instrument(skip(self, credential, post), fields(title = %post.title))]
    pub async fn create_post(
        &self,
        credential: &str,
        post: NewHealthPost,
    ) -> Result<HealthPost, FeedError> {
        self.authorize(credential)?;
        post.validate()?;

        let created = self.store.create_post(&post).await?;
        self.cache.invalidate(CacheKey::Posts).await;
        info!(post = %created.id, "Post created");
        Ok(created)
    }

    /// Update a post. See [`HealthPostUpdate`] for `publish_at` semantics.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::NotFound` if the post does not exist.
    #[instrument(skip(self, credential, update))]
    pub async fn update_post(
        &self,
        credential: &str,
        id: PostId,
        update: HealthPostUpdate,
    ) -> Result<HealthPost, FeedError> {
        self.authorize(credential)?;
        update.validate()?;

        let updated = self
            .store
            .update_post(id, &update)
            .await
            .map_err(on_post(id))?;
        self.cache.invalidate(CacheKey::Posts).await;
        Ok(updated)
    }

    /// Delete a post and its comments. Deleting a missing post succeeds.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Unauthorized` or `FeedError::Store`.
    #[instrument(skip(self, credential))]
    pub async fn delete_post(
        &self,
        credential: &str,
        id: PostId,
    ) -> Result<DeleteOutcome, FeedError> {
        self.authorize(credential)?;

        if self.store.delete_post(id).await? {
            self.cache.invalidate(CacheKey::Posts).await;
            info!("Post deleted");
            Ok(DeleteOutcome::Deleted)
        } else {
            debug!("Post already deleted");
            Ok(DeleteOutcome::AlreadyDeleted)
        }
    }

    /// Add one like; returns the new count.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::NotFound` if the post does not exist.
    #[instrument(skip(self))]
    pub async fn like(&self, id: PostId) -> Result<u32, FeedError> {
        let likes = self
            .store
            .increment_likes(id)
            .await
            .map_err(on_post(id))?;
        self.cache.invalidate(CacheKey::Posts).await;
        Ok(likes)
    }

    /// Remove one like, never below zero; returns the new count.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::NotFound` if the post does not exist.
    #[instrument(skip(self))]
    pub async fn unlike(&self, id: PostId) -> Result<u32, FeedError> {
        let likes = self
            .store
            .decrement_likes(id)
            .await
            .map_err(on_post(id))?;
        self.cache.invalidate(CacheKey::Posts).await;
        Ok(likes)
    }

    /// Comments on a post, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Store` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn comments(&self, id: PostId) -> Result<Vec<Comment>, FeedError> {
        Ok(self.store.list_comments(id).await?)
    }

    /// Add a comment after validating its length.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Invalid` without touching the store, or
    /// `FeedError::NotFound` if the post does not exist.
    #[instrument(skip(self, body))]
    pub async fn add_comment(&self, id: PostId, body: &str) -> Result<Comment, FeedError> {
        let body = CommentBody::parse(body)?;
        self.store
            .insert_comment(id, &body)
            .await
            .map_err(on_post(id))
    }

    /// Store a visitor review or suggestion.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Invalid` if the content is not 10-500 characters.
    #[instrument(skip(self, content))]
    pub async fn submit_feedback(
        &self,
        kind: FeedbackKind,
        content: &str,
    ) -> Result<Feedback, FeedError> {
        let feedback = NewFeedback {
            kind,
            content: FeedbackContent::parse(content)?,
        };
        let stored = self.store.insert_feedback(&feedback).await?;
        info!(feedback = %stored.id, "Feedback received");
        Ok(stored)
    }
}
