//! Optimistic like and comment state for the health feed.
//!
//! The ledger applies a reader's action locally before the remote call is
//! issued, then confirms or rolls back when the response arrives:
//!
//! - likes go `Idle -> Pending(snapshot) -> Idle`; on failure the snapshot
//!   (count, flag and device liked set) is restored;
//! - comments are appended under a temporary key and removed by that key if
//!   the insert fails.
//!
//! Entries removed by [`EngagementLedger::untrack_post`] or
//! [`EngagementLedger::close_comments`] are gone for good: responses that
//! arrive afterwards are discarded and reported as [`LedgerError::Detached`].
//! The device liked set is not per-entry, so a like failure that arrives
//! late still reverts it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::device::{DeviceStorage, LikedPosts};
use crate::types::{Comment, CommentBody, CommentId, PostId, ValidationError};

/// Errors from the remote engagement backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("post {0} not found")]
    NotFound(PostId),
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Server-side engagement operations.
#[async_trait]
pub trait EngagementRemote: Send + Sync {
    /// Atomically add one like.
    async fn increment_likes(&self, post: PostId) -> Result<(), RemoteError>;

    /// Atomically remove one like, never going below zero.
    async fn decrement_likes(&self, post: PostId) -> Result<(), RemoteError>;

    /// All comments on a post.
    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, RemoteError>;

    /// Store a new comment.
    async fn insert_comment(&self, post: PostId, body: &CommentBody) -> Result<(), RemoteError>;
}

/// Errors returned by [`EngagementLedger`] operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("a like change for post {0} is already in flight")]
    Busy(PostId),
    #[error("post {0} is not tracked")]
    UnknownPost(PostId),
    #[error("comments for post {0} are not open")]
    CommentsClosed(PostId),
    #[error("post {0} was closed before the response arrived")]
    Detached(PostId),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Like count and whether this device likes the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub likes: u32,
    pub liked_by_me: bool,
}

impl LikeState {
    const fn toggled(self) -> Self {
        if self.liked_by_me {
            Self {
                likes: self.likes.saturating_sub(1),
                liked_by_me: false,
            }
        } else {
            Self {
                likes: self.likes.saturating_add(1),
                liked_by_me: true,
            }
        }
    }
}

/// Identity of a displayed comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommentKey {
    /// Loaded from the store.
    Stored(CommentId),
    /// Added locally, keyed until the list is reloaded.
    Pending(Uuid),
}

/// A comment as shown to the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayComment {
    pub key: CommentKey,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// False while the insert is in flight.
    pub confirmed: bool,
}

impl From<Comment> for DisplayComment {
    fn from(comment: Comment) -> Self {
        Self {
            key: CommentKey::Stored(comment.id),
            body: comment.body,
            created_at: comment.created_at,
            confirmed: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LikePhase {
    Idle,
    Pending(LikeState),
}

#[derive(Debug)]
struct LikeEntry {
    generation: u64,
    state: LikeState,
    phase: LikePhase,
}

#[derive(Debug)]
struct CommentThread {
    generation: u64,
    /// `None` until the first load completes.
    comments: Option<Vec<DisplayComment>>,
    count: watch::Sender<usize>,
}

impl CommentThread {
    fn publish_count(&self) {
        let len = self.comments.as_ref().map_or(0, Vec::len);
        self.count.send_replace(len);
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    liked: LikedPosts,
    posts: HashMap<PostId, LikeEntry>,
    threads: HashMap<PostId, CommentThread>,
    next_generation: u64,
}

impl LedgerState {
    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

/// Per-post optimistic engagement state.
///
/// Locks are held only for synchronous bookkeeping, never across a remote
/// call, so the ledger can be shared between tasks behind an `Arc`.
pub struct EngagementLedger {
    remote: Arc<dyn EngagementRemote>,
    storage: Arc<dyn DeviceStorage>,
    state: Mutex<LedgerState>,
}

impl std::fmt::Debug for EngagementLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngagementLedger")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl EngagementLedger {
    /// Create a ledger, loading the liked set from device storage.
    #[must_use]
    pub fn new(remote: Arc<dyn EngagementRemote>, storage: Arc<dyn DeviceStorage>) -> Self {
        let liked = LikedPosts::load(storage.as_ref());
        Self {
            remote,
            storage,
            state: Mutex::new(LedgerState {
                liked,
                ..LedgerState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a post with the like count reported by the server.
    ///
    /// Re-tracking replaces the entry; a toggle still in flight for the old
    /// entry will come back as [`LedgerError::Detached`], or as
    /// [`LedgerError::Remote`] if it failed.
    pub fn track_post(&self, post: PostId, likes: u32) -> LikeState {
        let mut state = self.lock();
        let generation = state.bump_generation();
        let like_state = LikeState {
            likes,
            liked_by_me: state.liked.contains(post),
        };
        state.posts.insert(
            post,
            LikeEntry {
                generation,
                state: like_state,
                phase: LikePhase::Idle,
            },
        );
        like_state
    }

    /// Stop tracking a post and drop its like state.
    pub fn untrack_post(&self, post: PostId) {
        self.lock().posts.remove(&post);
    }

    /// Current like state of a tracked post.
    #[must_use]
    pub fn like_state(&self, post: PostId) -> Option<LikeState> {
        self.lock().posts.get(&post).map(|entry| entry.state)
    }

    /// Whether a like change for the post is awaiting its response.
    #[must_use]
    pub fn is_pending(&self, post: PostId) -> bool {
        self.lock()
            .posts
            .get(&post)
            .is_some_and(|entry| matches!(entry.phase, LikePhase::Pending(_)))
    }

    /// Whether this device has liked the post.
    #[must_use]
    pub fn is_liked(&self, post: PostId) -> bool {
        self.lock().liked.contains(post)
    }

    /// Flip the like on a tracked post.
    ///
    /// The count, flag and device liked set change before the remote call
    /// is issued. Returns the confirmed state.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Busy`] if a toggle for this post is in flight
    /// - [`LedgerError::UnknownPost`] if the post is not tracked
    /// - [`LedgerError::Remote`] if the server call failed; local state has
    ///   been rolled back, and the device liked set is reverted even when
    ///   the post was untracked meanwhile
    /// - [`LedgerError::Detached`] if the call succeeded after the post was
    ///   untracked
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, post: PostId) -> Result<LikeState, LedgerError> {
        let (generation, optimistic) = {
            let mut guard = self.lock();
            let LedgerState { posts, liked, .. } = &mut *guard;
            let entry = posts.get_mut(&post).ok_or(LedgerError::UnknownPost(post))?;
            if let LikePhase::Pending(_) = entry.phase {
                return Err(LedgerError::Busy(post));
            }

            let snapshot = entry.state;
            let optimistic = snapshot.toggled();
            entry.phase = LikePhase::Pending(snapshot);
            entry.state = optimistic;
            liked.set(post, optimistic.liked_by_me);
            self.save_liked(liked);
            (entry.generation, optimistic)
        };

        let result = if optimistic.liked_by_me {
            self.remote.increment_likes(post).await
        } else {
            self.remote.decrement_likes(post).await
        };

        let mut guard = self.lock();
        let LedgerState { posts, liked, .. } = &mut *guard;
        let current = posts
            .get(&post)
            .is_some_and(|entry| entry.generation == generation);
        if !current {
            debug!("Like response arrived for untracked post");
            // The liked set outlives the entry, so a failure still reverts it.
            return match result {
                Ok(()) => Err(LedgerError::Detached(post)),
                Err(e) => {
                    warn!(error = %e, "Like change failed after untrack, reverting liked set");
                    if liked.contains(post) == optimistic.liked_by_me {
                        liked.set(post, !optimistic.liked_by_me);
                        self.save_liked(liked);
                        if let Some(current) = posts.get_mut(&post) {
                            if let LikePhase::Idle = current.phase {
                                current.state.liked_by_me = !optimistic.liked_by_me;
                            }
                        }
                    }
                    Err(LedgerError::Remote(e))
                }
            };
        }

        let Some(entry) = posts.get_mut(&post) else {
            return Err(LedgerError::Detached(post));
        };
        let LikePhase::Pending(snapshot) = entry.phase else {
            return Err(LedgerError::Detached(post));
        };
        entry.phase = LikePhase::Idle;

        match result {
            Ok(()) => Ok(entry.state),
            Err(e) => {
                warn!(error = %e, "Like change failed, rolling back");
                entry.state = snapshot;
                liked.set(post, snapshot.liked_by_me);
                self.save_liked(liked);
                Err(LedgerError::Remote(e))
            }
        }
    }

    fn save_liked(&self, liked: &LikedPosts) {
        if let Err(e) = liked.save(self.storage.as_ref()) {
            warn!(error = %e, "Failed to persist liked posts");
        }
    }

    /// Open the comment list of a post, loading it on first open.
    ///
    /// Comments are returned oldest first. Later opens return the cached
    /// list without a remote call.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Remote`] if loading failed; the next open retries
    /// - [`LedgerError::Detached`] if the list was closed during the load
    #[instrument(skip(self))]
    pub async fn open_comments(&self, post: PostId) -> Result<Vec<DisplayComment>, LedgerError> {
        let generation = {
            let mut state = self.lock();
            if let Some(thread) = state.threads.get(&post) {
                if let Some(comments) = &thread.comments {
                    return Ok(comments.clone());
                }
                thread.generation
            } else {
                let generation = state.bump_generation();
                let (count, _) = watch::channel(0);
                state.threads.insert(
                    post,
                    CommentThread {
                        generation,
                        comments: None,
                        count,
                    },
                );
                generation
            }
        };

        let result = self.remote.list_comments(post).await;

        let mut state = self.lock();
        let current = state
            .threads
            .get(&post)
            .is_some_and(|thread| thread.generation == generation);
        if !current {
            debug!("Discarding comment list for closed post");
            return Err(LedgerError::Detached(post));
        }

        match result {
            Ok(mut loaded) => {
                let Some(thread) = state.threads.get_mut(&post) else {
                    return Err(LedgerError::Detached(post));
                };
                if let Some(comments) = &thread.comments {
                    return Ok(comments.clone());
                }
                loaded.sort_by_key(|comment| comment.created_at);
                let comments: Vec<DisplayComment> =
                    loaded.into_iter().map(DisplayComment::from).collect();
                thread.comments = Some(comments.clone());
                thread.publish_count();
                Ok(comments)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load comments");
                state.threads.remove(&post);
                Err(LedgerError::Remote(e))
            }
        }
    }

    /// Drop the comment list of a post.
    pub fn close_comments(&self, post: PostId) {
        self.lock().threads.remove(&post);
    }

    /// The displayed comments of an open post.
    #[must_use]
    pub fn comments(&self, post: PostId) -> Option<Vec<DisplayComment>> {
        self.lock()
            .threads
            .get(&post)
            .and_then(|thread| thread.comments.clone())
    }

    /// Subscribe to the displayed comment count of an open post.
    #[must_use]
    pub fn subscribe_comment_count(&self, post: PostId) -> Option<watch::Receiver<usize>> {
        self.lock()
            .threads
            .get(&post)
            .map(|thread| thread.count.subscribe())
    }

    /// Add a comment to an open post.
    ///
    /// The body is validated first; an invalid body changes nothing and
    /// makes no remote call. A valid one is shown immediately under a
    /// temporary key and stays there once confirmed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Invalid`] if the body is blank or too long
    /// - [`LedgerError::CommentsClosed`] if the comments were never opened
    /// - [`LedgerError::Remote`] if the insert failed; the comment has been
    ///   removed again
    /// - [`LedgerError::Detached`] if the comments were closed meanwhile
    #[instrument(skip(self, body))]
    pub async fn add_comment(
        &self,
        post: PostId,
        body: &str,
    ) -> Result<DisplayComment, LedgerError> {
        let body = CommentBody::parse(body)?;
        let key = CommentKey::Pending(Uuid::new_v4());

        let generation = {
            let mut state = self.lock();
            let thread = state
                .threads
                .get_mut(&post)
                .ok_or(LedgerError::CommentsClosed(post))?;
            let Some(comments) = thread.comments.as_mut() else {
                return Err(LedgerError::CommentsClosed(post));
            };
            comments.push(DisplayComment {
                key,
                body: body.as_str().to_owned(),
                created_at: Utc::now(),
                confirmed: false,
            });
            thread.publish_count();
            thread.generation
        };

        let result = self.remote.insert_comment(post, &body).await;

        let mut state = self.lock();
        let Some(thread) = state
            .threads
            .get_mut(&post)
            .filter(|thread| thread.generation == generation)
        else {
            debug!("Discarding comment response for closed post");
            return Err(LedgerError::Detached(post));
        };
        let Some(comments) = thread.comments.as_mut() else {
            return Err(LedgerError::Detached(post));
        };

        match result {
            Ok(()) => {
                let confirmed = comments
                    .iter_mut()
                    .find(|comment| comment.key == key)
                    .map(|comment| {
                        comment.confirmed = true;
                        comment.clone()
                    });
                confirmed.ok_or(LedgerError::Detached(post))
            }
            Err(e) => {
                warn!(error = %e, "Comment insert failed, removing it");
                comments.retain(|comment| comment.key != key);
                thread.publish_count();
                Err(LedgerError::Remote(e))
            }
        }
    }
}
