//! Storage seams for the portal.
//!
//! Services talk to storage only through these traits. Two implementations
//! exist: [`crate::db::PgStore`] for `PostgreSQL` and [`MemoryStore`] for
//! tests and local runs.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use pharmaguard_core::{
    Comment, CommentBody, Feedback, HealthPost, HealthPostUpdate, NewFeedback, NewHealthPost,
    Pharmacy, PostId, WeekId, WeekSchedule,
};

pub use memory::{MemoryStore, Operation};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a failed roster replacement.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// Nothing was changed; the previous roster is intact.
    #[error("roster replacement failed, previous roster kept: {0}")]
    Failed(#[source] StoreError),

    /// The old roster was (at least partly) deleted but the new one was not
    /// fully written. The stored roster must be reconciled.
    #[error("roster replacement stopped after {weeks_written} week(s): {source}")]
    Partial {
        weeks_written: usize,
        #[source]
        source: StoreError,
    },
}

/// Counts written by a successful roster replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ReplaceReport {
    pub weeks: usize,
    pub pharmacies: usize,
}

/// Weekly roster storage.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// All weeks in insertion order, each with its pharmacies in insertion order.
    async fn list_weeks(&self) -> Result<Vec<WeekSchedule>, StoreError>;

    /// Delete every pharmacy row. Returns the number deleted.
    async fn delete_all_pharmacies(&self) -> Result<u64, StoreError>;

    /// Delete every week row. Returns the number deleted.
    async fn delete_all_weeks(&self) -> Result<u64, StoreError>;

    /// Insert a week and return its key.
    async fn insert_week(&self, label: &str) -> Result<WeekId, StoreError>;

    /// Bulk-insert the pharmacies of a week.
    async fn insert_pharmacies(
        &self,
        week: WeekId,
        pharmacies: &[Pharmacy],
    ) -> Result<u64, StoreError>;

    /// Replace the whole roster.
    ///
    /// The provided implementation runs the individual steps in sequence
    /// and cannot undo them: once the first delete has succeeded any
    /// failure is reported as [`ReplaceError::Partial`]. Stores that can
    /// do better (e.g. with a transaction) should override it.
    async fn replace_all_weeks(
        &self,
        weeks: &[WeekSchedule],
    ) -> Result<ReplaceReport, ReplaceError> {
        self.delete_all_pharmacies()
            .await
            .map_err(ReplaceError::Failed)?;

        let partial = |weeks_written: usize| {
            move |source: StoreError| {
                warn!(weeks_written, error = %source, "Roster replacement interrupted");
                ReplaceError::Partial {
                    weeks_written,
                    source,
                }
            }
        };

        self.delete_all_weeks().await.map_err(partial(0))?;

        let mut report = ReplaceReport {
            weeks: 0,
            pharmacies: 0,
        };
        for week in weeks {
            let id = self
                .insert_week(&week.label)
                .await
                .map_err(partial(report.weeks))?;
            self.insert_pharmacies(id, &week.pharmacies)
                .await
                .map_err(partial(report.weeks))?;
            report.weeks += 1;
            report.pharmacies += week.pharmacies.len();
        }

        info!(weeks = report.weeks, pharmacies = report.pharmacies, "Roster replaced");
        Ok(report)
    }
}

/// Health post, like and comment storage.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts, newest first, including scheduled ones.
    async fn list_posts(&self) -> Result<Vec<HealthPost>, StoreError>;

    async fn create_post(&self, post: &NewHealthPost) -> Result<HealthPost, StoreError>;

    /// Returns [`StoreError::NotFound`] if the post does not exist.
    async fn update_post(
        &self,
        id: PostId,
        update: &HealthPostUpdate,
    ) -> Result<HealthPost, StoreError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_post(&self, id: PostId) -> Result<bool, StoreError>;

    /// Atomically add one like; returns the new count.
    async fn increment_likes(&self, id: PostId) -> Result<u32, StoreError>;

    /// Atomically remove one like, clamped at zero; returns the new count.
    async fn decrement_likes(&self, id: PostId) -> Result<u32, StoreError>;

    /// Comments on a post, oldest first.
    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, StoreError>;

    /// Returns [`StoreError::NotFound`] if the post does not exist.
    async fn insert_comment(&self, post: PostId, body: &CommentBody)
    -> Result<Comment, StoreError>;
}

/// Visitor feedback storage.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<Feedback, StoreError>;
}

/// Everything the portal needs from storage.
#[async_trait]
pub trait PortalStore: RosterStore + PostStore + FeedbackStore {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
