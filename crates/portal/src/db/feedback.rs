//! Visitor feedback table: `portal.feedback`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use pharmaguard_core::{Feedback, FeedbackId, FeedbackKind, NewFeedback};

use super::PgStore;
use crate::store::{FeedbackStore, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct FeedbackRow {
    id: i32,
    kind: FeedbackKind,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<FeedbackRow> for Feedback {
    fn from(row: FeedbackRow) -> Self {
        Self {
            id: FeedbackId::new(row.id),
            kind: row.kind,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl FeedbackStore for PgStore {
    #[instrument(skip(self, feedback), fields(kind = %feedback.kind))]
    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<Feedback, StoreError> {
        let row: FeedbackRow = sqlx::query_as(
            r"
            INSERT INTO portal.feedback (kind, content)
            VALUES ($1, $2)
            RETURNING id, kind, content, created_at
            ",
        )
        .bind(feedback.kind)
        .bind(feedback.content.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}
