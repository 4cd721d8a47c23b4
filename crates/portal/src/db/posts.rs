//! Health feed tables: `portal.health_post` and `portal.health_post_comment`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use pharmaguard_core::{
    Comment, CommentBody, CommentId, HealthPost, HealthPostUpdate, NewHealthPost, PostId,
};

use super::PgStore;
use crate::store::{PostStore, StoreError};

const POST_COLUMNS: &str = "id, title, body, image_url, created_at, publish_at, likes";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct HealthPostRow {
    id: i32,
    title: String,
    body: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    publish_at: Option<DateTime<Utc>>,
    likes: i32,
}

impl TryFrom<HealthPostRow> for HealthPost {
    type Error = StoreError;

    fn try_from(row: HealthPostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PostId::new(row.id),
            title: row.title,
            body: row.body,
            image_url: row.image_url,
            created_at: row.created_at,
            publish_at: row.publish_at,
            likes: likes_from_db(row.likes)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: i32,
    post_id: i32,
    body: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::new(row.id),
            post_id: PostId::new(row.post_id),
            body: row.body,
            created_at: row.created_at,
        }
    }
}

fn likes_from_db(likes: i32) -> Result<u32, StoreError> {
    u32::try_from(likes)
        .map_err(|_| StoreError::DataCorruption(format!("negative like count: {likes}")))
}

#[async_trait]
impl PostStore for PgStore {
    #[instrument(skip(self))]
    async fn list_posts(&self) -> Result<Vec<HealthPost>, StoreError> {
        let rows: Vec<HealthPostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM portal.health_post ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HealthPost::try_from).collect()
    }

    #[instrument(skip(self, post), fields(title = %post.title))]
    async fn create_post(&self, post: &NewHealthPost) -> Result<HealthPost, StoreError> {
        let row: HealthPostRow = sqlx::query_as(&format!(
            r"
            INSERT INTO portal.health_post (title, body, image_url, publish_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(&post.title)
        .bind(&post.body)
        .bind(&post.image_url)
        .bind(post.publish_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[instrument(skip(self, update))]
    async fn update_post(
        &self,
        id: PostId,
        update: &HealthPostUpdate,
    ) -> Result<HealthPost, StoreError> {
        let row: Option<HealthPostRow> = sqlx::query_as(&format!(
            r"
            UPDATE portal.health_post
            SET title = $2,
                body = $3,
                image_url = COALESCE($4, image_url),
                publish_at = CASE WHEN $5 THEN $6 ELSE publish_at END
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.title)
        .bind(&update.body)
        .bind(&update.image_url)
        .bind(update.publish_at.is_some())
        .bind(update.publish_at.flatten())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, id: PostId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM portal.health_post WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn increment_likes(&self, id: PostId) -> Result<u32, StoreError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE portal.health_post SET likes = likes + 1 WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        likes_from_db(row.ok_or(StoreError::NotFound)?.0)
    }

    #[instrument(skip(self))]
    async fn decrement_likes(&self, id: PostId) -> Result<u32, StoreError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r"
            UPDATE portal.health_post
            SET likes = GREATEST(likes - 1, 0)
            WHERE id = $1
            RETURNING likes
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        likes_from_db(row.ok_or(StoreError::NotFound)?.0)
    }

    #[instrument(skip(self))]
    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, StoreError> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            r"
            SELECT id, post_id, body, created_at
            FROM portal.health_post_comment
            WHERE post_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(post)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    #[instrument(skip(self, body))]
    async fn insert_comment(
        &self,
        post: PostId,
        body: &CommentBody,
    ) -> Result<Comment, StoreError> {
        let row: CommentRow = sqlx::query_as(
            r"
            INSERT INTO portal.health_post_comment (post_id, body)
            VALUES ($1, $2)
            RETURNING id, post_id, body, created_at
            ",
        )
        .bind(post)
        .bind(body.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::NotFound;
            }
            StoreError::Database(e)
        })?;

        Ok(row.into())
    }
}
