//! Health feed types: posts, comments and feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{CommentId, FeedbackId, PostId};
use super::text::{FeedbackContent, ValidationError, require};

/// A health information post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPost {
    pub id: PostId,
    pub title: String,
    pub body: String,
    /// Reference to an already-uploaded image.
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Scheduled publication time. `None` means published on creation.
    pub publish_at: Option<DateTime<Utc>>,
    /// Like count, never negative.
    pub likes: u32,
}

impl HealthPost {
    /// Whether the post is visible to readers at `now`.
    #[must_use]
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.publish_at.is_none_or(|at| at <= now)
    }
}

/// A reader comment on a post. Comments are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHealthPost {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub publish_at: Option<DateTime<Utc>>,
}

impl NewHealthPost {
    /// Check that title and body are present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        require("body", &self.body)
    }
}

/// Fields for updating a post.
///
/// `publish_at` is tri-state: absent keeps the stored value, `null` clears
/// it, a timestamp replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthPostUpdate {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub publish_at: Option<Option<DateTime<Utc>>>,
}

impl HealthPostUpdate {
    /// Check that title and body are present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        require("body", &self.body)
    }

    /// Apply this update to a stored post.
    pub fn apply_to(&self, post: &mut HealthPost) {
        post.title.clone_from(&self.title);
        post.body.clone_from(&self.body);
        if let Some(image_url) = &self.image_url {
            post.image_url = Some(image_url.clone());
        }
        if let Some(publish_at) = self.publish_at {
            post.publish_at = publish_at;
        }
    }
}

/// Distinguish an explicit `null` from an absent field.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Kind of feedback a visitor can leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "portal.feedback_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// An opinion about the service ("avis").
    #[serde(alias = "avis")]
    Review,
    /// An improvement idea.
    Suggestion,
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Review => write!(f, "review"),
            Self::Suggestion => write!(f, "suggestion"),
        }
    }
}

/// A feedback submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFeedback {
    pub kind: FeedbackKind,
    pub content: FeedbackContent,
}

/// A stored feedback message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub kind: FeedbackKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn post(publish_at: Option<DateTime<Utc>>) -> HealthPost {
        HealthPost {
            id: PostId::new(1),
            title: "Rhume".to_string(),
            body: "Reposez-vous.".to_string(),
            image_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            publish_at,
            likes: 0,
        }
    }

    #[test]
    fn test_post_without_schedule_is_visible() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert!(post(None).is_visible(now));
    }

    #[test]
    fn test_scheduled_post_visibility() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert!(!post(Some(now + Duration::minutes(1))).is_visible(now));
        assert!(post(Some(now)).is_visible(now));
        assert!(post(Some(now - Duration::days(1))).is_visible(now));
    }

    #[test]
    fn test_update_publish_at_tri_state() {
        let absent: HealthPostUpdate =
            serde_json::from_str(r#"{"title":"t","body":"b"}"#).unwrap();
        assert_eq!(absent.publish_at, None);

        let cleared: HealthPostUpdate =
            serde_json::from_str(r#"{"title":"t","body":"b","publish_at":null}"#).unwrap();
        assert_eq!(cleared.publish_at, Some(None));

        let set: HealthPostUpdate = serde_json::from_str(
            r#"{"title":"t","body":"b","publish_at":"2024-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            set.publish_at,
            Some(Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()))
        );
    }

    #[test]
    fn test_update_apply_keeps_schedule_when_absent() {
        let scheduled = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut stored = post(Some(scheduled));
        let update = HealthPostUpdate {
            title: "Grippe".to_string(),
            body: "Hydratez-vous.".to_string(),
            ..HealthPostUpdate::default()
        };
        update.apply_to(&mut stored);
        assert_eq!(stored.title, "Grippe");
        assert_eq!(stored.publish_at, Some(scheduled));

        let clear = HealthPostUpdate {
            publish_at: Some(None),
            ..update
        };
        clear.apply_to(&mut stored);
        assert_eq!(stored.publish_at, None);
    }

    #[test]
    fn test_new_post_requires_title_and_body() {
        let new = NewHealthPost {
            title: " ".to_string(),
            body: "x".to_string(),
            image_url: None,
            publish_at: None,
        };
        assert_eq!(
            new.validate(),
            Err(ValidationError::Empty { field: "title" })
        );
    }

    #[test]
    fn test_feedback_kind_accepts_french_alias() {
        let kind: FeedbackKind = serde_json::from_str("\"avis\"").unwrap();
        assert_eq!(kind, FeedbackKind::Review);
        assert_eq!(FeedbackKind::Suggestion.to_string(), "suggestion");
    }
}
