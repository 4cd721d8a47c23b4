//! Validated user-submitted text.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors raised when user input fails local validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty or whitespace.
    #[error("{field} cannot be empty")]
    Empty {
        /// Field name.
        field: &'static str,
    },
    /// The input is shorter than allowed.
    #[error("{field} must be at least {min} characters")]
    TooShort {
        /// Field name.
        field: &'static str,
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is longer than allowed.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
}

/// Check a length constraint counted in characters, not bytes.
fn check_length(
    field: &'static str,
    s: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let len = s.chars().count();
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// The body of a comment.
///
/// ## Constraints
///
/// - Length: 1-300 characters
/// - Must contain at least one non-whitespace character
///
/// ```
/// use pharmaguard_core::CommentBody;
///
/// assert!(CommentBody::parse("Merci pour ces conseils").is_ok());
/// assert!(CommentBody::parse("").is_err());
/// assert!(CommentBody::parse(&"a".repeat(301)).is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CommentBody(String);

impl CommentBody {
    /// Maximum comment length in characters.
    pub const MAX_LENGTH: usize = 300;

    /// Parse a comment body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is blank or longer than 300 characters.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        check_length("comment", s, 1, Self::MAX_LENGTH)?;
        Ok(Self(s.to_owned()))
    }

    /// Returns the body as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the body and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CommentBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CommentBody {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_length("comment", &value, 1, Self::MAX_LENGTH)?;
        Ok(Self(value))
    }
}

impl From<CommentBody> for String {
    fn from(body: CommentBody) -> Self {
        body.0
    }
}

/// The content of a feedback message (10-500 characters).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct FeedbackContent(String);

impl FeedbackContent {
    /// Minimum feedback length in characters.
    pub const MIN_LENGTH: usize = 10;
    /// Maximum feedback length in characters.
    pub const MAX_LENGTH: usize = 500;

    /// Parse feedback content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is blank, shorter than 10 or longer
    /// than 500 characters.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        check_length("feedback", s, Self::MIN_LENGTH, Self::MAX_LENGTH)?;
        Ok(Self(s.to_owned()))
    }

    /// Returns the content as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FeedbackContent {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FeedbackContent> for String {
    fn from(content: FeedbackContent) -> Self {
        content.0
    }
}

/// Require a non-blank field.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] if the value is blank.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_body_bounds() {
        assert!(CommentBody::parse("a").is_ok());
        assert!(CommentBody::parse(&"a".repeat(300)).is_ok());
        assert_eq!(
            CommentBody::parse(&"a".repeat(301)),
            Err(ValidationError::TooLong {
                field: "comment",
                max: 300
            })
        );
    }

    #[test]
    fn test_comment_body_rejects_blank() {
        assert_eq!(
            CommentBody::parse(""),
            Err(ValidationError::Empty { field: "comment" })
        );
        assert!(CommentBody::parse("   \n").is_err());
    }

    #[test]
    fn test_comment_body_counts_characters_not_bytes() {
        // 300 two-byte characters is still within the limit
        assert!(CommentBody::parse(&"é".repeat(300)).is_ok());
    }

    #[test]
    fn test_comment_body_deserialize_validates() {
        let ok: Result<CommentBody, _> = serde_json::from_str("\"bonjour\"");
        assert!(ok.is_ok());
        let err: Result<CommentBody, _> = serde_json::from_str("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_feedback_content_bounds() {
        assert!(matches!(
            FeedbackContent::parse("too short"),
            Err(ValidationError::TooShort { min: 10, .. })
        ));
        assert!(FeedbackContent::parse("long enough text").is_ok());
        assert!(FeedbackContent::parse(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::TooLong {
            field: "comment",
            max: 300,
        };
        assert_eq!(err.to_string(), "comment must be at most 300 characters");
    }
}
