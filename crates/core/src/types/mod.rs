//! Core types for PharmaGuard.
//!
//! This module provides the roster and health feed domain types plus
//! type-safe wrappers for store keys and validated user input.

pub mod id;
pub mod post;
pub mod roster;
pub mod text;

pub use id::*;
pub use post::{
    Comment, Feedback, FeedbackKind, HealthPost, HealthPostUpdate, NewFeedback, NewHealthPost,
};
pub use roster::{Pharmacy, WeekSchedule};
pub use text::{CommentBody, FeedbackContent, ValidationError};
