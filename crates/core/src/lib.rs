//! PharmaGuard Core - Shared domain library.
//!
//! This crate provides the domain logic shared by all PharmaGuard components:
//! - `portal` - HTTP API serving the duty roster and the health feed
//! - `cli` - Command-line tools for migrations, roster import and reading
//!
//! # Architecture
//!
//! The core crate contains no database access and no HTTP client. Remote
//! engagement calls and device storage are traits implemented elsewhere, so
//! everything here can be tested in-process.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, roster and health feed types, validated text
//! - [`week`] - Week label parsing and active-week resolution
//! - [`navigator`] - Bounds-checked cursor over a roster
//! - [`device`] - Device-local storage for liked posts and the cached roster
//! - [`ledger`] - Optimistic like and comment state

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod device;
pub mod ledger;
pub mod navigator;
pub mod types;
pub mod week;

pub use device::{DeviceStorage, DeviceStorageError, LikedPosts, MemoryDeviceStorage};
pub use ledger::{
    CommentKey, DisplayComment, EngagementLedger, EngagementRemote, LedgerError, LikeState,
    RemoteError,
};
pub use navigator::ScheduleNavigator;
pub use types::*;
pub use week::{ActiveWeekResolver, WeekInterval, WeekLabelError};
