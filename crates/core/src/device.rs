//! Device-local key-value storage.
//!
//! Each device keeps two things across sessions: the set of posts it has
//! liked and a cached copy of the roster for offline display. Both go
//! through [`DeviceStorage`], which is injected rather than reached through
//! global state. A missing key reads as empty, and so does a corrupt one
//! (with a warning), so a damaged cache never blocks startup.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::types::{PostId, WeekSchedule};

/// Key holding the JSON array of liked post ids.
pub const LIKED_POSTS_KEY: &str = "liked_posts";

/// Key holding the JSON-encoded cached roster.
pub const ROSTER_CACHE_KEY: &str = "roster_cache";

/// Errors from a device storage backend.
#[derive(thiserror::Error, Debug)]
pub enum DeviceStorageError {
    #[error("device storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("device storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// String key-value storage scoped to one device.
pub trait DeviceStorage: Send + Sync {
    /// Read a value. `Ok(None)` when the key has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, DeviceStorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn store(&self, key: &str, value: &str) -> Result<(), DeviceStorageError>;
}

/// Read a JSON value, treating absence and corruption as `T::default()`.
fn load_json<T>(storage: &dyn DeviceStorage, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match storage.load(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "Discarding corrupt device storage value");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "Device storage unreadable, starting empty");
            T::default()
        }
    }
}

fn store_json<T: Serialize>(
    storage: &dyn DeviceStorage,
    key: &str,
    value: &T,
) -> Result<(), DeviceStorageError> {
    let raw = serde_json::to_string(value)?;
    storage.store(key, &raw)
}

/// Posts liked from this device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikedPosts(BTreeSet<PostId>);

impl LikedPosts {
    /// Load the liked set; empty when absent or unreadable.
    #[must_use]
    pub fn load(storage: &dyn DeviceStorage) -> Self {
        Self(load_json(storage, LIKED_POSTS_KEY))
    }

    /// Persist the liked set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn save(&self, storage: &dyn DeviceStorage) -> Result<(), DeviceStorageError> {
        store_json(storage, LIKED_POSTS_KEY, &self.0)
    }

    #[must_use]
    pub fn contains(&self, post: PostId) -> bool {
        self.0.contains(&post)
    }

    /// Mark or unmark a post as liked.
    pub fn set(&mut self, post: PostId, liked: bool) {
        if liked {
            self.0.insert(post);
        } else {
            self.0.remove(&post);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Load the cached roster; empty when absent or unreadable.
#[must_use]
pub fn load_cached_roster(storage: &dyn DeviceStorage) -> Vec<WeekSchedule> {
    load_json(storage, ROSTER_CACHE_KEY)
}

/// Replace the cached roster.
///
/// # Errors
///
/// Returns an error if the backend cannot be written.
pub fn save_cached_roster(
    storage: &dyn DeviceStorage,
    roster: &[WeekSchedule],
) -> Result<(), DeviceStorageError> {
    store_json(storage, ROSTER_CACHE_KEY, &roster)
}

/// In-memory device storage.
#[derive(Debug, Default)]
pub struct MemoryDeviceStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryDeviceStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStorage for MemoryDeviceStorage {
    fn load(&self, key: &str) -> Result<Option<String>, DeviceStorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), DeviceStorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Pharmacy;

    #[test]
    fn test_liked_posts_absent_is_empty() {
        let storage = MemoryDeviceStorage::new();
        assert!(LikedPosts::load(&storage).is_empty());
    }

    #[test]
    fn test_liked_posts_corrupt_is_empty() {
        let storage = MemoryDeviceStorage::new();
        storage.store(LIKED_POSTS_KEY, "{not json").unwrap();
        assert!(LikedPosts::load(&storage).is_empty());
    }

    #[test]
    fn test_liked_posts_persist() {
        let storage = MemoryDeviceStorage::new();
        let mut liked = LikedPosts::default();
        liked.set(PostId::new(3), true);
        liked.set(PostId::new(5), true);
        liked.set(PostId::new(3), false);
        liked.save(&storage).unwrap();

        assert_eq!(storage.load(LIKED_POSTS_KEY).unwrap().as_deref(), Some("[5]"));
        let reloaded = LikedPosts::load(&storage);
        assert!(reloaded.contains(PostId::new(5)));
        assert!(!reloaded.contains(PostId::new(3)));
    }

    #[test]
    fn test_cached_roster_persist() {
        let storage = MemoryDeviceStorage::new();
        assert!(load_cached_roster(&storage).is_empty());

        let roster = vec![WeekSchedule::new(
            "01/01/24 au 07/01/24",
            vec![Pharmacy {
                name: "Pharmacie Centrale".to_string(),
                location: "Place du marché".to_string(),
                primary_contact: "0102".to_string(),
                secondary_contact: String::new(),
                latitude: Some(5.35),
                longitude: Some(-4.01),
            }],
        )];
        save_cached_roster(&storage, &roster).unwrap();
        assert_eq!(load_cached_roster(&storage), roster);
    }
}
