//! Device storage kept in a JSON file.
//!
//! The file holds one JSON object mapping storage keys to their string
//! values. Every write rewrites the whole file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use pharmaguard_core::{DeviceStorage, DeviceStorageError};

/// Device file used when `PHARMAGUARD_DEVICE_FILE` is unset.
pub const DEFAULT_DEVICE_FILE: &str = ".pharmaguard/device.json";

/// [`DeviceStorage`] backed by a single JSON file.
#[derive(Debug)]
pub struct FileDeviceStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDeviceStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Storage at `PHARMAGUARD_DEVICE_FILE`, or the default location.
    #[must_use]
    pub fn from_env() -> Self {
        let path = std::env::var("PHARMAGUARD_DEVICE_FILE")
            .unwrap_or_else(|_| DEFAULT_DEVICE_FILE.to_owned());
        Self::new(path)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, DeviceStorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl DeviceStorage for FileDeviceStorage {
    fn load(&self, key: &str) -> Result<Option<String>, DeviceStorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn store(&self, key: &str, value: &str) -> Result<(), DeviceStorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut values = match self.read_all() {
            Ok(values) => values,
            Err(DeviceStorageError::Encoding(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Replacing corrupt device file"
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_owned(), value.to_owned());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&values)?)?;
        Ok(())
    }
}
