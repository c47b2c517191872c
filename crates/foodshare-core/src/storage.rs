//! Credential storage behind the session store.
//!
//! Stores the bearer token and the serialized identity in
//! `<home>/credentials.json` with restricted permissions (0600).
//! Tokens are never logged.
//!
//! The session store is the only writer; everything else goes through it.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::config::paths;

/// Storage key for the bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the serialized identity record.
pub const USER_KEY: &str = "user";

/// A string-keyed store that survives process restarts.
///
/// Abstracted as a trait so tests (and embedders) can substitute an
/// in-memory fake for the on-disk default.
pub trait CredentialStorage: Send + Sync {
    /// Reads an entry. Absent or unreadable storage reads as `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes an entry.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes an entry. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed storage at a fixed path, one JSON map per file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at the default credentials path under the FoodShare home.
    pub fn new() -> Self {
        Self::at(paths::credentials_path())
    }

    /// Storage at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the map, treating a missing or corrupt file as empty.
    ///
    /// Fail-open: a credentials file that cannot be parsed must read as
    /// "no session", not as an error the caller has to handle.
    fn load_map(&self) -> HashMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return HashMap::new();
        };

        match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "ignoring unparseable credentials file"
                );
                HashMap::new()
            }
        }
    }

    /// Saves the map with restricted permissions (0600).
    fn save_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(map).context("Failed to serialize credentials")?;

        // Write with restricted permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }
}

impl Default for FileStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.load_map().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.load_map();
        map.insert(key.to_string(), value.to_string());
        self.save_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.load_map();
        if map.remove(key).is_some() {
            self.save_map(&map)?;
        }
        Ok(())
    }
}

/// In-memory storage for tests and embedding.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated storage, for seeding restore scenarios.
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }
}

impl CredentialStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    /// File storage round-trips entries.
    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::at(dir.path().join("credentials.json"));

        storage.set(ACCESS_TOKEN_KEY, "tok-123").unwrap();
        storage.set(USER_KEY, r#"{"name":"Ann"}"#).unwrap();

        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("tok-123"));
        assert_eq!(storage.get(USER_KEY).as_deref(), Some(r#"{"name":"Ann"}"#));
    }

    /// Removing entries persists, and removing twice is harmless.
    #[test]
    fn test_file_storage_remove() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::at(dir.path().join("credentials.json"));

        storage.set(ACCESS_TOKEN_KEY, "tok-123").unwrap();
        storage.remove(ACCESS_TOKEN_KEY).unwrap();
        storage.remove(ACCESS_TOKEN_KEY).unwrap();

        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
    }

    /// A missing file reads as empty.
    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::at(dir.path().join("credentials.json"));

        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
    }

    /// A corrupt file reads as empty instead of erroring.
    #[test]
    fn test_file_storage_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{not json at all").unwrap();

        let storage = FileStorage::at(path.clone());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);

        // A write through the same storage recovers the file.
        storage.set(ACCESS_TOKEN_KEY, "tok-456").unwrap();
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("tok-456"));
    }

    /// Credentials file is not world-readable.
    #[cfg(unix)]
    #[test]
    fn test_file_storage_restricted_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let storage = FileStorage::at(path.clone());

        storage.set(ACCESS_TOKEN_KEY, "tok-123").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    /// Memory storage honors the same contract.
    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();

        storage.set(USER_KEY, "{}").unwrap();
        assert_eq!(storage.get(USER_KEY).as_deref(), Some("{}"));

        storage.remove(USER_KEY).unwrap();
        storage.remove(USER_KEY).unwrap();
        assert_eq!(storage.get(USER_KEY), None);
    }
}
