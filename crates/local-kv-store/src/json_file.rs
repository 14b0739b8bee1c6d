//! Durable key-value store persisted as a single JSON object file

use crate::error::Result;
use crate::store::{check_quota, KeyValueStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Key-value store backed by one JSON file
///
/// The file is loaded on first access and rewritten after every mutation.
/// Writes go to a temporary sibling that is renamed over the original, so a
/// crash mid-write never leaves a truncated store behind.
pub struct JsonFileStore {
    path: PathBuf,
    quota: Option<usize>,
    entries: Mutex<Option<BTreeMap<String, String>>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota: None,
            entries: Mutex::new(None),
        }
    }

    /// Limit the store to `quota` bytes of keys plus values
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?path, "No store file yet, starting empty");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(path = ?path, error = %e, "Store file is corrupt, starting empty");
                Ok(BTreeMap::new())
            }
        }
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec(entries)?;
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Run `f` against the loaded entries, persisting if it reports a change
    async fn with_entries<T: Send>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> Result<(T, bool)> + Send,
    ) -> Result<T> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load(&self.path).await?);
        }
        let entries = guard.get_or_insert_with(BTreeMap::new);

        let mut working = entries.clone();
        let (value, changed) = f(&mut working)?;
        if changed {
            self.persist(&working).await?;
            *entries = working;
        }
        Ok(value)
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|entries| Ok((entries.get(key).cloned(), false)))
            .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let quota = self.quota;
        self.with_entries(|entries| {
            check_quota(entries, quota, key, value)?;
            entries.insert(key.to_string(), value.to_string());
            Ok(((), true))
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| Ok(((), entries.remove(key).is_some())))
            .await
    }

    async fn remove_many(&self, keys: &[String]) -> Result<()> {
        self.with_entries(|entries| {
            let before = entries.len();
            for key in keys {
                entries.remove(key);
            }
            Ok(((), entries.len() != before))
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.with_entries(|entries| Ok((entries.keys().cloned().collect(), false)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KvError;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("kv.json"));

        assert!(store.keys().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("kv.json");

        let store = JsonFileStore::new(&path);
        store.set("user_name", "Alice").await.unwrap();
        store.set("user_handle", "alice").await.unwrap();
        store.remove("user_handle").await.unwrap();
        drop(store);

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("user_name").await.unwrap().as_deref(),
            Some("Alice")
        );
        assert!(reopened.get("user_handle").await.unwrap().is_none());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, b"{ definitely not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.keys().await.unwrap().is_empty());

        store.set("k", "v").await.unwrap();
        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_remove_many() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("kv.json"));
        for key in ["a", "b", "c"] {
            store.set(key, "1").await.unwrap();
        }

        store
            .remove_many(&["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_quota_failure_is_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");
        let store = JsonFileStore::new(&path).with_quota(32);
        store.set("small", "value").await.unwrap();

        let result = store.set("big", &"Z".repeat(100)).await;
        assert!(matches!(result, Err(KvError::QuotaExceeded { .. })));

        let reopened = JsonFileStore::new(&path);
        assert!(reopened.get("big").await.unwrap().is_none());
        assert_eq!(reopened.get("small").await.unwrap().as_deref(), Some("value"));
    }
}
