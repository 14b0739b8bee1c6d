//! Cleanup of the deprecated key-value avatar cache
//!
//! The old scheme kept every avatar as a full base64 value under
//! `avatar_cache_<id>` inside the host key-value store, plus an
//! `avatar_cache_index` list. Under sustained play that filled the store's
//! size limit. Nothing writes there anymore; this module reclaims what is left.

use crate::error::Result;
use crate::types::PurgeReport;
use local_kv_store::KeyValueStore;
use tracing::{debug, info};

pub const LEGACY_PREFIX: &str = "avatar_cache_";
pub const LEGACY_INDEX_KEY: &str = "avatar_cache_index";

/// Set after a successful purge so later startups can skip the key scan
pub const PURGE_MARKER_KEY: &str = "avatar_legacy_purge_done";

pub fn is_legacy_key(key: &str) -> bool {
    key == LEGACY_INDEX_KEY || key.starts_with(LEGACY_PREFIX)
}

/// Delete every legacy cache key from `kv`
///
/// Safe to run repeatedly; keys outside the legacy namespace, including the
/// current avatar index, are never touched.
pub async fn purge_legacy(kv: &dyn KeyValueStore) -> Result<PurgeReport> {
    let legacy: Vec<String> = kv
        .keys()
        .await?
        .into_iter()
        .filter(|key| is_legacy_key(key))
        .collect();

    if legacy.is_empty() {
        debug!("No legacy avatar cache entries to purge");
        return Ok(PurgeReport::default());
    }

    kv.remove_many(&legacy).await?;
    info!(removed = legacy.len(), "Purged legacy avatar cache entries");

    Ok(PurgeReport {
        removed: legacy.len(),
        skipped: false,
    })
}

/// Run [`purge_legacy`] unless a previous run already completed
pub async fn purge_legacy_once(kv: &dyn KeyValueStore) -> Result<PurgeReport> {
    if kv.get(PURGE_MARKER_KEY).await?.is_some() {
        debug!("Legacy avatar cache already purged");
        return Ok(PurgeReport {
            removed: 0,
            skipped: true,
        });
    }

    let report = purge_legacy(kv).await?;
    kv.set(PURGE_MARKER_KEY, "1").await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::index::INDEX_KEY;
    use crate::store::AvatarBlobStore;
    use local_kv_store::MemoryStore;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn seeded() -> Arc<MemoryStore> {
        let kv = Arc::new(MemoryStore::new());
        kv.set("avatar_cache_av-1", "data:image/jpeg;base64,Zm9v")
            .await
            .unwrap();
        kv.set("avatar_cache_av-2", "data:image/jpeg;base64,YmFy")
            .await
            .unwrap();
        kv.set(LEGACY_INDEX_KEY, r#"["av-1","av-2"]"#).await.unwrap();
        kv.set("user_name", "Alice").await.unwrap();
        kv
    }

    #[test]
    fn test_marker_and_index_are_outside_legacy_namespace() {
        assert!(!is_legacy_key(INDEX_KEY));
        assert!(!is_legacy_key(PURGE_MARKER_KEY));
        assert!(is_legacy_key(LEGACY_INDEX_KEY));
        assert!(is_legacy_key("avatar_cache_abc"));
    }

    #[tokio::test]
    async fn test_purge_removes_only_legacy_keys() {
        let kv = seeded().await;

        let report = purge_legacy(kv.as_ref()).await.unwrap();
        assert_eq!(report.removed, 3);
        assert_eq!(kv.keys().await.unwrap(), vec!["user_name"]);
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let kv = seeded().await;

        purge_legacy(kv.as_ref()).await.unwrap();
        let after_first = kv.keys().await.unwrap();

        let second = purge_legacy(kv.as_ref()).await.unwrap();
        assert_eq!(second.removed, 0);
        assert_eq!(kv.keys().await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_purge_leaves_blob_store_untouched() {
        let dir = tempdir().unwrap();
        let kv = seeded().await;
        let store = AvatarBlobStore::new(dir.path(), kv.clone())
            .with_clock(Arc::new(ManualClock::new(1_000)));
        store.write("av-1", "Zm9v").await.unwrap();

        purge_legacy(kv.as_ref()).await.unwrap();

        assert!(store.exists("av-1").await);
        assert!(kv.get(INDEX_KEY).await.unwrap().is_some());
        assert_eq!(
            store.read("av-1").await.as_deref(),
            Some("data:image/jpeg;base64,Zm9v")
        );
    }

    #[tokio::test]
    async fn test_purge_once_skips_second_run() {
        let kv = seeded().await;

        let first = purge_legacy_once(kv.as_ref()).await.unwrap();
        assert_eq!(first.removed, 3);
        assert!(!first.skipped);

        // A stray legacy write after the marker is not rescanned
        kv.set("avatar_cache_late", "x").await.unwrap();
        let second = purge_legacy_once(kv.as_ref()).await.unwrap();
        assert!(second.skipped);
        assert!(kv.get("avatar_cache_late").await.unwrap().is_some());
    }
}
