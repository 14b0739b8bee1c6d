//! Process-wide wiring of the avatar cache

use crate::config::CacheConfig;
use crate::resolver::AvatarResolver;
use crate::self_avatar::SelfAvatarLoader;
use crate::source::AvatarSource;
use avatar_blob_store::{purge_legacy_once, AvatarBlobStore, EvictionReport, PurgeReport};
use avatar_channel_client::AvatarChannel;
use local_kv_store::{JsonFileStore, KeyValueStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The shared pieces every screen's resolver is built from
pub struct AvatarCache {
    kv: Arc<dyn KeyValueStore>,
    store: Arc<AvatarBlobStore>,
    source: Arc<dyn AvatarSource>,
    max_age: Duration,
}

/// Result of a startup maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub purge: Option<PurgeReport>,
    pub eviction: Option<EvictionReport>,
}

impl AvatarCache {
    /// Build the cache from `config`, using the game server channel as source
    ///
    /// Nothing is connected or created on disk until first use.
    pub fn open(config: &CacheConfig) -> Self {
        let kv: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.kv_path));
        let source: Arc<dyn AvatarSource> = Arc::new(AvatarChannel::new(config.channel_config()));
        Self::with_parts(config, kv, source)
    }

    pub fn with_parts(
        config: &CacheConfig,
        kv: Arc<dyn KeyValueStore>,
        source: Arc<dyn AvatarSource>,
    ) -> Self {
        let store = AvatarBlobStore::new(&config.cache_dir, kv.clone())
            .with_max_entries(config.max_entries);

        Self {
            kv,
            store: Arc::new(store),
            source,
            max_age: config.max_age(),
        }
    }

    pub fn store(&self) -> &Arc<AvatarBlobStore> {
        &self.store
    }

    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// A fresh resolver for one screen
    pub fn resolver(&self) -> AvatarResolver {
        AvatarResolver::new(self.store.clone(), self.source.clone())
    }

    pub fn self_avatar(&self) -> SelfAvatarLoader {
        SelfAvatarLoader::new(self.kv.clone())
    }

    /// Purge the legacy cache (once) and evict with the configured age
    ///
    /// Each step is best-effort; failures are logged and reported as `None`.
    pub async fn maintain(&self) -> MaintenanceReport {
        self.maintain_with(self.max_age, true).await
    }

    /// Maintenance with an explicit age, e.g. `Duration::ZERO` when the
    /// device is low on storage
    pub async fn maintain_with(&self, max_age: Duration, purge_legacy: bool) -> MaintenanceReport {
        let purge = if purge_legacy {
            match purge_legacy_once(self.kv.as_ref()).await {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(error = %e, "Legacy avatar cache purge failed");
                    None
                }
            }
        } else {
            None
        };

        let eviction = match self.store.evict(max_age).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Avatar cache eviction failed");
                None
            }
        };

        info!(
            purged = purge.as_ref().map(|p| p.removed).unwrap_or(0),
            evicted = eviction.as_ref().map(|e| e.expired + e.trimmed).unwrap_or(0),
            "Avatar cache maintenance finished"
        );

        MaintenanceReport { purge, eviction }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSource;
    use avatar_protocol::AvatarResponse;
    use local_kv_store::MemoryStore;
    use tempfile::tempdir;

    fn config_in(dir: &tempfile::TempDir) -> CacheConfig {
        CacheConfig {
            cache_dir: dir.path().join("avatars"),
            kv_path: dir.path().join("kv.json"),
            ..CacheConfig::default()
        }
    }

    #[tokio::test]
    async fn test_open_is_lazy() {
        let dir = tempdir().unwrap();
        let cache = AvatarCache::open(&config_in(&dir));

        assert!(cache.resolver().peek("anyone").is_none());
        assert!(!dir.path().join("avatars").exists());
        assert!(!dir.path().join("kv.json").exists());
    }

    #[tokio::test]
    async fn test_maintain_purges_legacy_and_keeps_fresh_blobs() {
        let dir = tempdir().unwrap();
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        kv.set("avatar_cache_av-1", "data:image/jpeg;base64,Zm9v")
            .await
            .unwrap();
        kv.set("avatar_cache_index", "[\"av-1\"]").await.unwrap();

        let source = Arc::new(FakeSource::new());
        source.respond("av-1", AvatarResponse::success("data:image/jpeg;base64,Zm9v"));
        let cache = AvatarCache::with_parts(&config_in(&dir), kv.clone(), source);

        cache.resolver().resolve("alice", Some("av-1")).await;

        let report = cache.maintain().await;
        assert_eq!(report.purge.unwrap().removed, 2);
        assert_eq!(report.eviction.unwrap().retained, 1);
        assert!(cache.store().exists("av-1").await);

        let aggressive = cache.maintain_with(Duration::ZERO, false).await;
        assert!(aggressive.purge.is_none());
        assert_eq!(aggressive.eviction.unwrap().expired, 1);
        assert!(!cache.store().exists("av-1").await);
    }

    #[tokio::test]
    async fn test_screens_get_independent_resolvers() {
        let dir = tempdir().unwrap();
        let source = Arc::new(FakeSource::new());
        source.respond("av-1", AvatarResponse::success("data:image/jpeg;base64,Zm9v"));
        let cache = AvatarCache::with_parts(
            &config_in(&dir),
            Arc::new(MemoryStore::new()),
            source.clone(),
        );

        let lobby = cache.resolver();
        let game = cache.resolver();
        lobby.resolve("alice", Some("av-1")).await;

        assert!(game.peek("alice").is_none());
        assert!(game.resolve("alice", Some("av-1")).await.is_some());
        assert_eq!(source.calls(), 1);
    }
}
