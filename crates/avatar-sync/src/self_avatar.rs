//! The local user's own profile and avatar
//!
//! Read straight from durable local storage so the user's avatar can be shown
//! before any server round trip. Nothing here touches the blob store or the
//! network.

use crate::error::Result;
use crate::resolver::AvatarResolver;
use avatar_blob_store::{data_uri, temporary_avatar_id};
use local_kv_store::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, warn};

pub const USER_NAME_KEY: &str = "user_name";
pub const USER_HANDLE_KEY: &str = "user_handle";
pub const USER_AVATAR_KEY: &str = "user_avatar";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalProfile {
    pub name: Option<String>,
    pub handle: String,
    /// The stored avatar as a data URI, if one was chosen
    pub display_uri: Option<String>,
}

pub struct SelfAvatarLoader {
    kv: Arc<dyn KeyValueStore>,
}

impl SelfAvatarLoader {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn get_non_empty(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .kv
            .get(key)
            .await?
            .filter(|value| !value.trim().is_empty()))
    }

    /// Load the local profile; `None` when no handle has been stored yet
    pub async fn load(&self) -> Result<Option<LocalProfile>> {
        let Some(handle) = self.get_non_empty(USER_HANDLE_KEY).await? else {
            debug!("No local profile stored");
            return Ok(None);
        };
        let name = self.get_non_empty(USER_NAME_KEY).await?;

        let display_uri = match self.get_non_empty(USER_AVATAR_KEY).await? {
            Some(stored) => match data_uri::normalize(&stored) {
                Ok(uri) => Some(uri),
                Err(e) => {
                    warn!(handle = %handle, error = %e, "Stored avatar is unreadable");
                    None
                }
            },
            None => None,
        };

        Ok(Some(LocalProfile {
            name,
            handle,
            display_uri,
        }))
    }

    pub async fn save(&self, profile: &LocalProfile) -> Result<()> {
        self.kv.set(USER_HANDLE_KEY, &profile.handle).await?;

        match &profile.name {
            Some(name) => self.kv.set(USER_NAME_KEY, name).await?,
            None => self.kv.remove(USER_NAME_KEY).await?,
        }
        match &profile.display_uri {
            Some(uri) => self.kv.set(USER_AVATAR_KEY, uri).await?,
            None => self.kv.remove(USER_AVATAR_KEY).await?,
        }
        Ok(())
    }

    /// Load the profile and show its avatar in `resolver` immediately
    pub async fn apply_to(&self, resolver: &AvatarResolver) -> Result<Option<LocalProfile>> {
        let profile = self.load().await?;
        if let Some(LocalProfile {
            handle,
            display_uri: Some(uri),
            ..
        }) = &profile
        {
            resolver.set_local_override(handle, uri);
        }
        Ok(profile)
    }

    /// Show a newly chosen avatar right away and keep it in local storage
    ///
    /// Returns the placeholder id that stands for the image until the server
    /// assigns a real one. The placeholder never reaches the blob store.
    pub async fn choose_avatar(
        &self,
        resolver: &AvatarResolver,
        handle: &str,
        image: &str,
        now_millis: i64,
    ) -> Result<String> {
        let uri = data_uri::normalize(image)?;
        resolver.set_local_override(handle, &uri);
        self.kv.set(USER_AVATAR_KEY, &uri).await?;
        Ok(temporary_avatar_id(handle, now_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::test_support::FakeSource;
    use avatar_blob_store::AvatarBlobStore;
    use local_kv_store::MemoryStore;
    use tempfile::tempdir;

    fn resolver_in(dir: &tempfile::TempDir) -> AvatarResolver {
        let store = Arc::new(AvatarBlobStore::new(
            dir.path(),
            Arc::new(MemoryStore::new()),
        ));
        AvatarResolver::new(store, Arc::new(FakeSource::new()))
    }

    #[tokio::test]
    async fn test_load_without_handle_is_none() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(USER_NAME_KEY, "Alice").await.unwrap();

        let loader = SelfAvatarLoader::new(kv);
        assert!(loader.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_normalizes_bare_base64() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(USER_HANDLE_KEY, "alice").await.unwrap();
        kv.set(USER_NAME_KEY, "Alice").await.unwrap();
        kv.set(USER_AVATAR_KEY, "Zm9v").await.unwrap();

        let profile = SelfAvatarLoader::new(kv).load().await.unwrap().unwrap();
        assert_eq!(
            profile,
            LocalProfile {
                name: Some("Alice".to_string()),
                handle: "alice".to_string(),
                display_uri: Some("data:image/jpeg;base64,Zm9v".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_unreadable_avatar_is_dropped() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(USER_HANDLE_KEY, "alice").await.unwrap();
        kv.set(USER_AVATAR_KEY, "not base64 ***").await.unwrap();

        let profile = SelfAvatarLoader::new(kv).load().await.unwrap().unwrap();
        assert!(profile.display_uri.is_none());
        assert!(profile.name.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let kv = Arc::new(MemoryStore::new());
        let loader = SelfAvatarLoader::new(kv.clone());
        let profile = LocalProfile {
            name: None,
            handle: "bob".to_string(),
            display_uri: Some("data:image/png;base64,YmFy".to_string()),
        };

        loader.save(&profile).await.unwrap();
        assert_eq!(loader.load().await.unwrap(), Some(profile));
        assert!(kv.get(USER_NAME_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_to_sets_override() {
        let dir = tempdir().unwrap();
        let resolver = resolver_in(&dir);
        let kv = Arc::new(MemoryStore::new());
        kv.set(USER_HANDLE_KEY, "me").await.unwrap();
        kv.set(USER_AVATAR_KEY, "data:image/jpeg;base64,Zm9v")
            .await
            .unwrap();

        let profile = SelfAvatarLoader::new(kv).apply_to(&resolver).await.unwrap();
        assert!(profile.is_some());
        assert_eq!(
            resolver.peek("me").as_deref(),
            Some("data:image/jpeg;base64,Zm9v")
        );
    }

    #[tokio::test]
    async fn test_choose_avatar_is_visible_immediately() {
        let dir = tempdir().unwrap();
        let resolver = resolver_in(&dir);
        let kv = Arc::new(MemoryStore::new());
        let loader = SelfAvatarLoader::new(kv.clone());

        let placeholder = loader
            .choose_avatar(&resolver, "me", "YmFy", 1_700_000_000_000)
            .await
            .unwrap();

        assert_eq!(placeholder, "local_me_1700000000000");
        assert_eq!(
            resolver.peek("me").as_deref(),
            Some("data:image/jpeg;base64,YmFy")
        );
        assert_eq!(
            kv.get(USER_AVATAR_KEY).await.unwrap().as_deref(),
            Some("data:image/jpeg;base64,YmFy")
        );
    }

    #[tokio::test]
    async fn test_choose_avatar_storage_full_still_overrides() {
        let dir = tempdir().unwrap();
        let resolver = resolver_in(&dir);
        let loader = SelfAvatarLoader::new(Arc::new(MemoryStore::with_quota(8)));

        let result = loader
            .choose_avatar(&resolver, "me", "data:image/jpeg;base64,Zm9vYmFy", 1)
            .await;

        assert!(matches!(result, Err(SyncError::Kv(_))));
        assert!(resolver.peek("me").is_some());
    }
}
