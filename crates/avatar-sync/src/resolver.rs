//! Coalescing avatar resolver

use crate::error::{Result, SyncError};
use crate::in_flight::{Claim, InFlight, InFlightClaim};
use crate::source::AvatarSource;
use crate::sync_map::SyncMap;
use avatar_blob_store::{data_uri, is_temporary, AvatarBlobStore, BlobStoreError};
use avatar_protocol::ProtocolError;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// A player as delivered in a lobby or table snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRef {
    pub handle: Option<String>,
    pub avatar_id: Option<String>,
}

impl PlayerRef {
    pub fn new(handle: &str, avatar_id: Option<&str>) -> Self {
        Self {
            handle: Some(handle.to_string()),
            avatar_id: avatar_id.map(str::to_string),
        }
    }
}

/// Resolves player avatars for one screen
///
/// Owns the screen's sync map and in-flight set; shares the blob store and
/// avatar source with every other resolver. Dropping the resolver discards
/// its sync map, though a fetch already running still lands in the blob
/// store.
pub struct AvatarResolver {
    store: Arc<AvatarBlobStore>,
    source: Arc<dyn AvatarSource>,
    sync_map: SyncMap,
    in_flight: Arc<InFlight>,
}

impl AvatarResolver {
    pub fn new(store: Arc<AvatarBlobStore>, source: Arc<dyn AvatarSource>) -> Self {
        Self {
            store,
            source,
            sync_map: SyncMap::new(),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Display URI already resolved for `handle`, without fetching
    pub fn peek(&self, handle: &str) -> Option<String> {
        self.sync_map.get(handle)
    }

    /// Show `display_uri` for `handle` right away, bypassing the blob store
    ///
    /// Used for the local user's freshly chosen avatar before the server has
    /// assigned it an identifier. A later successful [`resolve`] for the
    /// handle replaces it.
    ///
    /// [`resolve`]: AvatarResolver::resolve
    pub fn set_local_override(&self, handle: &str, display_uri: &str) {
        debug!(handle, "Applying local avatar override");
        self.sync_map.insert(handle, display_uri.to_string());
    }

    pub fn sync_map(&self) -> &SyncMap {
        &self.sync_map
    }

    /// Number of avatar ids with a fetch in progress
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Resolve the avatar `avatar_id` for `handle`
    ///
    /// Returns `None` when the player has no avatar, the fetch failed, or a
    /// fetch for the same id is already running; in the last case the sync
    /// map is filled for `handle` once that fetch lands.
    ///
    /// The network fetch runs on its own task. Dropping this future stops
    /// waiting for it but the fetch still completes, persists the blob and
    /// fills the sync map for every handle that asked.
    pub async fn resolve(&self, handle: &str, avatar_id: Option<&str>) -> Option<String> {
        let avatar_id = match avatar_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return None,
        };

        if is_temporary(avatar_id) {
            debug!(handle, avatar_id, "Skipping placeholder avatar id");
            return None;
        }

        if let Some(uri) = self.store.read(avatar_id).await {
            self.sync_map.insert(handle, uri.clone());
            return Some(uri);
        }

        let claim = match self.in_flight.claim(avatar_id, handle) {
            Claim::Owner(claim) => claim,
            Claim::Joined => {
                debug!(handle, avatar_id, "Avatar fetch already in flight");
                return None;
            }
        };

        let task = tokio::spawn(fetch_and_fill(
            self.store.clone(),
            self.source.clone(),
            self.sync_map.clone(),
            claim,
        ));

        match task.await {
            Ok(uri) => uri,
            Err(e) => {
                warn!(avatar_id, error = %e, "Avatar fetch task failed");
                None
            }
        }
    }

    /// Resolve every player that has both a handle and an avatar id
    ///
    /// Players resolve concurrently and independently. Returns how many
    /// resolved during this call.
    pub async fn resolve_many(&self, players: &[PlayerRef]) -> usize {
        let pending = players.iter().filter_map(|player| {
            let handle = player.handle.as_deref()?;
            let avatar_id = player.avatar_id.as_deref()?;
            Some(self.resolve(handle, Some(avatar_id)))
        });

        let resolved = join_all(pending)
            .await
            .into_iter()
            .filter(Option::is_some)
            .count();

        debug!(players = players.len(), resolved, "Resolved player avatars");
        resolved
    }
}

/// Fetch the claimed id, then fill the sync map for every waiting handle
async fn fetch_and_fill(
    store: Arc<AvatarBlobStore>,
    source: Arc<dyn AvatarSource>,
    sync_map: SyncMap,
    claim: InFlightClaim,
) -> Option<String> {
    let avatar_id = claim.avatar_id().to_string();
    let outcome = fetch(&store, source.as_ref(), &avatar_id).await;
    let handles = claim.release();

    match outcome {
        Ok(uri) => {
            for waiting in &handles {
                sync_map.insert(waiting, uri.clone());
            }
            debug!(avatar_id = %avatar_id, handles = handles.len(), "Resolved avatar");
            Some(uri)
        }
        Err(e) => {
            warn!(avatar_id = %avatar_id, error = %e, "Avatar fetch failed");
            None
        }
    }
}

/// Fetch from the source and persist data-URI payloads
async fn fetch(
    store: &AvatarBlobStore,
    source: &dyn AvatarSource,
    avatar_id: &str,
) -> Result<String> {
    // A fetch by another resolver may have landed since our miss
    if let Some(uri) = store.read(avatar_id).await {
        return Ok(uri);
    }

    let avatar_url = source.fetch_avatar(avatar_id).await?.into_avatar_url()?;

    if !data_uri::is_data_uri(&avatar_url) {
        debug!(avatar_id, "Avatar is a remote URL, not caching");
        return Ok(avatar_url);
    }

    match store.write(avatar_id, &avatar_url).await {
        Ok(()) => {}
        Err(BlobStoreError::Decode(msg)) => {
            return Err(SyncError::Protocol(ProtocolError::Malformed(msg)));
        }
        Err(e) => warn!(avatar_id, error = %e, "Failed to cache avatar"),
    }

    Ok(avatar_url)
}
