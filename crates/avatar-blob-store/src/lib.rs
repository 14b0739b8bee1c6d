//! Avatar blob store
//!
//! Persists avatar images as one file per avatar identifier, tracks the last
//! write time of each blob in an index kept in the host key-value store, and
//! evicts blobs by age and count. Also purges the deprecated cache scheme that
//! stored whole base64 blobs inside the key-value store itself.

pub mod clock;
pub mod data_uri;
pub mod error;
pub mod id;
pub mod index;
pub mod legacy;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BlobStoreError, Result};
pub use id::{is_temporary, temporary_avatar_id};
pub use index::{CacheIndex, INDEX_KEY};
pub use legacy::{purge_legacy, purge_legacy_once, LEGACY_INDEX_KEY, LEGACY_PREFIX};
pub use store::{AvatarBlobStore, BLOB_EXTENSION, DEFAULT_MAX_AGE};
pub use types::{CacheStats, EvictionReport, PurgeReport};
