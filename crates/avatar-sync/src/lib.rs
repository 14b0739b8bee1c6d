//! Avatar sync
//!
//! Turns the avatar identifiers attached to players into displayable image
//! URIs. Each screen owns an [`AvatarResolver`] whose sync map is read on every
//! render through [`AvatarResolver::peek`]; resolution itself is triggered
//! when new player data arrives. Lookups go to the on-disk blob store first
//! and to the game server only on a miss, with at most one request in flight
//! per identifier.

pub mod cache;
pub mod config;
pub mod error;
mod in_flight;
pub mod resolver;
pub mod self_avatar;
pub mod source;
pub mod sync_map;

#[cfg(test)]
mod test_support;

pub use cache::{AvatarCache, MaintenanceReport};
pub use config::CacheConfig;
pub use error::{Result, SyncError};
pub use resolver::{AvatarResolver, PlayerRef};
pub use self_avatar::{LocalProfile, SelfAvatarLoader};
pub use source::AvatarSource;
pub use sync_map::SyncMap;
