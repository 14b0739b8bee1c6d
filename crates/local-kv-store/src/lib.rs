//! Local key-value storage
//!
//! A small async string-to-string store used for durable on-device state:
//! user settings, the local profile, and cache metadata. Mirrors the shape of
//! the embedded key-value stores mobile hosts expose, including their size
//! limits.

pub mod error;
pub mod json_file;
pub mod memory;
pub mod store;

pub use error::{KvError, Result};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use store::KeyValueStore;
