//! Session-scoped player handle -> display URI map

use moka::sync::Cache;

/// In-memory map read on every render
///
/// Reads are synchronous and never trigger a fetch. The cache is unbounded:
/// entries leave only through `remove`, `clear`, or dropping the last clone.
/// Cloning shares the underlying map.
#[derive(Clone)]
pub struct SyncMap {
    entries: Cache<String, String>,
}

impl SyncMap {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    pub fn get(&self, handle: &str) -> Option<String> {
        self.entries.get(handle)
    }

    pub fn insert(&self, handle: &str, display_uri: String) {
        self.entries.insert(handle.to_string(), display_uri);
    }

    pub fn remove(&self, handle: &str) {
        self.entries.invalidate(handle);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for SyncMap {
    fn default() -> Self {
        Self::new()
    }
}
