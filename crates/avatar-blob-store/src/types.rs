//! Report and statistics types

use serde::{Deserialize, Serialize};

/// Statistics about the blob store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Outcome of one eviction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionReport {
    /// Entries removed for exceeding the maximum age
    pub expired: usize,
    /// Entries removed to bring the cache under the entry limit
    pub trimmed: usize,
    /// Entries left in the index afterwards
    pub retained: usize,
    /// Blob files found on disk without an index entry and indexed
    pub adopted: usize,
}

/// Outcome of a legacy cache purge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub removed: usize,
    /// True when a previous run's completion marker short-circuited the purge
    pub skipped: bool,
}
