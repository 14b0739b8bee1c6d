//! Persisted avatar index: avatar id -> last write time (Unix millis)
//!
//! The index lives under one key of the host key-value store. Every
//! read-modify-write cycle holds the index lock for its whole duration, so
//! writers (including overlapping eviction passes) are serialized and cannot
//! write back stale subsets of each other's work.

use crate::error::Result;
use local_kv_store::KeyValueStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Key of the index in the host key-value store. Must stay outside the
/// legacy cache namespace.
pub const INDEX_KEY: &str = "avatar_file_index_v2";

pub type IndexEntries = BTreeMap<String, i64>;

pub struct CacheIndex {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Mutex<()>,
}

/// Exclusive handle on the index for one read-modify-write cycle
pub struct IndexTransaction<'a> {
    index: &'a CacheIndex,
    _guard: MutexGuard<'a, ()>,
    pub entries: IndexEntries,
}

impl CacheIndex {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, INDEX_KEY)
    }

    pub fn with_key(kv: Arc<dyn KeyValueStore>, key: &str) -> Self {
        Self {
            kv,
            key: key.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the current index without taking the write lock
    pub async fn snapshot(&self) -> Result<IndexEntries> {
        self.load().await
    }

    /// Start an exclusive read-modify-write cycle
    pub async fn begin(&self) -> Result<IndexTransaction<'_>> {
        let guard = self.write_lock.lock().await;
        let entries = self.load().await?;
        Ok(IndexTransaction {
            index: self,
            _guard: guard,
            entries,
        })
    }

    /// Record a write of `id` at `timestamp`
    pub async fn record(&self, id: &str, timestamp: i64) -> Result<()> {
        let mut tx = self.begin().await?;
        tx.entries.insert(id.to_string(), timestamp);
        tx.commit().await
    }

    /// Drop `id` from the index if present
    pub async fn forget(&self, id: &str) -> Result<()> {
        let mut tx = self.begin().await?;
        if tx.entries.remove(id).is_none() {
            return Ok(());
        }
        tx.commit().await
    }

    async fn load(&self) -> Result<IndexEntries> {
        let Some(raw) = self.kv.get(&self.key).await? else {
            return Ok(IndexEntries::new());
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Avatar index is corrupt, treating as empty");
                Ok(IndexEntries::new())
            }
        }
    }
}

impl IndexTransaction<'_> {
    /// Write the modified entries back as a whole
    pub async fn commit(self) -> Result<()> {
        let raw = serde_json::to_string(&self.entries)
            .map_err(local_kv_store::KvError::from)?;
        self.index.kv.set(&self.index.key, &raw).await?;
        Ok(())
    }
}

/// Ids selected for removal by one eviction pass
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EvictionPlan {
    pub expired: Vec<String>,
    pub trimmed: Vec<String>,
}

/// Decide which entries to evict
///
/// Entries whose age is at least `max_age_millis` expire. If `max_entries` is
/// set, the oldest survivors (ties broken by id) are trimmed until the count
/// fits.
pub fn plan_eviction(
    entries: &IndexEntries,
    now_millis: i64,
    max_age_millis: i64,
    max_entries: Option<usize>,
) -> EvictionPlan {
    let mut plan = EvictionPlan::default();
    let mut survivors: Vec<(&String, i64)> = Vec::new();

    for (id, &written_at) in entries {
        if now_millis.saturating_sub(written_at) >= max_age_millis {
            plan.expired.push(id.clone());
        } else {
            survivors.push((id, written_at));
        }
    }

    if let Some(limit) = max_entries {
        if survivors.len() > limit {
            survivors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
            let excess = survivors.len() - limit;
            plan.trimmed = survivors[..excess]
                .iter()
                .map(|(id, _)| (*id).clone())
                .collect();
        }
    }

    plan
}
