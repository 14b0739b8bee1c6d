//! Directory-backed avatar blob store

use crate::clock::{Clock, SystemClock};
use crate::data_uri;
use crate::error::Result;
use crate::id::validate;
use crate::index::{plan_eviction, CacheIndex};
use crate::types::{CacheStats, EvictionReport};
use local_kv_store::KeyValueStore;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Extension of every blob file; the payload is always written as raw bytes
pub const BLOB_EXTENSION: &str = "jpg";

/// Maximum blob age used when the caller has no preference
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const TMP_SUFFIX: &str = ".tmp";

/// Distinguishes temp files of concurrent writers of the same id
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// One file per avatar id under `root`, plus an age index in the host
/// key-value store
pub struct AvatarBlobStore {
    root: PathBuf,
    index: CacheIndex,
    clock: Arc<dyn Clock>,
    max_entries: Option<usize>,
    root_ready: OnceCell<()>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AvatarBlobStore {
    pub fn new(root: impl Into<PathBuf>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            root: root.into(),
            index: CacheIndex::new(kv),
            clock: Arc::new(SystemClock),
            max_entries: None,
            root_ready: OnceCell::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cap the number of blobs kept after each eviction pass
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    fn blob_path(&self, id: &str) -> Result<PathBuf> {
        validate(id)?;
        Ok(self.root.join(format!("{}.{}", id, BLOB_EXTENSION)))
    }

    async fn ensure_root(&self) -> Result<()> {
        self.root_ready
            .get_or_try_init(|| async {
                fs::create_dir_all(&self.root).await?;
                debug!(root = ?self.root, "Avatar cache directory ready");
                Ok::<(), crate::error::BlobStoreError>(())
            })
            .await?;
        Ok(())
    }

    /// Whether a blob file for `id` is present
    pub async fn exists(&self, id: &str) -> bool {
        let Ok(path) = self.blob_path(id) else {
            return false;
        };
        fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Read the blob for `id` as a data URI
    ///
    /// Missing files, I/O errors and empty files are all reported as a miss.
    pub async fn read(&self, id: &str) -> Option<String> {
        let path = match self.blob_path(id) {
            Ok(path) => path,
            Err(e) => {
                debug!(avatar_id = %id, error = %e, "Refusing to read avatar");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(avatar_id = %id, size = bytes.len(), "Avatar cache hit");
                Some(data_uri::encode(&bytes))
            }
            Ok(_) => {
                warn!(avatar_id = %id, "Cached avatar file is empty, treating as miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!(avatar_id = %id, error = %e, "Failed to read cached avatar");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Persist `blob` (a data URI or bare base64 payload) under `id`
    ///
    /// The bytes land in a temporary sibling, the index entry is recorded,
    /// and only then is the sibling renamed into place. A failure at any step
    /// leaves the previous blob intact. If only the rename fails, the index
    /// holds a fresh timestamp for the old file, which ages out normally.
    pub async fn write(&self, id: &str, blob: &str) -> Result<()> {
        let path = self.blob_path(id)?;
        let bytes = data_uri::decode(blob)?;

        self.ensure_root().await?;

        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}{}", BLOB_EXTENSION, seq, TMP_SUFFIX));
        if let Err(e) = fs::write(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = self.index.record(id, self.clock.now_millis()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(avatar_id = %id, size = bytes.len(), "Cached avatar");
        Ok(())
    }

    /// Delete the blob and index entry for `id`, ignoring a missing file
    pub async fn remove(&self, id: &str) -> Result<()> {
        let path = self.blob_path(id)?;
        remove_file_best_effort(&path).await;
        self.index.forget(id).await
    }

    /// Evict blobs whose last write is at least `max_age` old, then trim the
    /// oldest survivors down to the configured entry limit
    ///
    /// Blob files with no index entry are indexed first using their
    /// modification time, so they age out like everything else. The index is
    /// rewritten once at the end.
    pub async fn evict(&self, max_age: Duration) -> Result<EvictionReport> {
        let mut tx = self.index.begin().await?;
        let now = self.clock.now_millis();

        let adopted = self.adopt_orphans(&mut tx.entries, now).await;

        let max_age_millis = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        let plan = plan_eviction(&tx.entries, now, max_age_millis, self.max_entries);

        for id in plan.expired.iter().chain(plan.trimmed.iter()) {
            if let Ok(path) = self.blob_path(id) {
                remove_file_best_effort(&path).await;
            }
            tx.entries.remove(id);
        }

        let report = EvictionReport {
            expired: plan.expired.len(),
            trimmed: plan.trimmed.len(),
            retained: tx.entries.len(),
            adopted,
        };
        tx.commit().await?;

        info!(
            expired = report.expired,
            trimmed = report.trimmed,
            retained = report.retained,
            adopted = report.adopted,
            "Avatar cache eviction complete"
        );
        Ok(report)
    }

    /// Index blob files that have no entry. In-progress `.tmp` files are
    /// left alone.
    async fn adopt_orphans(&self, entries: &mut crate::index::IndexEntries, now: i64) -> usize {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(root = ?self.root, error = %e, "Failed to scan avatar cache directory");
                }
                return 0;
            }
        };

        let suffix = format!(".{}", BLOB_EXTENSION);
        let known: HashSet<String> = entries.keys().cloned().collect();
        let mut adopted = 0;

        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Avatar cache directory scan interrupted");
                    break;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(id) = name.strip_suffix(&suffix) else {
                continue;
            };
            if known.contains(id) || validate(id).is_err() {
                continue;
            }

            let written_at = modified_millis(&entry).await.unwrap_or(now);
            debug!(avatar_id = %id, written_at, "Indexing orphaned avatar blob");
            entries.insert(id.to_string(), written_at);
            adopted += 1;
        }

        adopted
    }

    /// Current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let entries = self.index.snapshot().await.unwrap_or_default();

        let mut total_size = 0;
        for id in entries.keys() {
            if let Ok(path) = self.blob_path(id) {
                if let Ok(meta) = fs::metadata(&path).await {
                    total_size += meta.len();
                }
            }
        }

        CacheStats {
            entries: entries.len(),
            total_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

async fn remove_file_best_effort(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = ?path, error = %e, "Failed to delete avatar blob");
        }
    }
}

async fn modified_millis(entry: &fs::DirEntry) -> Option<i64> {
    let modified = entry.metadata().await.ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    i64::try_from(since_epoch.as_millis()).ok()
}
