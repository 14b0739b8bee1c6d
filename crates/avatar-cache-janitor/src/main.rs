//! Avatar cache janitor
//!
//! Runs the startup maintenance of the avatar cache against a cache
//! directory and local store on disk, then exits. Useful after a client
//! upgrade or when a device reports low storage.

mod error;

use crate::error::Result;
use avatar_blob_store::{purge_legacy_once, AvatarBlobStore, EvictionReport, PurgeReport};
use avatar_sync::CacheConfig;
use clap::Parser;
use local_kv_store::{JsonFileStore, KeyValueStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "avatar-cache-janitor", about = "Purge and evict the on-disk avatar cache")]
struct Args {
    /// Avatar blob directory (overrides AVATAR_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Local store file (overrides AVATAR_KV_PATH)
    #[arg(long)]
    kv_path: Option<PathBuf>,
    /// Evict blobs older than this many days; 0 clears everything
    #[arg(long)]
    ttl_days: Option<u64>,
    /// Keep at most this many blobs; 0 disables the cap
    #[arg(long)]
    max_entries: Option<usize>,
    #[arg(long)]
    skip_legacy_purge: bool,
}

impl Args {
    fn apply(&self, mut config: CacheConfig) -> CacheConfig {
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(path) = &self.kv_path {
            config.kv_path = path.clone();
        }
        if let Some(days) = self.ttl_days {
            config.ttl_days = days;
        }
        if let Some(max) = self.max_entries {
            config.max_entries = (max > 0).then_some(max);
        }
        config
    }
}

#[derive(Debug)]
struct Outcome {
    purge: Option<PurgeReport>,
    eviction: EvictionReport,
}

async fn run(config: &CacheConfig, purge_legacy: bool) -> Result<Outcome> {
    let kv: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.kv_path));

    let purge = if purge_legacy {
        Some(purge_legacy_once(kv.as_ref()).await?)
    } else {
        None
    };

    let store =
        AvatarBlobStore::new(&config.cache_dir, kv.clone()).with_max_entries(config.max_entries);
    let eviction = store.evict(config.max_age()).await?;

    Ok(Outcome { purge, eviction })
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter =
        EnvFilter::from_default_env().add_directive("avatar_cache_janitor=info".parse()?);

    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    let args = Args::parse();
    let config = args.apply(CacheConfig::from_env());

    info!("Cache dir: {:?}", config.cache_dir);
    info!("Local store: {:?}", config.kv_path);
    info!("TTL: {} days, max entries: {:?}", config.ttl_days, config.max_entries);

    let outcome = run(&config, !args.skip_legacy_purge).await?;

    if let Some(purge) = &outcome.purge {
        info!(
            removed = purge.removed,
            skipped = purge.skipped,
            "Legacy cache purge done"
        );
    }
    info!(
        expired = outcome.eviction.expired,
        trimmed = outcome.eviction.trimmed,
        retained = outcome.eviction.retained,
        adopted = outcome.eviction.adopted,
        "Janitor finished"
    );

    Ok(())
}
