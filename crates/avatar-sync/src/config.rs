//! Avatar cache configuration

use avatar_channel_client::ChannelConfig;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CACHE_DIR: &str = "./cache/avatars";
const DEFAULT_KV_PATH: &str = "./cache/local-store.json";
const DEFAULT_TTL_DAYS: u64 = 7;
const DEFAULT_MAX_ENTRIES: usize = 500;
const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000/ws";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding one file per cached avatar
    pub cache_dir: PathBuf,
    /// JSON file backing the local key-value store
    pub kv_path: PathBuf,
    /// Blobs older than this are evicted
    pub ttl_days: u64,
    /// Most blobs kept after eviction; `None` disables the cap
    pub max_entries: Option<usize>,
    /// Game server WebSocket URL
    pub server_url: String,
    pub request_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            kv_path: PathBuf::from(DEFAULT_KV_PATH),
            ttl_days: DEFAULT_TTL_DAYS,
            max_entries: Some(DEFAULT_MAX_ENTRIES),
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl CacheConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from any variable source, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let cache_dir = lookup("AVATAR_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let kv_path = lookup("AVATAR_KV_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.kv_path);

        let ttl_days = lookup("AVATAR_CACHE_TTL_DAYS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.ttl_days);

        // "0" or "none" turns the entry cap off
        let max_entries = match lookup("AVATAR_CACHE_MAX_ENTRIES") {
            Some(raw) if raw.eq_ignore_ascii_case("none") => None,
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => None,
                Ok(n) => Some(n),
                Err(_) => defaults.max_entries,
            },
            None => defaults.max_entries,
        };

        let server_url = lookup("AVATAR_SERVER_URL").unwrap_or(defaults.server_url);

        let request_timeout_secs = lookup("AVATAR_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.request_timeout_secs);

        Self {
            cache_dir,
            kv_path,
            ttl_days,
            max_entries,
            server_url,
            request_timeout_secs,
        }
    }

    /// Eviction age derived from `ttl_days`
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.ttl_days.saturating_mul(24 * 60 * 60))
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            url: self.server_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..ChannelConfig::default()
        }
    }
}
