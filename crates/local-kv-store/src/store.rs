//! The key-value store abstraction

use crate::error::{KvError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Async string key-value store
///
/// Implementations must make each call atomic with respect to the others on
/// the same instance. Multi-step read-modify-write sequences are the caller's
/// responsibility to serialize.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` if present
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key in `keys` in a single operation
    async fn remove_many(&self, keys: &[String]) -> Result<()>;

    /// List all keys currently in the store
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Bytes accounted against a store quota (keys plus values)
pub(crate) fn used_bytes(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// Reject a `set` that would push the store past `quota`
pub(crate) fn check_quota(
    entries: &BTreeMap<String, String>,
    quota: Option<usize>,
    key: &str,
    value: &str,
) -> Result<()> {
    let Some(limit) = quota else {
        return Ok(());
    };

    let replaced = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
    let required = used_bytes(entries) - replaced + key.len() + value.len();
    if required > limit {
        return Err(KvError::QuotaExceeded { limit, required });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_used_bytes_counts_keys_and_values() {
        let map = entries(&[("ab", "cde"), ("f", "")]);
        assert_eq!(used_bytes(&map), 6);
    }

    #[test]
    fn test_check_quota_unlimited() {
        let map = entries(&[("a", "b")]);
        assert!(check_quota(&map, None, "k", &"x".repeat(10_000)).is_ok());
    }

    #[test]
    fn test_check_quota_accounts_for_replaced_value() {
        let map = entries(&[("key", "0123456789")]);
        // 3 + 10 = 13 used; replacing with another 10-byte value still fits in 13
        assert!(check_quota(&map, Some(13), "key", "abcdefghij").is_ok());
        // A new key does not fit
        let err = check_quota(&map, Some(13), "other", "x").unwrap_err();
        assert!(matches!(
            err,
            KvError::QuotaExceeded {
                limit: 13,
                required: 19
            }
        ));
    }
}
