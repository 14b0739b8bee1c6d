//! Avatar identifier helpers

use crate::error::{BlobStoreError, Result};

const TEMPORARY_PREFIX: &str = "local_";

/// Build the client-side placeholder id used before the server assigns one
pub fn temporary_avatar_id(handle: &str, now_millis: i64) -> String {
    format!("{}{}_{}", TEMPORARY_PREFIX, handle, now_millis)
}

/// Whether `id` is a client-generated placeholder rather than a server id
pub fn is_temporary(id: &str) -> bool {
    id.starts_with(TEMPORARY_PREFIX)
}

/// Reject ids that cannot safely name a file inside the cache directory
pub(crate) fn validate(id: &str) -> Result<()> {
    let unsafe_name = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0'])
        || is_temporary(id);

    if unsafe_name {
        return Err(BlobStoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_id_format() {
        let id = temporary_avatar_id("alice", 1_700_000_000_000);
        assert_eq!(id, "local_alice_1700000000000");
        assert!(is_temporary(&id));
        assert!(!is_temporary("av-42"));
    }

    #[test]
    fn test_validate_accepts_server_ids() {
        assert!(validate("av-42").is_ok());
        assert!(validate("6650f2c1e4b0a1b2c3d4e5f6").is_ok());
    }

    #[test]
    fn test_validate_rejects_path_tricks_and_placeholders() {
        for id in ["", ".", "..", "a/b", "..\\x", "nul\0", "local_bob_1"] {
            assert!(validate(id).is_err(), "expected {:?} to be rejected", id);
        }
    }
}
