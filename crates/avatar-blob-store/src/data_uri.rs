//! Data-URI encoding for avatar payloads
//!
//! Avatars travel as `data:<mime>;base64,<payload>` strings. On disk only the
//! decoded bytes are kept; the prefix is rebuilt on read from the image magic.

use crate::error::{BlobStoreError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const DEFAULT_MIME: &str = "image/jpeg";

/// Whether `value` looks like a data URI rather than a remote URL
pub fn is_data_uri(value: &str) -> bool {
    value.starts_with("data:")
}

/// Strip a `data:...;base64,` prefix, returning the bare payload
pub fn strip_prefix(value: &str) -> &str {
    if !is_data_uri(value) {
        return value;
    }
    match value.find(',') {
        Some(comma) => &value[comma + 1..],
        None => value,
    }
}

/// Decode a data URI (or a bare base64 payload) into raw bytes
pub fn decode(value: &str) -> Result<Vec<u8>> {
    let payload: String = strip_prefix(value)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if payload.is_empty() {
        return Err(BlobStoreError::Decode("empty payload".to_string()));
    }

    Ok(STANDARD.decode(payload.as_bytes())?)
}

/// Encode raw image bytes as a displayable data URI
pub fn encode(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(bytes), STANDARD.encode(bytes))
}

/// Normalize a stored value into a data URI, adding the prefix if missing
pub fn normalize(value: &str) -> Result<String> {
    if is_data_uri(value) {
        decode(value)?;
        return Ok(value.to_string());
    }
    Ok(encode(&decode(value)?))
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        DEFAULT_MIME
    }
}
