//! Error types for the avatar blob store

use std::fmt;

#[derive(Debug)]
pub enum BlobStoreError {
    Io(Box<std::io::Error>),
    Kv(local_kv_store::KvError),
    InvalidId(String),
    Decode(String),
}

impl fmt::Display for BlobStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobStoreError::Io(err) => write!(f, "IO error: {}", err),
            BlobStoreError::Kv(err) => write!(f, "Index store error: {}", err),
            BlobStoreError::InvalidId(id) => write!(f, "Invalid avatar id: {:?}", id),
            BlobStoreError::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for BlobStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlobStoreError::Io(err) => Some(err.as_ref()),
            BlobStoreError::Kv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BlobStoreError {
    fn from(err: std::io::Error) -> Self {
        BlobStoreError::Io(Box::new(err))
    }
}

impl From<local_kv_store::KvError> for BlobStoreError {
    fn from(err: local_kv_store::KvError) -> Self {
        BlobStoreError::Kv(err)
    }
}

impl From<base64::DecodeError> for BlobStoreError {
    fn from(err: base64::DecodeError) -> Self {
        BlobStoreError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BlobStoreError>;
