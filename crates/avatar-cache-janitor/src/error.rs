//! Error types for the avatar cache janitor

use std::fmt;

#[derive(Debug)]
pub enum JanitorError {
    Store(avatar_blob_store::BlobStoreError),
    Config(String),
}

impl fmt::Display for JanitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JanitorError::Store(err) => write!(f, "Avatar store error: {}", err),
            JanitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for JanitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JanitorError::Store(err) => Some(err),
            JanitorError::Config(_) => None,
        }
    }
}

impl From<avatar_blob_store::BlobStoreError> for JanitorError {
    fn from(err: avatar_blob_store::BlobStoreError) -> Self {
        JanitorError::Store(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for JanitorError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        JanitorError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JanitorError>;
