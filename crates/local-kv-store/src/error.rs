//! Error types for the local key-value store

use std::fmt;

#[derive(Debug)]
pub enum KvError {
    Io(Box<std::io::Error>),
    Serialization(String),
    QuotaExceeded { limit: usize, required: usize },
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvError::Io(err) => write!(f, "IO error: {}", err),
            KvError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            KvError::QuotaExceeded { limit, required } => write!(
                f,
                "Store full: {} bytes required, limit is {} bytes",
                required, limit
            ),
        }
    }
}

impl std::error::Error for KvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KvError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KvError {
    fn from(err: std::io::Error) -> Self {
        KvError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for KvError {
    fn from(err: serde_json::Error) -> Self {
        KvError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KvError>;
