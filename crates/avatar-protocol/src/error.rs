//! Errors raised when interpreting an avatar response

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The server answered `ok: false`
    Rejected(String),
    /// The response does not match the expected shape
    Malformed(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Rejected(msg) => write!(f, "Server rejected avatar request: {}", msg),
            ProtocolError::Malformed(msg) => write!(f, "Malformed avatar response: {}", msg),
        }
    }
}

impl std::error::Error for ProtocolError {}

pub type Result<T> = std::result::Result<T, ProtocolError>;
