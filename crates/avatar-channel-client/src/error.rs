//! Error types for the avatar channel client

use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum ChannelError {
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    JsonParse(String),
    Timeout(Duration),
    ConnectionClosed,
    MaxReconnectAttempts,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::WebSocket(err) => write!(f, "WebSocket error: {}", err),
            ChannelError::JsonParse(msg) => write!(f, "JSON parse error: {}", msg),
            ChannelError::Timeout(after) => write!(f, "Request timed out after {:?}", after),
            ChannelError::ConnectionClosed => write!(f, "Connection closed"),
            ChannelError::MaxReconnectAttempts => {
                write!(f, "Max reconnection attempts reached")
            }
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::WebSocket(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChannelError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ChannelError::WebSocket(Box::new(err))
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        ChannelError::JsonParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = ChannelError::Timeout(Duration::from_secs(15));
        assert_eq!(format!("{}", err), "Request timed out after 15s");
    }

    #[test]
    fn test_connection_closed_display() {
        let err = ChannelError::ConnectionClosed;
        assert_eq!(format!("{}", err), "Connection closed");
    }

    #[test]
    fn test_max_reconnect_attempts_display() {
        let err = ChannelError::MaxReconnectAttempts;
        assert_eq!(format!("{}", err), "Max reconnection attempts reached");
    }
}
