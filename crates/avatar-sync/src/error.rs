//! Error types for avatar resolution

use std::fmt;

#[derive(Debug)]
pub enum SyncError {
    Channel(avatar_channel_client::ChannelError),
    Protocol(avatar_protocol::ProtocolError),
    Store(avatar_blob_store::BlobStoreError),
    Kv(local_kv_store::KvError),
    Source(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Channel(err) => write!(f, "Channel error: {}", err),
            SyncError::Protocol(err) => write!(f, "{}", err),
            SyncError::Store(err) => write!(f, "Blob store error: {}", err),
            SyncError::Kv(err) => write!(f, "Local storage error: {}", err),
            SyncError::Source(msg) => write!(f, "Avatar source error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Channel(err) => Some(err),
            SyncError::Protocol(err) => Some(err),
            SyncError::Store(err) => Some(err),
            SyncError::Kv(err) => Some(err),
            SyncError::Source(_) => None,
        }
    }
}

impl From<avatar_channel_client::ChannelError> for SyncError {
    fn from(err: avatar_channel_client::ChannelError) -> Self {
        SyncError::Channel(err)
    }
}

impl From<avatar_protocol::ProtocolError> for SyncError {
    fn from(err: avatar_protocol::ProtocolError) -> Self {
        SyncError::Protocol(err)
    }
}

impl From<avatar_blob_store::BlobStoreError> for SyncError {
    fn from(err: avatar_blob_store::BlobStoreError) -> Self {
        SyncError::Store(err)
    }
}

impl From<local_kv_store::KvError> for SyncError {
    fn from(err: local_kv_store::KvError) -> Self {
        SyncError::Kv(err)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display_passes_through() {
        let err = SyncError::from(avatar_protocol::ProtocolError::Rejected(
            "Avatar not found".to_string(),
        ));
        assert_eq!(
            format!("{}", err),
            "Server rejected avatar request: Avatar not found"
        );
    }

    #[test]
    fn test_channel_error_display() {
        let err = SyncError::from(avatar_channel_client::ChannelError::ConnectionClosed);
        assert_eq!(format!("{}", err), "Channel error: Connection closed");
    }

    #[test]
    fn test_source_error_has_no_source() {
        let err = SyncError::Source("offline".to_string());
        assert!(std::error::Error::source(&err).is_none());
    }
}
