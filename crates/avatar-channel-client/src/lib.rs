//! Avatar channel client
//!
//! Sends avatar fetch requests over a long-lived WebSocket connection to the
//! game server and matches each response to its request by `requestId`.
//! Reconnects with exponential backoff when the connection drops.

pub mod channel;
pub mod error;

pub use channel::{AvatarChannel, ChannelConfig};
pub use error::{ChannelError, Result};
