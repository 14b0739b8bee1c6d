//! Avatar fetch protocol
//!
//! JSON messages exchanged with the game server to fetch a stored avatar by
//! its identifier. Requests and responses are correlated by `requestId`.

pub mod error;
pub mod types;

pub use error::{ProtocolError, Result};
pub use types::{AvatarPayload, AvatarRequest, AvatarResponse, GET_AVATAR};
