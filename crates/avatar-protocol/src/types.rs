//! Avatar request/response messages

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};

/// Message type of an avatar fetch request
pub const GET_AVATAR: &str = "getAvatar";

/// Request for the avatar stored under `avatar_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub request_id: u64,
    pub avatar_id: String,
}

impl AvatarRequest {
    pub fn get_avatar(request_id: u64, avatar_id: &str) -> Self {
        Self {
            kind: GET_AVATAR.to_string(),
            request_id,
            avatar_id: avatar_id.to_string(),
        }
    }
}

/// `{ ok: true, avatar: {...} }` or `{ ok: false, error: "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AvatarPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarPayload {
    /// A `data:` URI or a remote URL
    pub avatar_url: String,
}

impl AvatarResponse {
    pub fn success(avatar_url: &str) -> Self {
        Self {
            request_id: None,
            ok: true,
            avatar: Some(AvatarPayload {
                avatar_url: avatar_url.to_string(),
            }),
            error: None,
        }
    }

    pub fn failure(error: &str) -> Self {
        Self {
            request_id: None,
            ok: false,
            avatar: None,
            error: Some(error.to_string()),
        }
    }

    pub fn with_request_id(mut self, request_id: u64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// The avatar URL, or why there is none
    pub fn into_avatar_url(self) -> Result<String> {
        if !self.ok {
            return Err(ProtocolError::Rejected(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        match self.avatar {
            Some(payload) if !payload.avatar_url.trim().is_empty() => Ok(payload.avatar_url),
            Some(_) => Err(ProtocolError::Malformed("empty avatarUrl".to_string())),
            None => Err(ProtocolError::Malformed("ok response without avatar".to_string())),
        }
    }
}
