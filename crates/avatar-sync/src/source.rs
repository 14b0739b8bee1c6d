//! Where avatars come from on a cache miss

use crate::error::Result;
use async_trait::async_trait;
use avatar_channel_client::AvatarChannel;
use avatar_protocol::AvatarResponse;

/// Remote lookup of an avatar by identifier
#[async_trait]
pub trait AvatarSource: Send + Sync {
    async fn fetch_avatar(&self, avatar_id: &str) -> Result<AvatarResponse>;
}

#[async_trait]
impl AvatarSource for AvatarChannel {
    async fn fetch_avatar(&self, avatar_id: &str) -> Result<AvatarResponse> {
        Ok(AvatarChannel::fetch_avatar(self, avatar_id).await?)
    }
}
