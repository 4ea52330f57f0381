//! Outbound side of the Discord connection.
//!
//! The onboarding flow only talks to Discord through [`Gateway`], so it can
//! run against the real HTTP client or a recording double in tests.

pub mod discord;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use std::sync::Arc;

use crate::error::Result;
use crate::onboarding::WelcomeNotice;

pub use discord::DiscordGateway;

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send_direct_message(&self, user_id: UserId, content: &str) -> Result<()>;

    /// Post the welcome embed and return the posted message's ID
    async fn send_welcome(&self, channel_id: ChannelId, notice: &WelcomeNotice)
        -> Result<MessageId>;

    /// Fails with `MessageNotFound` if the message is already gone
    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()>;

    async fn set_nickname(&self, guild_id: GuildId, user_id: UserId, nickname: &str)
        -> Result<()>;

    async fn find_channel_by_name(&self, guild_id: GuildId, name: &str)
        -> Result<Option<ChannelId>>;
}

/// Shared gateway type
pub type SharedGateway = Arc<dyn Gateway>;
