use async_trait::async_trait;
use parking_lot::Mutex;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Gateway;
use crate::error::{BotError, Result};
use crate::onboarding::WelcomeNotice;

/// How `delete_message` should fail, if at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteFailure {
    NotFound,
    Forbidden,
    Other,
}

/// In-memory gateway that records every call
#[derive(Default)]
pub struct RecordingGateway {
    pub dms: Mutex<Vec<(UserId, String)>>,
    pub welcomes: Mutex<Vec<(ChannelId, MessageId, WelcomeNotice)>>,
    pub deleted: Mutex<Vec<(ChannelId, MessageId)>>,
    pub nicknames: Mutex<HashMap<UserId, String>>,
    pub channels: Mutex<HashMap<String, ChannelId>>,
    pub deny_nicknames: Mutex<bool>,
    pub delete_failure: Mutex<Option<DeleteFailure>>,
    next_message_id: AtomicU64,
}

impl RecordingGateway {
    pub fn with_channel(name: &str, channel_id: u64) -> Self {
        let gateway = Self::default();
        gateway
            .channels
            .lock()
            .insert(name.to_string(), ChannelId::new(channel_id));
        gateway
    }

    /// DMs sent to `user_id`, oldest first
    pub fn dms_to(&self, user_id: UserId) -> Vec<String> {
        self.dms
            .lock()
            .iter()
            .filter(|(to, _)| *to == user_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn send_direct_message(&self, user_id: UserId, content: &str) -> Result<()> {
        self.dms.lock().push((user_id, content.to_string()));
        Ok(())
    }

    async fn send_welcome(
        &self,
        channel_id: ChannelId,
        notice: &WelcomeNotice,
    ) -> Result<MessageId> {
        let message_id = MessageId::new(1000 + self.next_message_id.fetch_add(1, Ordering::Relaxed));
        self.welcomes
            .lock()
            .push((channel_id, message_id, notice.clone()));
        Ok(message_id)
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        match *self.delete_failure.lock() {
            Some(DeleteFailure::NotFound) => Err(BotError::MessageNotFound),
            Some(DeleteFailure::Forbidden) => Err(BotError::PermissionDenied {
                message: "Missing Permissions".to_string(),
            }),
            Some(DeleteFailure::Other) => Err(BotError::Discord {
                message: "gateway unavailable".to_string(),
            }),
            None => {
                self.deleted.lock().push((channel_id, message_id));
                Ok(())
            }
        }
    }

    async fn set_nickname(&self, _guild_id: GuildId, user_id: UserId, nickname: &str) -> Result<()> {
        if *self.deny_nicknames.lock() {
            return Err(BotError::PermissionDenied {
                message: "Missing Permissions".to_string(),
            });
        }
        self.nicknames.lock().insert(user_id, nickname.to_string());
        Ok(())
    }

    async fn find_channel_by_name(
        &self,
        _guild_id: GuildId,
        name: &str,
    ) -> Result<Option<ChannelId>> {
        Ok(self.channels.lock().get(name).copied())
    }
}
