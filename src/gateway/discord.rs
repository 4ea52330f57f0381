use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, Http, MessageId, UserId};
use std::sync::Arc;
use tracing::debug;

use super::Gateway;
use crate::error::Result;
use crate::onboarding::WelcomeNotice;

/// [`Gateway`] backed by serenity's HTTP client
pub struct DiscordGateway {
    http: Arc<Http>,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn to_embed(notice: &WelcomeNotice) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(&notice.title)
        .description(&notice.description)
        .color(notice.color);

    for field in &notice.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }

    if let Some(url) = &notice.thumbnail_url {
        embed = embed.thumbnail(url);
    }

    let mut footer = serenity::CreateEmbedFooter::new(&notice.footer_text);
    if let Some(icon) = &notice.footer_icon_url {
        footer = footer.icon_url(icon);
    }
    embed.footer(footer)
}

#[async_trait]
impl Gateway for DiscordGateway {
    async fn send_direct_message(&self, user_id: UserId, content: &str) -> Result<()> {
        let dm_channel = user_id.create_dm_channel(&self.http).await?;
        dm_channel
            .send_message(&self.http, serenity::CreateMessage::new().content(content))
            .await?;
        Ok(())
    }

    async fn send_welcome(
        &self,
        channel_id: ChannelId,
        notice: &WelcomeNotice,
    ) -> Result<MessageId> {
        let message = channel_id
            .send_message(&self.http, serenity::CreateMessage::new().embed(to_embed(notice)))
            .await?;
        Ok(message.id)
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        channel_id.delete_message(&self.http, message_id).await?;
        Ok(())
    }

    async fn set_nickname(&self, guild_id: GuildId, user_id: UserId, nickname: &str) -> Result<()> {
        guild_id
            .edit_member(
                &self.http,
                user_id,
                serenity::EditMember::new().nickname(nickname),
            )
            .await?;
        Ok(())
    }

    async fn find_channel_by_name(
        &self,
        guild_id: GuildId,
        name: &str,
    ) -> Result<Option<ChannelId>> {
        let channels = guild_id.channels(&self.http).await?;
        let wanted = name.to_lowercase();

        let found = channels
            .values()
            .find(|c| c.kind == serenity::ChannelType::Text && c.name.to_lowercase() == wanted)
            .map(|c| c.id);
        if found.is_none() {
            debug!("No text channel named '{}' in guild {}", name, guild_id);
        }
        Ok(found)
    }
}
