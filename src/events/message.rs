use poise::serenity_prelude as serenity;
use tracing::debug;

use crate::onboarding::OnboardingEvent;
use crate::{Data, Error};

/// Handle incoming messages
pub async fn handle_message(
    _ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    // Ignore bot messages
    if msg.author.bot {
        return Ok(());
    }

    let direct = msg.guild_id.is_none();
    if direct {
        debug!("Processing DM from: {}", msg.author.name);
    }

    data.onboarding
        .handle_event(OnboardingEvent::MessageReceived {
            author: msg.author.id,
            direct,
            content: msg.content.clone(),
        })
        .await?;

    Ok(())
}
