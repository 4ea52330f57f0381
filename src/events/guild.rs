use poise::serenity_prelude as serenity;
use tracing::info;

use crate::onboarding::{MemberProfile, OnboardingEvent};
use crate::{Data, Error};

/// Handle when a new member joins the guild
pub async fn handle_member_add(
    _ctx: &serenity::Context,
    new_member: &serenity::Member,
    data: &Data,
) -> Result<(), Error> {
    if new_member.user.bot {
        return Ok(());
    }

    info!(
        "New member joined: {} (ID: {}) in guild {}",
        new_member.user.name, new_member.user.id, new_member.guild_id
    );

    // Failures inside the session are reported to the member by the session task
    data.onboarding
        .handle_event(OnboardingEvent::Joined(MemberProfile::from(new_member)))
        .await?;

    Ok(())
}

/// Handle when a member leaves (or is removed from) the guild
pub async fn handle_member_removal(
    guild_id: serenity::GuildId,
    user: &serenity::User,
    data: &Data,
) -> Result<(), Error> {
    info!(
        "Member left: {} (ID: {}) from guild {}",
        user.name, user.id, guild_id
    );

    data.onboarding
        .handle_event(OnboardingEvent::Left {
            guild_id,
            user_id: user.id,
        })
        .await?;

    Ok(())
}
