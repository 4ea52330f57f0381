pub mod coordinator;
pub mod registry;
pub mod selection;
pub mod session;
pub mod welcome;

use poise::serenity_prelude::{self as serenity, GuildId, UserId};

pub use coordinator::{create_shared_onboarding_manager, SharedOnboardingManager};
pub use welcome::WelcomeNotice;

/// The parts of a guild member the onboarding flow needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<&serenity::Member> for MemberProfile {
    fn from(member: &serenity::Member) -> Self {
        Self {
            user_id: member.user.id,
            guild_id: member.guild_id,
            display_name: member.display_name().to_string(),
            avatar_url: member.user.avatar_url(),
        }
    }
}

/// Gateway events the onboarding flow reacts to
#[derive(Debug, Clone)]
pub enum OnboardingEvent {
    Joined(MemberProfile),
    Left {
        guild_id: GuildId,
        user_id: UserId,
    },
    MessageReceived {
        author: UserId,
        /// Sent in a DM channel rather than a guild channel
        direct: bool,
        content: String,
    },
}
