use std::collections::HashMap;

use crate::config::OnboardingConfig;
use crate::onboarding::MemberProfile;
use crate::state::Assignment;

const WELCOME_COLOR: u32 = 0x3498db;

/// Shown in place of an empty answer; Discord rejects empty embed fields
const NO_ANSWER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-neutral description of the public welcome post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeNotice {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub thumbnail_url: Option<String>,
    pub footer_text: String,
    pub footer_icon_url: Option<String>,
}

#[cfg(test)]
impl WelcomeNotice {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// Build the welcome post from the member's answers and their new character
pub fn build_welcome(
    member: &MemberProfile,
    assignment: &Assignment,
    answers: &HashMap<String, String>,
    config: &OnboardingConfig,
) -> WelcomeNotice {
    let mut fields: Vec<EmbedField> = config
        .questions
        .iter()
        .map(|q| EmbedField {
            name: q.label.clone(),
            value: answers
                .get(&q.prompt)
                .filter(|a| !a.is_empty())
                .cloned()
                .unwrap_or_else(|| NO_ANSWER.to_string()),
            inline: q.inline,
        })
        .collect();

    fields.push(EmbedField {
        name: "Region".to_string(),
        value: assignment.character_region.clone(),
        inline: true,
    });
    fields.push(EmbedField {
        name: "Character".to_string(),
        value: assignment.character_name.clone(),
        inline: true,
    });

    WelcomeNotice {
        title: format!("Welcome {}! 🎉", member.display_name),
        description: format!(
            "Joined the server and picked **{}**.",
            assignment.character_name
        ),
        color: WELCOME_COLOR,
        fields,
        thumbnail_url: Some(config.art_url(&assignment.character_name)),
        footer_text: "Enjoy your stay!".to_string(),
        footer_icon_url: member.avatar_url.clone(),
    }
}
