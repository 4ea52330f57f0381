use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Onboarding configuration
/// Loaded from data/onboarding.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OnboardingConfig {
    /// Questions asked over DM, in order
    #[serde(default = "default_questions")]
    pub questions: Vec<Question>,

    /// Name of the public channel that receives welcome posts
    #[serde(default = "default_welcome_channel")]
    pub welcome_channel: String,

    /// How long to wait for each reply before giving up
    #[serde(default = "default_answer_timeout_secs")]
    pub answer_timeout_secs: u64,

    /// Maximum characters per outbound message
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,

    /// Thumbnail URL for the welcome post; `{name}` is replaced with the character name
    #[serde(default = "default_art_url_template")]
    pub art_url_template: String,

    /// Buffered replies per session before further messages are dropped
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
}

/// A single questionnaire entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Question {
    /// Text sent to the member
    pub prompt: String,

    /// Field name on the welcome post
    pub label: String,

    #[serde(default = "default_inline")]
    pub inline: bool,
}

impl Question {
    pub fn new(prompt: &str, label: &str, inline: bool) -> Self {
        Self {
            prompt: prompt.to_string(),
            label: label.to_string(),
            inline,
        }
    }
}

fn default_questions() -> Vec<Question> {
    vec![
        Question::new("How old are you?", "Age", true),
        Question::new("What nickname will you go by?", "Nick", true),
        Question::new("What are your hobbies?", "Hobbies", false),
    ]
}

fn default_welcome_channel() -> String {
    "welcome".to_string()
}

fn default_answer_timeout_secs() -> u64 {
    300
}

fn default_message_limit() -> usize {
    2000
}

fn default_art_url_template() -> String {
    "https://ddragon.leagueoflegends.com/cdn/img/champion/splash/{name}_0.jpg".to_string()
}

fn default_inbox_capacity() -> usize {
    16
}

fn default_inline() -> bool {
    true
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            welcome_channel: default_welcome_channel(),
            answer_timeout_secs: default_answer_timeout_secs(),
            message_limit: default_message_limit(),
            art_url_template: default_art_url_template(),
            inbox_capacity: default_inbox_capacity(),
        }
    }
}

impl OnboardingConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> crate::error::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::error::BotError::ConfigLoad {
                path: path.to_string(),
                source: e,
            })?;

        let config: Self =
            serde_json::from_str(&content).map_err(|e| crate::error::BotError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |message: &str| {
            Err(crate::error::BotError::ConfigValidation {
                message: message.to_string(),
            })
        };

        if self.answer_timeout_secs == 0 {
            return invalid("answer_timeout_secs must be greater than zero");
        }
        if self.message_limit == 0 {
            return invalid("message_limit must be greater than zero");
        }
        if self.inbox_capacity == 0 {
            return invalid("inbox_capacity must be greater than zero");
        }
        if !self.art_url_template.contains("{name}") {
            return invalid("art_url_template must contain {name}");
        }
        Ok(())
    }

    pub fn answer_timeout(&self) -> Duration {
        Duration::from_secs(self.answer_timeout_secs)
    }

    /// The prompts in the order they are asked
    pub fn prompts(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.prompt.clone()).collect()
    }

    pub fn art_url(&self, character_name: &str) -> String {
        self.art_url_template.replace("{name}", character_name)
    }
}
