use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // State errors (the pool store)
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("State file '{path}' is corrupt: {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // Onboarding errors
    #[error("No answer within {seconds} seconds")]
    AnswerTimeout { seconds: u64 },

    #[error("Invalid selection: '{input}'")]
    InvalidSelection { input: String },

    #[error("No characters are available")]
    PoolExhausted,

    #[error("Character '{name}' was already taken")]
    CharacterTaken { name: String },

    #[error("Member {member_id} already holds '{character}'")]
    AlreadyAssigned { member_id: String, character: String },

    #[error("Onboarding session was cancelled")]
    SessionCancelled,

    #[error("Session cannot {action} while {state}")]
    InvalidState { action: String, state: String },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    #[error("Message not found")]
    MessageNotFound,

    // Permission errors
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    /// Whether the error comes from the pool store itself rather than the member's input.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            BotError::StateLoad { .. } | BotError::StateSave { .. } | BotError::StateParse { .. }
        )
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        if let serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) = &err {
            match response.status_code.as_u16() {
                403 => {
                    return BotError::PermissionDenied {
                        message: response.error.message.clone(),
                    }
                }
                404 => return BotError::MessageNotFound,
                _ => {}
            }
        }
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
