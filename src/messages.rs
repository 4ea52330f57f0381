// src/messages.rs

pub fn selection_header() -> String {
    "🎭 **Pick your character!**\n\
    Reply with the number of the character you want from the list below."
        .to_string()
}

pub fn selection_confirmed(name: &str, region: &str) -> String {
    format!(
        "✅ You picked **{}** from the region **{}**. Welcome to the server!",
        name, region
    )
}

pub fn timeout_message() -> String {
    "⌛ **Time's up.**\n\n\
    You took too long to answer. Leave and rejoin the server to start again."
        .to_string()
}

pub fn invalid_selection_message(input: &str) -> String {
    format!(
        "❌ **Invalid selection.**\n\n\
        `{}` is not a number from the list. Leave and rejoin the server to try again.",
        input
    )
}

pub fn pool_exhausted_message() -> String {
    "😔 Sorry, there are no characters available right now. Please contact an administrator."
        .to_string()
}

pub fn character_taken_message(name: &str) -> String {
    format!(
        "⚠️ **{}** was just picked by another member. Leave and rejoin the server to choose again.",
        name
    )
}

pub fn already_assigned_message(name: &str) -> String {
    format!("You already play as **{}** on this server.", name)
}

pub fn setup_error_message() -> String {
    "There was an error setting up your profile. Please contact an administrator.".to_string()
}
