use tracing::warn;

use crate::error::{BotError, Result};
use crate::state::Character;

/// One line per character, numbered from 1
pub fn numbered_lines(characters: &[Character]) -> Vec<String> {
    characters
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {} ({})", i + 1, c.name, c.region))
        .collect()
}

/// Pack lines into as few messages as possible without splitting a line.
///
/// Lines are joined with `\n`. A line that is longer than `limit` on its own
/// is sent as its own message.
pub fn chunk_lines(lines: &[String], limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in lines {
        let line_len = line.chars().count();
        if line_len > limit {
            warn!("List item exceeds message limit ({} > {})", line_len, limit);
        }

        let needed = if current.is_empty() {
            line_len
        } else {
            current_len + 1 + line_len
        };

        if !current.is_empty() && needed > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// The messages that present `characters` to a member
pub fn selection_messages(characters: &[Character], limit: usize) -> Vec<String> {
    chunk_lines(&numbered_lines(characters), limit)
}

/// Parse a 1-based pick against the list that was shown
pub fn parse_selection<'a>(input: &str, presented: &'a [Character]) -> Result<&'a Character> {
    let invalid = || BotError::InvalidSelection {
        input: input.trim().to_string(),
    };

    let index: usize = input.trim().parse().map_err(|_| invalid())?;
    if index == 0 {
        return Err(invalid());
    }
    presented.get(index - 1).ok_or_else(invalid)
}
