use tracing::info;

use crate::onboarding::selection::chunk_lines;
use crate::state::CharacterPool;
use crate::{Context, Error};

/// Show the character pool
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn pool(ctx: Context<'_>) -> Result<(), Error> {
    info!("pool called by {}", ctx.author().name);
    let onboarding = &ctx.data().onboarding;

    let pool = onboarding.store().snapshot().await?;
    let messages = pool_summary(
        &pool,
        onboarding.sessions().len(),
        onboarding.config().message_limit,
    );

    for message in messages {
        ctx.send(poise::CreateReply::default().content(message).ephemeral(true))
            .await?;
    }
    Ok(())
}

/// Show the most recent log lines
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn recent_logs(
    ctx: Context<'_>,
    #[description = "Number of lines (default 20)"] count: Option<usize>,
) -> Result<(), Error> {
    let count = count.unwrap_or(20).clamp(1, 200);
    let lines: Vec<String> = ctx
        .data()
        .log_buffer
        .get_recent(count)
        .iter()
        .map(|e| e.format())
        .collect();

    if lines.is_empty() {
        ctx.send(poise::CreateReply::default()
            .content("No log entries captured yet.")
            .ephemeral(true))
            .await?;
        return Ok(());
    }

    // Leave room for the code fence around each chunk
    let limit = ctx.data().onboarding.config().message_limit.saturating_sub(8);
    for chunk in chunk_lines(&lines, limit) {
        ctx.send(poise::CreateReply::default()
            .content(format!("```\n{}\n```", chunk))
            .ephemeral(true))
            .await?;
    }
    Ok(())
}

/// Status lines for `/pool`, split to fit the message limit
pub fn pool_summary(pool: &CharacterPool, onboarding: usize, limit: usize) -> Vec<String> {
    let mut lines = vec![
        format!(
            "**Character pool:** {} available, {} claimed, {} member(s) onboarding",
            pool.available.len(),
            pool.assigned.len(),
            onboarding
        ),
        String::new(),
        "**Available**".to_string(),
    ];
    lines.extend(
        pool.sorted_available()
            .iter()
            .map(|c| format!("• {} ({})", c.name, c.region)),
    );

    if !pool.assigned.is_empty() {
        lines.push(String::new());
        lines.push("**Claimed**".to_string());
        lines.extend(pool.assigned.values().map(|a| {
            format!(
                "• {} ({}): {} <@{}>",
                a.character_name, a.character_region, a.member_display_name, a.member_id
            )
        }));
    }

    chunk_lines(&lines, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Character;
    use poise::serenity_prelude::UserId;

    #[test]
    fn test_pool_summary() {
        let mut pool = CharacterPool::new(vec![
            Character::new("Zed", "Ionia"),
            Character::new("Aatrox", "Runeterra"),
            Character::new("Lux", "Demacia"),
        ]);
        pool.allocate(UserId::new(42), "kim", "Lux").unwrap();

        let messages = pool_summary(&pool, 3, 2000);
        assert_eq!(messages.len(), 1);

        let text = &messages[0];
        assert!(text.starts_with("**Character pool:** 2 available, 1 claimed, 3 member(s) onboarding"));
        let aatrox = text.find("• Aatrox (Runeterra)").unwrap();
        let zed = text.find("• Zed (Ionia)").unwrap();
        assert!(aatrox < zed);
        assert!(text.contains("• Lux (Demacia): kim <@42>"));
    }

    #[test]
    fn test_pool_summary_respects_limit() {
        let pool = CharacterPool::new(
            (0..100)
                .map(|i| Character::new(format!("Character{:03}", i), "Region"))
                .collect(),
        );

        let messages = pool_summary(&pool, 0, 300);
        assert!(messages.len() > 1);
        assert!(messages.iter().all(|m| m.chars().count() <= 300));
    }
}
