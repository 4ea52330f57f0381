use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot that onboards new members and hands out characters from a shared pool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to register commands to (implies --guild-commands)
    #[arg(long)]
    guild_id: Option<u64>,
}

mod commands;
mod config;
mod error;
mod events;
mod gateway;
mod logging;
mod messages;
mod onboarding;
mod state;

use commands::{help, ping, pool, recent_logs};
use config::OnboardingConfig;
use events::{handle_member_add, handle_member_removal, handle_message};
use gateway::DiscordGateway;
use logging::SharedLogBuffer;
use onboarding::{create_shared_onboarding_manager, SharedOnboardingManager};
use state::{create_shared_pool_store, PoolStore};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub onboarding: SharedOnboardingManager,
    pub log_buffer: SharedLogBuffer,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = handle_message(ctx, new_message, data).await {
                error!("Failed to handle message: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = handle_member_add(ctx, new_member, data).await {
                error!("Failed to handle new member: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            if let Err(e) = handle_member_removal(*guild_id, user, data).await {
                error!("Failed to handle member removal: {}", e);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Log the application ID encoded in the first segment of the token
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));

    if let Some(id_str) = decoded.ok().and_then(|d| String::from_utf8(d).ok()) {
        info!(
            "Bot ID: {} (enable the Server Members intent at https://discord.com/developers/applications/{}/bot)",
            id_str, id_str
        );
    }
}

fn load_onboarding_config(data_path: &str) -> Result<OnboardingConfig> {
    let path = format!("{}/onboarding.json", data_path);
    if !Path::new(&path).exists() {
        info!("No {} found, using default onboarding config", path);
        return Ok(OnboardingConfig::default());
    }

    let config = OnboardingConfig::load_from_file(&path)?;
    info!(
        "Loaded onboarding config: {} questions, welcome channel '{}', {}s timeout",
        config.questions.len(),
        config.welcome_channel,
        config.answer_timeout_secs
    );
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let log_buffer = logging::create_log_buffer(500);
    let log_file = std::env::var("LOG_FILE").unwrap_or_else(|_| "logs/bot.log".to_string());
    logging::init(
        log_buffer.clone(),
        Some(log_file.as_str()).filter(|p| !p.is_empty()),
    )?;

    let token = std::env::var("DISCORD_TOKEN")
        .map_err(|_| anyhow::anyhow!("Missing DISCORD_TOKEN environment variable"))?;
    log_bot_id(&token);

    let data_path = std::env::var("DATA_PATH").unwrap_or_else(|_| "data".to_string());
    let state_path = std::env::var("STATE_PATH").unwrap_or_else(|_| "state".to_string());

    // Ensure state directory exists
    tokio::fs::create_dir_all(&state_path).await?;

    let onboarding_config = Arc::new(load_onboarding_config(&data_path)?);

    info!("Loading character pool...");
    let seed_path = format!("{}/characters.json", data_path);
    let pool_store = create_shared_pool_store(
        PoolStore::open(
            format!("{}/characters.json", state_path),
            Some(Path::new(&seed_path)),
        )
        .await?,
    );
    info!("Character pool stored at {}", pool_store.path().display());

    let guild_commands = args.guild_commands || args.guild_id.is_some();
    let target_guild_id = args.guild_id;

    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), help(), pool(), recent_logs()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say(format!("An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                            let _ = ctx.say("Invalid arguments provided.").await;
                        }
                        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
                            error!("User {} missing permissions for '{}': {:?}", ctx.author().name, ctx.command().qualified_name, missing_permissions);
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let onboarding_config = onboarding_config.clone();
            let pool_store = pool_store.clone();
            let log_buffer = log_buffer.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let guilds_to_register: Vec<serenity::GuildId> = match target_guild_id {
                    Some(gid) => vec![serenity::GuildId::new(gid)],
                    None => ready.guilds.iter().map(|g| g.id).collect(),
                };

                if guild_commands {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        }
                    }
                } else if let Err(e) = poise::builtins::register_globally(
                    ctx,
                    &framework.options().commands,
                ).await {
                    error!("Failed to register commands globally: {}", e);
                }

                let gateway = Arc::new(DiscordGateway::new(ctx.http.clone()));
                let onboarding =
                    create_shared_onboarding_manager(gateway, pool_store, onboarding_config);

                Ok(Data {
                    onboarding,
                    log_buffer,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable the GUILD_MEMBERS and MESSAGE_CONTENT privileged intents at https://discord.com/developers/applications -> Your App -> Bot -> Privileged Gateway Intents");
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents: GUILD_MEMBERS, MESSAGE_CONTENT"
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
