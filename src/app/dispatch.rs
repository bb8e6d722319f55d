use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::services::{GalleryServices, discord_http, discord_source, open_store};
use crate::cli::{Cli, Commands, GalleryCommands};
use crate::config::Config;
use crate::error::TransportError;
use crate::gallery::{ChannelRef, GalleryCommand};
use crate::runtime::supervisor::{Backoff, spawn_component_supervisor};
use crate::transport::discord::{GalleryBot, commands};

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run => run_bot(config).await,
        Commands::RegisterCommands => register_commands(&config).await,
        Commands::Gallery(command) => {
            let reply = run_gallery_command(&config, command).await?;
            println!("{reply}");
            Ok(())
        }
    }
}

async fn run_bot(config: Config) -> Result<()> {
    config.validate_for_bot()?;

    let http = discord_http(&config);
    let store = open_store(&config).await?;
    let services = GalleryServices::assemble(&config, store, discord_source(&http));

    let bot = Arc::new(GalleryBot::new(
        config.discord.clone(),
        http,
        Arc::clone(&services.enforcer),
        Arc::clone(&services.router),
    ));

    let shutdown = CancellationToken::new();
    let supervisor = spawn_component_supervisor(
        "discord",
        Backoff::from_reliability(&config.reliability),
        0,
        shutdown.clone(),
        move || {
            let bot = Arc::clone(&bot);
            async move { bot.listen().await }
        },
    );

    tracing::info!("gallerist running; press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("listen for shutdown signal")?;
    tracing::info!("shutting down");
    shutdown.cancel();
    supervisor.await.context("join discord supervisor")?;
    services.drain().await;
    Ok(())
}

async fn register_commands(config: &Config) -> Result<()> {
    config.validate_for_commands()?;
    let application_id = config
        .discord
        .application_id
        .as_deref()
        .context("discord.application_id is not set")?;

    let http = discord_http(config);
    commands::register_commands(&http, application_id, config.discord.guild_id.as_deref())
        .await?;

    let scope = config.discord.guild_id.as_deref().unwrap_or("global");
    tracing::info!(scope, "registered gallery-channels command");
    println!("Registered /{} ({scope}).", commands::GALLERY_COMMAND_NAME);
    Ok(())
}

/// Run one gallery subcommand through the command router and return its reply.
pub async fn run_gallery_command(config: &Config, command: GalleryCommands) -> Result<String> {
    if command.needs_discord() {
        config.validate_for_bot()?;
    }

    let http = discord_http(config);
    let store = open_store(config).await?;
    let services = GalleryServices::assemble(config, store, discord_source(&http));

    let command = match command {
        GalleryCommands::List => GalleryCommand::List,
        GalleryCommands::Add { channel } => GalleryCommand::Add {
            channel: ChannelRef::text(channel),
        },
        GalleryCommands::Remove { channel } => GalleryCommand::Remove {
            channel: ChannelRef::text(channel),
        },
        GalleryCommands::Clean { channel: None } => GalleryCommand::Clean { channel: None },
        GalleryCommands::Clean {
            channel: Some(id),
        } => {
            let channel = services
                .source
                .resolve_channel(&id)
                .await?
                .ok_or(TransportError::ChannelNotFound(id))?;
            GalleryCommand::Clean {
                channel: Some(channel),
            }
        }
    };

    let reply = services.router.handle(command).await;
    services.drain().await;
    Ok(reply)
}
