use anyhow::Result;
use serde_json::json;
use std::str::FromStr;

use super::http_client::DiscordHttpClient;
use super::source::parse_channel;
use super::types::{
    CALLBACK_DEFERRED_MESSAGE, COMMAND_CHAT_INPUT, GALLERY_PICKER_CHANNEL_TYPES, OPTION_CHANNEL,
    OPTION_SUB_COMMAND,
};
use crate::error::TransportError;
use crate::gallery::{ChannelRef, GalleryCommand, GallerySubcommand};

pub const GALLERY_COMMAND_NAME: &str = "gallery-channels";

const CHANNEL_OPTION: &str = "channel";

fn channel_option(description: &str, required: bool) -> serde_json::Value {
    json!({
        "name": CHANNEL_OPTION,
        "description": description,
        "type": OPTION_CHANNEL,
        "required": required,
        "channel_types": GALLERY_PICKER_CHANNEL_TYPES,
    })
}

fn subcommand(
    name: GallerySubcommand,
    description: &str,
    options: Vec<serde_json::Value>,
) -> serde_json::Value {
    let name: &'static str = name.into();
    json!({
        "name": name,
        "description": description,
        "type": OPTION_SUB_COMMAND,
        "options": options,
    })
}

/// The `gallery-channels` chat-input command with its four subcommands.
pub fn build_gallery_command() -> serde_json::Value {
    json!({
        "name": GALLERY_COMMAND_NAME,
        "description": "Controller for the gallery-channels module",
        "type": COMMAND_CHAT_INPUT,
        "options": [
            subcommand(
                GallerySubcommand::Add,
                "Add a new gallery channel",
                vec![channel_option("Existing messages will be preserved", true)],
            ),
            subcommand(
                GallerySubcommand::Remove,
                "Remove a gallery channel",
                vec![channel_option("New messages will no longer be moderated", true)],
            ),
            subcommand(GallerySubcommand::List, "List existing gallery channels", vec![]),
            subcommand(
                GallerySubcommand::Clean,
                "Clean (an) existing gallery channel(s)",
                vec![channel_option("If specified, only this channel will be cleaned", false)],
            ),
        ],
    })
}

pub async fn register_commands(
    http: &DiscordHttpClient,
    application_id: &str,
    guild_id: Option<&str>,
) -> Result<()> {
    http.register_commands(application_id, guild_id, &[build_gallery_command()])
        .await
}

pub fn is_gallery_command(data: &serde_json::Value) -> bool {
    data.get("name").and_then(serde_json::Value::as_str) == Some(GALLERY_COMMAND_NAME)
}

/// Decode interaction data for the gallery command into a [`GalleryCommand`].
///
/// Channel options are resolved through `data.resolved.channels` so the
/// router knows whether the channel carries messages.
pub fn parse_gallery_command(data: &serde_json::Value) -> Result<GalleryCommand, TransportError> {
    let sub = data
        .get("options")
        .and_then(serde_json::Value::as_array)
        .and_then(|options| options.first())
        .ok_or_else(|| TransportError::Payload("gallery command without subcommand".into()))?;
    let sub_name = sub
        .get("name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    let subcommand = GallerySubcommand::from_str(sub_name)
        .map_err(|_| TransportError::Payload(format!("unknown subcommand {sub_name:?}")))?;

    let channel = channel_argument(data, sub);
    let required = |channel: Option<ChannelRef>| {
        channel.ok_or_else(|| {
            TransportError::Payload(format!("subcommand {sub_name} requires a channel"))
        })
    };

    Ok(match subcommand {
        GallerySubcommand::Add => GalleryCommand::Add {
            channel: required(channel)?,
        },
        GallerySubcommand::Remove => GalleryCommand::Remove {
            channel: required(channel)?,
        },
        GallerySubcommand::List => GalleryCommand::List,
        GallerySubcommand::Clean => GalleryCommand::Clean { channel },
    })
}

fn channel_argument(data: &serde_json::Value, sub: &serde_json::Value) -> Option<ChannelRef> {
    let id = sub
        .get("options")
        .and_then(serde_json::Value::as_array)?
        .iter()
        .find(|opt| opt.get("name").and_then(serde_json::Value::as_str) == Some(CHANNEL_OPTION))?
        .get("value")?
        .as_str()?;

    data.get("resolved")
        .and_then(|resolved| resolved.get("channels"))
        .and_then(|channels| channels.get(id))
        .and_then(parse_channel)
        .or_else(|| {
            Some(ChannelRef {
                id: id.to_string(),
                text_capable: false,
            })
        })
}

pub async fn defer_interaction(
    http: &DiscordHttpClient,
    interaction_id: &str,
    interaction_token: &str,
) -> Result<()> {
    http.create_interaction_response(interaction_id, interaction_token, CALLBACK_DEFERRED_MESSAGE)
        .await
}

pub async fn send_interaction_followup(
    http: &DiscordHttpClient,
    application_id: &str,
    interaction_token: &str,
    content: &str,
) -> Result<()> {
    http.edit_original_interaction_response(application_id, interaction_token, content)
        .await
}
