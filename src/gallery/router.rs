use super::message::{ChannelRef, MessageSource};
use super::registry::{AddOutcome, GalleryRegistry, RemoveOutcome};
use super::sweep::Sweeper;
use std::fmt::Write as _;
use std::sync::Arc;
use strum::{EnumString, IntoStaticStr};

pub const SUCCESS_GLYPH: &str = "✅ ";
pub const FAILURE_GLYPH: &str = "❌ ";

/// Reply for any command that failed; carries no internal detail.
pub const FAILURE_REPLY: &str = "❌ Something went wrong.";

/// Subcommand names of the `gallery-channels` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum GallerySubcommand {
    Add,
    Remove,
    List,
    Clean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryCommand {
    Add { channel: ChannelRef },
    Remove { channel: ChannelRef },
    List,
    Clean { channel: Option<ChannelRef> },
}

impl GalleryCommand {
    pub fn subcommand(&self) -> GallerySubcommand {
        match self {
            Self::Add { .. } => GallerySubcommand::Add,
            Self::Remove { .. } => GallerySubcommand::Remove,
            Self::List => GallerySubcommand::List,
            Self::Clean { .. } => GallerySubcommand::Clean,
        }
    }
}

fn success(text: &str) -> String {
    format!("{SUCCESS_GLYPH}{text}")
}

fn failure(text: &str) -> String {
    format!("{FAILURE_GLYPH}{text}")
}

pub fn format_gallery_list(channel_ids: &[String]) -> String {
    let mut out = String::from("**Gallery Channels**\n\n");
    if channel_ids.is_empty() {
        out.push_str("*None*");
        return out;
    }
    for (i, id) in channel_ids.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "- <#{id}>");
    }
    out
}

/// Maps administrative commands onto registry mutations and sweeps.
pub struct CommandRouter {
    registry: Arc<GalleryRegistry>,
    sweeper: Arc<Sweeper>,
    source: Arc<dyn MessageSource>,
}

impl CommandRouter {
    pub fn new(
        registry: Arc<GalleryRegistry>,
        sweeper: Arc<Sweeper>,
        source: Arc<dyn MessageSource>,
    ) -> Self {
        Self {
            registry,
            sweeper,
            source,
        }
    }

    /// Run a command and produce the reply text. Never fails: any error is
    /// logged and turned into a generic failure reply.
    pub async fn handle(&self, command: GalleryCommand) -> String {
        let subcommand: &'static str = command.subcommand().into();
        match self.execute(command).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(subcommand, error = %e, "gallery command failed");
                FAILURE_REPLY.to_string()
            }
        }
    }

    async fn execute(&self, command: GalleryCommand) -> crate::Result<String> {
        let galleries = self.registry.list().await?;

        match command {
            GalleryCommand::Add { channel } => {
                if galleries.contains(&channel.id) {
                    return Ok(failure("Channel is already a gallery."));
                }
                match self.registry.add(&channel.id).await? {
                    AddOutcome::Added => Ok(success("Gallery successfully added.")),
                    AddOutcome::AlreadyPresent => Ok(failure("Channel is already a gallery.")),
                }
            }
            GalleryCommand::Remove { channel } => {
                if !galleries.contains(&channel.id) {
                    return Ok(failure("Channel is not a gallery."));
                }
                match self.registry.remove(&channel.id).await? {
                    RemoveOutcome::Removed => Ok(success("Gallery successfully removed.")),
                    RemoveOutcome::NotPresent => Ok(failure("Channel is not a gallery.")),
                }
            }
            GalleryCommand::List => Ok(format_gallery_list(&galleries)),
            GalleryCommand::Clean { channel } => {
                let targets = match channel {
                    Some(channel) if channel.text_capable => vec![channel.id],
                    _ => self.resolve_text_channels(&galleries).await,
                };
                let report = self.sweeper.sweep(&targets).await;
                let count = report.remediated_count();
                tracing::info!(channels = targets.len(), count, "cleaned gallery channels");
                Ok(success(&format!("Cleaned `{count}` messages.")))
            }
        }
    }

    async fn resolve_text_channels(&self, galleries: &[String]) -> Vec<String> {
        let mut resolved = Vec::with_capacity(galleries.len());
        for id in galleries {
            match self.source.resolve_channel(id).await {
                Ok(Some(channel)) if channel.text_capable => resolved.push(channel.id),
                Ok(Some(_)) => {
                    tracing::debug!(channel = %id, "skipping gallery: not text-capable");
                }
                Ok(None) => {
                    tracing::debug!(channel = %id, "skipping gallery: channel not found");
                }
                Err(e) => {
                    tracing::warn!(channel = %id, error = %e, "skipping gallery: resolve failed");
                }
            }
        }
        resolved
    }
}
