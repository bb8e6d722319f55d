use clap::{Parser, Subcommand};

/// `Gallerist` - keeps Discord gallery channels image-only.
#[derive(Parser, Debug)]
#[command(name = "gallerist")]
#[command(version)]
#[command(about = "Image-only gallery channel moderation for Discord.", long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to Discord and enforce gallery channels
    Run,

    /// Register the `gallery-channels` slash command
    RegisterCommands,

    /// Manage gallery channels from the terminal
    #[command(subcommand)]
    Gallery(GalleryCommands),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum GalleryCommands {
    /// List gallery channels
    List,

    /// Add a gallery channel
    Add {
        /// Channel id
        channel: String,
    },

    /// Remove a gallery channel
    Remove {
        /// Channel id
        channel: String,
    },

    /// Remove non-image messages from one channel, or from every gallery
    Clean {
        /// Channel id; all galleries when omitted
        channel: Option<String>,
    },
}

impl GalleryCommands {
    /// Whether the command needs to reach Discord.
    pub fn needs_discord(&self) -> bool {
        matches!(self, Self::Clean { .. })
    }
}
