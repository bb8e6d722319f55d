use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory - computed from home, not serialized
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub gallery: GalleryConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub application_id: Option<String>,
    /// Register commands for this guild only (instant propagation).
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub intents: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub activity_type: Option<u8>,
    #[serde(default)]
    pub activity_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Role or user id that is never moderated.
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default = "default_warning_delete_after_secs")]
    pub warning_delete_after_secs: u64,
    #[serde(default = "default_registry_key")]
    pub registry_key: String,
    #[serde(default = "default_max_update_attempts")]
    pub max_update_attempts: u32,
}

fn default_warning_delete_after_secs() -> u64 {
    5
}

fn default_registry_key() -> String {
    "gallery_channels".into()
}

fn default_max_update_attempts() -> u32 {
    8
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            admin_id: None,
            warning_delete_after_secs: default_warning_delete_after_secs(),
            registry_key: default_registry_key(),
            max_update_attempts: default_max_update_attempts(),
        }
    }
}

impl GalleryConfig {
    pub fn warning_delete_after(&self) -> Duration {
        Duration::from_secs(self.warning_delete_after_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite file holding the config table. Defaults to `<data dir>/gallerist.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_channel_backoff_secs")]
    pub channel_initial_backoff_secs: u64,
    #[serde(default = "default_channel_backoff_max_secs")]
    pub channel_max_backoff_secs: u64,
}

fn default_channel_backoff_secs() -> u64 {
    2
}

fn default_channel_backoff_max_secs() -> u64 {
    60
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            channel_initial_backoff_secs: default_channel_backoff_secs(),
            channel_max_backoff_secs: default_channel_backoff_max_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let gallerist_dir = home.join(".gallerist");

        Self {
            data_dir: gallerist_dir.clone(),
            config_path: gallerist_dir.join("config.toml"),
            discord: DiscordConfig::default(),
            gallery: GalleryConfig::default(),
            storage: StorageConfig::default(),
            reliability: ReliabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("gallerist.db"))
    }

    /// Checks the settings needed to talk to Discord.
    pub fn validate_for_bot(&self) -> Result<(), ConfigError> {
        if self.discord.bot_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "discord.bot_token is empty (set it in config.toml or GALLERIST_BOT_TOKEN)".into(),
            ));
        }
        if self.gallery.max_update_attempts == 0 {
            return Err(ConfigError::Validation(
                "gallery.max_update_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn validate_for_commands(&self) -> Result<(), ConfigError> {
        self.validate_for_bot()?;
        if self
            .discord
            .application_id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "discord.application_id is required to register commands".into(),
            ));
        }
        Ok(())
    }
}
