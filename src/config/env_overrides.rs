use super::Config;
use std::path::PathBuf;

fn non_empty_var(primary: &str, fallback: Option<&str>) -> Option<String> {
    std::env::var(primary)
        .ok()
        .or_else(|| fallback.and_then(|name| std::env::var(name).ok()))
        .filter(|value| !value.trim().is_empty())
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = non_empty_var("GALLERIST_BOT_TOKEN", Some("DISCORD_TOKEN")) {
            self.discord.bot_token = token;
        }

        if let Some(app_id) = non_empty_var("GALLERIST_APPLICATION_ID", None) {
            self.discord.application_id = Some(app_id);
        }

        if let Some(guild_id) = non_empty_var("GALLERIST_GUILD_ID", None) {
            self.discord.guild_id = Some(guild_id);
        }

        if let Some(admin_id) = non_empty_var("GALLERIST_ADMIN_ID", Some("ADMIN_ID")) {
            self.gallery.admin_id = Some(admin_id);
        }

        if let Some(path) = non_empty_var("GALLERIST_DATABASE_PATH", None) {
            self.storage.database_path = Some(PathBuf::from(path));
        }
    }
}
