use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::gallery::{
    CommandRouter, ExemptionPolicy, GalleryEnforcer, GalleryRegistry, MessageSource,
    PolicyEvaluator, Remediator, Sweeper,
};
use crate::store::{ConfigStore, SqliteConfigStore};
use crate::transport::discord::DiscordMessageSource;
use crate::transport::discord::http_client::DiscordHttpClient;

/// The wired gallery components, shared by the bot and the terminal commands.
pub struct GalleryServices {
    pub registry: Arc<GalleryRegistry>,
    pub enforcer: Arc<GalleryEnforcer>,
    pub sweeper: Arc<Sweeper>,
    pub router: Arc<CommandRouter>,
    pub source: Arc<dyn MessageSource>,
}

impl GalleryServices {
    pub fn assemble(
        config: &Config,
        store: Arc<dyn ConfigStore>,
        source: Arc<dyn MessageSource>,
    ) -> Self {
        let registry = Arc::new(GalleryRegistry::new(
            store,
            config.gallery.registry_key.clone(),
            config.gallery.max_update_attempts,
        ));
        let enforcer = Arc::new(GalleryEnforcer::new(
            PolicyEvaluator::new(ExemptionPolicy::new(config.gallery.admin_id.clone())),
            Remediator::new(Arc::clone(&source), config.gallery.warning_delete_after()),
            Arc::clone(&registry),
        ));
        let sweeper = Arc::new(Sweeper::new(Arc::clone(&enforcer), Arc::clone(&source)));
        let router = Arc::new(CommandRouter::new(
            Arc::clone(&registry),
            Arc::clone(&sweeper),
            Arc::clone(&source),
        ));

        Self {
            registry,
            enforcer,
            sweeper,
            router,
            source,
        }
    }

    /// Block until warnings posted by these services have been removed.
    /// Called before the runtime goes away.
    pub async fn drain(&self) {
        self.enforcer.wait_for_cleanups().await;
    }
}

pub async fn open_store(config: &Config) -> Result<Arc<dyn ConfigStore>> {
    let path = config.database_path();
    let store = SqliteConfigStore::open(&path)
        .await
        .with_context(|| format!("open config store at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "config store opened");
    Ok(Arc::new(store))
}

pub fn discord_http(config: &Config) -> Arc<DiscordHttpClient> {
    Arc::new(DiscordHttpClient::new(&config.discord.bot_token))
}

pub fn discord_source(http: &Arc<DiscordHttpClient>) -> Arc<dyn MessageSource> {
    Arc::new(DiscordMessageSource::new(Arc::clone(http)))
}
