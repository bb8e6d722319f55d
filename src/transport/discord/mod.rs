pub mod commands;
pub mod gateway;
pub mod http_client;
pub mod source;
pub mod types;

use crate::config::DiscordConfig;
use crate::gallery::{CommandRouter, FAILURE_REPLY, GalleryEnforcer, GalleryMessage, MessageOutcome};
use std::sync::Arc;
use tokio_util::task::AbortOnDropHandle;

use self::commands::{
    defer_interaction, is_gallery_command, parse_gallery_command, send_interaction_followup,
};
use self::gateway::{GatewayEvent, GatewaySession};
use self::http_client::DiscordHttpClient;
use self::types::DEFAULT_INTENTS;

pub use self::source::DiscordMessageSource;

/// An application-command interaction addressed to the bot.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub id: String,
    pub token: String,
    pub application_id: Option<String>,
    pub user_id: String,
    pub data: serde_json::Value,
}

/// Connects the gallery core to the Discord gateway: messages go to the
/// enforcer, `gallery-channels` interactions go to the command router.
pub struct GalleryBot {
    http: Arc<DiscordHttpClient>,
    config: DiscordConfig,
    enforcer: Arc<GalleryEnforcer>,
    router: Arc<CommandRouter>,
    bot_user_id: std::sync::Mutex<Option<String>>,
}

impl GalleryBot {
    pub fn new(
        config: DiscordConfig,
        http: Arc<DiscordHttpClient>,
        enforcer: Arc<GalleryEnforcer>,
        router: Arc<CommandRouter>,
    ) -> Self {
        Self {
            http,
            config,
            enforcer,
            router,
            bot_user_id: std::sync::Mutex::new(None),
        }
    }

    fn intents(&self) -> u64 {
        self.config.intents.unwrap_or(DEFAULT_INTENTS)
    }

    fn build_presence(&self) -> Option<serde_json::Value> {
        let status = self.config.status.as_deref().unwrap_or("online");
        let activity_name = self.config.activity_name.as_deref()?;
        let activity_type = self.config.activity_type.unwrap_or(0);

        Some(serde_json::json!({
            "status": status,
            "activities": [{
                "name": activity_name,
                "type": activity_type,
            }],
            "since": null,
            "afk": false,
        }))
    }

    fn set_bot_user_id(&self, user_id: &str) {
        if let Ok(mut guard) = self.bot_user_id.lock() {
            *guard = Some(user_id.to_string());
        }
    }

    fn is_bot_user(&self, user_id: &str) -> bool {
        self.bot_user_id
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .is_some_and(|id| id == user_id)
    }

    /// Run one gateway session. Each message and interaction is handled on
    /// its own task so a slow sweep never stalls the event stream. Dropping
    /// the returned future closes the connection.
    pub async fn listen(self: &Arc<Self>) -> anyhow::Result<()> {
        let gateway_url = self.http.gateway_url().await?;
        let session = GatewaySession::new(
            self.config.bot_token.clone(),
            self.intents(),
            self.build_presence(),
        );

        let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<GatewayEvent>(100);
        let mut connection = AbortOnDropHandle::new(tokio::spawn(async move {
            session.run(&gateway_url, &event_tx).await
        }));

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    self.dispatch(event);
                }
                result = &mut connection => return flatten_join(result),
            }
        }

        flatten_join(connection.await)
    }

    fn dispatch(self: &Arc<Self>, event: GatewayEvent) {
        let bot = Arc::clone(self);
        match event {
            GatewayEvent::Ready { user_id } => {
                tokio::spawn(async move { bot.handle_ready(&user_id).await });
            }
            GatewayEvent::Message(message) => {
                tokio::spawn(async move { bot.handle_message(&message).await });
            }
            GatewayEvent::Command(interaction) => {
                if !is_gallery_command(&interaction.data) {
                    return;
                }
                tokio::spawn(async move { bot.handle_interaction(&interaction).await });
            }
        }
    }

    pub async fn handle_ready(&self, user_id: &str) {
        self.set_bot_user_id(user_id);
        tracing::info!(user = %user_id, "Discord: connected");

        if let Some(app_id) = &self.config.application_id {
            if let Err(e) =
                commands::register_commands(&self.http, app_id, self.config.guild_id.as_deref())
                    .await
            {
                tracing::warn!(error = %format!("{e:#}"), "Discord: failed to register slash commands");
            }
        }
    }

    /// Live enforcement against the persisted registry.
    pub async fn handle_message(&self, message: &GalleryMessage) -> Option<MessageOutcome> {
        if self.is_bot_user(&message.author.id) {
            return None;
        }
        match self.enforcer.handle_message(message, None).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(
                    channel = %message.channel_id,
                    message = %message.id,
                    error = %format!("{e:#}"),
                    "gallery enforcement failed"
                );
                None
            }
        }
    }

    /// Defer, run the command, then put the result into the deferred reply.
    pub async fn handle_interaction(&self, interaction: &Interaction) {
        if let Err(e) = defer_interaction(&self.http, &interaction.id, &interaction.token).await {
            tracing::warn!(error = %format!("{e:#}"), "Discord: failed to defer interaction");
            return;
        }

        let reply = match parse_gallery_command(&interaction.data) {
            Ok(command) => {
                tracing::debug!(user = %interaction.user_id, ?command, "gallery command received");
                self.router.handle(command).await
            }
            Err(e) => {
                tracing::error!(user = %interaction.user_id, error = %e, "malformed gallery command");
                FAILURE_REPLY.to_string()
            }
        };

        let Some(application_id) = interaction
            .application_id
            .as_deref()
            .or(self.config.application_id.as_deref())
        else {
            tracing::warn!("Discord: no application id to answer interaction");
            return;
        };

        if let Err(e) =
            send_interaction_followup(&self.http, application_id, &interaction.token, &reply).await
        {
            tracing::warn!(error = %format!("{e:#}"), "Discord: failed to deliver command reply");
        }
    }
}

fn flatten_join(
    result: Result<anyhow::Result<()>, tokio::task::JoinError>,
) -> anyhow::Result<()> {
    result.unwrap_or_else(|e| Err(anyhow::anyhow!("Discord gateway task failed: {e}")))
}
