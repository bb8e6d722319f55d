use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, Response, StatusCode, Url, header::HeaderMap};
use serde_json::{Value, json};

use super::types::API_BASE;

/// Attempts after the first 429 before a request is given up.
const MAX_RATE_LIMIT_RETRIES: u8 = 3;
const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(1);

/// REST calls the gallery bot makes, authenticated as the bot user.
pub struct DiscordHttpClient {
    client: reqwest::Client,
    base_url: String,
    authorization: String,
}

impl DiscordHttpClient {
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_base_url(bot_token, API_BASE)
    }

    /// Client against a different API root, e.g. a local mock server.
    #[must_use]
    pub fn with_base_url(bot_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            authorization: format!("Bot {}", bot_token.into()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// One page of channel history, newest first (Discord's order).
    pub async fn get_channel_messages(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let mut params = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            params.push(("before", before.to_string()));
        }
        let url = Url::parse_with_params(
            &self.url(&format!("/channels/{channel_id}/messages")),
            &params,
        )
        .context("build Discord channel messages URL")?;

        self.call_ok(Method::GET, url.as_str(), None)
            .await?
            .json()
            .await
            .context("parse Discord channel messages")
    }

    /// `Ok(None)` when the channel is unknown or not visible to the bot.
    pub async fn get_channel(&self, channel_id: &str) -> Result<Option<Value>> {
        let url = self.url(&format!("/channels/{channel_id}"));
        let response = self.call(Method::GET, &url, None).await?;
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        check_status(&Method::GET, &url, response)
            .await?
            .json()
            .await
            .map(Some)
            .context("parse Discord channel")
    }

    /// Reply to `message_id`, pinging only `mention_users`.
    pub async fn reply_to_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
        mention_users: &[String],
        fail_if_not_exists: bool,
    ) -> Result<Value> {
        let body = json!({
            "content": content,
            "message_reference": {
                "message_id": message_id,
                "channel_id": channel_id,
                "fail_if_not_exists": fail_if_not_exists,
            },
            "allowed_mentions": {
                "parse": [],
                "users": mention_users,
                "replied_user": false,
            },
        });
        let url = self.url(&format!("/channels/{channel_id}/messages"));
        self.call_ok(Method::POST, &url, Some(&body))
            .await?
            .json()
            .await
            .context("parse Discord reply")
    }

    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let url = self.url(&format!("/channels/{channel_id}/messages/{message_id}"));
        self.call_ok(Method::DELETE, &url, None).await?;
        Ok(())
    }

    /// WebSocket URL to open the gateway against.
    pub async fn gateway_url(&self) -> Result<String> {
        let body: Value = self
            .call_ok(Method::GET, &self.url("/gateway/bot"), None)
            .await?
            .json()
            .await
            .context("parse Discord gateway/bot")?;
        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("gateway/bot response without url")
    }

    pub async fn create_interaction_response(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        callback_type: u8,
    ) -> Result<()> {
        let url = self.url(&format!(
            "/interactions/{interaction_id}/{interaction_token}/callback"
        ));
        self.call_ok(Method::POST, &url, Some(&json!({ "type": callback_type })))
            .await?;
        Ok(())
    }

    pub async fn edit_original_interaction_response(
        &self,
        application_id: &str,
        interaction_token: &str,
        content: &str,
    ) -> Result<()> {
        let url = self.url(&format!(
            "/webhooks/{application_id}/{interaction_token}/messages/@original"
        ));
        self.call_ok(Method::PATCH, &url, Some(&json!({ "content": content })))
            .await?;
        Ok(())
    }

    /// Bulk overwrite of the application's commands, guild-scoped when
    /// `guild_id` is set.
    pub async fn register_commands(
        &self,
        application_id: &str,
        guild_id: Option<&str>,
        commands: &[Value],
    ) -> Result<()> {
        let path = match guild_id {
            Some(guild) => format!("/applications/{application_id}/guilds/{guild}/commands"),
            None => format!("/applications/{application_id}/commands"),
        };
        self.call_ok(Method::PUT, &self.url(&path), Some(&json!(commands)))
            .await?;
        Ok(())
    }

    async fn call_ok(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response> {
        let response = self.call(method.clone(), url, body).await?;
        check_status(&method, url, response).await
    }

    /// Send, sleeping through 429 responses. Other statuses are returned as is.
    async fn call(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response> {
        let mut retries = 0;
        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .header("Authorization", &self.authorization);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request
                .send()
                .await
                .with_context(|| format!("send Discord request {method} {url}"))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            if retries == MAX_RATE_LIMIT_RETRIES {
                anyhow::bail!("Discord request {method} {url} still rate limited after {retries} retries");
            }
            retries += 1;

            let wait = retry_after(response).await;
            tracing::debug!(%method, url, ?wait, retries, "Discord rate limited");
            tokio::time::sleep(wait).await;
        }
    }
}

async fn check_status(method: &Method, url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    anyhow::bail!("Discord request {method} {url} failed ({status}): {body}")
}

/// The `Retry-After` header, else the JSON body's `retry_after`.
async fn retry_after(response: Response) -> Duration {
    if let Some(wait) = retry_after_header(response.headers()) {
        return wait;
    }
    response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("retry_after").and_then(Value::as_f64))
        .map_or(FALLBACK_RETRY_AFTER, seconds)
}

fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("Retry-After")?
        .to_str()
        .ok()?
        .parse::<f64>()
        .ok()
        .map(seconds)
}

fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}
