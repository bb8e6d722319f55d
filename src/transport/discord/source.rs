//! [`MessageSource`] backed by the Discord REST API.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use super::http_client::DiscordHttpClient;
use super::types::{MESSAGE_PAGE_LIMIT, has_message_history};
use crate::error::TransportError;
use crate::gallery::{
    Author, ChannelRef, GalleryMessage, MessageSource, OutgoingReply, SentMessage, SourceFuture,
};

/// Build a [`GalleryMessage`] from a Discord message object. Gateway
/// `MESSAGE_CREATE` payloads additionally carry `member.roles`; REST history
/// does not.
pub fn parse_message(d: &serde_json::Value) -> Option<GalleryMessage> {
    let id = d.get("id")?.as_str()?.to_string();
    let channel_id = d.get("channel_id")?.as_str()?.to_string();
    let author = d.get("author")?;
    let author_id = author.get("id")?.as_str()?.to_string();
    let bot = author
        .get("bot")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
        || d.get("webhook_id").is_some_and(|id| !id.is_null());

    let member_roles = d
        .get("member")
        .and_then(|member| member.get("roles"))
        .and_then(serde_json::Value::as_array)
        .map(|roles| {
            roles
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let attachment_count = d
        .get("attachments")
        .and_then(serde_json::Value::as_array)
        .map_or(0, Vec::len);

    Some(GalleryMessage {
        id,
        channel_id,
        author: Author { id: author_id, bot },
        member_roles,
        attachment_count,
        content: d
            .get("content")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
            .to_string(),
        timestamp: d
            .get("timestamp")
            .and_then(serde_json::Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc)),
    })
}

/// Classify a Discord channel object. Unknown channel types are treated as
/// not text-capable.
pub fn parse_channel(d: &serde_json::Value) -> Option<ChannelRef> {
    let id = d.get("id")?.as_str()?.to_string();
    let text_capable = d
        .get("type")
        .and_then(serde_json::Value::as_u64)
        .is_some_and(has_message_history);
    Some(ChannelRef { id, text_capable })
}

pub struct DiscordMessageSource {
    http: Arc<DiscordHttpClient>,
}

impl DiscordMessageSource {
    pub fn new(http: Arc<DiscordHttpClient>) -> Self {
        Self { http }
    }

    /// Page backwards through history until a short page, then return the
    /// messages oldest first.
    async fn fetch_history(&self, channel_id: &str) -> anyhow::Result<Vec<GalleryMessage>> {
        let mut messages = Vec::new();
        let mut before: Option<String> = None;

        loop {
            let page = self
                .http
                .get_channel_messages(channel_id, before.as_deref(), MESSAGE_PAGE_LIMIT)
                .await
                .with_context(|| format!("fetch history of channel {channel_id}"))?;
            let page_len = page.len();

            for raw in &page {
                match parse_message(raw) {
                    Some(message) => messages.push(message),
                    None => tracing::debug!(channel = %channel_id, "skipping unparseable message"),
                }
            }

            let oldest = page
                .last()
                .and_then(|raw| raw.get("id"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);

            match oldest {
                Some(id) if page_len >= MESSAGE_PAGE_LIMIT => before = Some(id),
                _ => break,
            }
        }

        messages.reverse();
        tracing::debug!(channel = %channel_id, count = messages.len(), "fetched channel history");
        Ok(messages)
    }
}

impl MessageSource for DiscordMessageSource {
    fn fetch_all_messages<'a>(
        &'a self,
        channel_id: &'a str,
    ) -> SourceFuture<'a, Vec<GalleryMessage>> {
        Box::pin(self.fetch_history(channel_id))
    }

    fn reply<'a>(
        &'a self,
        target: &'a GalleryMessage,
        reply: &'a OutgoingReply,
    ) -> SourceFuture<'a, SentMessage> {
        Box::pin(async move {
            let sent = self
                .http
                .reply_to_message(
                    &target.channel_id,
                    &target.id,
                    &reply.content,
                    &reply.mention_users,
                    reply.fail_if_not_exists,
                )
                .await?;
            let id = sent
                .get("id")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| TransportError::Payload("reply without message id".into()))?
                .to_string();
            let channel_id = sent
                .get("channel_id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(&target.channel_id)
                .to_string();
            Ok(SentMessage { id, channel_id })
        })
    }

    fn delete_message<'a>(
        &'a self,
        channel_id: &'a str,
        message_id: &'a str,
    ) -> SourceFuture<'a, ()> {
        Box::pin(self.http.delete_message(channel_id, message_id))
    }

    fn resolve_channel<'a>(&'a self, channel_id: &'a str) -> SourceFuture<'a, Option<ChannelRef>> {
        Box::pin(async move {
            let Some(raw) = self.http.get_channel(channel_id).await? else {
                return Ok(None);
            };
            Ok(parse_channel(&raw))
        })
    }
}
