use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`MessageSource`] operations.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    /// Set for bot and webhook accounts.
    pub bot: bool,
}

/// A chat message as seen by the gallery policy.
///
/// `member_roles` is empty for messages fetched from history, where Discord
/// does not attach member data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryMessage {
    pub id: String,
    pub channel_id: String,
    pub author: Author,
    pub member_roles: Vec<String>,
    pub attachment_count: usize,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A resolved channel reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: String,
    /// Whether the channel carries a message history (text, voice chat, threads).
    pub text_capable: bool,
}

impl ChannelRef {
    pub fn text(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text_capable: true,
        }
    }
}

/// A message this process posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: String,
    pub channel_id: String,
}

/// Reply payload addressed to an existing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    pub content: String,
    /// Only these users may be pinged by the reply.
    pub mention_users: Vec<String>,
    /// When false, a missing target message turns the reply into a plain send.
    pub fail_if_not_exists: bool,
}

/// Messaging operations the gallery core needs from the chat platform.
pub trait MessageSource: Send + Sync {
    /// Full history of a channel, oldest first.
    fn fetch_all_messages<'a>(&'a self, channel_id: &'a str)
    -> SourceFuture<'a, Vec<GalleryMessage>>;

    fn reply<'a>(
        &'a self,
        target: &'a GalleryMessage,
        reply: &'a OutgoingReply,
    ) -> SourceFuture<'a, SentMessage>;

    fn delete_message<'a>(&'a self, channel_id: &'a str, message_id: &'a str)
    -> SourceFuture<'a, ()>;

    /// `Ok(None)` when the channel does not exist or is not visible.
    fn resolve_channel<'a>(&'a self, channel_id: &'a str) -> SourceFuture<'a, Option<ChannelRef>>;
}
