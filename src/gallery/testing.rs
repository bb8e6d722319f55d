//! In-crate fakes for unit tests.

use super::message::{
    Author, ChannelRef, GalleryMessage, MessageSource, OutgoingReply, SentMessage, SourceFuture,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

pub(crate) fn text_message(id: &str, channel: &str, author: &str, content: &str) -> GalleryMessage {
    GalleryMessage {
        id: id.into(),
        channel_id: channel.into(),
        author: Author {
            id: author.into(),
            bot: false,
        },
        member_roles: vec![],
        attachment_count: 0,
        content: content.into(),
        timestamp: None,
    }
}

pub(crate) fn image_message(id: &str, channel: &str, author: &str) -> GalleryMessage {
    GalleryMessage {
        attachment_count: 1,
        ..text_message(id, channel, author, "")
    }
}

#[derive(Default)]
struct State {
    histories: HashMap<String, Vec<GalleryMessage>>,
    channels: HashMap<String, ChannelRef>,
    failing_fetches: HashSet<String>,
    failing_deletes: HashSet<String>,
    fail_replies: bool,
    replies: Vec<OutgoingReply>,
    deleted: Vec<(String, String)>,
    next_id: u64,
}

#[derive(Default)]
pub(crate) struct RecordingSource {
    state: Mutex<State>,
}

impl RecordingSource {
    pub(crate) async fn with_history(&self, channel: &str, messages: Vec<GalleryMessage>) {
        let mut state = self.state.lock().await;
        state.histories.insert(channel.into(), messages);
        state
            .channels
            .insert(channel.into(), ChannelRef::text(channel));
    }

    pub(crate) async fn with_channel(&self, channel: ChannelRef) {
        self.state
            .lock()
            .await
            .channels
            .insert(channel.id.clone(), channel);
    }

    pub(crate) async fn fail_fetch_of(&self, channel: &str) {
        self.state
            .lock()
            .await
            .failing_fetches
            .insert(channel.into());
    }

    pub(crate) async fn fail_delete_of(&self, message: &str) {
        self.state
            .lock()
            .await
            .failing_deletes
            .insert(message.into());
    }

    pub(crate) async fn fail_replies(&self) {
        self.state.lock().await.fail_replies = true;
    }

    pub(crate) async fn replies(&self) -> Vec<OutgoingReply> {
        self.state.lock().await.replies.clone()
    }

    pub(crate) async fn deleted(&self) -> Vec<(String, String)> {
        self.state.lock().await.deleted.clone()
    }
}

impl MessageSource for RecordingSource {
    fn fetch_all_messages<'a>(
        &'a self,
        channel_id: &'a str,
    ) -> SourceFuture<'a, Vec<GalleryMessage>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            if state.failing_fetches.contains(channel_id) {
                anyhow::bail!("fetch of {channel_id} refused");
            }
            Ok(state.histories.get(channel_id).cloned().unwrap_or_default())
        })
    }

    fn reply<'a>(
        &'a self,
        target: &'a GalleryMessage,
        reply: &'a OutgoingReply,
    ) -> SourceFuture<'a, SentMessage> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.fail_replies {
                anyhow::bail!("reply refused");
            }
            state.next_id += 1;
            state.replies.push(reply.clone());
            Ok(SentMessage {
                id: format!("warning-{}", state.next_id),
                channel_id: target.channel_id.clone(),
            })
        })
    }

    fn delete_message<'a>(
        &'a self,
        channel_id: &'a str,
        message_id: &'a str,
    ) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.failing_deletes.contains(message_id) {
                anyhow::bail!("unknown message {message_id}");
            }
            state.deleted.push((channel_id.into(), message_id.into()));
            Ok(())
        })
    }

    fn resolve_channel<'a>(&'a self, channel_id: &'a str) -> SourceFuture<'a, Option<ChannelRef>> {
        Box::pin(async move { Ok(self.state.lock().await.channels.get(channel_id).cloned()) })
    }
}
