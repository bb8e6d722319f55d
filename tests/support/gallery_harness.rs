#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Barrier, Mutex};

use gallerist::Config;
use gallerist::app::services::GalleryServices;
use gallerist::gallery::{
    Author, ChannelRef, GalleryMessage, MessageSource, OutgoingReply, SentMessage, SourceFuture,
};
use gallerist::store::{ConfigStore, InMemoryConfigStore, StoreFuture, VersionedValue};

pub fn message(id: &str, channel: &str, author: &str, content: &str) -> GalleryMessage {
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

pub fn image(id: &str, channel: &str, author: &str) -> GalleryMessage {
    GalleryMessage {
        attachment_count: 1,
        ..message(id, channel, author, "")
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.gallery.warning_delete_after_secs = 0;
    config
}

pub fn services(store: Arc<dyn ConfigStore>, source: Arc<ScriptedSource>) -> GalleryServices {
    GalleryServices::assemble(&test_config(), store, source)
}

#[derive(Default)]
struct ScriptState {
    histories: HashMap<String, Vec<GalleryMessage>>,
    channels: HashMap<String, ChannelRef>,
    failing_fetches: HashSet<String>,
    failing_deletes: HashSet<String>,
    replies: Vec<(String, OutgoingReply)>,
    deleted: Vec<String>,
    fetched: Vec<String>,
    sent: usize,
}

/// Message source with scripted histories that records every side effect.
#[derive(Default)]
pub struct ScriptedSource {
    state: Mutex<ScriptState>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn text_channel(&self, id: &str, history: Vec<GalleryMessage>) {
        let mut state = self.state.lock().await;
        state.histories.insert(id.into(), history);
        state.channels.insert(id.into(), ChannelRef::text(id));
    }

    pub async fn container_channel(&self, id: &str) {
        self.state.lock().await.channels.insert(
            id.into(),
            ChannelRef {
                id: id.into(),
                text_capable: false,
            },
        );
    }

    pub async fn fail_fetch(&self, channel: &str) {
        self.state
            .lock()
            .await
            .failing_fetches
            .insert(channel.into());
    }

    pub async fn fail_delete(&self, message: &str) {
        self.state
            .lock()
            .await
            .failing_deletes
            .insert(message.into());
    }

    /// `(target message id, reply)` in send order.
    pub async fn replies(&self) -> Vec<(String, OutgoingReply)> {
        self.state.lock().await.replies.clone()
    }

    pub async fn deleted(&self) -> Vec<String> {
        self.state.lock().await.deleted.clone()
    }

    /// For use outside a runtime.
    pub fn deleted_blocking(&self) -> Vec<String> {
        self.state.blocking_lock().deleted.clone()
    }

    pub async fn fetched(&self) -> Vec<String> {
        self.state.lock().await.fetched.clone()
    }
}

impl MessageSource for ScriptedSource {
    fn fetch_all_messages<'a>(
        &'a self,
        channel_id: &'a str,
    ) -> SourceFuture<'a, Vec<GalleryMessage>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.fetched.push(channel_id.into());
            if state.failing_fetches.contains(channel_id) {
                anyhow::bail!("Missing Access");
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
            state.sent += 1;
            state.replies.push((target.id.clone(), reply.clone()));
            Ok(SentMessage {
                id: format!("warning-{}", state.sent),
                channel_id: target.channel_id.clone(),
            })
        })
    }

    fn delete_message<'a>(
        &'a self,
        _channel_id: &'a str,
        message_id: &'a str,
    ) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.failing_deletes.contains(message_id) {
                anyhow::bail!("Unknown Message");
            }
            state.deleted.push(message_id.into());
            Ok(())
        })
    }

    fn resolve_channel<'a>(&'a self, channel_id: &'a str) -> SourceFuture<'a, Option<ChannelRef>> {
        Box::pin(async move { Ok(self.state.lock().await.channels.get(channel_id).cloned()) })
    }
}

/// Store that holds the first `parties` readers at a barrier after they have
/// read, so their read-modify-write cycles overlap.
pub struct InterleavingStore {
    inner: InMemoryConfigStore,
    barrier: Barrier,
    parties: usize,
    reads: AtomicUsize,
}

impl InterleavingStore {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: InMemoryConfigStore::new(),
            barrier: Barrier::new(parties),
            parties,
            reads: AtomicUsize::new(0),
        }
    }
}

impl ConfigStore for InterleavingStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<VersionedValue>> {
        Box::pin(async move {
            let value = self.inner.get(key).await?;
            if self.reads.fetch_add(1, Ordering::SeqCst) < self.parties {
                self.barrier.wait().await;
            }
            Ok(value)
        })
    }

    fn upsert<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
        self.inner.upsert(key, value)
    }

    fn compare_and_swap<'a>(
        &'a self,
        key: &'a str,
        expected_version: Option<i64>,
        value: &'a str,
    ) -> StoreFuture<'a, bool> {
        self.inner.compare_and_swap(key, expected_version, value)
    }
}
