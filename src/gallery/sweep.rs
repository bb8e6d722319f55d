//! Retroactive enforcement over channel history.
//!
//! Channels and messages are processed one at a time. A channel whose history
//! cannot be fetched is recorded and skipped; a message that cannot be
//! remediated is recorded and skipped. Nothing is retried.

use super::enforcer::{GalleryEnforcer, MessageOutcome};
use super::message::MessageSource;
use super::policy::Compliance;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepItem {
    Remediated { message_id: String },
    Skipped { message_id: String, reason: Compliance },
    Error { message_id: String, cause: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Swept(Vec<SweepItem>),
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSweep {
    pub channel_id: String,
    pub outcome: ChannelOutcome,
}

impl ChannelSweep {
    pub fn remediated_count(&self) -> usize {
        self.items()
            .iter()
            .filter(|item| matches!(item, SweepItem::Remediated { .. }))
            .count()
    }

    pub fn items(&self) -> &[SweepItem] {
        match &self.outcome {
            ChannelOutcome::Swept(items) => items,
            ChannelOutcome::FetchFailed(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub channels: Vec<ChannelSweep>,
}

impl SweepReport {
    /// Messages whose warning was sent and whose original was deleted.
    pub fn remediated_count(&self) -> usize {
        self.channels.iter().map(ChannelSweep::remediated_count).sum()
    }

    pub fn error_count(&self) -> usize {
        self.channels
            .iter()
            .flat_map(ChannelSweep::items)
            .filter(|item| matches!(item, SweepItem::Error { .. }))
            .count()
    }

    pub fn failed_channels(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|sweep| matches!(sweep.outcome, ChannelOutcome::FetchFailed(_)))
            .map(|sweep| sweep.channel_id.as_str())
            .collect()
    }
}

pub struct Sweeper {
    enforcer: Arc<GalleryEnforcer>,
    source: Arc<dyn MessageSource>,
}

impl Sweeper {
    pub fn new(enforcer: Arc<GalleryEnforcer>, source: Arc<dyn MessageSource>) -> Self {
        Self { enforcer, source }
    }

    pub async fn sweep(&self, channel_ids: &[String]) -> SweepReport {
        let mut report = SweepReport::default();
        for channel_id in channel_ids {
            report.channels.push(self.sweep_channel(channel_id).await);
        }

        tracing::debug!(
            channels = report.channels.len(),
            remediated = report.remediated_count(),
            errors = report.error_count(),
            "sweep finished"
        );
        report
    }

    async fn sweep_channel(&self, channel_id: &str) -> ChannelSweep {
        let messages = match self.source.fetch_all_messages(channel_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(channel = %channel_id, error = %e, "skipping channel: history fetch failed");
                return ChannelSweep {
                    channel_id: channel_id.to_string(),
                    outcome: ChannelOutcome::FetchFailed(format!("{e:#}")),
                };
            }
        };

        // Enforce on this channel whether or not it is registered.
        let only_this = [channel_id.to_string()];
        let mut items = Vec::with_capacity(messages.len());

        for message in &messages {
            let item = match self
                .enforcer
                .handle_message(message, Some(only_this.as_slice()))
                .await
            {
                Ok(MessageOutcome::Compliant(reason)) => SweepItem::Skipped {
                    message_id: message.id.clone(),
                    reason,
                },
                Ok(MessageOutcome::Remediated(remediation)) if remediation.original_deleted => {
                    SweepItem::Remediated {
                        message_id: message.id.clone(),
                    }
                }
                Ok(MessageOutcome::Remediated(_)) => SweepItem::Error {
                    message_id: message.id.clone(),
                    cause: "warning sent but the message could not be deleted".into(),
                },
                Err(e) => {
                    tracing::debug!(channel = %channel_id, message = %message.id, error = %e, "sweep skipped message");
                    SweepItem::Error {
                        message_id: message.id.clone(),
                        cause: format!("{e:#}"),
                    }
                }
            };
            items.push(item);
        }

        ChannelSweep {
            channel_id: channel_id.to_string(),
            outcome: ChannelOutcome::Swept(items),
        }
    }
}
