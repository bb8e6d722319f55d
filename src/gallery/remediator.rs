use super::message::{GalleryMessage, MessageSource, OutgoingReply, SentMessage};
use super::policy::Violation;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub fn warning_text(author_id: &str) -> String {
    format!("This is a gallery channel, <@{author_id}>, so only images may be sent here.")
}

/// Handle to the delayed deletion of a warning reply.
///
/// Dropping the handle leaves the deletion scheduled.
#[derive(Debug)]
pub struct WarningCleanup {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl WarningCleanup {
    /// Keep the warning; no-op once the deletion already ran.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until the scheduled deletion ran or was cancelled.
    pub async fn finished(self) {
        if let Err(e) = self.handle.await {
            tracing::debug!(error = %e, "warning cleanup task ended abnormally");
        }
    }
}

#[derive(Debug)]
pub struct Remediation {
    pub warning: SentMessage,
    /// False when deleting the offending message failed (usually already gone).
    pub original_deleted: bool,
    pub cleanup: WarningCleanup,
}

/// Warns the author, deletes the offending message, and schedules removal of
/// the warning.
///
/// Scheduled removals are tracked; callers about to stop the runtime must
/// [`Remediator::wait_for_cleanups`] first or the warnings stay behind.
pub struct Remediator {
    source: Arc<dyn MessageSource>,
    warning_delay: Duration,
    cleanups: TaskTracker,
}

impl Remediator {
    pub fn new(source: Arc<dyn MessageSource>, warning_delay: Duration) -> Self {
        Self {
            source,
            warning_delay,
            cleanups: TaskTracker::new(),
        }
    }

    /// Scheduled warning removals that have not run or been cancelled yet.
    pub fn pending_cleanups(&self) -> usize {
        self.cleanups.len()
    }

    /// Wait until every scheduled warning removal ran or was cancelled.
    pub async fn wait_for_cleanups(&self) {
        self.cleanups.close();
        self.cleanups.wait().await;
        self.cleanups.reopen();
    }

    pub fn warning_delay(&self) -> Duration {
        self.warning_delay
    }

    /// Only a failed warning reply is an error; deletion failures are
    /// reported through [`Remediation::original_deleted`].
    pub async fn remediate(
        &self,
        message: &GalleryMessage,
        violation: &Violation,
    ) -> anyhow::Result<Remediation> {
        let reply = OutgoingReply {
            content: warning_text(&violation.author_id),
            mention_users: vec![violation.author_id.clone()],
            fail_if_not_exists: false,
        };
        let warning = self.source.reply(message, &reply).await?;

        let original_deleted = match self
            .source
            .delete_message(&message.channel_id, &message.id)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    channel = %message.channel_id,
                    message = %message.id,
                    error = %e,
                    "could not delete gallery violation"
                );
                false
            }
        };

        let cleanup = self.schedule_warning_cleanup(warning.clone());

        tracing::info!(
            channel = %violation.channel_id,
            author = %violation.author_id,
            reason = %violation.reason,
            "remediated gallery violation"
        );

        Ok(Remediation {
            warning,
            original_deleted,
            cleanup,
        })
    }

    fn schedule_warning_cleanup(&self, warning: SentMessage) -> WarningCleanup {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let source = Arc::clone(&self.source);
        let delay = self.warning_delay;

        let handle = self.cleanups.spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {
                    tracing::debug!(message = %warning.id, "warning cleanup cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    if let Err(e) = source.delete_message(&warning.channel_id, &warning.id).await {
                        tracing::debug!(
                            channel = %warning.channel_id,
                            message = %warning.id,
                            error = %e,
                            "could not delete gallery warning"
                        );
                    }
                }
            }
        });

        WarningCleanup { token, handle }
    }
}
