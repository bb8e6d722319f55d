use super::message::GalleryMessage;
use super::policy::{Compliance, PolicyEvaluator, Verdict};
use super::registry::GalleryRegistry;
use super::remediator::{Remediation, Remediator};
use std::sync::Arc;

#[derive(Debug)]
pub enum MessageOutcome {
    Compliant(Compliance),
    Remediated(Remediation),
}

impl MessageOutcome {
    pub fn was_remediated(&self) -> bool {
        matches!(self, Self::Remediated(_))
    }
}

/// Applies the gallery policy to one message and remediates violations.
pub struct GalleryEnforcer {
    evaluator: PolicyEvaluator,
    remediator: Remediator,
    registry: Arc<GalleryRegistry>,
}

impl GalleryEnforcer {
    pub fn new(
        evaluator: PolicyEvaluator,
        remediator: Remediator,
        registry: Arc<GalleryRegistry>,
    ) -> Self {
        Self {
            evaluator,
            remediator,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<GalleryRegistry> {
        &self.registry
    }

    /// Wait for the scheduled removal of every warning posted so far.
    pub async fn wait_for_cleanups(&self) {
        self.remediator.wait_for_cleanups().await;
    }

    /// `galleries` overrides the persisted registry when given.
    pub async fn handle_message(
        &self,
        message: &GalleryMessage,
        galleries: Option<&[String]>,
    ) -> anyhow::Result<MessageOutcome> {
        if let Some(reason) = self.evaluator.pre_registry(message) {
            return Ok(MessageOutcome::Compliant(reason));
        }

        let verdict = match galleries {
            Some(list) => self.evaluator.evaluate(message, list),
            None => {
                let snapshot = self.registry.list().await?;
                self.evaluator.evaluate(message, &snapshot)
            }
        };

        match verdict {
            Verdict::Compliant(reason) => Ok(MessageOutcome::Compliant(reason)),
            Verdict::Violation(violation) => {
                let remediation = self.remediator.remediate(message, &violation).await?;
                Ok(MessageOutcome::Remediated(remediation))
            }
        }
    }
}
