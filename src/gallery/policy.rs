//! Gallery policy evaluation.
//!
//! Pure decision logic: no I/O, no clock. Callers pass the gallery list they
//! want enforced, which is either the persisted registry snapshot or an ad hoc
//! override (the sweep uses `[channel]`).

use super::message::GalleryMessage;
use std::fmt;

/// The only link scheme accepted in place of an attachment.
pub const ALLOWED_LINK_PREFIX: &str = "https://";

/// Role or user id that is never moderated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExemptionPolicy {
    admin_id: Option<String>,
}

impl ExemptionPolicy {
    pub fn new(admin_id: Option<String>) -> Self {
        Self {
            admin_id: admin_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn admin_id(&self) -> Option<&str> {
        self.admin_id.as_deref()
    }

    /// True when the author id or one of the member roles is the admin id.
    pub fn is_exempt(&self, message: &GalleryMessage) -> bool {
        let Some(admin_id) = self.admin_id.as_deref() else {
            return false;
        };
        message.author.id == admin_id || message.member_roles.iter().any(|role| role == admin_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compliance {
    AutomatedSender,
    ExemptSender,
    NotGallery,
    ImageOrLink,
}

impl fmt::Display for Compliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::AutomatedSender => "sender is a bot",
            Self::ExemptSender => "sender is exempt",
            Self::NotGallery => "channel is not a gallery",
            Self::ImageOrLink => "message carries an attachment or link",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    NonImageContent,
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonImageContent => f.write_str("non-image content in gallery channel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub message_id: String,
    pub channel_id: String,
    pub author_id: String,
    pub reason: ViolationReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Compliant(Compliance),
    Violation(Violation),
}

impl Verdict {
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyEvaluator {
    exemption: ExemptionPolicy,
}

impl PolicyEvaluator {
    pub fn new(exemption: ExemptionPolicy) -> Self {
        Self { exemption }
    }

    /// Sender rules, decided before the registry is consulted.
    pub fn pre_registry(&self, message: &GalleryMessage) -> Option<Compliance> {
        if message.author.bot {
            Some(Compliance::AutomatedSender)
        } else if self.exemption.is_exempt(message) {
            Some(Compliance::ExemptSender)
        } else {
            None
        }
    }

    pub fn evaluate(&self, message: &GalleryMessage, galleries: &[String]) -> Verdict {
        if let Some(reason) = self.pre_registry(message) {
            return Verdict::Compliant(reason);
        }
        if !galleries.iter().any(|id| *id == message.channel_id) {
            return Verdict::Compliant(Compliance::NotGallery);
        }
        if message.attachment_count == 0 && !message.content.starts_with(ALLOWED_LINK_PREFIX) {
            return Verdict::Violation(Violation {
                message_id: message.id.clone(),
                channel_id: message.channel_id.clone(),
                author_id: message.author.id.clone(),
                reason: ViolationReason::NonImageContent,
            });
        }
        Verdict::Compliant(Compliance::ImageOrLink)
    }
}
