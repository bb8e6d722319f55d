//! Gallery channel moderation: policy, remediation, registry, sweep and the
//! administrative command router.
//!
//! Nothing in this module talks to Discord directly. Platform access goes
//! through [`MessageSource`]; persistence goes through the registry's
//! [`ConfigStore`](crate::store::ConfigStore).

pub mod enforcer;
pub mod message;
pub mod policy;
pub mod registry;
pub mod remediator;
pub mod router;
pub mod sweep;

#[cfg(test)]
mod testing;

pub use enforcer::{GalleryEnforcer, MessageOutcome};
pub use message::{
    Author, ChannelRef, GalleryMessage, MessageSource, OutgoingReply, SentMessage, SourceFuture,
};
pub use policy::{
    ALLOWED_LINK_PREFIX, Compliance, ExemptionPolicy, PolicyEvaluator, Verdict, Violation,
    ViolationReason,
};
pub use registry::{AddOutcome, GalleryRegistry, RemoveOutcome};
pub use remediator::{Remediation, Remediator, WarningCleanup, warning_text};
pub use router::{
    CommandRouter, FAILURE_REPLY, GalleryCommand, GallerySubcommand, format_gallery_list,
};
pub use sweep::{ChannelOutcome, ChannelSweep, SweepItem, SweepReport, Sweeper};
