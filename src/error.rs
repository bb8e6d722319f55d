use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `Gallerist`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; transport code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum GalleryError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Config store ────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Registry ────────────────────────────────────────────────────────
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    // ── Transport / Discord ─────────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Config store errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store: {0}")]
    Open(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Query(err.to_string())
    }
}

// ─── Registry errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Every compare-and-swap attempt lost to a concurrent writer.
    #[error("update of {key} lost to concurrent writers after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },

    /// Blank, padded, or containing the list delimiter; it would not survive
    /// being stored in the comma-separated list.
    #[error("invalid channel id {0:?}")]
    InvalidChannelId(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─── Transport errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("malformed discord payload: {0}")]
    Payload(String),

    #[error("channel {0} not found")]
    ChannelNotFound(String),
}

/// Convenience alias for results using [`GalleryError`].
pub type Result<T> = std::result::Result<T, GalleryError>;
