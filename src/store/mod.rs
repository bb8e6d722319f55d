//! Key/value configuration store backing the gallery registry.
//!
//! Values are opaque strings. Every write bumps a per-key version so callers
//! can perform read-modify-write cycles with [`ConfigStore::compare_and_swap`]
//! instead of overwriting blindly.

pub mod memory;
pub mod sqlite;

use crate::error::StoreError;
use std::future::Future;
use std::pin::Pin;

pub use memory::InMemoryConfigStore;
pub use sqlite::SqliteConfigStore;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// A stored value together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: String,
    pub version: i64,
}

/// Async config persistence contract.
pub trait ConfigStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<VersionedValue>>;

    /// Unconditional write; creates the key when absent.
    fn upsert<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()>;

    /// Write `value` only if the key is still at `expected_version`
    /// (`None` meaning "key must not exist yet"). Returns whether the write
    /// was applied.
    fn compare_and_swap<'a>(
        &'a self,
        key: &'a str,
        expected_version: Option<i64>,
        value: &'a str,
    ) -> StoreFuture<'a, bool>;
}
