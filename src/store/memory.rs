use super::{ConfigStore, StoreFuture, VersionedValue};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Process-local store used by tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    entries: Mutex<HashMap<String, VersionedValue>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<VersionedValue>> {
        Box::pin(async move { Ok(self.entries.lock().await.get(key).cloned()) })
    }

    fn upsert<'a>(&'a self, key: &'a str, value: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            let version = entries.get(key).map_or(1, |current| current.version + 1);
            entries.insert(
                key.to_string(),
                VersionedValue {
                    value: value.to_string(),
                    version,
                },
            );
            Ok(())
        })
    }

    fn compare_and_swap<'a>(
        &'a self,
        key: &'a str,
        expected_version: Option<i64>,
        value: &'a str,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            let current = entries.get(key).map(|entry| entry.version);
            if current != expected_version {
                return Ok(false);
            }
            entries.insert(
                key.to_string(),
                VersionedValue {
                    value: value.to_string(),
                    version: current.map_or(1, |v| v + 1),
                },
            );
            Ok(true)
        })
    }
}
