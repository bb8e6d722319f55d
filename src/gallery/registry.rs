use crate::error::{RegistryError, StoreError};
use crate::store::ConfigStore;
use std::sync::Arc;

/// Separator between channel ids in the stored value.
pub const CHANNEL_DELIMITER: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

pub fn parse_channel_list(raw: &str) -> Vec<String> {
    raw.split(CHANNEL_DELIMITER)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_channel_list(ids: &[String]) -> String {
    ids.join(&CHANNEL_DELIMITER.to_string())
}

fn validate_channel_id(channel_id: &str) -> Result<(), RegistryError> {
    if channel_id.is_empty()
        || channel_id.trim() != channel_id
        || channel_id.contains(CHANNEL_DELIMITER)
    {
        return Err(RegistryError::InvalidChannelId(channel_id.to_string()));
    }
    Ok(())
}

/// Durable set of gallery channel ids kept as one delimited value.
///
/// Mutations are optimistic: read the versioned value, compute the new list,
/// and write it back only if nobody else wrote in between. A lost race
/// re-reads and retries up to `max_attempts` times.
pub struct GalleryRegistry {
    store: Arc<dyn ConfigStore>,
    key: String,
    max_attempts: u32,
}

impl GalleryRegistry {
    pub fn new(store: Arc<dyn ConfigStore>, key: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            store,
            key: key.into(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .get(&self.key)
            .await?
            .map(|stored| parse_channel_list(&stored.value))
            .unwrap_or_default())
    }

    pub async fn contains(&self, channel_id: &str) -> Result<bool, StoreError> {
        Ok(self.list().await?.iter().any(|id| id == channel_id))
    }

    pub async fn add(&self, channel_id: &str) -> Result<AddOutcome, RegistryError> {
        validate_channel_id(channel_id)?;
        let written = self
            .update(|current| {
                if current.iter().any(|id| id == channel_id) {
                    return None;
                }
                let mut next = current.to_vec();
                next.push(channel_id.to_string());
                Some(next)
            })
            .await?;

        if written {
            tracing::info!(channel = %channel_id, "added a gallery channel");
            Ok(AddOutcome::Added)
        } else {
            Ok(AddOutcome::AlreadyPresent)
        }
    }

    pub async fn remove(&self, channel_id: &str) -> Result<RemoveOutcome, RegistryError> {
        let written = self
            .update(|current| {
                if !current.iter().any(|id| id == channel_id) {
                    return None;
                }
                Some(
                    current
                        .iter()
                        .filter(|id| *id != channel_id)
                        .cloned()
                        .collect(),
                )
            })
            .await?;

        if written {
            tracing::info!(channel = %channel_id, "removed a gallery channel");
            Ok(RemoveOutcome::Removed)
        } else {
            Ok(RemoveOutcome::NotPresent)
        }
    }

    /// Apply `mutate` atomically. `None` from the closure means "no change"
    /// and skips the write. Returns whether a write happened.
    async fn update<F>(&self, mutate: F) -> Result<bool, RegistryError>
    where
        F: Fn(&[String]) -> Option<Vec<String>>,
    {
        for attempt in 1..=self.max_attempts {
            let snapshot = self.store.get(&self.key).await?;
            let current = snapshot
                .as_ref()
                .map(|stored| parse_channel_list(&stored.value))
                .unwrap_or_default();

            let Some(next) = mutate(&current) else {
                return Ok(false);
            };

            let expected = snapshot.as_ref().map(|stored| stored.version);
            if self
                .store
                .compare_and_swap(&self.key, expected, &join_channel_list(&next))
                .await?
            {
                return Ok(true);
            }

            tracing::debug!(key = %self.key, attempt, "registry write lost a race; retrying");
        }

        Err(RegistryError::Conflict {
            key: self.key.clone(),
            attempts: self.max_attempts,
        })
    }
}
