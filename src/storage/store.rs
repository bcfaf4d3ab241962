//! In-Memory Repository
//!
//! Thread-safe hashmap of typed values with expiration metadata.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use super::repository::{CommandRepository, RepositoryError};
use crate::types::{detect_type, Value};

/// Entry in the store with value and expiration
#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// Read-path check: an entry is unusable from its expiration instant on
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| now >= t).unwrap_or(false)
    }

    /// Sweep-path check: only entries strictly past their expiration
    fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t < now).unwrap_or(false)
    }
}

/// Thread-safe in-memory repository
///
/// Writes take the exclusive lock, reads share it. Reads never remove
/// expired entries; that is left to [`CommandRepository::cleanup`].
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the number of keys (including expired)
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if repository is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CommandRepository for InMemoryRepository {
    fn get(&self, key: &str) -> Result<String, RepositoryError> {
        let map = self.inner.read();
        let entry = map
            .get(key)
            .ok_or_else(|| RepositoryError::NotFound(key.to_string()))?;

        if entry.is_expired_at(Utc::now()) {
            return Err(RepositoryError::Expired(key.to_string()));
        }

        Ok(entry.value.as_text().into_owned())
    }

    fn set(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let entry = Entry {
            value: detect_type(value),
            expires_at,
        };
        let mut map = self.inner.write();
        map.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> u64 {
        let mut map = self.inner.write();
        if map.remove(key).is_some() {
            1
        } else {
            0
        }
    }

    fn get_expired_keys(&self) -> Result<Vec<String>, RepositoryError> {
        let map = self.inner.read();
        let now = Utc::now();
        Ok(map
            .iter()
            .filter(|(_, entry)| entry.is_past(now))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
