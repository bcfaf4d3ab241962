//! Repository Contract
//!
//! Operations the command façade and the cleanup job depend on.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Lookup failures reported by a repository
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("value for key {0:?} was not found")]
    NotFound(String),

    #[error("key {0:?} has expired")]
    Expired(String),
}

/// Key-value repository with per-key expiration
///
/// All operations are safe to call from many threads at once.
pub trait CommandRepository: Send + Sync {
    /// Canonical text of the live value stored under `key`
    fn get(&self, key: &str) -> Result<String, RepositoryError>;

    /// Store `value` under `key`, replacing any previous entry
    ///
    /// `expires_at` of `None` means the entry never expires.
    fn set(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;

    /// Remove `key`, returning 1 if it was present and 0 otherwise
    fn delete(&self, key: &str) -> u64;

    /// Remove each key in order, returning the number actually removed
    fn batch_delete(&self, keys: &[String]) -> u64 {
        keys.iter().map(|key| self.delete(key)).sum()
    }

    /// Keys whose expiration is set and already in the past
    fn get_expired_keys(&self) -> Result<Vec<String>, RepositoryError>;

    /// Remove every currently expired key
    ///
    /// Scan and delete take the lock separately, so a key refreshed in
    /// between can still be removed.
    fn cleanup(&self) -> Result<u64, RepositoryError> {
        let keys = self.get_expired_keys()?;
        Ok(self.batch_delete(&keys))
    }
}
