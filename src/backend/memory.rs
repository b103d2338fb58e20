//! In-memory backend
//!
//! HashMap-based store with RwLock for concurrency. Every entry carries an
//! absolute deadline; an entry past its deadline is treated as absent by
//! every operation and physically removed by `purge_expired`.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

use super::Backend;
use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
struct StoredValue {
    value: Vec<u8>,
    expires_at: SystemTime,
}

impl StoredValue {
    fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at > now
    }
}

/// In-process key-value store with expiration
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryBackend {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current deadline of a live key
    pub fn expires_at(&self, key: &str) -> Option<SystemTime> {
        let now = SystemTime::now();
        self.data
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at)
    }

    /// Whether a live entry exists for the key
    pub fn contains(&self, key: &str) -> bool {
        self.expires_at(key).is_some()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = SystemTime::now();
        self.data.read().values().filter(|entry| entry.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = SystemTime::now();
        let data = self.data.read();
        Ok(data
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Config(format!("ttl {:?} out of range", ttl)))?;
        self.data.write().insert(
            key.to_string(),
            StoredValue {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    fn expire_at(&self, key: &str, at: SystemTime) -> Result<bool> {
        let now = SystemTime::now();
        let mut data = self.data.write();

        match data.get(key).map(|entry| entry.is_live(now)) {
            Some(true) => {
                if let Some(entry) = data.get_mut(key) {
                    entry.expires_at = at;
                }
                Ok(true)
            }
            Some(false) => {
                // Already expired, just not swept yet
                data.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let now = SystemTime::now();
        Ok(self
            .data
            .write()
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, entry| entry.is_live(now));
        let removed = before - data.len();

        if removed > 0 {
            tracing::debug!("Purged {} expired entries", removed);
        }
        removed
    }
}
