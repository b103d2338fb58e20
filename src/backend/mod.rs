//! Backend Module
//!
//! The backing key-value store the cache layer sits on.
//!
//! ## Responsibilities
//! - Physical storage of opaque byte values under string keys
//! - Enforcing expiration (expired entries are never returned)
//! - Distinguishing "key not found" from real failures
//!
//! ## Implementations
//! - `MemoryBackend`: in-process map, also what the server hosts
//! - `RemoteBackend`: blocking TCP client for `atlascache-server`

mod memory;
mod remote;

pub use memory::MemoryBackend;
pub use remote::RemoteBackend;

use std::time::{Duration, SystemTime};

use crate::error::Result;

/// A key-value store with per-key expiration
///
/// "Not found" is reported through the `Ok` value (`None` / `false`);
/// `Err` is reserved for failures of the store itself.
pub trait Backend: Send + Sync {
    /// Get the live value for a key
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value, overwriting, expiring `ttl` from now
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Move a key's expiration to an absolute time
    ///
    /// Returns false if the key does not exist.
    fn expire_at(&self, key: &str, at: SystemTime) -> Result<bool>;

    /// Remove a key. Returns false if it did not exist.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Health check
    fn ping(&self) -> Result<()>;

    /// Physically drop expired entries, returning how many were removed
    ///
    /// Stores that expire entries on their own keep the default.
    fn purge_expired(&self) -> usize {
        0
    }
}
