//! Cache Module
//!
//! The capability set callers program against, with two implementations.
//!
//! ## Components
//! - `DirectStore`: reads and writes go straight to the backend
//! - `BufferedTransaction`: writes and deletes are held in a local overlay
//!   and replayed onto the parent by `end()`
//!
//! ## Overlay States (per identifier, per transaction)
//! ```text
//!   absent ──set──▶ Write(bytes) ──set/delete──▶ ...
//!     │
//!     └──delete──▶ Delete ──set/delete──▶ ...
//! ```
//! Once an identifier is in the overlay, every later `get` in the same
//! transaction is answered from the overlay.

mod direct;
mod transaction;

pub use direct::DirectStore;
pub use transaction::{BufferedTransaction, Pending};

use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Operations shared by the direct store and buffered transactions
///
/// Identifiers are bare: the store prefix is applied by `DirectStore`.
pub trait Cache {
    /// Scope produced by `begin`
    type Scope: Cache;

    /// Read and decode a value. `CacheError::Miss` when absent.
    fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T>;

    /// Encode and write a value
    fn set<T: Serialize + ?Sized>(&mut self, id: &str, value: &T) -> Result<()>;

    /// Write already-encoded bytes, never buffered
    fn set_raw(&mut self, id: &str, data: &[u8]) -> Result<()>;

    /// Remove a value. Removing a missing value succeeds.
    fn delete(&mut self, id: &str) -> Result<()>;

    /// Set the absolute expiration of a value. A missing value is not an error.
    fn expire(&mut self, id: &str, at: SystemTime) -> Result<()>;

    /// Open a buffered transaction whose touched keys live at least `max`
    fn begin(&self, max: Duration) -> Result<Self::Scope>;

    /// Close this scope, applying anything it buffered
    fn end(self) -> Result<()>
    where
        Self: Sized;
}
