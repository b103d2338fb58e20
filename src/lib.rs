//! # AtlasCache
//!
//! A caching layer over a remote key-value store with:
//! - A direct pass-through store with key prefixing and a default TTL
//! - Buffered transactions that hold writes locally until `end()`
//! - Deadline-bounded expiration for keys touched by a transaction
//! - A TCP server and client for the backing store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   BufferedTransaction                       │
//! │        (overlay: Write(bytes) | Delete, per identifier)     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ get miss-through, expire, end() replay
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      DirectStore                            │
//! │             (prefix + id, payload codec, TTL)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌──────────────┐         ┌───────────────┐      ┌──────────┐
//!   │ MemoryBackend│         │ RemoteBackend │─TCP─▶│  Server  │
//!   └──────────────┘         └───────────────┘      └──────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod backend;
pub mod cache;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CacheError, Result};
pub use config::Config;
pub use codec::{BincodeCodec, JsonCodec, PayloadCodec};
pub use backend::{Backend, MemoryBackend, RemoteBackend};
pub use cache::{BufferedTransaction, Cache, DirectStore, Pending};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
