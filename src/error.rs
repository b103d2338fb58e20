//! Error types for AtlasCache
//!
//! Provides a unified error type for all cache and backend operations.

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for AtlasCache operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // Cache Errors
    // -------------------------------------------------------------------------
    /// Key absent, either in the backing store or deleted in a transaction
    #[error("Cache miss")]
    Miss,

    #[error("Nested transactions are not supported")]
    NestedTransaction,

    // -------------------------------------------------------------------------
    // Payload Errors
    // -------------------------------------------------------------------------
    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Backing Store Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Error message reported by the remote server
    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// True for `Miss`, whatever layer reported it
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss)
    }

    /// True for failures that originate in the backing store
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CacheError::Io(_)
                | CacheError::Network(_)
                | CacheError::Protocol(_)
                | CacheError::Server(_)
        )
    }
}
