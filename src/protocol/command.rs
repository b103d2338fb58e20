//! Command definitions
//!
//! Represents commands from clients.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Set = 0x02,
    Delete = 0x03,
    Ping = 0x04,
    ExpireAt = 0x05,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Set a key-value pair expiring `ttl_ms` from now
    Set {
        key: Vec<u8>,
        value: Vec<u8>,
        ttl_ms: u64,
    },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Ping (health check)
    Ping,

    /// Set the absolute expiration of a key (unix millis)
    ExpireAt { key: Vec<u8>, at_ms: u64 },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
            Command::ExpireAt { .. } => CommandType::ExpireAt,
        }
    }
}

/// Unix milliseconds for a point in time, clamped to the epoch
pub fn to_unix_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
        .unwrap_or(0)
}

/// Point in time for unix milliseconds
pub fn from_unix_millis(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}
