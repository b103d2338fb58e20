//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single non-blocking acceptor loop
//! - Fixed worker thread pool fed through a bounded channel
//! - Background sweeper purging expired entries
//! - Commands run directly against the hosted `Backend`

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::{execute, Connection};
