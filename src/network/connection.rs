//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Read};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::Backend;
use crate::error::{CacheError, Result};
use crate::protocol::{from_unix_millis, read_command, write_response, Command, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Store the commands run against
    backend: Arc<dyn Backend>,

    /// Set when the server is stopping
    shutdown: Arc<AtomicBool>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        backend: Arc<dyn Backend>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            backend,
            shutdown,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    ///
    /// The read timeout doubles as the interval at which a connection checks
    /// for server shutdown, both while idle and while waiting inside a frame.
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses.
    /// Returns when the client disconnects, the server shuts down, or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            // Wait for the first byte of the next frame; timeouts here mean idle
            match self.reader.fill_buf() {
                Ok(buf) if buf.is_empty() => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Ok(_) => {}
                Err(ref e) if is_timeout(e) => {
                    if self.shutdown.load(Ordering::Relaxed) {
                        tracing::debug!("Closing idle client {} for shutdown", self.peer_addr);
                        return Ok(());
                    }
                    continue;
                }
                Err(ref e) if is_disconnect(e) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e.into());
                }
            }

            let read = read_command(&mut FrameReader {
                inner: &mut self.reader,
                shutdown: &self.shutdown,
            });

            let command = match read {
                Ok(cmd) => cmd,
                Err(CacheError::Io(ref e)) if is_disconnect(e) => {
                    tracing::debug!("Client {} disconnected mid-frame", self.peer_addr);
                    return Ok(());
                }
                // Only reachable once shutdown is set
                Err(CacheError::Io(ref e)) if is_timeout(e) => {
                    tracing::debug!("Dropping partial frame from {} for shutdown", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command.command_type());

            let response = execute(self.backend.as_ref(), command);

            if let Err(e) = self.send_response(response) {
                if let CacheError::Io(ref io_err) = e {
                    match io_err.kind() {
                        ErrorKind::ConnectionAborted
                        | ErrorKind::ConnectionReset
                        | ErrorKind::BrokenPipe => {
                            tracing::debug!(
                                "Client {} disconnected before response could be sent: {}",
                                self.peer_addr,
                                e
                            );
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Reader used once a frame has started
///
/// Read timeouts are retried instead of surfaced, so `read_exact` never
/// drops the part of a frame it already consumed. Gives up on shutdown.
struct FrameReader<'a, R> {
    inner: &'a mut R,
    shutdown: &'a AtomicBool,
}

impl<R: Read> Read for FrameReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Err(ref e) if is_timeout(e) && !self.shutdown.load(Ordering::Relaxed) => continue,
                other => return other,
            }
        }
    }
}

// Windows reports TimedOut instead of WouldBlock
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

/// Run one command against a backend and build its response
pub fn execute(backend: &dyn Backend, command: Command) -> Response {
    let result = match command {
        Command::Get { key } => key_str(&key).and_then(|key| backend.get(key)).map(|value| {
            match value {
                Some(value) => Response::ok(Some(value)),
                None => Response::not_found(),
            }
        }),
        Command::Set { key, value, ttl_ms } => key_str(&key)
            .and_then(|key| backend.set(key, &value, Duration::from_millis(ttl_ms)))
            .map(|_| Response::ok(None)),
        Command::Delete { key } => key_str(&key)
            .and_then(|key| backend.delete(key))
            .map(found_or_not),
        Command::ExpireAt { key, at_ms } => key_str(&key)
            .and_then(|key| backend.expire_at(key, from_unix_millis(at_ms)))
            .map(found_or_not),
        Command::Ping => backend.ping().map(|_| Response::ok(Some(b"PONG".to_vec()))),
    };

    result.unwrap_or_else(|e| Response::error(&e.to_string()))
}

fn found_or_not(existed: bool) -> Response {
    if existed {
        Response::ok(None)
    } else {
        Response::not_found()
    }
}

fn key_str(key: &[u8]) -> Result<&str> {
    std::str::from_utf8(key).map_err(|e| CacheError::Protocol(format!("key is not UTF-8: {}", e)))
}
