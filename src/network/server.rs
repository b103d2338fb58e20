//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, SendTimeoutError};

use super::Connection;
use crate::backend::Backend;
use crate::config::Config;
use crate::error::{CacheError, Result};

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server exposing a backend over the wire protocol
pub struct Server {
    config: Config,
    backend: Arc<dyn Backend>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

/// Cloneable handle that stops a running server
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl Server {
    /// Bind the listen address from config
    ///
    /// Binding happens here so callers can learn the real port
    /// (e.g. when binding `127.0.0.1:0`) before `run` blocks.
    pub fn bind(config: Config, backend: Arc<dyn Backend>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            CacheError::Network(format!("bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            backend,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Start the server (blocking until shutdown)
    pub fn run(self) -> Result<()> {
        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            self.config.max_connections
        );

        let (tx, rx) = channel::bounded::<TcpStream>(self.config.max_connections);

        let mut workers = Vec::with_capacity(self.config.max_connections);
        for id in 0..self.config.max_connections {
            workers.push(self.spawn_worker(id, rx.clone())?);
        }
        drop(rx);

        let sweeper = self.spawn_sweeper()?;

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::trace!("Accepted connection from {}", addr);
                    // Accepted sockets may inherit non-blocking mode
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                    if !self.dispatch(&tx, stream) {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    // e.g. out of file descriptors
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down, waiting for workers");
        self.shutdown.store(true, Ordering::Relaxed);
        drop(tx);

        for worker in workers {
            let _ = worker.join();
        }
        let _ = sweeper.join();

        Ok(())
    }

    /// Hand a stream to the worker pool
    ///
    /// Waits while every worker is busy, but keeps watching the shutdown
    /// flag. Returns false when the acceptor should stop.
    fn dispatch(&self, tx: &channel::Sender<TcpStream>, mut stream: TcpStream) -> bool {
        loop {
            match tx.send_timeout(stream, ACCEPT_POLL_INTERVAL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(pending)) => {
                    if self.shutdown.load(Ordering::Relaxed) {
                        tracing::debug!("Dropping queued connection for shutdown");
                        return false;
                    }
                    stream = pending;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    tracing::error!("All connection workers have exited");
                    return false;
                }
            }
        }
    }

    fn spawn_worker(
        &self,
        id: usize,
        rx: channel::Receiver<TcpStream>,
    ) -> Result<JoinHandle<()>> {
        let backend = Arc::clone(&self.backend);
        let shutdown = Arc::clone(&self.shutdown);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let handle = thread::Builder::new()
            .name(format!("atlascache-worker-{}", id))
            .spawn(move || {
                for stream in rx.iter() {
                    let served = Connection::new(stream, Arc::clone(&backend), Arc::clone(&shutdown))
                        .and_then(|mut conn| {
                            conn.set_timeouts(read_ms, write_ms)?;
                            conn.handle()
                        });

                    if let Err(e) = served {
                        tracing::warn!("Connection ended with error: {}", e);
                    }
                }
            })?;

        Ok(handle)
    }

    /// Periodically drop expired entries until shutdown
    fn spawn_sweeper(&self) -> Result<JoinHandle<()>> {
        let backend = Arc::clone(&self.backend);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = Duration::from_millis(self.config.sweep_interval_ms.max(1));

        let handle = thread::Builder::new()
            .name("atlascache-sweeper".to_string())
            .spawn(move || {
                let mut elapsed = Duration::ZERO;
                while !shutdown.load(Ordering::Relaxed) {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    elapsed += ACCEPT_POLL_INTERVAL;
                    if elapsed >= interval {
                        elapsed = Duration::ZERO;
                        backend.purge_expired();
                    }
                }
            })?;

        Ok(handle)
    }
}
