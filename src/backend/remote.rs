//! Remote backend
//!
//! Blocking TCP client for `atlascache-server`.
//!
//! One connection is shared behind a mutex and opened on first use. If an
//! exchange fails the connection is dropped, so the next call reconnects.
//! The failed call itself is not retried.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use super::Backend;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::protocol::{read_response, to_unix_millis, write_command, Command, Response, Status};

#[derive(Debug)]
struct ClientConnection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

/// Backend that talks to a remote server over TCP
#[derive(Debug)]
pub struct RemoteBackend {
    addr: String,
    read_timeout_ms: u64,
    write_timeout_ms: u64,
    conn: Mutex<Option<ClientConnection>>,
}

impl RemoteBackend {
    /// Create a client for `config.server_addr` without connecting yet
    pub fn new(config: &Config) -> Self {
        Self {
            addr: config.server_addr.clone(),
            read_timeout_ms: config.read_timeout_ms,
            write_timeout_ms: config.write_timeout_ms,
            conn: Mutex::new(None),
        }
    }

    /// Create a client and verify the server answers
    pub fn connect(config: &Config) -> Result<Self> {
        let backend = Self::new(config);
        backend.ping()?;
        Ok(backend)
    }

    /// Server address this client talks to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn open(&self) -> Result<ClientConnection> {
        let stream = TcpStream::connect(&self.addr)
            .map_err(|e| CacheError::Network(format!("connect to {}: {}", self.addr, e)))?;

        stream.set_nodelay(true)?;
        if self.read_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(self.read_timeout_ms)))?;
        }
        if self.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(self.write_timeout_ms)))?;
        }

        tracing::debug!("Connected to {}", self.addr);

        Ok(ClientConnection {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one command and wait for its response
    fn request(&self, command: Command) -> Result<Response> {
        let mut guard = self.conn.lock();

        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(CacheError::Network("connection unavailable".to_string()));
        };

        tracing::trace!("Sending {:?} to {}", command.command_type(), self.addr);

        let exchanged = write_command(&mut conn.writer, &command)
            .and_then(|_| read_response(&mut conn.reader));

        match exchanged {
            Ok(response) if response.status == Status::Error => {
                Err(CacheError::Server(response.message()))
            }
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::warn!("Dropping connection to {}: {}", self.addr, e);
                *guard = None;
                Err(e)
            }
        }
    }

    fn unexpected(command: &str, response: &Response) -> CacheError {
        CacheError::Protocol(format!(
            "{}: unexpected response status {:?}",
            command, response.status
        ))
    }
}

impl Backend for RemoteBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self.request(Command::Get {
            key: key.as_bytes().to_vec(),
        })?;

        match response.status {
            Status::Ok => Ok(Some(response.payload.unwrap_or_default())),
            Status::NotFound => Ok(None),
            Status::Error => Err(Self::unexpected("GET", &response)),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let response = self.request(Command::Set {
            key: key.as_bytes().to_vec(),
            value: value.to_vec(),
            ttl_ms: ttl.as_millis().min(u64::MAX as u128) as u64,
        })?;

        match response.status {
            Status::Ok => Ok(()),
            _ => Err(Self::unexpected("SET", &response)),
        }
    }

    fn expire_at(&self, key: &str, at: SystemTime) -> Result<bool> {
        let response = self.request(Command::ExpireAt {
            key: key.as_bytes().to_vec(),
            at_ms: to_unix_millis(at),
        })?;

        match response.status {
            Status::Ok => Ok(true),
            Status::NotFound => Ok(false),
            Status::Error => Err(Self::unexpected("EXPIREAT", &response)),
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let response = self.request(Command::Delete {
            key: key.as_bytes().to_vec(),
        })?;

        match response.status {
            Status::Ok => Ok(true),
            Status::NotFound => Ok(false),
            Status::Error => Err(Self::unexpected("DEL", &response)),
        }
    }

    fn ping(&self) -> Result<()> {
        let response = self.request(Command::Ping)?;

        match (response.status, response.payload.as_deref()) {
            (Status::Ok, Some(b"PONG")) => Ok(()),
            _ => Err(Self::unexpected("PING", &response)),
        }
    }
}
