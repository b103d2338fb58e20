//! Tests for RemoteBackend against a live Server
//!
//! These tests verify:
//! - Every backend operation over the wire
//! - Not-found signalling for get, delete and expire
//! - Server-side expiration and sweeping
//! - Idle connections staying usable across server read timeouts
//! - Frames split across a server read timeout
//! - Graceful server shutdown, even with every worker busy

use std::io::Write;
use std::net::TcpStream;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use atlascache::network::{Server, ShutdownHandle};
use atlascache::protocol::{encode_command, read_response, Command, Status};
use atlascache::{Backend, CacheError, Config, MemoryBackend, RemoteBackend};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    store: Arc<MemoryBackend>,
    addr: String,
    shutdown: ShutdownHandle,
    thread: JoinHandle<()>,
}

impl TestServer {
    fn start() -> Self {
        Self::with_workers(4)
    }

    fn with_workers(max_connections: usize) -> Self {
        let store = Arc::new(MemoryBackend::new());
        let config = Config::builder()
            .listen_addr("127.0.0.1:0")
            .max_connections(max_connections)
            .sweep_interval_ms(20)
            .read_timeout_ms(50)
            .build();

        let server = Server::bind(config, store.clone()).unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let shutdown = server.shutdown_handle();
        let thread = thread::spawn(move || server.run().unwrap());

        Self {
            store,
            addr,
            shutdown,
            thread,
        }
    }

    fn client(&self) -> RemoteBackend {
        let config = Config::builder().server_addr(&self.addr).build();
        RemoteBackend::connect(&config).unwrap()
    }

    fn raw_client(&self) -> TcpStream {
        let stream = TcpStream::connect(&self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        stream
    }

    fn stop(self) {
        self.shutdown.shutdown();
        self.thread.join().unwrap();
    }
}

// =============================================================================
// Operation Tests
// =============================================================================

#[test]
fn test_ping() {
    let server = TestServer::start();
    server.client().ping().unwrap();
    server.stop();
}

#[test]
fn test_set_get_delete() {
    let server = TestServer::start();
    let client = server.client();

    client.set("k", b"value", Duration::from_secs(60)).unwrap();
    assert_eq!(client.get("k").unwrap(), Some(b"value".to_vec()));
    assert!(server.store.contains("k"));

    assert!(client.delete("k").unwrap());
    assert!(!client.delete("k").unwrap());
    assert_eq!(client.get("k").unwrap(), None);

    server.stop();
}

#[test]
fn test_empty_value_round_trips_as_present() {
    let server = TestServer::start();
    let client = server.client();

    client.set("empty", b"", Duration::from_secs(60)).unwrap();
    assert_eq!(client.get("empty").unwrap(), Some(Vec::new()));

    server.stop();
}

#[test]
fn test_expire_at_over_the_wire() {
    let server = TestServer::start();
    let client = server.client();

    client.set("k", b"v", Duration::from_secs(60)).unwrap();

    let at = SystemTime::now() + Duration::from_secs(600);
    assert!(client.expire_at("k", at).unwrap());
    assert!(!client.expire_at("missing", at).unwrap());

    // Wire carries millisecond precision
    let stored = server.store.expires_at("k").unwrap();
    let diff = match stored.duration_since(at) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    assert!(diff < Duration::from_millis(2));

    server.stop();
}

#[test]
fn test_server_expires_entries() {
    let server = TestServer::start();
    let client = server.client();

    client.set("short", b"v", Duration::from_millis(30)).unwrap();
    thread::sleep(Duration::from_millis(150));

    assert_eq!(client.get("short").unwrap(), None);
    assert!(server.store.is_empty());

    server.stop();
}

// =============================================================================
// Connection Handling Tests
// =============================================================================

#[test]
fn test_connect_to_closed_port_fails() {
    let config = Config::builder().server_addr("127.0.0.1:1").build();
    let err = RemoteBackend::connect(&config).unwrap_err();
    assert!(matches!(err, CacheError::Network(_)));
}

#[test]
fn test_client_survives_idle_timeouts() {
    let server = TestServer::start();
    let client = server.client();

    // Several server read timeouts pass while the client is idle
    thread::sleep(Duration::from_millis(200));

    client.set("k", b"v", Duration::from_secs(60)).unwrap();
    assert_eq!(client.get("k").unwrap(), Some(b"v".to_vec()));

    server.stop();
}

#[test]
fn test_frame_split_across_read_timeout() {
    let server = TestServer::start();
    let mut stream = server.raw_client();
    let frame = encode_command(&Command::Ping);

    // Stall mid-header for several server read timeouts
    stream.write_all(&frame[..2]).unwrap();
    thread::sleep(Duration::from_millis(200));
    stream.write_all(&frame[2..]).unwrap();

    let response = read_response(&mut stream).unwrap();
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.payload, Some(b"PONG".to_vec()));

    // The stream is still aligned on frame boundaries
    stream.write_all(&frame).unwrap();
    assert_eq!(read_response(&mut stream).unwrap().status, Status::Ok);

    server.stop();
}

#[test]
fn test_client_errors_after_server_stops() {
    let first = TestServer::start();
    let addr = first.addr.clone();
    let config = Config::builder().server_addr(&addr).build();
    let client = RemoteBackend::connect(&config).unwrap();
    first.stop();

    // The old connection is closed; the reconnect attempt has no listener
    assert!(client.ping().is_err());
    let err = client.get("k").unwrap_err();
    assert!(err.is_backend());
}

#[test]
fn test_many_clients() {
    let server = TestServer::start();

    let handles: Vec<_> = (0..3)
        .map(|t| {
            let client = server.client();
            thread::spawn(move || {
                for i in 0..20 {
                    let key = format!("c{}-{}", t, i);
                    client.set(&key, key.as_bytes(), Duration::from_secs(60)).unwrap();
                    assert_eq!(client.get(&key).unwrap(), Some(key.into_bytes()));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(server.store.len(), 60);
    server.stop();
}

#[test]
fn test_shutdown_with_all_workers_busy() {
    let server = TestServer::with_workers(1);

    // One connection holds the only worker, one fills the queue,
    // and the last leaves the acceptor waiting to hand it off
    let held = server.raw_client();
    thread::sleep(Duration::from_millis(50));
    let queued = server.raw_client();
    let waiting = server.raw_client();
    thread::sleep(Duration::from_millis(100));

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        server.stop();
        let _ = done_tx.send(());
    });

    assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    drop((held, queued, waiting));
}
