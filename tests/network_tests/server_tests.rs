//! Server Tests
//!
//! End-to-end tests over real TCP connections:
//! - Basic command flow
//! - Lock release on disconnect
//! - Per-message error recovery
//! - Connection limit and graceful shutdown
//! - Many concurrent clients

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lockkv::network::{Client, Server, ShutdownHandle};
use lockkv::protocol::read_response;
use lockkv::{Config, LockMode, LockState, Result, Store};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    store: Arc<Store>,
    shutdown: ShutdownHandle,
    handle: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(Config::builder().listen_addr("127.0.0.1:0").build())
    }

    fn start_with(config: Config) -> Self {
        let store = Arc::new(Store::new());
        let server = Server::bind(config, Arc::clone(&store)).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run());

        Self {
            addr,
            store,
            shutdown,
            handle: Some(handle),
        }
    }

    fn client(&self) -> Client {
        Client::connect(self.addr).unwrap()
    }

    fn stop(&mut self) {
        self.shutdown.shutdown();
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Poll until `condition` holds; cleanup runs on the server's thread
fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached within 5s");
        thread::sleep(Duration::from_millis(5));
    }
}

// =============================================================================
// Command Flow Tests
// =============================================================================

#[test]
fn test_write_then_read_over_tcp() {
    let server = TestServer::start();
    let mut client = server.client();

    let response = client.write(&["a", "b"], &["1", "2"]).unwrap();
    assert!(response.success);

    let response = client.read(&["a", "b"]).unwrap();
    let values = response.values.unwrap();
    assert_eq!(values["a"], "1");
    assert_eq!(values["b"], "2");
}

#[test]
fn test_lock_hides_key_from_other_clients() {
    let server = TestServer::start();
    let mut owner = server.client();
    let mut other = server.client();

    owner.write(&["a"], &["1"]).unwrap();
    owner.lock(&["a"], LockMode::Write).unwrap();

    let response = other.read(&["a"]).unwrap();
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("No data found for provided keys"));

    let response = other.write_with(&["a"], &["2"], false, true).unwrap();
    assert!(response.success);
    assert_eq!(response.skipped, Some(vec!["a".to_string()]));
    assert_eq!(server.store.peek("a"), Some("1".to_string()));

    owner.unlock(&["a"]).unwrap();
    let response = other.read(&["a"]).unwrap();
    assert_eq!(response.values.unwrap()["a"], "1");
}

// =============================================================================
// Disconnect Cleanup Tests
// =============================================================================

#[test]
fn test_disconnect_releases_locks() {
    let server = TestServer::start();

    let mut first = server.client();
    first.write_with(&["a", "b"], &["1", "1"], true, false).unwrap();
    first.lock(&["c"], LockMode::Read).unwrap();
    assert_eq!(server.store.locked_count(), 3);

    first.close().unwrap();
    wait_until(|| server.store.locked_count() == 0);

    let mut second = server.client();
    let response = second.write_with(&["a", "b"], &["2", "2"], false, true).unwrap();
    assert_eq!(response.skipped, Some(Vec::new()));
    assert_eq!(server.store.peek("a"), Some("2".to_string()));
}

#[test]
fn test_dropped_client_releases_locks() {
    let server = TestServer::start();

    {
        let mut client = server.client();
        client.lock(&["x"], LockMode::Write).unwrap();
        assert!(server.store.lock_state("x").is_locked());
    }

    wait_until(|| server.store.lock_state("x") == LockState::Unlocked);
}

#[test]
fn test_idle_timeout_releases_locks() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .read_timeout_ms(100)
        .build();
    let server = TestServer::start_with(config);

    // The client stays connected but silent past the read timeout
    let mut client = server.client();
    client.lock(&["idle"], LockMode::Write).unwrap();
    assert!(server.store.lock_state("idle").is_locked());

    wait_until(|| server.store.locked_count() == 0);
    drop(client);
}

#[test]
fn test_oversized_frame_closes_connection_and_releases_locks() {
    let server = TestServer::start();

    let mut client = server.client();
    client.lock(&["held"], LockMode::Write).unwrap();
    assert!(server.store.lock_state("held").is_locked());

    // A raw header claiming a payload far over the limit
    let mut raw = TcpStream::connect(server.addr).unwrap();
    raw.write_all(&u32::MAX.to_be_bytes()).unwrap();
    let response = read_response(&mut raw).unwrap();
    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("Protocol error"));

    // Unrelated sessions are unaffected
    assert!(server.store.lock_state("held").is_locked());
    drop(client);
    wait_until(|| server.store.locked_count() == 0);
}

// =============================================================================
// Error Boundary Tests
// =============================================================================

#[test]
fn test_bad_messages_do_not_close_connection() {
    let server = TestServer::start();
    let mut client = server.client();

    let response = client.send_raw(b"definitely not json").unwrap();
    assert!(!response.success);

    let response = client
        .send_raw(br#"{"command":"write2","keys":["a"],"values":["1"]}"#)
        .unwrap();
    assert_eq!(response.error.as_deref(), Some("Unknown command: write2"));

    let response = client.write(&["a", "b"], &["1"]).unwrap();
    assert!(!response.success);

    let response = client.write(&["a"], &["1"]).unwrap();
    assert!(response.success);
    assert_eq!(server.store.peek("a"), Some("1".to_string()));
}

// =============================================================================
// Server Lifecycle Tests
// =============================================================================

#[test]
fn test_connection_limit_rejects_extra_clients() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_connections(1)
        .build();
    let server = TestServer::start_with(config);

    let mut first = server.client();
    assert!(first.write(&["a"], &["1"]).unwrap().success);

    let mut rejected = TcpStream::connect(server.addr).unwrap();
    let response = read_response(&mut rejected).unwrap();
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Server at connection limit"));

    // The admitted client is still served
    assert!(first.read(&["a"]).unwrap().success);
}

#[test]
fn test_shutdown_closes_connections_and_releases_locks() {
    let mut server = TestServer::start();

    let mut client = server.client();
    client.lock(&["a", "b"], LockMode::Write).unwrap();
    assert_eq!(server.store.locked_count(), 2);

    server.stop();

    assert_eq!(server.store.locked_count(), 0);
    assert!(client.read(&["a"]).is_err());
}

#[test]
fn test_bind_rejects_invalid_config() {
    let config = Config::builder().listen_addr("nowhere").build();
    assert!(Server::bind(config, Arc::new(Store::new())).is_err());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_many_concurrent_clients() {
    let server = TestServer::start();
    let clients = 333;
    let addr = server.addr;

    // Writers: one connection each, disconnecting right after
    crossbeam::scope(|s| {
        for i in 0..clients {
            s.spawn(move |_| {
                let mut client = Client::connect(addr).unwrap();
                let key = format!("key{}", i);
                let value = format!("value{}", i);
                let response = client.write_with(&[key.as_str()], &[value.as_str()], true, false).unwrap();
                assert!(response.success);
            });
        }
    })
    .unwrap();

    // Held locks go away with their writers
    wait_until(|| server.store.locked_count() == 0);

    // Readers and bad-command senders interleaved
    crossbeam::scope(|s| {
        for i in 0..clients {
            s.spawn(move |_| {
                let mut client = Client::connect(addr).unwrap();
                let key = format!("key{}", i);
                let response = client.read(&[key.as_str()]).unwrap();
                assert!(response.success);
                assert_eq!(response.values.unwrap()[&key], format!("value{}", i));
            });
            s.spawn(move |_| {
                let mut client = Client::connect(addr).unwrap();
                let response = client
                    .send_raw(br#"{"command":"write2","keys":["k"],"values":["v"]}"#)
                    .unwrap();
                assert!(!response.success);
            });
        }
    })
    .unwrap();

    assert_eq!(server.store.len(), clients);
}
