//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{write_response, Response};
use crate::store::Store;
use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Sockets of live connections, keyed by connection id
type LiveConnections = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// Cloneable handle that stops a running server
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting and close all connections
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server for LockKV
///
/// ## Threading:
/// - The calling thread runs a non-blocking accept loop
/// - Every connection gets a dedicated thread owning its `Session`
/// - All connections share one `Arc<Store>`
pub struct Server {
    config: Config,
    store: Arc<Store>,
    listener: TcpListener,
    shutdown: ShutdownHandle,

    /// Connections currently being served
    active: Arc<AtomicUsize>,

    /// Socket clones used to unblock connection threads on shutdown
    live: LiveConnections,

    next_conn_id: AtomicU64,
}

impl Server {
    /// Bind the listener described by `config`
    pub fn bind(config: Config, store: Arc<Store>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            store,
            listener,
            shutdown: ShutdownHandle::default(),
            active: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(Mutex::new(HashMap::new())),
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Start the server (blocking)
    ///
    /// Returns after shutdown once every connection thread has released
    /// its session.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        let wait_group = WaitGroup::new();

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.accept_connection(stream, peer, &wait_group),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Usually fd exhaustion; back off instead of dying
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down, closing {} connections", self.active_connections());

        for stream in self.live.lock().values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        wait_group.wait();

        tracing::info!("All connections closed");
        Ok(())
    }

    /// Set up one accepted stream and spawn its thread
    fn accept_connection(&self, stream: TcpStream, peer: SocketAddr, wait_group: &WaitGroup) {
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Failed to configure stream from {}: {}", peer, e);
            return;
        }

        if self.active_connections() >= self.config.max_connections {
            tracing::warn!(
                "Rejecting {}: connection limit {} reached",
                peer,
                self.config.max_connections
            );
            let mut writer = &stream;
            let _ = write_response(&mut writer, &Response::error("Server at connection limit"));
            return;
        }

        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let tracker = match stream.try_clone() {
            Ok(tracker) => tracker,
            Err(e) => {
                tracing::warn!("Failed to clone stream from {}: {}", peer, e);
                return;
            }
        };

        self.live.lock().insert(conn_id, tracker);
        self.active.fetch_add(1, Ordering::SeqCst);

        // From here on the guard undoes the bookkeeping, whatever happens
        let guard = ConnectionGuard {
            conn_id,
            active: Arc::clone(&self.active),
            live: Arc::clone(&self.live),
            _wait: wait_group.clone(),
        };

        let mut connection = match Connection::new(stream, Arc::clone(&self.store)) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!("Failed to set up connection from {}: {}", peer, e);
                return;
            }
        };

        if let Err(e) =
            connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)
        {
            tracing::warn!("Failed to set timeouts for {}: {}", peer, e);
            return;
        }

        let spawned = thread::Builder::new()
            .name(format!("lockkv-conn-{}", conn_id))
            .spawn(move || {
                let _guard = guard;
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} ended with error: {}", peer, e);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn thread for {}: {}", peer, e);
        }
    }
}

/// Releases a connection's server-side bookkeeping when its thread ends
struct ConnectionGuard {
    conn_id: u64,
    active: Arc<AtomicUsize>,
    live: LiveConnections,
    _wait: WaitGroup,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.live.lock().remove(&self.conn_id);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
