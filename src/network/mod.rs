//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop (non-blocking, polls a shutdown flag)
//! - One thread per connection, each owning its `Session`
//! - Messages routed through the dispatcher

mod server;
mod connection;
mod client;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
pub use client::Client;
