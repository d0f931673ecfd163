//! # LockKV
//!
//! An in-memory key-value store shared by many concurrent clients, with:
//! - Advisory per-key locks (`read` / `write` mode)
//! - Lock ownership tied to the client's connection lifetime
//! - Automatic lock release when a connection ends, however it ends
//! - A JSON-over-TCP client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one thread per connection)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ frames
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Dispatcher                                 │
//! │          (decode → execute → encode, per message)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                ┌──────▼──────┐
//!                │   Session   │  tracked keys, released on close
//!                └──────┬──────┘
//!                       │
//!          ┌────────────▼────────────┐
//!          │          Store          │
//!          │  values + lock table    │
//!          │   (one shared Mutex)    │
//!          └─────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod session;
pub mod protocol;
pub mod dispatcher;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use store::{LockMode, LockState, Store, WriteOutcome};
pub use session::Session;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LockKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
