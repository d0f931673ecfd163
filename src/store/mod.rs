//! Store Module
//!
//! The shared key/value map and its advisory lock table.
//!
//! ## Responsibilities
//! - Hold every key/value pair for the life of the process
//! - Track which keys are locked, and in which mode
//! - Run every eligibility check together with the mutation it guards
//!
//! ## Concurrency
//! Values and locks live behind ONE `parking_lot::Mutex`. Each public
//! operation takes the mutex once, so "is this key locked?" and
//! "write this key" can never be separated by another client's request.
//! Nothing ever waits on an advisory lock: a locked key is skipped, not queued.

mod table;

pub use table::Store;

use std::fmt;
use std::str::FromStr;

use crate::error::KvError;

/// Advisory lock mode attached to a locked key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LockMode {
    #[default]
    Read,
    Write,
}

impl LockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Read => "read",
            LockMode::Write => "write",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockMode {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(LockMode::Read),
            "write" => Ok(LockMode::Write),
            other => Err(KvError::Decode(format!(
                "unknown lock mode '{}' (expected 'read' or 'write')",
                other
            ))),
        }
    }
}

/// Lock state of a single key
///
/// A key carries at most one mode at a time. Shared read locks from
/// several holders cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    LockedBy(LockMode),
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::LockedBy(_))
    }
}

/// What a `write` did with each key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Keys whose value was stored, in request order
    pub applied: Vec<String>,

    /// Keys left untouched because they were locked, in request order
    pub skipped: Vec<String>,
}

impl WriteOutcome {
    /// True when every requested key was applied
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
