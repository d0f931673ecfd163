//! Session Module
//!
//! Binds one client connection to the keys it asked to lock.
//!
//! ## Lifecycle
//! - Created when a connection is accepted (id = peer address)
//! - Every `write` and `lock` adds its keys to the tracked set
//! - An explicit `unlock` drops those keys from the tracked set
//! - `close` (or `Drop`) unlocks every tracked key, exactly once
//!
//! The tracked set accumulates across commands. A connection that locks
//! `a`, then writes `b`, still releases `a` when it goes away.
//!
//! Locks are advisory: nothing stops two sessions from both tracking the
//! same key, and whichever disconnects first releases it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::Result;
use crate::store::{LockMode, Store, WriteOutcome};

/// Connection-derived session identifier
pub type SessionId = String;

/// Per-connection state
pub struct Session {
    /// Identifier used in logs (usually the peer address)
    id: SessionId,

    /// Shared store
    store: Arc<Store>,

    /// Keys this session may still be holding locked
    tracked: BTreeSet<String>,

    /// Set once cleanup has run
    closed: bool,
}

impl Session {
    /// Open a session against a shared store
    pub fn new(id: impl Into<SessionId>, store: Arc<Store>) -> Self {
        let id = id.into();
        tracing::debug!("Session {} opened", id);

        Self {
            id,
            store,
            tracked: BTreeSet::new(),
            closed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Keys currently tracked for release on disconnect, sorted
    pub fn tracked_keys(&self) -> Vec<&str> {
        self.tracked.iter().map(String::as_str).collect()
    }

    /// Write through to the store and track the requested keys
    ///
    /// Nothing is tracked when the arity check fails.
    pub fn write(&mut self, keys: &[String], values: &[String], hold_lock: bool) -> Result<WriteOutcome> {
        let outcome = self.store.write(keys, values, hold_lock)?;
        self.track(keys);

        tracing::trace!(
            "Session {} wrote {} keys ({} skipped)",
            self.id,
            outcome.applied.len(),
            outcome.skipped.len()
        );

        Ok(outcome)
    }

    /// Read unlocked, present keys
    pub fn read(&self, keys: &[String]) -> BTreeMap<String, String> {
        self.store.read(keys)
    }

    /// Lock keys and track them
    pub fn lock(&mut self, keys: &[String], mode: LockMode) -> usize {
        let acquired = self.store.lock(keys, mode);
        self.track(keys);

        tracing::trace!("Session {} locked {}/{} keys ({})", self.id, acquired, keys.len(), mode);
        acquired
    }

    /// Unlock keys and stop tracking them
    pub fn unlock(&mut self, keys: &[String]) -> usize {
        let released = self.store.unlock(keys);
        for key in keys {
            self.tracked.remove(key);
        }

        tracing::trace!("Session {} unlocked {}/{} keys", self.id, released, keys.len());
        released
    }

    /// End the session, releasing every tracked key
    ///
    /// Returns how many locks were actually removed. Keys another session
    /// (or this one) already unlocked are skipped by the store.
    pub fn close(mut self) -> usize {
        self.release()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn track(&mut self, keys: &[String]) {
        self.tracked.extend(keys.iter().cloned());
    }

    fn release(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        self.closed = true;

        let keys: Vec<String> = std::mem::take(&mut self.tracked).into_iter().collect();
        let released = self.store.unlock(&keys);

        tracing::debug!(
            "Session {} closed: released {} of {} tracked keys",
            self.id,
            released,
            keys.len()
        );
        released
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}
