//! Store implementation
//!
//! HashMap-based values and lock table sharing one Mutex.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use crate::error::{KvError, Result};
use super::{LockMode, LockState, WriteOutcome};

/// Everything the exclusion domain protects
#[derive(Default)]
struct Inner {
    /// Key -> value
    data: HashMap<String, String>,

    /// Key -> mode of its single active lock (absent = unlocked)
    locks: HashMap<String, LockMode>,
}

/// Shared in-memory key/value store with advisory per-key locks
///
/// All methods take `&self`; share it across connections with `Arc<Store>`.
#[derive(Default)]
pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    /// Create a new empty Store
    pub fn new() -> Self {
        Self::default()
    }

    /// Write key/value pairs, skipping keys that are currently locked
    ///
    /// Fails with `ArityMismatch` (and changes nothing) when `keys` and
    /// `values` differ in length. Otherwise each pair is checked and applied
    /// inside one critical section. With `hold_lock`, every applied key is
    /// then locked in `write` mode before the critical section ends.
    pub fn write(&self, keys: &[String], values: &[String], hold_lock: bool) -> Result<WriteOutcome> {
        if keys.len() != values.len() {
            return Err(KvError::ArityMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }

        let mut outcome = WriteOutcome::default();
        let mut inner = self.inner.lock();

        for (key, value) in keys.iter().zip(values) {
            if inner.locks.contains_key(key) {
                outcome.skipped.push(key.clone());
                continue;
            }
            inner.data.insert(key.clone(), value.clone());
            outcome.applied.push(key.clone());
        }

        // Lock after the loop so a key repeated in one batch is not skipped
        // by its own earlier occurrence.
        if hold_lock {
            for key in &outcome.applied {
                inner.locks.entry(key.clone()).or_insert(LockMode::Write);
            }
        }

        Ok(outcome)
    }

    /// Read the values of every requested key that is unlocked and present
    ///
    /// Locked and missing keys are both simply absent from the result.
    pub fn read(&self, keys: &[String]) -> BTreeMap<String, String> {
        let inner = self.inner.lock();

        keys.iter()
            .filter(|key| !inner.locks.contains_key(*key))
            .filter_map(|key| inner.data.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }

    /// Lock each key that is not locked yet
    ///
    /// Already-locked keys keep their original mode. Returns how many keys
    /// were newly locked.
    pub fn lock(&self, keys: &[String], mode: LockMode) -> usize {
        let mut inner = self.inner.lock();
        let mut acquired = 0;

        for key in keys {
            if !inner.locks.contains_key(key) {
                inner.locks.insert(key.clone(), mode);
                acquired += 1;
            }
        }

        acquired
    }

    /// Remove any lock on each key, whatever its mode
    ///
    /// Returns how many locks were actually removed.
    pub fn unlock(&self, keys: &[String]) -> usize {
        let mut inner = self.inner.lock();
        let mut released = 0;

        for key in keys {
            if inner.locks.remove(key).is_some() {
                released += 1;
            }
        }

        released
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Current lock state of a key
    pub fn lock_state(&self, key: &str) -> LockState {
        match self.inner.lock().locks.get(key) {
            Some(mode) => LockState::LockedBy(*mode),
            None => LockState::Unlocked,
        }
    }

    /// Stored value of a key, ignoring locks
    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.lock().data.get(key).cloned()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.inner.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of currently locked keys
    pub fn locked_count(&self) -> usize {
        self.inner.lock().locks.len()
    }
}
