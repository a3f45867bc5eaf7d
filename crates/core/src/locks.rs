//! Per-key async locks used to serialize mutations on a single bed or
//! equipment item.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// A set of named async mutexes, created on first use and dropped again once
/// nobody holds or waits for them.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Arc<LockMap>,
}

/// Held while a key is locked; releases on drop.
pub struct KeyedGuard {
    key: String,
    locks: Arc<LockMap>,
    _guard: OwnedMutexGuard<()>,
}

impl KeyedGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one in our guard. Anyone else waiting
        // cloned theirs under this same map lock.
        let idle = locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2);
        if idle {
            locks.remove(&self.key);
        }
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> KeyedGuard {
        let lock = self.lock_for(key);
        KeyedGuard {
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
            _guard: lock.lock_owned().await,
        }
    }

    /// Lock `key` only if it is free right now.
    pub fn try_acquire(&self, key: &str) -> Option<KeyedGuard> {
        let lock = self.lock_for(key);
        let guard = lock.try_lock_owned().ok()?;
        Some(KeyedGuard {
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
            _guard: guard,
        })
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
