//! Per-key async locks.
//!
//! One `tokio` mutex per key, created on demand and dropped again once no
//! task holds or waits for it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Registry of exclusive sections keyed by string.
#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    map: Arc<LockMap>,
}

/// Held while a key is locked. Releases on drop.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    map: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        self.map
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn guard(&self, key: &str, guard: OwnedMutexGuard<()>) -> KeyGuard {
        KeyGuard {
            key: key.to_string(),
            map: self.map.clone(),
            guard: Some(guard),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let slot = self.slot(key);
        let guard = slot.lock_owned().await;
        self.guard(key, guard)
    }

    /// Take `key` if nobody holds it.
    pub fn try_lock(&self, key: &str) -> Option<KeyGuard> {
        // A failed attempt leaves the entry to the current holder, whose guard removes it
        let guard = self.slot(key).try_lock_owned().ok()?;
        Some(self.guard(key, guard))
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.map
            .lock()
            .get(key)
            .is_some_and(|slot| slot.try_lock().is_err())
    }

    /// Number of keys with a live lock.
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn release_if_idle(map: &LockMap, key: &str) {
    let mut map = map.lock();
    // Only the map's own reference left: nobody holds or waits for the key
    if map.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
        map.remove(key);
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        release_if_idle(&self.map, &self.key);
    }
}
