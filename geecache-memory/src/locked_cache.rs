use parking_lot::Mutex;

use geecache_common::Value;

use crate::store::Store;

/// A mutex-guarded [`Store`] that materializes lazily on first `add`,
/// so a `Group` that is never written to never allocates its arena.
pub struct LockedCache {
    max_bytes: i64,
    inner: Mutex<Option<Store>>,
}

impl LockedCache {
    pub fn new(max_bytes: i64) -> Self {
        LockedCache {
            max_bytes,
            inner: Mutex::new(None),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut guard = self.inner.lock();
        guard.as_mut()?.get(key)
    }

    pub fn add(&self, key: &str, value: Value) {
        let mut guard = self.inner.lock();
        guard
            .get_or_insert_with(|| Store::new(self.max_bytes))
            .add(key, value);
    }
}
