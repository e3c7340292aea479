//! Opt-in thread-safe wrapper around [`LruCache`].
//!
//! One mutex guards the whole cache, so every operation is serialized.
//! Multi-step protocols (get, fill payload, changed) either hold the
//! guard from [`lock`](SharedLruCache::lock) across all steps or use
//! [`get_with`](SharedLruCache::get_with).

use parking_lot::{Mutex, MutexGuard};

use crate::cache::LruCache;
use crate::layout::SlotHandle;
use crate::stats::Stats;

pub struct SharedLruCache<T> {
    inner: Mutex<LruCache<T>>,
}

impl<T> SharedLruCache<T> {
    pub fn new(cache: LruCache<T>) -> Self {
        SharedLruCache {
            inner: Mutex::new(cache),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, LruCache<T>> {
        self.inner.lock()
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, LruCache<T>>> {
        self.inner.try_lock()
    }

    pub fn find(&self, key: u32) -> Option<SlotHandle> {
        self.inner.lock().find(key)
    }

    pub fn try_get(&self, key: u32) -> Option<SlotHandle> {
        self.inner.lock().try_get(key)
    }

    /// Take a reference on `key`. On a miss, `fill` populates the recycled
    /// slot's payload for `key` and the slot is committed before the lock
    /// is released, so other threads never see it pending.
    pub fn get_with<F>(&self, key: u32, fill: F) -> Option<SlotHandle>
    where
        F: FnOnce(&mut T),
    {
        let mut cache = self.inner.lock();
        let slot = cache.get(key)?;
        if cache.pending().is_some_and(|(pending, _)| pending == slot) {
            fill(cache.payload_mut(slot));
            cache.changed(slot);
        }
        Some(slot)
    }

    pub fn put(&self, slot: SlotHandle) -> u32 {
        self.inner.lock().put(slot)
    }

    pub fn stats(&self) -> Stats {
        self.inner.lock().stats()
    }

    pub fn into_inner(self) -> LruCache<T> {
        self.inner.into_inner()
    }
}
