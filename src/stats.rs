use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Sticky state bits of a cache.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// A miss has been granted a slot that is not yet committed.
        const DIRTY = 1 << 0;
        /// The last miss found no free or evictable slot. Cleared only
        /// when a `put` drops some slot's refcount to zero.
        const STARVING = 1 << 1;
    }
}

/// Event counters, reset by [`LruCache::reset`](crate::LruCache::reset).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub starving: u64,
    pub dirty: u64,
    pub changed: u64,
}

/// Point-in-time snapshot of a cache's occupancy and counters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stats {
    pub name: String,
    pub capacity: u32,
    pub used: u32,
    pub hits: u64,
    pub misses: u64,
    /// Gets refused because the cache was starving.
    pub starving: u64,
    /// Misses refused because another miss was still pending commit.
    pub dirty: u64,
    /// Completed commits.
    pub changed: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "\t{}: used:{}/{} hits:{} misses:{} starving:{} dirty:{} changed:{}",
            self.name,
            self.used,
            self.capacity,
            self.hits,
            self.misses,
            self.starving,
            self.dirty,
            self.changed
        )
    }
}
