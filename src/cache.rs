//! Fixed-capacity LRU slot cache.
//!
//! A pool of `capacity` slots, each able to represent one `u32` key.
//! Slots are found by key through a chained hash table and partitioned
//! into three lists: `free` (never used or deleted), `lru` (resident,
//! refcount 0, evictable) and `in_use` (refcount > 0, pinned).
//!
//! A miss does not relabel a slot immediately. `get` hands out a recycled
//! slot still unhashed, the caller fills its payload for the new key, and
//! `changed` commits the new key. Only one such miss may be pending at a
//! time; further misses are refused until the commit.
//!
//! All mutators take `&mut self`, so callers sharing a cache must hold
//! their own lock around each call (or use [`SharedLruCache`](crate::SharedLruCache)).

use std::fmt;

use hashbrown::HashSet;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::hashtable::{ht_clear, ht_insert, ht_lookup, ht_remove};
use crate::layout::{ListId, Slot, SlotHandle, SlotHeader, FREE, MAX_CAPACITY, SLOT_NONE};
use crate::ordering::{list_indices, list_move_to_head, list_push_tail, unused_candidate, Lists};
use crate::stats::{Counters, Flags, Stats};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Pending {
    index: u32,
    key: u32,
}

#[derive(Debug)]
pub struct LruCache<T> {
    name: String,
    slots: Vec<Slot<T>>,
    buckets: Vec<u32>,
    lists: Lists,
    used: u32,
    pending: Option<Pending>,
    flags: Flags,
    counters: Counters,
}

impl<T: Default> LruCache<T> {
    /// Build a cache of `capacity` slots with default payloads.
    pub fn create(name: &str, capacity: u32) -> Result<Self> {
        Self::create_with(name, capacity, |_| T::default())
    }

    /// Return every slot to the free list and zero all counters and flags,
    /// without reallocating. Payloads are reset to their default.
    pub fn reset(&mut self) {
        self.reset_with(|_| T::default());
    }
}

impl<T> LruCache<T> {
    /// Build a cache of `capacity` slots, initialising each payload from
    /// its slot index.
    pub fn create_with<F>(name: &str, capacity: u32, mut init: F) -> Result<Self>
    where
        F: FnMut(u32) -> T,
    {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { name: name.into() });
        }
        let oom = || Error::InsufficientMemory {
            name: name.into(),
            capacity,
        };
        if capacity > MAX_CAPACITY {
            return Err(oom());
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity as usize).map_err(|_| oom())?;
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(capacity as usize).map_err(|_| oom())?;

        for i in 0..capacity {
            slots.push(Slot::new(i, init(i)));
        }
        buckets.resize(capacity as usize, SLOT_NONE);

        let mut cache = LruCache {
            name: name.into(),
            slots,
            buckets,
            lists: Lists::new(),
            used: 0,
            pending: None,
            flags: Flags::empty(),
            counters: Counters::default(),
        };
        cache.reset_bookkeeping();
        debug!(cache = %cache.name, capacity, "created lru cache");
        Ok(cache)
    }

    /// Release the cache and all slot storage.
    pub fn destroy(self) {
        debug!(cache = %self.name, "destroyed lru cache");
    }

    /// Like [`reset`](Self::reset), rebuilding each payload from its slot
    /// index with `init`.
    pub fn reset_with<F>(&mut self, mut init: F)
    where
        F: FnMut(u32) -> T,
    {
        for slot in &mut self.slots {
            slot.payload = init(slot.header.index);
        }
        self.reset_bookkeeping();
        debug!(cache = %self.name, capacity = self.capacity(), "reset lru cache");
    }

    fn reset_bookkeeping(&mut self) {
        ht_clear(&mut self.buckets);
        self.lists = Lists::new();
        for i in 0..self.capacity() {
            self.slots[i as usize].header = SlotHeader::new(i);
            list_push_tail(&mut self.lists, &mut self.slots, i, ListId::Free);
        }
        self.used = 0;
        self.pending = None;
        self.flags = Flags::empty();
        self.counters = Counters::default();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of slots with a refcount above zero.
    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The slot granted by the last miss and the key it will take on
    /// `changed`, if a commit is outstanding.
    pub fn pending(&self) -> Option<(SlotHandle, u32)> {
        self.pending.map(|p| (SlotHandle(p.index), p.key))
    }

    /// Look up the slot currently carrying `key`. Touches nothing.
    pub fn find(&self, key: u32) -> Option<SlotHandle> {
        ht_lookup(&self.buckets, &self.slots, key).map(SlotHandle)
    }

    /// True if `key` is resident and referenced.
    pub fn is_used(&self, key: u32) -> bool {
        self.find(key)
            .is_some_and(|h| self.slots[h.0 as usize].header.refcount > 0)
    }

    /// Take a reference on `key` if it is resident. Never recycles a slot.
    pub fn try_get(&mut self, key: u32) -> Option<SlotHandle> {
        self.get_inner(key, false)
    }

    /// Take a reference on `key`, recycling a free or evictable slot on a miss.
    ///
    /// On a miss the returned slot is pending: its key is still the old
    /// one and it is not findable. Fill its payload, then call
    /// [`changed`](Self::changed). Returns `None` when the cache is
    /// starving or another miss is still pending.
    pub fn get(&mut self, key: u32) -> Option<SlotHandle> {
        self.get_inner(key, true)
    }

    fn get_inner(&mut self, key: u32, may_change: bool) -> Option<SlotHandle> {
        assert!(key != FREE, "cache {}: FREE is not a valid key", self.name);

        if self.flags.contains(Flags::STARVING) {
            self.counters.starving += 1;
            return None;
        }

        if let Some(index) = ht_lookup(&self.buckets, &self.slots, key) {
            self.counters.hits += 1;
            let h = &mut self.slots[index as usize].header;
            if h.refcount == 0 {
                self.used += 1;
            }
            h.refcount += 1;
            list_move_to_head(&mut self.lists, &mut self.slots, index, ListId::InUse);
            trace!(cache = %self.name, key, index, "hit");
            return Some(SlotHandle(index));
        }

        if !may_change {
            return None;
        }
        self.counters.misses += 1;

        let Some(index) = unused_candidate(&self.lists) else {
            self.flags.insert(Flags::STARVING);
            self.counters.starving += 1;
            debug!(cache = %self.name, key, used = self.used, "starving");
            return None;
        };

        if self.flags.contains(Flags::DIRTY) {
            self.counters.dirty += 1;
            debug!(cache = %self.name, key, "miss refused, commit pending");
            return None;
        }

        let h = &self.slots[index as usize].header;
        assert_eq!(
            h.refcount, 0,
            "cache {}: recycling referenced slot {index}",
            self.name
        );
        if h.list == ListId::Lru {
            trace!(cache = %self.name, evicted = h.key, index, "evict");
        }

        ht_remove(&mut self.buckets, &mut self.slots, index);
        list_move_to_head(&mut self.lists, &mut self.slots, index, ListId::InUse);
        self.slots[index as usize].header.refcount = 1;
        self.used += 1;
        self.flags.insert(Flags::DIRTY);
        self.pending = Some(Pending { index, key });
        Some(SlotHandle(index))
    }

    /// Commit the pending slot under the key requested by the miss.
    ///
    /// # Panics
    /// If nothing is pending or `slot` is not the pending slot.
    pub fn changed(&mut self, slot: SlotHandle) {
        let Some(pending) = self.pending else {
            panic!("cache {}: changed({}) with nothing pending", self.name, slot.0);
        };
        assert_eq!(
            slot.0, pending.index,
            "cache {}: changed() on slot {} but slot {} is pending",
            self.name, slot.0, pending.index
        );

        let index = pending.index;
        self.counters.changed += 1;
        self.slots[index as usize].header.key = pending.key;
        ht_insert(&mut self.buckets, &mut self.slots, index);
        list_move_to_head(&mut self.lists, &mut self.slots, index, ListId::InUse);
        self.pending = None;
        self.flags.remove(Flags::DIRTY);
        trace!(cache = %self.name, key = pending.key, index, "committed");
    }

    /// Drop one reference. At zero the slot becomes the most recently used
    /// entry of `lru` and the starving flag clears. Returns the new refcount.
    ///
    /// # Panics
    /// If the refcount is already zero or the slot is pending commit.
    pub fn put(&mut self, slot: SlotHandle) -> u32 {
        let index = self.check_index(slot.0);
        assert!(
            self.pending.map(|p| p.index) != Some(index),
            "cache {}: put() on pending slot {index}, call changed() first",
            self.name
        );
        let h = &mut self.slots[index as usize].header;
        assert!(
            h.refcount > 0,
            "cache {}: put() on unreferenced slot {index}",
            self.name
        );

        h.refcount -= 1;
        let refcount = h.refcount;
        if refcount == 0 {
            list_move_to_head(&mut self.lists, &mut self.slots, index, ListId::Lru);
            self.used -= 1;
            self.flags.remove(Flags::STARVING);
        }
        refcount
    }

    /// Relabel the slot at `index` to `key`, bypassing the get/changed
    /// protocol. Used to load a cache from externally persisted state.
    ///
    /// The slot lands on `in_use` or `lru` according to its refcount.
    /// Setting [`FREE`] returns an unreferenced slot to the free list.
    pub fn set(&mut self, key: u32, index: u32) {
        let index = self.check_index(index);
        assert!(
            self.pending.map(|p| p.index) != Some(index),
            "cache {}: set() on pending slot {index}",
            self.name
        );
        if let Some(p) = self.pending {
            assert!(
                p.key != key,
                "cache {}: set() to key {key} which is pending commit",
                self.name
            );
        }

        let refcount = self.slots[index as usize].header.refcount;
        if key == FREE {
            assert_eq!(
                refcount, 0,
                "cache {}: set(FREE) on referenced slot {index}",
                self.name
            );
        } else if let Some(other) = self.find(key).filter(|h| h.0 != index) {
            panic!(
                "cache {}: set({key}, {index}) but slot {} already holds it",
                self.name, other.0
            );
        }

        ht_remove(&mut self.buckets, &mut self.slots, index);
        self.slots[index as usize].header.key = key;
        let list = if key == FREE {
            ListId::Free
        } else {
            ht_insert(&mut self.buckets, &mut self.slots, index);
            if refcount > 0 {
                ListId::InUse
            } else {
                ListId::Lru
            }
        };
        list_move_to_head(&mut self.lists, &mut self.slots, index, list);
        debug!(cache = %self.name, key, index, "set");
    }

    /// Forget the key held by an unreferenced slot and return it to the
    /// free list, where it is the next slot handed out.
    pub fn del(&mut self, slot: SlotHandle) {
        let index = self.check_index(slot.0);
        assert!(
            self.pending.map(|p| p.index) != Some(index),
            "cache {}: del() on pending slot {index}",
            self.name
        );
        let h = &self.slots[index as usize].header;
        assert_eq!(
            h.refcount, 0,
            "cache {}: del() on referenced slot {index}",
            self.name
        );
        let old_key = h.key;

        ht_remove(&mut self.buckets, &mut self.slots, index);
        self.slots[index as usize].header.key = FREE;
        list_move_to_head(&mut self.lists, &mut self.slots, index, ListId::Free);
        debug!(cache = %self.name, key = old_key, index, "deleted");
    }

    pub fn index_of(&self, slot: SlotHandle) -> u32 {
        slot.0
    }

    pub fn element_by_index(&self, index: u32) -> SlotHandle {
        SlotHandle(self.check_index(index))
    }

    pub fn slot(&self, slot: SlotHandle) -> &Slot<T> {
        &self.slots[self.check_index(slot.0) as usize]
    }

    pub fn payload(&self, slot: SlotHandle) -> &T {
        &self.slot(slot).payload
    }

    pub fn payload_mut(&mut self, slot: SlotHandle) -> &mut T {
        let index = self.check_index(slot.0);
        &mut self.slots[index as usize].payload
    }

    pub fn stats(&self) -> Stats {
        Stats {
            name: self.name.clone(),
            capacity: self.capacity(),
            used: self.used,
            hits: self.counters.hits,
            misses: self.counters.misses,
            starving: self.counters.starving,
            dirty: self.counters.dirty,
            changed: self.counters.changed,
        }
    }

    /// Call `f` for every slot holding a key, in index order.
    pub fn dump_details<F>(&self, mut f: F)
    where
        F: FnMut(&Slot<T>),
    {
        for slot in self.slots.iter().filter(|s| !s.is_free()) {
            f(slot);
        }
    }

    /// Write a per-slot table: index, key and refcount, followed by
    /// whatever `detail` writes for occupied slots.
    pub fn write_details<W, F>(&self, out: &mut W, label: &str, mut detail: F) -> fmt::Result
    where
        W: fmt::Write,
        F: FnMut(&mut W, &Slot<T>) -> fmt::Result,
    {
        writeln!(out, "\tnn: lc_number refcnt {label}")?;
        for slot in &self.slots {
            if slot.is_free() {
                writeln!(out, "\t{:2}: FREE", slot.index())?;
            } else {
                write!(
                    out,
                    "\t{:2}: {:4} {:4}    ",
                    slot.index(),
                    slot.key(),
                    slot.refcount()
                )?;
                detail(out, slot)?;
            }
        }
        Ok(())
    }

    /// Walk every list and hash chain and panic on any broken invariant.
    pub fn check_invariants(&self) {
        let name = &self.name;
        let pending = self.pending.map(|p| p.index);
        let mut seen = vec![false; self.slots.len()];
        let mut total = 0u32;

        for id in [ListId::Free, ListId::Lru, ListId::InUse] {
            let indices = list_indices(&self.lists, &self.slots, id);
            assert_eq!(
                indices.len() as u32,
                self.lists.get(id).len,
                "cache {name}: {id:?} length mismatch"
            );
            for index in indices {
                assert!(
                    !seen[index as usize],
                    "cache {name}: slot {index} listed twice"
                );
                seen[index as usize] = true;
                total += 1;

                let h = &self.slots[index as usize].header;
                assert_eq!(
                    h.list, id,
                    "cache {name}: slot {index} has a stale list tag"
                );
                match id {
                    ListId::Free | ListId::Lru => assert_eq!(
                        h.refcount, 0,
                        "cache {name}: slot {index} on {id:?} is referenced"
                    ),
                    ListId::InUse => assert!(
                        h.refcount > 0,
                        "cache {name}: slot {index} on InUse is unreferenced"
                    ),
                }
                if id == ListId::Free {
                    assert_eq!(h.key, FREE, "cache {name}: free slot {index} carries a key");
                }
            }
        }
        assert_eq!(total, self.capacity(), "cache {name}: slots missing from lists");
        assert_eq!(self.used, self.lists.in_use.len, "cache {name}: used count drifted");
        assert_eq!(
            self.flags.contains(Flags::DIRTY),
            self.pending.is_some(),
            "cache {name}: DIRTY does not match pending state"
        );

        let mut keys = HashSet::new();
        for slot in &self.slots {
            let h = &slot.header;
            if Some(h.index) == pending {
                assert!(!h.hashed, "cache {name}: pending slot {} is findable", h.index);
                continue;
            }
            assert_eq!(
                h.hashed,
                h.key != FREE,
                "cache {name}: slot {} hash membership does not match its key",
                h.index
            );
            if h.key != FREE {
                assert!(keys.insert(h.key), "cache {name}: key {} held twice", h.key);
                assert_eq!(
                    ht_lookup(&self.buckets, &self.slots, h.key),
                    Some(h.index),
                    "cache {name}: key {} not reachable by hash",
                    h.key
                );
            }
        }
    }

    #[track_caller]
    fn check_index(&self, index: u32) -> u32 {
        assert!(
            index < self.capacity(),
            "cache {}: slot index {index} out of range (capacity {})",
            self.name,
            self.capacity()
        );
        index
    }
}
