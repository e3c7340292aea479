//! Chained hash table mapping keys to slot indices.
//!
//! One bucket per slot; a key lands in bucket `key % buckets.len()`.
//! Chains are threaded through the `hash_prev`/`hash_next` fields of the
//! slot headers, so lookup walks the chain and compares keys directly.

use crate::layout::{Slot, SLOT_NONE};

#[inline]
pub fn ht_bucket(key: u32, nbuckets: usize) -> usize {
    (key as usize) % nbuckets
}

/// Look up a key, returning the slot index if a hashed slot carries it.
pub fn ht_lookup<T>(buckets: &[u32], slots: &[Slot<T>], key: u32) -> Option<u32> {
    let mut cursor = buckets[ht_bucket(key, buckets.len())];
    while cursor != SLOT_NONE {
        let h = &slots[cursor as usize].header;
        if h.key == key {
            return Some(cursor);
        }
        cursor = h.hash_next;
    }
    None
}

/// Link a slot into the chain for its current key, at the chain head.
///
/// The slot must not already be hashed.
pub fn ht_insert<T>(buckets: &mut [u32], slots: &mut [Slot<T>], index: u32) {
    let b = ht_bucket(slots[index as usize].header.key, buckets.len());
    let old_head = buckets[b];

    let h = &mut slots[index as usize].header;
    debug_assert!(!h.hashed, "slot {index} is already hashed");
    h.hashed = true;
    h.hash_prev = SLOT_NONE;
    h.hash_next = old_head;

    if old_head != SLOT_NONE {
        slots[old_head as usize].header.hash_prev = index;
    }
    buckets[b] = index;
}

/// Unlink a slot from its chain. No-op when the slot is not hashed.
///
/// Uses the slot's current key to find the bucket, so call this before
/// relabelling the slot.
pub fn ht_remove<T>(buckets: &mut [u32], slots: &mut [Slot<T>], index: u32) {
    let h = &slots[index as usize].header;
    if !h.hashed {
        return;
    }
    let (prev, next, key) = (h.hash_prev, h.hash_next, h.key);

    if prev != SLOT_NONE {
        slots[prev as usize].header.hash_next = next;
    } else {
        buckets[ht_bucket(key, buckets.len())] = next;
    }
    if next != SLOT_NONE {
        slots[next as usize].header.hash_prev = prev;
    }

    let h = &mut slots[index as usize].header;
    h.hashed = false;
    h.hash_prev = SLOT_NONE;
    h.hash_next = SLOT_NONE;
}

/// Empty every bucket. Slot-side links are reset by the caller.
pub fn ht_clear(buckets: &mut [u32]) {
    buckets.fill(SLOT_NONE);
}
