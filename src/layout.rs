//! Slot header and the sentinels shared by the list and hash-chain code.
//!
//! Every slot lives in one contiguous `Vec<Slot<T>>` for the lifetime of
//! the cache. Links between slots are plain `u32` indices into that vector.

/// Key value meaning "this slot represents nothing".
pub const FREE: u32 = u32::MAX;

/// Hard upper bound on the number of slots in one cache.
pub const MAX_CAPACITY: u32 = 1 << 24;

/// Sentinel value meaning "no slot" in prev/next links.
pub const SLOT_NONE: u32 = u32::MAX;

/// The membership list a slot currently sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListId {
    Free,
    Lru,
    InUse,
}

/// Bookkeeping fields embedded in every slot.
#[derive(Debug)]
pub struct SlotHeader {
    pub index: u32,
    pub key: u32,
    pub refcount: u32,

    // membership list
    pub list: ListId,
    pub prev: u32,
    pub next: u32,

    // hash chain, both SLOT_NONE and `hashed == false` when unlinked
    pub hashed: bool,
    pub hash_prev: u32,
    pub hash_next: u32,
}

impl SlotHeader {
    pub fn new(index: u32) -> Self {
        SlotHeader {
            index,
            key: FREE,
            refcount: 0,
            list: ListId::Free,
            prev: SLOT_NONE,
            next: SLOT_NONE,
            hashed: false,
            hash_prev: SLOT_NONE,
            hash_next: SLOT_NONE,
        }
    }
}

/// One unit of cache capacity: the header plus the caller's payload.
#[derive(Debug)]
pub struct Slot<T> {
    pub(crate) header: SlotHeader,
    pub(crate) payload: T,
}

impl<T> Slot<T> {
    pub(crate) fn new(index: u32, payload: T) -> Self {
        Slot {
            header: SlotHeader::new(index),
            payload,
        }
    }

    /// Fixed position of this slot in the pool.
    pub fn index(&self) -> u32 {
        self.header.index
    }

    /// Key this slot currently represents, or [`FREE`].
    pub fn key(&self) -> u32 {
        self.header.key
    }

    pub fn refcount(&self) -> u32 {
        self.header.refcount
    }

    pub fn is_free(&self) -> bool {
        self.header.key == FREE
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }
}

/// Non-owning reference to a slot, valid until the next mutating call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotHandle(pub(crate) u32);

impl SlotHandle {
    pub fn index(self) -> u32 {
        self.0
    }
}
