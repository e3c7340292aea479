//! Fixed-capacity LRU slot cache.
//!
//! A bounded pool of slots, each labelled with an application `u32` key,
//! with hash lookup, reference counting, least-recently-used eviction and
//! a two-phase "get, then `changed`" protocol for repopulating a slot on
//! a miss. See [`LruCache`] for the protocol.
mod cache;
mod error;
mod hashtable;
mod layout;
mod ordering;
mod shared;
mod stats;

pub use cache::LruCache;
pub use error::{Error, Result};
pub use layout::{Slot, SlotHandle, FREE, MAX_CAPACITY};
pub use shared::SharedLruCache;
pub use stats::{Flags, Stats};
