//! Intrusive doubly-linked lists for slot membership.
//!
//! Uses prev/next indices stored in each slot header. Three lists
//! (`free`, `lru`, `in_use`) partition the pool; the header's `list` tag
//! records which one a slot is on so it can be unlinked in O(1).
//!
//! The head of each list is the most recently inserted end. The LRU
//! eviction candidate is therefore the tail of `lru`.

use crate::layout::{ListId, Slot, SLOT_NONE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListHead {
    pub head: u32,
    pub tail: u32,
    pub len: u32,
}

impl ListHead {
    pub const EMPTY: ListHead = ListHead {
        head: SLOT_NONE,
        tail: SLOT_NONE,
        len: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.head == SLOT_NONE
    }
}

#[derive(Clone, Debug)]
pub struct Lists {
    pub free: ListHead,
    pub lru: ListHead,
    pub in_use: ListHead,
}

impl Lists {
    pub fn new() -> Self {
        Lists {
            free: ListHead::EMPTY,
            lru: ListHead::EMPTY,
            in_use: ListHead::EMPTY,
        }
    }

    pub fn get(&self, id: ListId) -> &ListHead {
        match id {
            ListId::Free => &self.free,
            ListId::Lru => &self.lru,
            ListId::InUse => &self.in_use,
        }
    }

    fn get_mut(&mut self, id: ListId) -> &mut ListHead {
        match id {
            ListId::Free => &mut self.free,
            ListId::Lru => &mut self.lru,
            ListId::InUse => &mut self.in_use,
        }
    }
}

/// Remove a slot from whichever list it is on.
pub fn list_remove<T>(lists: &mut Lists, slots: &mut [Slot<T>], index: u32) {
    let h = &slots[index as usize].header;
    let (prev, next, id) = (h.prev, h.next, h.list);
    let list = lists.get_mut(id);

    if prev != SLOT_NONE {
        slots[prev as usize].header.next = next;
    } else {
        list.head = next;
    }

    if next != SLOT_NONE {
        slots[next as usize].header.prev = prev;
    } else {
        list.tail = prev;
    }
    list.len -= 1;

    let h = &mut slots[index as usize].header;
    h.prev = SLOT_NONE;
    h.next = SLOT_NONE;
}

/// Push an unlinked slot onto the head of `id`.
pub fn list_push_head<T>(lists: &mut Lists, slots: &mut [Slot<T>], index: u32, id: ListId) {
    let list = lists.get_mut(id);
    let old_head = list.head;

    let h = &mut slots[index as usize].header;
    h.list = id;
    h.prev = SLOT_NONE;
    h.next = old_head;

    if old_head != SLOT_NONE {
        slots[old_head as usize].header.prev = index;
    } else {
        list.tail = index;
    }
    list.head = index;
    list.len += 1;
}

/// Push an unlinked slot onto the tail of `id`.
pub fn list_push_tail<T>(lists: &mut Lists, slots: &mut [Slot<T>], index: u32, id: ListId) {
    let list = lists.get_mut(id);
    let old_tail = list.tail;

    let h = &mut slots[index as usize].header;
    h.list = id;
    h.prev = old_tail;
    h.next = SLOT_NONE;

    if old_tail != SLOT_NONE {
        slots[old_tail as usize].header.next = index;
    } else {
        list.head = index;
    }
    list.tail = index;
    list.len += 1;
}

/// Move a slot from its current list to the head of `id`.
pub fn list_move_to_head<T>(lists: &mut Lists, slots: &mut [Slot<T>], index: u32, id: ListId) {
    list_remove(lists, slots, index);
    list_push_head(lists, slots, index, id);
}

/// Pick the slot a miss should recycle: the head of `free`, else the
/// tail of `lru` (least recently released). Does not unlink it.
pub fn unused_candidate(lists: &Lists) -> Option<u32> {
    if !lists.free.is_empty() {
        Some(lists.free.head)
    } else if !lists.lru.is_empty() {
        Some(lists.lru.tail)
    } else {
        None
    }
}

/// Collect the indices on `id`, head to tail.
pub fn list_indices<T>(lists: &Lists, slots: &[Slot<T>], id: ListId) -> Vec<u32> {
    let list = lists.get(id);
    let mut out = Vec::with_capacity(list.len as usize);
    let mut cursor = list.head;
    while cursor != SLOT_NONE {
        out.push(cursor);
        cursor = slots[cursor as usize].header.next;
    }
    out
}
