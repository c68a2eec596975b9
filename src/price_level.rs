//! Price level - the FIFO queue of orders resting at a single price.
//!
//! A doubly-linked list threaded through arena indices: O(1) append,
//! O(1) pop from the head, and O(1) unlink from any position, which is
//! what makes cancellation constant-time.

use crate::arena::{Arena, ArenaIndex, NULL_INDEX};

/// Orders resting at one price, in strict time priority.
///
/// The oldest order sits at the head and is always matched first.
#[derive(Clone, Copy, Debug, Default)]
pub struct PriceLevel {
    /// Oldest order (first to match)
    pub head: ArenaIndex,
    /// Newest order (last to match)
    pub tail: ArenaIndex,
    /// Total resting quantity at this price
    pub total_qty: u64,
    /// Number of resting orders at this price
    pub count: u32,
}

impl PriceLevel {
    #[inline]
    pub const fn new() -> Self {
        Self {
            head: NULL_INDEX,
            tail: NULL_INDEX,
            total_qty: 0,
            count: 0,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append an order at the tail (lowest time priority).
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn push_back(&mut self, arena: &mut Arena, index: ArenaIndex) {
        let qty = arena.get(index).qty;

        if self.tail == NULL_INDEX {
            debug_assert!(self.head == NULL_INDEX);
            self.head = index;
            self.tail = index;
            arena.get_mut(index).prev = NULL_INDEX;
            arena.get_mut(index).next = NULL_INDEX;
        } else {
            arena.get_mut(self.tail).next = index;
            arena.get_mut(index).prev = self.tail;
            arena.get_mut(index).next = NULL_INDEX;
            self.tail = index;
        }

        self.count += 1;
        self.total_qty += qty as u64;
    }

    /// Detach and return the head order (oldest).
    ///
    /// The slot is NOT freed; the caller owns that step.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn pop_front(&mut self, arena: &mut Arena) -> Option<ArenaIndex> {
        if self.head == NULL_INDEX {
            return None;
        }

        let index = self.head;
        let node = arena.get(index);
        let next_idx = node.next;
        let qty = node.qty;

        if next_idx == NULL_INDEX {
            // Only order at this price
            self.head = NULL_INDEX;
            self.tail = NULL_INDEX;
        } else {
            self.head = next_idx;
            arena.get_mut(next_idx).prev = NULL_INDEX;
        }

        self.count -= 1;
        self.total_qty -= qty as u64;

        arena.get_mut(index).prev = NULL_INDEX;
        arena.get_mut(index).next = NULL_INDEX;

        Some(index)
    }

    /// Unlink an order from anywhere in the queue (cancel path).
    ///
    /// Returns `true` if the level is now empty. The slot is NOT freed;
    /// the caller owns that step.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn remove(&mut self, arena: &mut Arena, index: ArenaIndex) -> bool {
        let node = arena.get(index);
        let prev_idx = node.prev;
        let next_idx = node.next;
        let qty = node.qty;

        if prev_idx == NULL_INDEX && next_idx == NULL_INDEX {
            // Only order at this price
            debug_assert!(self.head == index && self.tail == index);
            self.head = NULL_INDEX;
            self.tail = NULL_INDEX;
        } else if prev_idx == NULL_INDEX {
            // Head of the queue
            debug_assert!(self.head == index);
            self.head = next_idx;
            arena.get_mut(next_idx).prev = NULL_INDEX;
        } else if next_idx == NULL_INDEX {
            // Tail of the queue
            debug_assert!(self.tail == index);
            self.tail = prev_idx;
            arena.get_mut(prev_idx).next = NULL_INDEX;
        } else {
            // Middle
            arena.get_mut(prev_idx).next = next_idx;
            arena.get_mut(next_idx).prev = prev_idx;
        }

        self.count -= 1;
        self.total_qty -= qty as u64;

        arena.get_mut(index).prev = NULL_INDEX;
        arena.get_mut(index).next = NULL_INDEX;

        self.count == 0
    }

    /// Head order index, or `NULL_INDEX` if empty.
    #[inline]
    pub const fn peek_head(&self) -> ArenaIndex {
        self.head
    }

    /// Keep `total_qty` in step after a partial fill mutated an order's
    /// qty in place.
    #[inline]
    pub fn subtract_qty(&mut self, qty: u32) {
        debug_assert!(self.total_qty >= qty as u64);
        self.total_qty -= qty as u64;
    }
}
