//! Slab allocator - fixed-capacity pool of order records.
//!
//! The whole pool is one contiguous allocation made at construction;
//! after that no per-order heap traffic occurs. Free slots are threaded
//! into a singly-linked free list through the `next` field, giving O(1)
//! alloc and free. Exhaustion is an `Option::None`, never a fault.

use std::fmt;

/// Sentinel index marking the end of a list (the pool's "null pointer")
pub const NULL_INDEX: u32 = u32::MAX;

/// Stable integer handle to a pool slot.
/// 32 bits instead of a pointer halves linkage metadata and removes any
/// possibility of dangling references to recycled slots.
pub type ArenaIndex = u32;

/// One order's matching state - exactly 64 bytes (one cache line).
///
/// # Memory Layout
///
/// | Field      | Type    | Offset | Size |
/// |------------|---------|--------|------|
/// | price      | u64     | 0      | 8    |
/// | qty        | u32     | 8      | 4    |
/// | (padding)  | -       | 12     | 4    |
/// | order_id   | u64     | 16     | 8    |
/// | timestamp  | u64     | 24     | 8    |
/// | next       | u32     | 32     | 4    |
/// | prev       | u32     | 36     | 4    |
/// | _reserved  | [u8;24] | 40     | 24   |
/// | **Total**  |         |        | 64   |
#[repr(C)]
#[repr(align(64))]
#[derive(Clone, Copy)]
pub struct OrderNode {
    // === Hot data (read on every matching step) ===

    /// Fixed-point price in ticks (e.g. $100.50 -> 10050 at 2 decimals).
    /// Meaningful only for limit orders; market orders carry 0.
    pub price: u64,

    /// Remaining quantity. Strictly positive while the record rests in
    /// the book; decremented by each partial fill.
    pub qty: u32,

    // 4 bytes implicit padding here for u64 alignment

    /// Caller-supplied order ID, unique among active orders
    pub order_id: u64,

    /// Arrival marker; FIFO priority comes from insertion order, this is
    /// carried for reporting only
    pub timestamp: u64,

    // === Linkage ===
    // In the book: FIFO queue links within a price level.
    // On the free list: `next` threads the list of free slots.

    /// Next order at the same price level
    pub next: ArenaIndex,

    /// Previous order at the same price level (O(1) cancel unlink)
    pub prev: ArenaIndex,

    pub _reserved: [u8; 24],
}

const _: () = assert!(
    std::mem::size_of::<OrderNode>() == 64,
    "OrderNode must be exactly 64 bytes (one cache line)"
);

const _: () = assert!(
    std::mem::align_of::<OrderNode>() == 64,
    "OrderNode must be 64-byte aligned"
);

impl OrderNode {
    /// Create an empty node (free-list filler)
    #[inline]
    pub const fn empty() -> Self {
        Self {
            price: 0,
            qty: 0,
            order_id: 0,
            timestamp: 0,
            next: NULL_INDEX,
            prev: NULL_INDEX,
            _reserved: [0u8; 24],
        }
    }

    /// Overwrite the slot with a fresh order's terms. Reuses the storage
    /// in place; there is no separate construction step.
    #[inline]
    pub fn init(&mut self, order_id: u64, timestamp: u64, price: u64, qty: u32) {
        self.price = price;
        self.qty = qty;
        self.order_id = order_id;
        self.timestamp = timestamp;
        self.next = NULL_INDEX;
        self.prev = NULL_INDEX;
    }

    /// Scrub the node before it returns to the free list
    #[inline]
    pub fn reset(&mut self) {
        self.price = 0;
        self.qty = 0;
        self.order_id = 0;
        self.timestamp = 0;
        self.next = NULL_INDEX;
        self.prev = NULL_INDEX;
    }
}

impl fmt::Debug for OrderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderNode")
            .field("order_id", &self.order_id)
            .field("timestamp", &self.timestamp)
            .field("price", &self.price)
            .field("qty", &self.qty)
            .field("prev", &self.prev)
            .field("next", &self.next)
            .finish()
    }
}

/// Pre-allocated slab of order records with O(1) alloc/free.
///
/// The free list is threaded through the `next` field of unused nodes.
/// The pool never grows: `alloc` returning `None` is the caller's
/// capacity-exceeded signal.
pub struct Arena {
    /// Contiguous block of pre-allocated nodes
    nodes: Vec<OrderNode>,

    /// Head of the free list (index of first available slot)
    free_head: ArenaIndex,

    /// Number of currently allocated slots
    allocated_count: u32,

    /// Total capacity
    capacity: u32,
}

impl Arena {
    /// Create an arena with room for `capacity` orders.
    ///
    /// # Panics
    /// Panics if capacity is not less than `NULL_INDEX` (the sentinel
    /// must stay unused).
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < NULL_INDEX, "capacity must be less than NULL_INDEX");

        let mut nodes = vec![OrderNode::empty(); capacity as usize];

        // Thread the initial free list: slot i -> slot i+1
        for i in 0..capacity.saturating_sub(1) {
            nodes[i as usize].next = i + 1;
        }
        if capacity > 0 {
            nodes[(capacity - 1) as usize].next = NULL_INDEX;
        }

        Self {
            nodes,
            free_head: if capacity > 0 { 0 } else { NULL_INDEX },
            allocated_count: 0,
            capacity,
        }
    }

    /// Take a free slot, or `None` if the pool is exhausted.
    ///
    /// # Complexity
    /// O(1) - pops the free-list head
    #[inline]
    pub fn alloc(&mut self) -> Option<ArenaIndex> {
        if self.free_head == NULL_INDEX {
            return None;
        }

        let index = self.free_head;
        self.free_head = self.nodes[index as usize].next;
        self.allocated_count += 1;

        self.nodes[index as usize].next = NULL_INDEX;
        self.nodes[index as usize].prev = NULL_INDEX;

        Some(index)
    }

    /// Return a slot to the free list.
    ///
    /// The caller must pass an index it previously allocated and has not
    /// already freed; double frees are caught only by debug assertions.
    ///
    /// # Complexity
    /// O(1) - pushes onto the free-list head
    #[inline]
    pub fn free(&mut self, index: ArenaIndex) {
        debug_assert!(index < self.capacity, "index out of bounds");
        debug_assert!(self.allocated_count > 0, "double free detected");

        self.nodes[index as usize].reset();
        self.nodes[index as usize].next = self.free_head;
        self.free_head = index;
        self.allocated_count -= 1;
    }

    /// Immutable slot access.
    #[inline]
    pub fn get(&self, index: ArenaIndex) -> &OrderNode {
        debug_assert!(index < self.capacity, "index out of bounds");
        &self.nodes[index as usize]
    }

    /// Mutable slot access.
    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> &mut OrderNode {
        debug_assert!(index < self.capacity, "index out of bounds");
        &mut self.nodes[index as usize]
    }

    /// Number of slots currently handed out.
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.allocated_count
    }

    /// Total slot count fixed at construction.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// True if no slot is allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allocated_count == 0
    }

    /// True if the free list is empty.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_head == NULL_INDEX
    }

    /// Pre-fault all pages so the hot path never takes a page fault.
    pub fn warm_up(&mut self) {
        for node in &mut self.nodes {
            // Volatile write defeats dead-store elimination
            unsafe {
                std::ptr::write_volatile(&mut node._reserved[0], 0);
            }
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("allocated", &self.allocated_count)
            .field("free_head", &self.free_head)
            .finish()
    }
}
