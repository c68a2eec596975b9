//! Order book structure - bid and ask side indexes plus the id index.
//!
//! Sparse price levels in hash maps with cached best prices give O(1)
//! best-price access in the common case; the id index gives O(1) lookup
//! for cancellation. Matching itself lives in `matching`.

use rustc_hash::FxHashMap;

use crate::arena::{Arena, ArenaIndex, NULL_INDEX};
use crate::price_level::PriceLevel;
use crate::types::Side;

/// Where a resting order lives, keyed by its external id.
#[derive(Clone, Copy, Debug)]
pub struct OrderInfo {
    /// Slot in the arena
    pub arena_index: ArenaIndex,
    /// Which side index holds the order
    pub side: Side,
    /// Price level holding the order
    pub price: u64,
}

/// Sparse order book over hash-mapped price levels.
///
/// Suits instruments with wide price ranges; levels are created on
/// first use and destroyed the instant they empty, so no empty level
/// ever persists in either index.
pub struct OrderBook {
    /// Bid levels (buy orders), best = highest price
    pub bids: FxHashMap<u64, PriceLevel>,
    /// Ask levels (sell orders), best = lowest price
    pub asks: FxHashMap<u64, PriceLevel>,
    /// Cached best bid price
    best_bid: Option<u64>,
    /// Cached best ask price
    best_ask: Option<u64>,
    /// Id index: order id -> location, valid only while resting
    order_map: FxHashMap<u64, OrderInfo>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: FxHashMap::default(),
            asks: FxHashMap::default(),
            best_bid: None,
            best_ask: None,
            order_map: FxHashMap::default(),
        }
    }

    /// Pre-size the hash maps for an expected load.
    pub fn with_capacity(levels: usize, orders: usize) -> Self {
        Self {
            bids: FxHashMap::with_capacity_and_hasher(levels, Default::default()),
            asks: FxHashMap::with_capacity_and_hasher(levels, Default::default()),
            best_bid: None,
            best_ask: None,
            order_map: FxHashMap::with_capacity_and_hasher(orders, Default::default()),
        }
    }

    // ========================================================================
    // Best Price Access
    // ========================================================================

    /// Highest buy price, if any bids rest.
    #[inline]
    pub fn best_bid(&self) -> Option<u64> {
        self.best_bid
    }

    /// Lowest sell price, if any asks rest.
    #[inline]
    pub fn best_ask(&self) -> Option<u64> {
        self.best_ask
    }

    /// Best price on a given side.
    #[inline]
    pub fn best_price(&self, side: Side) -> Option<u64> {
        match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
        }
    }

    /// Best price a taker on `side` would match against.
    #[inline]
    pub fn best_opposite_price(&self, side: Side) -> Option<u64> {
        match side {
            Side::Buy => self.best_ask,  // buyer lifts the lowest ask
            Side::Sell => self.best_bid, // seller hits the highest bid
        }
    }

    // ========================================================================
    // Level Access
    // ========================================================================

    #[inline]
    pub fn get_level(&self, side: Side, price: u64) -> Option<&PriceLevel> {
        match side {
            Side::Buy => self.bids.get(&price),
            Side::Sell => self.asks.get(&price),
        }
    }

    #[inline]
    pub fn get_level_mut(&mut self, side: Side, price: u64) -> Option<&mut PriceLevel> {
        match side {
            Side::Buy => self.bids.get_mut(&price),
            Side::Sell => self.asks.get_mut(&price),
        }
    }

    #[inline]
    pub fn get_or_create_level(&mut self, side: Side, price: u64) -> &mut PriceLevel {
        match side {
            Side::Buy => self.bids.entry(price).or_insert_with(PriceLevel::new),
            Side::Sell => self.asks.entry(price).or_insert_with(PriceLevel::new),
        }
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Rest an already-initialized record at the back of its price level
    /// and register it in the id index.
    ///
    /// Returns `false` if the id is already active (the caller should
    /// have screened for this; nothing is inserted).
    pub fn add_order(
        &mut self,
        arena: &mut Arena,
        order_id: u64,
        side: Side,
        price: u64,
        arena_index: ArenaIndex,
    ) -> bool {
        if self.order_map.contains_key(&order_id) {
            return false;
        }

        self.order_map.insert(order_id, OrderInfo {
            arena_index,
            side,
            price,
        });

        let level = self.get_or_create_level(side, price);
        level.push_back(arena, arena_index);

        self.update_best_price_on_add(side, price);

        true
    }

    /// Unlink a resting order (cancel path).
    ///
    /// Erases the id-index entry, removes the record from its level and
    /// prunes the level if it emptied. The arena slot is NOT freed; the
    /// caller owns that step.
    pub fn remove_order(&mut self, arena: &mut Arena, order_id: u64) -> Option<OrderInfo> {
        let info = self.order_map.remove(&order_id)?;

        let level = match info.side {
            Side::Buy => self.bids.get_mut(&info.price),
            Side::Sell => self.asks.get_mut(&info.price),
        };

        if let Some(level) = level {
            let now_empty = level.remove(arena, info.arena_index);
            if now_empty {
                self.remove_empty_level(info.side, info.price);
            }
        }

        Some(info)
    }

    /// Look up a resting order by id.
    #[inline]
    pub fn get_order(&self, order_id: u64) -> Option<&OrderInfo> {
        self.order_map.get(&order_id)
    }

    #[inline]
    pub fn contains_order(&self, order_id: u64) -> bool {
        self.order_map.contains_key(&order_id)
    }

    /// Erase an id-index entry only. Match path: the matching loop has
    /// already popped the record from its level.
    #[inline]
    pub fn remove_order_from_map(&mut self, order_id: u64) {
        self.order_map.remove(&order_id);
    }

    // ========================================================================
    // Level Removal
    // ========================================================================

    /// Drop an emptied price level and refresh the cached best price if
    /// that level was the best.
    pub fn remove_empty_level(&mut self, side: Side, price: u64) {
        match side {
            Side::Buy => {
                self.bids.remove(&price);
                if self.best_bid == Some(price) {
                    self.best_bid = self.bids.keys().copied().max();
                }
            }
            Side::Sell => {
                self.asks.remove(&price);
                if self.best_ask == Some(price) {
                    self.best_ask = self.asks.keys().copied().min();
                }
            }
        }
    }

    fn update_best_price_on_add(&mut self, side: Side, price: u64) {
        match side {
            Side::Buy => {
                if self.best_bid.map_or(true, |best| price > best) {
                    self.best_bid = Some(price);
                }
            }
            Side::Sell => {
                if self.best_ask.map_or(true, |best| price < best) {
                    self.best_ask = Some(price);
                }
            }
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Number of resting orders (the id index's size).
    pub fn order_count(&self) -> usize {
        self.order_map.len()
    }

    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order_map.is_empty()
    }

    /// Spread (best_ask - best_bid) when the book is two-sided.
    pub fn spread(&self) -> Option<u64> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    /// (total quantity, order count) resting at one price.
    pub fn depth_at(&self, side: Side, price: u64) -> (u64, u32) {
        self.get_level(side, price)
            .map(|l| (l.total_qty, l.count))
            .unwrap_or((0, 0))
    }

    /// Count records reachable by walking every level's FIFO chain on
    /// both sides. Equals `order_count()` whenever the indexes are
    /// consistent; tests assert exactly that.
    pub fn walk_order_count(&self, arena: &Arena) -> usize {
        let mut total = 0usize;
        for level in self.bids.values().chain(self.asks.values()) {
            let mut idx = level.head;
            while idx != NULL_INDEX {
                total += 1;
                idx = arena.get(idx).next;
            }
        }
        total
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.best_bid = None;
        self.best_ask = None;
        self.order_map.clear();
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("best_bid", &self.best_bid)
            .field("best_ask", &self.best_ask)
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("order_count", &self.order_map.len())
            .finish()
    }
}
