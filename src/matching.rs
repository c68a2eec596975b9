//! Matching engine - the submit/cancel pipeline and the crossing loop.
//!
//! One side-parameterized algorithm serves all four cases
//! (limit/market x buy/sell): the price gate is the only point where
//! limit and market orders differ, and `Side::crosses` folds the two
//! comparison directions into one call.

use crate::arena::{Arena, NULL_INDEX};
use crate::order_book::OrderBook;
use crate::types::{Fill, OrderKind, RejectReason, Side, SubmitResult, SubmitStatus};

/// Price-time priority matching engine over a fixed-capacity pool.
///
/// Owns the slab allocator and both side indexes. Single-writer: one
/// logical caller drives `submit`/`cancel` to completion synchronously;
/// concurrent producers must serialize externally (e.g. an SPSC queue),
/// the engine takes no locks.
pub struct MatchingEngine {
    /// Slab allocator for order records
    pub arena: Arena,
    /// Side indexes + id index
    pub book: OrderBook,
}

impl MatchingEngine {
    /// Create an engine whose book can hold at most `capacity` resting
    /// orders. Capacity never grows; size it to the expected high-water
    /// mark of resting orders.
    pub fn new(capacity: u32) -> Self {
        Self {
            arena: Arena::new(capacity),
            book: OrderBook::with_capacity(1000, capacity as usize),
        }
    }

    /// Submit an order and run it through matching.
    ///
    /// # Pipeline
    /// 1. Validate quantity and id uniqueness.
    /// 2. Acquire a pool slot; exhaustion rejects the whole submission
    ///    with zero fills (the order is not matched at all).
    /// 3. Cross against the opposite side, best price first, FIFO within
    ///    a level. Limit orders stop at the price gate; market orders
    ///    sweep whatever liquidity exists.
    /// 4. Dispose: a limit remainder rests and is indexed; a market
    ///    remainder is discarded (market orders never rest); a fully
    ///    consumed record goes straight back to the pool.
    ///
    /// Fills are returned in the order trades occurred, each priced at
    /// the maker's resting price.
    pub fn submit(
        &mut self,
        id: u64,
        timestamp: u64,
        price: u64,
        qty: u32,
        side: Side,
        kind: OrderKind,
    ) -> SubmitResult {
        if qty == 0 {
            return SubmitResult::rejected(RejectReason::InvalidQuantity, 0);
        }
        // An active order already owns this id; refuse rather than
        // overwrite the id index.
        if self.book.contains_order(id) {
            return SubmitResult::rejected(RejectReason::DuplicateOrderId, qty);
        }

        let Some(arena_idx) = self.arena.alloc() else {
            return SubmitResult::rejected(RejectReason::PoolExhausted, qty);
        };
        self.arena.get_mut(arena_idx).init(id, timestamp, price, qty);

        let mut fills = Vec::new();
        let remaining = self.cross(id, side, kind, price, qty, &mut fills);
        self.arena.get_mut(arena_idx).qty = remaining;

        if kind == OrderKind::Limit && remaining > 0 {
            self.book.add_order(&mut self.arena, id, side, price, arena_idx);
            SubmitResult {
                fills,
                status: SubmitStatus::Resting,
                unfilled_qty: remaining,
            }
        } else {
            // Fully filled, or a market order whose remainder has nothing
            // left to sweep; either way the slot is recycled now.
            self.arena.free(arena_idx);
            let status = if remaining == 0 {
                SubmitStatus::Filled
            } else {
                SubmitStatus::Discarded
            };
            SubmitResult {
                fills,
                status,
                unfilled_qty: remaining,
            }
        }
    }

    /// Cross an incoming order against the opposite side.
    ///
    /// Walks price levels best-first, consuming makers in FIFO order,
    /// until the taker is exhausted, the opposite side empties, or a
    /// limit taker hits the price gate.
    ///
    /// Returns the unmatched remainder.
    fn cross(
        &mut self,
        taker_id: u64,
        side: Side,
        kind: OrderKind,
        limit_price: u64,
        mut remaining: u32,
        fills: &mut Vec<Fill>,
    ) -> u32 {
        let maker_side = side.opposite();

        while remaining > 0 {
            let best = match self.book.best_price(maker_side) {
                Some(price) => price,
                None => break, // opposite side exhausted
            };

            // Price gate: limit takers stop at their price; market
            // takers accept any maker price.
            if kind == OrderKind::Limit && !side.crosses(limit_price, best) {
                break;
            }

            remaining = self.fill_at_level(taker_id, maker_side, best, remaining, fills);
        }

        remaining
    }

    /// Consume makers at one price level until the taker or the level is
    /// exhausted. Returns the taker's remainder.
    fn fill_at_level(
        &mut self,
        taker_id: u64,
        maker_side: Side,
        price: u64,
        mut remaining: u32,
        fills: &mut Vec<Fill>,
    ) -> u32 {
        while remaining > 0 {
            let maker_idx = match self.book.get_level(maker_side, price) {
                Some(level) => level.peek_head(),
                None => break,
            };
            if maker_idx == NULL_INDEX {
                break;
            }

            let maker = self.arena.get(maker_idx);
            let maker_id = maker.order_id;
            let maker_qty = maker.qty;

            let traded = remaining.min(maker_qty);

            // The maker sets the trade price
            fills.push(Fill {
                maker_order_id: maker_id,
                taker_order_id: taker_id,
                qty: traded,
                price,
            });

            remaining -= traded;
            let maker_left = maker_qty - traded;

            if maker_left == 0 {
                // Maker exhausted: drop it from the level, the id index
                // and the pool in one step, then prune the level if it
                // just emptied.
                let level = self
                    .book
                    .get_level_mut(maker_side, price)
                    .expect("level exists while its head is being matched");
                level.pop_front(&mut self.arena);
                let emptied = level.is_empty();
                self.book.remove_order_from_map(maker_id);
                self.arena.free(maker_idx);
                if emptied {
                    self.book.remove_empty_level(maker_side, price);
                    break;
                }
            } else {
                // Partial fill: decrement in place, keep time priority
                self.arena.get_mut(maker_idx).qty = maker_left;
                let level = self
                    .book
                    .get_level_mut(maker_side, price)
                    .expect("level exists while its head is being matched");
                level.subtract_qty(traded);
            }
        }

        remaining
    }

    /// Cancel a resting order by id.
    ///
    /// O(1): id-index lookup, unlink from its level, slot back to the
    /// pool. Returns `false` for unknown or already-gone ids; cancelling
    /// twice is a normal outcome, not an error.
    pub fn cancel(&mut self, id: u64) -> bool {
        match self.book.remove_order(&mut self.arena, id) {
            Some(info) => {
                self.arena.free(info.arena_index);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Number of currently resting orders. Always equals the id index's
    /// size, the pool's allocated count, and the sum of all level
    /// counts.
    #[inline]
    pub fn active_orders(&self) -> usize {
        self.book.order_count()
    }

    #[inline]
    pub fn best_bid(&self) -> Option<u64> {
        self.book.best_bid()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<u64> {
        self.book.best_ask()
    }

    #[inline]
    pub fn spread(&self) -> Option<u64> {
        self.book.spread()
    }

    /// Pre-fault the pool's pages before a timed run.
    pub fn warm_up(&mut self) {
        self.arena.warm_up();
    }

    /// Drop every resting order and rebuild the pool. Harness utility;
    /// reallocates, so keep it off the hot path.
    pub fn clear(&mut self) {
        let capacity = self.arena.capacity();
        self.book.clear();
        self.arena = Arena::new(capacity);
    }

    /// Hash of observable book state, for determinism tests.
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.book.best_bid().hash(&mut hasher);
        self.book.best_ask().hash(&mut hasher);
        self.book.order_count().hash(&mut hasher);
        self.arena.allocated().hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(
        engine: &mut MatchingEngine,
        id: u64,
        side: Side,
        price: u64,
        qty: u32,
    ) -> SubmitResult {
        engine.submit(id, id, price, qty, side, OrderKind::Limit)
    }

    fn market(engine: &mut MatchingEngine, id: u64, side: Side, qty: u32) -> SubmitResult {
        engine.submit(id, id, 0, qty, side, OrderKind::Market)
    }

    #[test]
    fn test_limit_rests_when_no_match() {
        let mut engine = MatchingEngine::new(1000);

        let result = limit(&mut engine, 1, Side::Buy, 10000, 100);

        assert!(result.fills.is_empty());
        assert_eq!(result.status, SubmitStatus::Resting);
        assert_eq!(result.unfilled_qty, 100);
        assert_eq!(engine.best_bid(), Some(10000));
        assert_eq!(engine.active_orders(), 1);
    }

    #[test]
    fn test_full_match_at_maker_price() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Sell, 10000, 100);
        // Taker bids above the ask; the maker's price still rules
        let result = limit(&mut engine, 2, Side::Buy, 10050, 100);

        assert_eq!(result.status, SubmitStatus::Filled);
        assert_eq!(result.fills.len(), 1);
        assert_eq!(
            result.fills[0],
            Fill { maker_order_id: 1, taker_order_id: 2, qty: 100, price: 10000 }
        );
        assert_eq!(engine.active_orders(), 0);
        assert_eq!(engine.best_bid(), None);
        assert_eq!(engine.best_ask(), None);
    }

    #[test]
    fn test_partial_fill_taker_rests() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Sell, 10000, 50);
        let result = limit(&mut engine, 2, Side::Buy, 10000, 100);

        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].qty, 50);
        assert_eq!(result.status, SubmitStatus::Resting);
        assert_eq!(result.unfilled_qty, 50);

        assert_eq!(engine.active_orders(), 1);
        assert_eq!(engine.best_bid(), Some(10000));
        assert_eq!(engine.best_ask(), None);
    }

    #[test]
    fn test_partial_fill_maker_keeps_priority() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Sell, 10000, 100);
        limit(&mut engine, 2, Side::Buy, 10000, 30);

        assert_eq!(engine.active_orders(), 1);
        assert_eq!(engine.best_ask(), Some(10000));
        assert_eq!(engine.book.depth_at(Side::Sell, 10000), (70, 1));

        // The partially filled maker is still first in line
        let result = limit(&mut engine, 3, Side::Buy, 10000, 70);
        assert_eq!(result.fills[0].maker_order_id, 1);
        assert_eq!(engine.active_orders(), 0);
    }

    #[test]
    fn test_sweep_multiple_levels() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Sell, 10000, 50);
        limit(&mut engine, 2, Side::Sell, 10010, 50);
        limit(&mut engine, 3, Side::Sell, 10020, 50);

        let result = limit(&mut engine, 4, Side::Buy, 10020, 120);

        let trades: Vec<_> = result.fills.iter().map(|f| (f.price, f.qty)).collect();
        assert_eq!(trades, vec![(10000, 50), (10010, 50), (10020, 20)]);
        assert_eq!(result.status, SubmitStatus::Filled);

        // 30 left of order 3 at the worst level
        assert_eq!(engine.active_orders(), 1);
        assert_eq!(engine.best_ask(), Some(10020));
        assert_eq!(engine.book.depth_at(Side::Sell, 10020), (30, 1));
    }

    #[test]
    fn test_price_gate_stops_limit_taker() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Sell, 10100, 100);
        let result = limit(&mut engine, 2, Side::Buy, 10000, 100);

        assert!(result.fills.is_empty(), "no trade above the taker's limit");
        assert_eq!(result.status, SubmitStatus::Resting);
        assert_eq!(engine.active_orders(), 2);
    }

    #[test]
    fn test_sell_side_price_gate() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Buy, 9900, 100);
        let result = limit(&mut engine, 2, Side::Sell, 10000, 100);

        assert!(result.fills.is_empty(), "no trade below the seller's limit");
        assert_eq!(engine.active_orders(), 2);

        // Seller at or under the bid does trade, at the bid's price
        let result = limit(&mut engine, 3, Side::Sell, 9800, 100);
        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].price, 9900);
        assert_eq!(result.fills[0].maker_order_id, 1);
    }

    #[test]
    fn test_market_order_ignores_price() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Sell, 99999, 40);
        let result = market(&mut engine, 2, Side::Buy, 40);

        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].price, 99999);
        assert_eq!(result.status, SubmitStatus::Filled);
        assert_eq!(engine.active_orders(), 0);
    }

    #[test]
    fn test_market_remainder_discarded() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Sell, 10000, 20);
        let result = market(&mut engine, 2, Side::Buy, 100);

        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].qty, 20);
        assert_eq!(result.status, SubmitStatus::Discarded);
        assert_eq!(result.unfilled_qty, 80);

        // Nothing rests, nothing leaks
        assert_eq!(engine.active_orders(), 0);
        assert!(engine.arena.is_empty());
    }

    #[test]
    fn test_market_into_empty_book() {
        let mut engine = MatchingEngine::new(1000);

        let result = market(&mut engine, 1, Side::Sell, 500);

        assert!(result.fills.is_empty());
        assert_eq!(result.status, SubmitStatus::Discarded);
        assert_eq!(result.unfilled_qty, 500);
        assert!(engine.arena.is_empty());
    }

    #[test]
    fn test_fifo_within_level() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Sell, 10000, 100);
        limit(&mut engine, 2, Side::Sell, 10000, 100);
        limit(&mut engine, 3, Side::Sell, 10000, 100);

        let result = limit(&mut engine, 4, Side::Buy, 10000, 200);

        assert_eq!(result.fills.len(), 2);
        assert_eq!(result.fills[0].maker_order_id, 1); // first in
        assert_eq!(result.fills[1].maker_order_id, 2); // second in
        assert_eq!(engine.active_orders(), 1); // order 3 untouched
    }

    #[test]
    fn test_pool_exhaustion_rejects_whole_submission() {
        let mut engine = MatchingEngine::new(1);

        limit(&mut engine, 1, Side::Sell, 10000, 50);
        assert_eq!(engine.active_orders(), 1);

        // The pool is full; even a crossing order is refused unmatched
        let result = limit(&mut engine, 2, Side::Buy, 10000, 30);
        assert!(result.fills.is_empty());
        assert_eq!(
            result.status,
            SubmitStatus::Rejected(RejectReason::PoolExhausted)
        );
        assert_eq!(engine.active_orders(), 1);
        assert_eq!(engine.book.depth_at(Side::Sell, 10000), (50, 1));
    }

    #[test]
    fn test_slot_returns_after_cancel() {
        let mut engine = MatchingEngine::new(1);

        limit(&mut engine, 1, Side::Sell, 10000, 50);
        assert!(engine.cancel(1));

        let result = limit(&mut engine, 2, Side::Buy, 9000, 10);
        assert_eq!(result.status, SubmitStatus::Resting);
    }

    #[test]
    fn test_cancel_idempotent() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Buy, 10000, 100);

        assert!(engine.cancel(1));
        assert!(!engine.cancel(1), "second cancel finds nothing");
        assert!(!engine.cancel(999), "unknown id is a clean false");
        assert_eq!(engine.active_orders(), 0);
        assert_eq!(engine.best_bid(), None);
    }

    #[test]
    fn test_cancel_after_partial_fill() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Sell, 10000, 1000);
        limit(&mut engine, 2, Side::Buy, 10000, 300);

        assert_eq!(engine.book.depth_at(Side::Sell, 10000), (700, 1));
        assert!(engine.cancel(1));
        assert_eq!(engine.active_orders(), 0);
        assert!(engine.arena.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected_while_active() {
        let mut engine = MatchingEngine::new(1000);

        limit(&mut engine, 1, Side::Buy, 10000, 100);
        let result = limit(&mut engine, 1, Side::Sell, 10100, 50);

        assert_eq!(
            result.status,
            SubmitStatus::Rejected(RejectReason::DuplicateOrderId)
        );
        assert_eq!(engine.active_orders(), 1);

        // Once the original is gone the id is free again
        engine.cancel(1);
        let result = limit(&mut engine, 1, Side::Sell, 10100, 50);
        assert_eq!(result.status, SubmitStatus::Resting);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut engine = MatchingEngine::new(1000);

        let result = engine.submit(1, 1, 10000, 0, Side::Buy, OrderKind::Limit);
        assert_eq!(
            result.status,
            SubmitStatus::Rejected(RejectReason::InvalidQuantity)
        );
        assert!(engine.arena.is_empty());
    }

    #[test]
    fn test_partial_fill_then_market_sweep() {
        let mut engine = MatchingEngine::new(16);

        // One resting sell, id=1, price=100.00, qty=50
        limit(&mut engine, 1, Side::Sell, 10000, 50);

        // Buy limit id=2 for 30 takes a partial fill
        let result = limit(&mut engine, 2, Side::Buy, 10000, 30);
        assert_eq!(result.fills.len(), 1);
        assert_eq!(
            result.fills[0],
            Fill { maker_order_id: 1, taker_order_id: 2, qty: 30, price: 10000 }
        );
        assert_eq!(engine.active_orders(), 1);
        assert_eq!(engine.book.depth_at(Side::Sell, 10000), (20, 1));

        // Buy market id=3 for 100 sweeps the remaining 20, drops 80
        let result = market(&mut engine, 3, Side::Buy, 100);
        assert_eq!(result.fills.len(), 1);
        assert_eq!(
            result.fills[0],
            Fill { maker_order_id: 1, taker_order_id: 3, qty: 20, price: 10000 }
        );
        assert_eq!(result.unfilled_qty, 80);
        assert_eq!(result.status, SubmitStatus::Discarded);
        assert_eq!(engine.active_orders(), 0);
    }

    #[test]
    fn test_index_consistency_through_mixed_flow() {
        let mut engine = MatchingEngine::new(64);

        limit(&mut engine, 1, Side::Buy, 9900, 100);
        limit(&mut engine, 2, Side::Buy, 9950, 100);
        limit(&mut engine, 3, Side::Sell, 10050, 100);
        limit(&mut engine, 4, Side::Sell, 10050, 40);
        limit(&mut engine, 5, Side::Buy, 10050, 120); // takes 3 fully, 4 partially
        engine.cancel(2);
        market(&mut engine, 6, Side::Sell, 60); // hits bid at 9900

        assert_eq!(engine.active_orders(), engine.book.order_count());
        assert_eq!(engine.active_orders(), engine.arena.allocated() as usize);
        assert_eq!(
            engine.active_orders(),
            engine.book.walk_order_count(&engine.arena)
        );
    }
}
