//! Order parameters and submission results.
//!
//! Inputs are plain value types; outputs are `Fill` events plus an
//! explicit status so callers never have to infer an outcome from an
//! empty fill list alone.

/// Order side (buy = bid, sell = ask)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Buy = 0,
    /// Sell side (asks)
    Sell = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Does a taker on this side at `taker_price` cross a maker at
    /// `maker_price`? Buyers cross down onto asks, sellers up onto bids.
    #[inline]
    pub const fn crosses(self, taker_price: u64, maker_price: u64) -> bool {
        match self {
            Side::Buy => taker_price >= maker_price,
            Side::Sell => taker_price <= maker_price,
        }
    }
}

/// Order kind. Market orders ignore the price gate and never rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OrderKind {
    Market = 0,
    Limit = 1,
}

/// One matched quantity transfer.
///
/// The trade price is always the maker's (resting order's) price: the
/// order already in the book sets the execution price.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fill {
    /// Resting (passive) order ID
    pub maker_order_id: u64,
    /// Incoming (aggressive) order ID
    pub taker_order_id: u64,
    /// Executed quantity
    pub qty: u32,
    /// Execution price in ticks (maker's price)
    pub price: u64,
}

/// Why a submission was refused without matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectReason {
    /// The slab allocator has no free slot
    PoolExhausted = 0,
    /// An active order already uses this ID
    DuplicateOrderId = 1,
    /// Quantity must be positive
    InvalidQuantity = 2,
}

/// Final disposition of a submitted order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Fully matched; nothing rests
    Filled,
    /// Limit remainder now resting in the book
    Resting,
    /// Market remainder dropped (market orders never rest)
    Discarded,
    /// Refused before matching; fill list is empty
    Rejected(RejectReason),
}

/// Everything a single `submit` call produced.
#[derive(Debug)]
pub struct SubmitResult {
    /// Fills in the order trades occurred
    pub fills: Vec<Fill>,
    /// What happened to the order
    pub status: SubmitStatus,
    /// Quantity left unmatched (resting or discarded; the full quantity
    /// on rejection)
    pub unfilled_qty: u32,
}

impl SubmitResult {
    #[inline]
    pub(crate) fn rejected(reason: RejectReason, qty: u32) -> Self {
        Self {
            fills: Vec::new(),
            status: SubmitStatus::Rejected(reason),
            unfilled_qty: qty,
        }
    }

    /// Total quantity traded across all fills.
    pub fn traded_qty(&self) -> u64 {
        self.fills.iter().map(|f| f.qty as u64).sum()
    }

    /// True if the order (or part of it) now rests in the book.
    #[inline]
    pub fn is_resting(&self) -> bool {
        self.status == SubmitStatus::Resting
    }

    /// True if the submission was refused outright.
    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self.status, SubmitStatus::Rejected(_))
    }
}
