//! # Slab-LOB
//!
//! A pool-backed limit order book matching engine with strict
//! price-time priority.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one caller owns an engine instance (no locks)
//! - **O(1) Cancel**: id index + intrusive doubly-linked price levels
//! - **Slab Allocation**: all order records live in one fixed-capacity
//!   pool allocated up front; the hot path never touches the heap
//! - **Explicit Outcomes**: exhaustion and unknown-cancel are returned
//!   values, never panics
//!
//! ## Architecture
//!
//! ```text
//! submit/cancel --> [MatchingEngine]
//!                      |-- Arena (slab of OrderNodes)
//!                      |-- OrderBook (bid/ask levels + id index)
//!                      `--> Vec<Fill> + SubmitStatus
//! ```

pub mod arena;
pub mod matching;
pub mod order_book;
pub mod price_level;
pub mod sim;
pub mod types;

// Re-exports for convenience
pub use arena::{Arena, ArenaIndex, OrderNode, NULL_INDEX};
pub use matching::MatchingEngine;
pub use order_book::{OrderBook, OrderInfo};
pub use price_level::PriceLevel;
pub use sim::{FlowConfig, FlowGenerator, SimReport};
pub use types::{Fill, OrderKind, RejectReason, Side, SubmitResult, SubmitStatus};
