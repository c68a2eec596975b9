//! Synthetic order flow - seeded generator and simulation harness.
//!
//! Produces a reproducible stream of randomized submissions (market and
//! limit, both sides) and drives them through a `MatchingEngine`,
//! timing the run and recording per-op latency percentiles.

use hdrhistogram::Histogram;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

use crate::matching::MatchingEngine;
use crate::types::{OrderKind, Side, SubmitStatus};

/// Knobs for the random flow. Defaults mirror a mid-price equity-like
/// instrument: prices 100.00-200.00 in 2-decimal ticks, sizes 1-1000,
/// an even side split and 10% market orders.
#[derive(Clone, Copy, Debug)]
pub struct FlowConfig {
    pub seed: u64,
    /// Inclusive tick range for limit prices
    pub min_price: u64,
    pub max_price: u64,
    /// Inclusive quantity range
    pub min_qty: u32,
    pub max_qty: u32,
    /// Fraction of orders submitted as market orders
    pub market_fraction: f64,
    /// Fraction of orders on the buy side
    pub buy_fraction: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            min_price: 10_000,
            max_price: 20_000,
            min_qty: 1,
            max_qty: 1000,
            market_fraction: 0.1,
            buy_fraction: 0.5,
        }
    }
}

/// One generated order submission.
#[derive(Clone, Copy, Debug)]
pub struct Submission {
    pub id: u64,
    pub timestamp: u64,
    /// Limit price in ticks; 0 for market orders
    pub price: u64,
    pub qty: u32,
    pub side: Side,
    pub kind: OrderKind,
}

/// Endless iterator of submissions with strictly increasing ids and
/// timestamps. Two generators built from the same config produce the
/// same stream.
pub struct FlowGenerator {
    config: FlowConfig,
    rng: ChaCha8Rng,
    next_id: u64,
    next_timestamp: u64,
}

impl FlowGenerator {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            next_id: 1,
            next_timestamp: 1,
        }
    }
}

impl Iterator for FlowGenerator {
    type Item = Submission;

    fn next(&mut self) -> Option<Submission> {
        let cfg = &self.config;
        let kind = if self.rng.gen_bool(cfg.market_fraction) {
            OrderKind::Market
        } else {
            OrderKind::Limit
        };
        let side = if self.rng.gen_bool(cfg.buy_fraction) {
            Side::Buy
        } else {
            Side::Sell
        };
        // Market orders carry a dummy price; the gate never reads it
        let price = match kind {
            OrderKind::Limit => self.rng.gen_range(cfg.min_price..=cfg.max_price),
            OrderKind::Market => 0,
        };
        let qty = self.rng.gen_range(cfg.min_qty..=cfg.max_qty);

        let id = self.next_id;
        self.next_id += 1;
        let timestamp = self.next_timestamp;
        self.next_timestamp += 1;

        Some(Submission {
            id,
            timestamp,
            price,
            qty,
            side,
            kind,
        })
    }
}

/// What a timed simulation run observed.
#[derive(Debug)]
pub struct SimReport {
    pub orders: u64,
    pub elapsed_ms: f64,
    /// Orders per second
    pub throughput: f64,
    pub total_fills: u64,
    pub rested: u64,
    pub discarded: u64,
    pub rejected: u64,
    /// Resting orders left in the book at the end
    pub final_active: usize,
    /// Per-submit wall-clock latency in nanoseconds
    pub latency: Histogram<u64>,
}

impl SimReport {
    pub fn print(&self) {
        println!("Simulated {} orders in {:.2} ms", self.orders, self.elapsed_ms);
        println!("Throughput: {:.0} orders/sec", self.throughput);
        println!(
            "Fills: {}  rested: {}  discarded: {}  rejected: {}",
            self.total_fills, self.rested, self.discarded, self.rejected
        );
        println!("Final active orders in book: {}", self.final_active);
        println!("--- per-submit latency (ns) ---");
        println!("P50:    {:6}", self.latency.value_at_quantile(0.50));
        println!("P90:    {:6}", self.latency.value_at_quantile(0.90));
        println!("P99:    {:6}", self.latency.value_at_quantile(0.99));
        println!("P99.9:  {:6}", self.latency.value_at_quantile(0.999));
        println!("Max:    {:6}", self.latency.max());
    }
}

/// Drive `total_orders` submissions from `flow` through `engine`,
/// timing the whole run and each call.
pub fn run_simulation(
    engine: &mut MatchingEngine,
    flow: &mut FlowGenerator,
    total_orders: u64,
) -> SimReport {
    // 1ns..1s bounds; anything slower is clamped, not dropped
    let mut latency =
        Histogram::<u64>::new_with_bounds(1, 1_000_000_000, 3).expect("valid histogram bounds");

    let mut total_fills = 0u64;
    let mut rested = 0u64;
    let mut discarded = 0u64;
    let mut rejected = 0u64;

    let run_start = Instant::now();
    for _ in 0..total_orders {
        let sub = flow.next().expect("generator is endless");

        let op_start = Instant::now();
        let result = engine.submit(sub.id, sub.timestamp, sub.price, sub.qty, sub.side, sub.kind);
        let elapsed = op_start.elapsed();

        latency.saturating_record(elapsed.as_nanos() as u64);

        total_fills += result.fills.len() as u64;
        match result.status {
            SubmitStatus::Resting => rested += 1,
            SubmitStatus::Discarded => discarded += 1,
            SubmitStatus::Rejected(_) => rejected += 1,
            SubmitStatus::Filled => {}
        }
    }
    let elapsed_ms = run_start.elapsed().as_secs_f64() * 1000.0;

    SimReport {
        orders: total_orders,
        elapsed_ms,
        throughput: total_orders as f64 / (elapsed_ms / 1000.0),
        total_fills,
        rested,
        discarded,
        rejected,
        final_active: engine.active_orders(),
        latency,
    }
}
