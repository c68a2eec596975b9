//! Randomized order-flow simulation over a fresh matching engine.
//!
//! Prints elapsed time, throughput, per-submit latency percentiles and
//! the final book population.

use clap::Parser;
use slab_lob::sim::{run_simulation, FlowConfig, FlowGenerator};
use slab_lob::MatchingEngine;

#[derive(Parser, Debug)]
#[command(name = "simulate", about = "Run a synthetic order-flow simulation")]
struct Args {
    /// Total orders to submit
    #[arg(default_value_t = 1_000_000)]
    orders: u64,

    /// Pool capacity (maximum simultaneously resting orders)
    #[arg(default_value_t = 2_000_000)]
    capacity: u32,

    /// RNG seed for the flow generator
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Pin the run to the last CPU core
    #[arg(long)]
    pin: bool,
}

fn main() {
    let args = Args::parse();

    if args.pin {
        pin_to_last_core();
    }

    println!("Initializing order book with pool capacity {}", args.capacity);
    let mut engine = MatchingEngine::new(args.capacity);
    engine.warm_up();

    let mut flow = FlowGenerator::new(FlowConfig {
        seed: args.seed,
        ..FlowConfig::default()
    });

    println!("Running simulation for {} orders...", args.orders);
    let report = run_simulation(&mut engine, &mut flow, args.orders);
    report.print();
}

/// The last core is the one most likely isolated from OS interrupts.
fn pin_to_last_core() {
    if let Some(core_ids) = core_affinity::get_core_ids() {
        if let Some(last_core) = core_ids.last() {
            core_affinity::set_for_current(*last_core);
        }
    }
}
