//! Shared environment configuration for the raffle binaries.
//!
//! | Variable | Effect | Default |
//! |---|---|---|
//! | `RAFFLE_LOG` | `tracing` filter directives | `info` |
//! | `RAYON_NUM_THREADS` / `OMP_NUM_THREADS` | sweep thread pool size | 8 |
//! | `RAFFLE_MAX_ODDS_BUCKETS` | [`Limits::max_odds_buckets`] | `MAX_ODDS_BUCKETS` |
//! | `RAFFLE_MAX_TICKETS` | [`Limits::max_tickets`] | `MAX_TICKETS` |
//! | `RAFFLE_MAX_PRIZES` | [`Limits::max_prizes`] | `MAX_PRIZES` |
//! | `RAFFLE_MAX_NODES` | [`Limits::max_nodes`] | `MAX_DISTRIBUTION_NODES` |
//! | `RAFFLE_MAX_DISTRIBUTIONS` | [`Limits::max_distributions`] | `MAX_DISTRIBUTIONS` |
//! | `RAFFLE_MAX_CUMULATIVE_ROWS` | [`Limits::max_cumulative_rows`] | `MAX_CUMULATIVE_ROWS` |
//!
//! Unparseable values fall back to the default. Arena sizes are capped at
//! `MAX_ARENA_SLOTS`.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::constants::MAX_ARENA_SLOTS;
use crate::types::Limits;

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// [`Limits::default`] with every `RAFFLE_MAX_*` override applied.
pub fn limits_from_env() -> Limits {
    let d = Limits::default();
    Limits {
        max_odds_buckets: env_or("RAFFLE_MAX_ODDS_BUCKETS", d.max_odds_buckets),
        max_tickets: env_or("RAFFLE_MAX_TICKETS", d.max_tickets),
        max_prizes: env_or("RAFFLE_MAX_PRIZES", d.max_prizes),
        max_nodes: env_or("RAFFLE_MAX_NODES", d.max_nodes).min(MAX_ARENA_SLOTS),
        max_distributions: env_or("RAFFLE_MAX_DISTRIBUTIONS", d.max_distributions)
            .min(MAX_ARENA_SLOTS),
        max_cumulative_rows: env_or("RAFFLE_MAX_CUMULATIVE_ROWS", d.max_cumulative_rows),
    }
}

fn rayon_threads() -> usize {
    std::env::var("RAYON_NUM_THREADS")
        .or_else(|_| std::env::var("OMP_NUM_THREADS"))
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8)
}

/// Read `RAYON_NUM_THREADS` (fallback `OMP_NUM_THREADS`, default 8).
/// Builds the rayon global thread pool. Returns thread count.
///
/// # Panics
///
/// Panics if the global pool was already built.
pub fn init_rayon_threads() -> usize {
    let num_threads = rayon_threads();
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .expect("rayon global pool already initialised");
    println!("Rayon threads: {}", num_threads);
    num_threads
}

/// Install a `fmt` subscriber filtered by `RAFFLE_LOG` (default `info`).
///
/// Logs go to stderr so that reports and JSON on stdout stay clean. Calling
/// this twice is harmless; the second call is ignored.
pub fn init_tracing() {
    let filter = std::env::var("RAFFLE_LOG")
        .ok()
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
