//! # Raffle: exact winnings distributions for draws without replacement
//!
//! Given a population split into prize tiers (`count` members each carrying a
//! `value`), computes the distribution of the total value won by someone
//! holding `T` tickets, i.e. drawing `T` members without replacement.
//!
//! ## Pipeline
//!
//! | Stage | Rust module | Description |
//! |-------|-------------|-------------|
//! | 0 | [`ln_factorial`] | Cached ln(n!): exact for n ≤ 256, Stirling's series beyond |
//! | 1 | [`odds`] | Hypergeometric pmf slices via one log-factorial evaluation plus a ratio recurrence |
//! | 2 | [`aggregator`] | Per-tier dynamic program over "k tickets matched so far" buckets, with peak-outward pruning |
//! | 3 | [`cumulative`] | Normalised cumulative table and queries (p_below, percentiles, moments) |
//!
//! [`algebra`] is the independent path for tickets that are statistically
//! independent (separate raffles): convolution, binary-exponentiation power
//! and weighted mixtures.
//!
//! ## Storage
//!
//! Distributions are sorted linked maps ([`linked_map`]) whose nodes and
//! headers live in fixed-capacity generation-checked arenas ([`arena`]).
//! Nothing grows past its configured [`types::Limits`]; running out is a
//! recoverable [`error::RaffleError::CapacityExceeded`], and a failed
//! operation leaves the store exactly as it found it.
//!
//! One [`engine::Engine`] owns one set of arenas. It is not shared between
//! threads; parallel callers build one engine each.
//!
//! ## Pruning
//!
//! A cutoff `p` drops source entries with mass `<= p` and contributions
//! `<= p²` in the aggregator, and products `<= p` in the algebra. `p = 0`
//! keeps every non-zero term. Lost mass is reported as
//! [`cumulative::CumulativeDistribution::total_probability`].

pub mod aggregator;
pub mod algebra;
pub mod arena;
pub mod constants;
pub mod cumulative;
pub mod distribution;
pub mod engine;
pub mod env_config;
pub mod error;
pub mod linked_map;
pub mod ln_factorial;
pub mod odds;
pub mod prizes;
pub mod simulation;
pub mod types;

pub use engine::Engine;
pub use error::{RaffleError, Result};
pub use types::{Limits, Prize};
