//! Capacity defaults and numeric thresholds.
//!
//! Every structure in the crate has a hard ceiling. These are the defaults
//! used by [`crate::types::Limits::default`]; each can be overridden at run
//! time through [`crate::env_config::limits_from_env`].
//!
//! | Constant | Bounds |
//! |---|---|
//! | [`MAX_ODDS_BUCKETS`] | width of one hypergeometric pmf slice |
//! | [`MAX_TICKETS`] | tickets per aggregate run (one bucket per ticket count + 1) |
//! | [`MAX_PRIZES`] | prize tiers in a [`crate::prizes::PrizeList`] |
//! | [`MAX_DISTRIBUTION_NODES`] | `(value, probability)` nodes shared by all live distributions |
//! | [`MAX_DISTRIBUTIONS`] | live distribution headers |
//! | [`MAX_CUMULATIVE_ROWS`] | rows of one extracted cumulative table |

/// ln(n!) is summed exactly for n < EXACT_LNF_COUNT (so 256! is exact).
pub const EXACT_LNF_COUNT: usize = 257;

/// ln(n!) is cached for n < CACHE_LNF_COUNT; beyond it Stirling is evaluated per query.
pub const CACHE_LNF_COUNT: usize = 262_144;

/// 0.5 * ln(2π), the constant term of Stirling's series.
pub const HALF_LN_TWO_PI: f64 = 0.918_938_533_204_672_8;

/// Maximum width of one odds table.
pub const MAX_ODDS_BUCKETS: usize = 4096;

/// Maximum ticket count for one aggregate run. One less than the bucket
/// width so that a full `0..=tickets` odds table always fits.
pub const MAX_TICKETS: u64 = (MAX_ODDS_BUCKETS - 1) as u64;

/// Maximum number of prize tiers.
pub const MAX_PRIZES: usize = 256;

/// Node slots shared by every distribution of one store.
pub const MAX_DISTRIBUTION_NODES: usize = 1 << 22;

/// Distribution header slots of one store.
pub const MAX_DISTRIBUTIONS: usize = 8192;

/// Upper bound for either arena capacity; slot indices are 32-bit.
pub const MAX_ARENA_SLOTS: usize = u32::MAX as usize;

/// Maximum rows in one cumulative table.
pub const MAX_CUMULATIVE_ROWS: usize = 1 << 20;

/// Default pruning cutoff: keep everything.
pub const DEFAULT_P_CUTOFF: f64 = 0.0;

/// Retained mass below `1 - LOW_MASS_WARNING` after pruning is logged as a warning.
pub const LOW_MASS_WARNING: f64 = 1e-3;

/// Percentiles reported by [`crate::cumulative::CumulativeDistribution::summary`].
pub const SUMMARY_PERCENTILES: [u32; 9] = [1, 5, 10, 25, 50, 75, 90, 95, 99];
