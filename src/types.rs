//! Core value types shared across modules: prize tiers, capacity limits and
//! the resource tags used in capacity errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// One prize tier: `count` members of the population each carry `value`.
///
/// A tier with `value == 0` models the non-winning remainder of the audience.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prize {
    pub count: u64,
    pub value: u64,
}

impl Prize {
    pub fn new(count: u64, value: u64) -> Self {
        Self { count, value }
    }
}

/// Runtime capacities of one [`crate::engine::Engine`].
///
/// Every field is a hard ceiling; exceeding one fails the operation with
/// [`crate::error::RaffleError::CapacityExceeded`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Width of one odds table.
    pub max_odds_buckets: usize,
    /// Tickets per aggregate run.
    pub max_tickets: u64,
    /// Prize tiers per list.
    pub max_prizes: usize,
    /// Distribution nodes shared by all live distributions.
    pub max_nodes: usize,
    /// Live distributions.
    pub max_distributions: usize,
    /// Rows per cumulative table.
    pub max_cumulative_rows: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_odds_buckets: MAX_ODDS_BUCKETS,
            max_tickets: MAX_TICKETS,
            max_prizes: MAX_PRIZES,
            max_nodes: MAX_DISTRIBUTION_NODES,
            max_distributions: MAX_DISTRIBUTIONS,
            max_cumulative_rows: MAX_CUMULATIVE_ROWS,
        }
    }
}

/// A bounded resource named in a capacity error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    OddsBuckets,
    Tickets,
    Prizes,
    DistributionNodes,
    Distributions,
    CumulativeRows,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::OddsBuckets => "odds buckets",
            Resource::Tickets => "tickets",
            Resource::Prizes => "prize tiers",
            Resource::DistributionNodes => "distribution nodes",
            Resource::Distributions => "distributions",
            Resource::CumulativeRows => "cumulative rows",
        };
        f.write_str(name)
    }
}
