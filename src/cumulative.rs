//! Cumulative tables: the normalised, sorted form of a final distribution.
//!
//! [`extract_cumulative`] drops entries at or below the pruning cutoff, then
//! divides every probability and running sum by the retained mass. That
//! corrects pruning loss and floating-point drift in one step, and the last
//! cumulative value comes out as exactly 1.
//!
//! The query methods (`p_below`, `exact_probability`, percentiles, moments)
//! work on the table alone and need no store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::SUMMARY_PERCENTILES;
use crate::distribution::{DistId, DistributionStore};
use crate::error::{RaffleError, Result};
use crate::types::Resource;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CumulativeRow {
    pub value: u64,
    pub probability: f64,
    /// P(v <= value).
    pub cumulative: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeDistribution {
    rows: Vec<CumulativeRow>,
    /// Mass retained before normalisation (1 minus pruning loss and drift).
    total_probability: f64,
}

/// Moments and percentiles of a cumulative table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// Percentile (1, 5, … 99) → smallest value whose cumulative reaches it.
    pub percentiles: BTreeMap<u32, u64>,
    pub total_probability: f64,
}

/// Normalised cumulative table of `dist`, keeping entries with probability above `cutoff`.
pub fn extract_cumulative(
    store: &DistributionStore,
    dist: DistId,
    cutoff: f64,
    max_rows: usize,
) -> Result<CumulativeDistribution> {
    let mut rows = Vec::new();
    let mut running = 0.0;
    for (value, p) in store.iter(dist)? {
        if p <= cutoff {
            continue;
        }
        if rows.len() >= max_rows {
            return Err(RaffleError::capacity(
                Resource::CumulativeRows,
                rows.len() + 1,
                max_rows,
            ));
        }
        running += p;
        rows.push(CumulativeRow {
            value,
            probability: p,
            cumulative: running,
        });
    }

    let total_probability = running;
    if total_probability > 0.0 {
        for row in &mut rows {
            row.probability /= total_probability;
            row.cumulative /= total_probability;
        }
    }
    Ok(CumulativeDistribution {
        rows,
        total_probability,
    })
}

/// Rebuild a distribution from a cumulative table.
///
/// Rows are inserted highest value first so every insert links at the head.
pub fn extract_distribution(
    store: &mut DistributionStore,
    cumulative: &CumulativeDistribution,
) -> Result<DistId> {
    let dist = store.create()?;
    for row in cumulative.rows.iter().rev() {
        if let Err(err) = store.accumulate(dist, row.value, row.probability) {
            store.release(dist)?;
            return Err(err);
        }
    }
    Ok(dist)
}

impl CumulativeDistribution {
    /// Build from already-normalised rows, e.g. read back from JSON.
    pub fn from_rows(rows: Vec<CumulativeRow>, total_probability: f64) -> Self {
        Self {
            rows,
            total_probability,
        }
    }

    pub fn rows(&self) -> &[CumulativeRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_probability(&self) -> f64 {
        self.total_probability
    }

    pub fn min_value(&self) -> Option<u64> {
        self.rows.first().map(|r| r.value)
    }

    pub fn max_value(&self) -> Option<u64> {
        self.rows.last().map(|r| r.value)
    }

    /// P(v < x).
    pub fn p_below(&self, x: u64) -> f64 {
        let below = self.rows.partition_point(|r| r.value < x);
        if below == 0 {
            0.0
        } else if below == self.rows.len() {
            1.0
        } else {
            self.rows[below - 1].cumulative
        }
    }

    /// P(v == x).
    pub fn exact_probability(&self, x: u64) -> f64 {
        self.rows
            .binary_search_by_key(&x, |r| r.value)
            .map(|i| self.rows[i].probability)
            .unwrap_or(0.0)
    }

    /// P(low <= v < high), clamped to [0, 1].
    pub fn range_probability(&self, low: u64, high: u64) -> f64 {
        (self.p_below(high) - self.p_below(low)).clamp(0.0, 1.0)
    }

    pub fn mean(&self) -> f64 {
        self.rows
            .iter()
            .map(|r| r.value as f64 * r.probability)
            .sum()
    }

    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.rows
            .iter()
            .map(|r| (r.value as f64 - mean).powi(2) * r.probability)
            .sum()
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Smallest value whose cumulative probability reaches `q` (0 < q <= 1).
    pub fn percentile(&self, q: f64) -> Option<u64> {
        let i = self.rows.partition_point(|r| r.cumulative < q);
        self.rows
            .get(i)
            .or(self.rows.last())
            .map(|r| r.value)
    }

    pub fn summary(&self) -> Option<DistributionSummary> {
        let min = self.min_value()?;
        let max = self.max_value()?;
        let mean = self.mean();
        let variance = self.variance();

        let mut percentiles = BTreeMap::new();
        for pct in SUMMARY_PERCENTILES {
            if let Some(v) = self.percentile(pct as f64 / 100.0) {
                percentiles.insert(pct, v);
            }
        }

        Some(DistributionSummary {
            min,
            max,
            mean,
            variance,
            std_dev: variance.sqrt(),
            percentiles,
            total_probability: self.total_probability,
        })
    }
}
