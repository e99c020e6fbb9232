//! Sparse probability distributions: accumulated value → probability mass.
//!
//! A distribution is a [`LinkedMapPool`] map specialised to `u64` keys and
//! `f64` masses. Keys are unique and iterate in ascending order, which the
//! aggregator's early-exit pruning and the cumulative extractor both rely on.
//!
//! All distributions of one computation share a [`DistributionStore`]; each
//! [`DistId`] must be released exactly once when it is no longer needed.

use crate::error::{RaffleError, Result};
use crate::linked_map::{LinkedMapPool, MapId};
use crate::types::Limits;

pub type DistributionStore = LinkedMapPool<u64, f64>;

/// Handle to a live distribution of a [`DistributionStore`].
pub type DistId = MapId;

impl LinkedMapPool<u64, f64> {
    pub fn with_limits(limits: &Limits) -> Self {
        Self::new(limits.max_distributions, limits.max_nodes)
    }

    /// The unit distribution `{0: 1.0}`.
    pub fn unit(&mut self) -> Result<DistId> {
        self.from_entries(&[(0, 1.0)])
    }

    /// Build a distribution from `(value, probability)` pairs in any order.
    /// Repeated values are summed.
    pub fn from_entries(&mut self, entries: &[(u64, f64)]) -> Result<DistId> {
        let dist = self.create()?;
        for &(value, p) in entries {
            if let Err(err) = self.accumulate(dist, value, p) {
                self.release(dist)?;
                return Err(err);
            }
        }
        Ok(dist)
    }

    /// Independent copy of `dist`.
    pub fn duplicate(&mut self, dist: DistId) -> Result<DistId> {
        let copy = self.create()?;
        let mut walk = self.walk(dist)?;
        while let Some((value, p)) = self.step(&mut walk) {
            if let Err(err) = self.accumulate(copy, value, p) {
                self.release(copy)?;
                return Err(err);
            }
        }
        Ok(copy)
    }

    pub fn to_vec(&self, dist: DistId) -> Result<Vec<(u64, f64)>> {
        Ok(self.iter(dist)?.collect())
    }

    /// Sum of all stored masses.
    pub fn total_mass(&self, dist: DistId) -> Result<f64> {
        Ok(self.iter(dist)?.map(|(_, p)| p).sum())
    }
}

/// `base + steps · value`, rejecting accumulated values that overflow `u64`.
pub(crate) fn offset_key(base: u64, steps: u64, value: u64) -> Result<u64> {
    steps
        .checked_mul(value)
        .and_then(|shift| base.checked_add(shift))
        .ok_or_else(|| {
            RaffleError::InvalidInput(format!(
                "accumulated value overflows u64 ({base} + {steps} × {value})"
            ))
        })
}
