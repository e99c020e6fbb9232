//! The engine: one owned set of arenas, odds buffer and prize list.
//!
//! Every boundary operation is a method here. An `Engine` is single-threaded;
//! concurrent computations each build their own (see the `raffle_sweep`
//! binary), so nothing is shared between threads except the immutable
//! ln-factorial table.
//!
//! Distribution handles returned by the engine belong to the caller, who
//! releases each distinct handle once with [`Engine::release_distribution`].

use tracing::warn;

use crate::aggregator;
use crate::algebra::{self, CompoundPart};
use crate::constants::LOW_MASS_WARNING;
use crate::cumulative::{self, CumulativeDistribution};
use crate::distribution::{DistId, DistributionStore};
use crate::error::Result;
use crate::odds::{self, OddsTable};
use crate::prizes::PrizeList;
use crate::types::{Limits, Prize};

#[derive(Debug)]
pub struct Engine {
    limits: Limits,
    store: DistributionStore,
    odds: OddsTable,
    prizes: PrizeList,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Engine {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            store: DistributionStore::with_limits(&limits),
            odds: OddsTable::new(limits.max_odds_buckets),
            prizes: PrizeList::new(limits.max_prizes),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn store(&self) -> &DistributionStore {
        &self.store
    }

    /// Direct store access, e.g. to build input distributions for the algebra.
    pub fn store_mut(&mut self) -> &mut DistributionStore {
        &mut self.store
    }

    // ── Prize tiers ─────────────────────────────────────────────────────

    pub fn reset_prizes(&mut self) {
        self.prizes.reset();
    }

    pub fn add_prize(&mut self, count: u64, value: u64) -> Result<()> {
        self.prizes.add(count, value)
    }

    pub fn prizes(&self) -> &[Prize] {
        self.prizes.as_slice()
    }

    // ── Odds ────────────────────────────────────────────────────────────

    /// Zero-padded pmf over `0..=samples`.
    pub fn calculate_odds(&mut self, total: u64, targets: u64, samples: u64) -> Result<Vec<f64>> {
        Ok(self.odds.generate(total, targets, samples)?.values().to_vec())
    }

    pub fn calculate_final_odds(&self, total: u64, targets: u64, samples: u64) -> f64 {
        odds::calculate_final_odds(total, targets, samples)
    }

    // ── Aggregation ─────────────────────────────────────────────────────

    /// Joint winnings distribution of `tickets` tickets over `prizes`.
    pub fn calculate_probability_map(
        &mut self,
        prizes: &[Prize],
        tickets: u64,
        cutoff: f64,
    ) -> Result<DistId> {
        aggregator::calculate_probability_map(
            &mut self.store,
            &mut self.odds,
            prizes,
            tickets,
            cutoff,
            self.limits.max_tickets,
        )
    }

    /// Cumulative winnings table of `tickets` tickets over the engine's own prize list.
    ///
    /// The intermediate distribution is released before returning.
    pub fn calculate_cumulative_probability_map(
        &mut self,
        tickets: u64,
        cutoff: f64,
    ) -> Result<CumulativeDistribution> {
        let dist = aggregator::calculate_probability_map(
            &mut self.store,
            &mut self.odds,
            self.prizes.as_slice(),
            tickets,
            cutoff,
            self.limits.max_tickets,
        )?;
        self.extract_and_release(dist, cutoff)
    }

    // ── Cumulative tables ───────────────────────────────────────────────

    pub fn extract_cumulative(&self, dist: DistId, cutoff: f64) -> Result<CumulativeDistribution> {
        let table =
            cumulative::extract_cumulative(&self.store, dist, cutoff, self.limits.max_cumulative_rows)?;
        check_retained_mass(&table);
        Ok(table)
    }

    pub fn extract_distribution(&mut self, table: &CumulativeDistribution) -> Result<DistId> {
        cumulative::extract_distribution(&mut self.store, table)
    }

    fn extract_and_release(&mut self, dist: DistId, cutoff: f64) -> Result<CumulativeDistribution> {
        let extracted = self.extract_cumulative(dist, cutoff);
        self.store.release(dist)?;
        extracted
    }

    // ── Algebra ─────────────────────────────────────────────────────────

    /// Convolution; `None` is the identity and is returned as the other argument.
    pub fn multiply_distribution(
        &mut self,
        a: Option<DistId>,
        b: Option<DistId>,
        cutoff: f64,
    ) -> Result<Option<DistId>> {
        algebra::multiply(&mut self.store, a, b, cutoff)
    }

    /// `exponent`-fold self-convolution. Exponent 1 returns `dist` itself.
    pub fn power_distribution(&mut self, dist: DistId, exponent: u32, cutoff: f64) -> Result<DistId> {
        algebra::power(&mut self.store, dist, exponent, cutoff)
    }

    pub fn compound(&mut self, parts: &[CompoundPart<'_>], cutoff: f64) -> Result<DistId> {
        algebra::compound(&mut self.store, parts, cutoff)
    }

    /// Winnings of `exponent` independent entries into the raffle summarised by `table`.
    pub fn pow_cumulative(
        &mut self,
        table: &CumulativeDistribution,
        exponent: u32,
        cutoff: f64,
    ) -> Result<CumulativeDistribution> {
        let base = self.extract_distribution(table)?;
        let powered = match self.power_distribution(base, exponent, cutoff) {
            Ok(powered) => powered,
            Err(err) => {
                self.store.release(base)?;
                return Err(err);
            }
        };
        if powered != base {
            self.store.release(base)?;
        }
        self.extract_and_release(powered, cutoff)
    }

    pub fn release_distribution(&mut self, dist: DistId) -> Result<()> {
        self.store.release(dist)
    }
}

fn check_retained_mass(table: &CumulativeDistribution) {
    let mass = table.total_probability();
    if mass < 1.0 - LOW_MASS_WARNING {
        warn!(
            mass,
            rows = table.len(),
            "pruning dropped a noticeable share of probability mass"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_from_prize_list() {
        let mut engine = Engine::default();
        engine.add_prize(1, 10).unwrap();
        engine.add_prize(3, 5).unwrap();
        engine.add_prize(4, 0).unwrap();
        let c = engine.calculate_cumulative_probability_map(4, 0.0).unwrap();
        assert_eq!(c.len(), 6);
        assert!((c.exact_probability(10) - 22.0 / 70.0).abs() < 1e-9);
        assert!((c.rows()[5].cumulative - 1.0).abs() < 1e-15);
        assert!((c.total_probability() - 1.0).abs() < 1e-9);
        assert_eq!(engine.store().live_maps(), 0);
        assert_eq!(engine.store().live_nodes(), 0);
    }

    #[test]
    fn test_reset_prizes() {
        let mut engine = Engine::default();
        engine.add_prize(1, 10).unwrap();
        engine.reset_prizes();
        assert!(engine.prizes().is_empty());
        assert!(engine.calculate_cumulative_probability_map(1, 0.0).is_err());
    }

    #[test]
    fn test_calculate_odds_owned() {
        let mut engine = Engine::default();
        let first = engine.calculate_odds(9, 5, 4).unwrap();
        let second = engine.calculate_odds(7, 2, 1).unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 2);
        assert!((first[2] - 60.0 / 126.0).abs() < 1e-9);
    }

    #[test]
    fn test_pow_cumulative() {
        let mut engine = Engine::default();
        engine.add_prize(1, 1).unwrap();
        engine.add_prize(1, 0).unwrap();
        let coin = engine.calculate_cumulative_probability_map(1, 0.0).unwrap();
        let twelve = engine.pow_cumulative(&coin, 12, 0.0).unwrap();
        assert_eq!(twelve.len(), 13);
        assert!((twelve.exact_probability(6) - 924.0 / 4096.0).abs() < 1e-9);

        let same = engine.pow_cumulative(&coin, 1, 0.0).unwrap();
        assert_eq!(same.rows(), coin.rows());
        assert_eq!(engine.store().live_maps(), 0);
    }

    #[test]
    fn test_double_release_is_stale() {
        let mut engine = Engine::default();
        let d = engine
            .calculate_probability_map(&[Prize::new(1, 1), Prize::new(1, 0)], 1, 0.0)
            .unwrap();
        engine.release_distribution(d).unwrap();
        assert_eq!(
            engine.release_distribution(d),
            Err(crate::error::RaffleError::StaleHandle)
        );
    }
}
