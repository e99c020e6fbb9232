//! Monte-Carlo raffle simulation, used to cross-check the exact engine.
//!
//! Each game draws `tickets` members without replacement from the population
//! described by the prize tiers and sums the values they carry. Members are
//! never materialised: a draw picks a uniform index into the members still in
//! the pot and walks the per-tier counts to find its tier.
//!
//! Games run in parallel; game `i` uses `SmallRng::seed_from_u64(seed + i)`,
//! so results are reproducible for a given seed regardless of thread count.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{RaffleError, Result};
use crate::prizes::population;
use crate::types::Prize;

/// Empirical winnings distribution of a batch of simulated games.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationResult {
    /// `(value, share of games)`, ascending by value.
    pub frequencies: Vec<(u64, f64)>,
    pub games: usize,
    pub mean: f64,
    pub std_dev: f64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SimulationResult {
    /// Observed share of games that won exactly `value`.
    pub fn frequency(&self, value: u64) -> f64 {
        self.frequencies
            .binary_search_by_key(&value, |&(v, _)| v)
            .map(|i| self.frequencies[i].1)
            .unwrap_or(0.0)
    }
}

/// Play one raffle: total value won by `tickets` tickets.
pub fn simulate_game(prizes: &[Prize], tickets: u64, rng: &mut SmallRng) -> u64 {
    let mut left: Vec<u64> = prizes.iter().map(|p| p.count).collect();
    let mut in_pot = population(prizes);
    let mut total = 0u64;
    for _ in 0..tickets.min(in_pot) {
        let mut pick = rng.random_range(0..in_pot);
        for (tier, count) in prizes.iter().zip(left.iter_mut()) {
            if pick < *count {
                *count -= 1;
                total = total.saturating_add(tier.value);
                break;
            }
            pick -= *count;
        }
        in_pot -= 1;
    }
    total
}

/// Simulate `games` raffles in parallel.
pub fn simulate_raffle(
    prizes: &[Prize],
    tickets: u64,
    games: usize,
    seed: u64,
) -> Result<SimulationResult> {
    let members = population(prizes);
    if tickets > members {
        return Err(RaffleError::InvalidInput(format!(
            "{tickets} tickets drawn from a population of {members}"
        )));
    }
    if games == 0 {
        return Err(RaffleError::InvalidInput("simulation needs at least one game".into()));
    }

    let start = Instant::now();
    let totals: Vec<u64> = (0..games)
        .into_par_iter()
        .map(|i| {
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(i as u64));
            simulate_game(prizes, tickets, &mut rng)
        })
        .collect();
    let elapsed = start.elapsed();

    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    for &t in &totals {
        *counts.entry(t).or_default() += 1;
    }
    let n = games as f64;
    let frequencies: Vec<(u64, f64)> = counts
        .into_iter()
        .map(|(value, c)| (value, c as f64 / n))
        .collect();

    let mean = totals.iter().map(|&t| t as f64).sum::<f64>() / n;
    let variance = totals
        .iter()
        .map(|&t| (t as f64 - mean).powi(2))
        .sum::<f64>()
        / n;

    Ok(SimulationResult {
        frequencies,
        games,
        mean,
        std_dev: variance.sqrt(),
        elapsed,
    })
}
