//! Joint prize distribution for a holder of several tickets.
//!
//! ## Dynamic program
//!
//! `buckets[k]` is the distribution of accumulated value given that exactly
//! `k` of the `T` tickets have been matched to the tiers processed so far.
//! It starts as `buckets[0] = {0: 1}` with every other bucket empty.
//!
//! For every tier but the last, with `remaining` members still undrawn:
//!
//! ```text
//! for n in T-1 ..= 0:                         // high to low: targets n+d >= n are already final
//!     slice = hypergeometric(remaining, tier.count, T - n)
//!     for (key, p) in old buckets[n], for d in slice (peak outward):
//!         buckets[n + d][key + d · tier.value] += p · slice[d]
//! ```
//!
//! Each scan from the peak stops at the first contribution `<= cutoff²`; the
//! pmf is unimodal, so nothing further out can be larger.
//!
//! The last tier must absorb every ticket still unmatched, so only
//! `d = T - n` matters and its probability comes from
//! [`calculate_final_odds`] directly, folded into `buckets[T]`.

use std::time::Instant;

use tracing::{debug, info};

use crate::distribution::{offset_key, DistId, DistributionStore};
use crate::error::{RaffleError, Result};
use crate::odds::{calculate_final_odds, Odds, OddsTable};
use crate::types::{Prize, Resource};

/// Distribution of total winnings over `tickets` tickets, tiers processed in the given order.
///
/// The caller owns the returned handle. On error every bucket allocated here
/// has been released again.
pub fn calculate_probability_map(
    store: &mut DistributionStore,
    odds: &mut OddsTable,
    prizes: &[Prize],
    tickets: u64,
    cutoff: f64,
    max_tickets: u64,
) -> Result<DistId> {
    let Some((last, leading)) = prizes.split_last() else {
        return Err(RaffleError::InvalidInput("no prize tiers".into()));
    };
    if tickets > max_tickets {
        return Err(RaffleError::capacity(
            Resource::Tickets,
            usize::try_from(tickets).unwrap_or(usize::MAX),
            usize::try_from(max_tickets).unwrap_or(usize::MAX),
        ));
    }
    let population = prizes
        .iter()
        .try_fold(0u64, |acc, p| acc.checked_add(p.count))
        .ok_or_else(|| RaffleError::InvalidInput("population overflows u64".into()))?;
    if tickets > population {
        return Err(RaffleError::InvalidInput(format!(
            "{tickets} tickets drawn from a population of {population}"
        )));
    }

    let started = Instant::now();
    let mut buckets = Vec::with_capacity(tickets as usize + 1);
    if let Err(err) = run_tiers(store, odds, &mut buckets, leading, last, population, tickets, cutoff) {
        for &bucket in &buckets {
            let _ = store.release(bucket);
        }
        return Err(err);
    }

    let (&terminal, spent) = buckets
        .split_last()
        .ok_or_else(|| RaffleError::InvalidInput("no ticket buckets".into()))?;
    for &bucket in spent {
        store.release(bucket)?;
    }

    info!(
        tickets,
        tiers = prizes.len(),
        entries = store.len(terminal)?,
        mass = store.total_mass(terminal)?,
        elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
        "probability map computed"
    );
    Ok(terminal)
}

#[allow(clippy::too_many_arguments)]
fn run_tiers(
    store: &mut DistributionStore,
    odds: &mut OddsTable,
    buckets: &mut Vec<DistId>,
    leading: &[Prize],
    last: &Prize,
    population: u64,
    tickets: u64,
    cutoff: f64,
) -> Result<()> {
    for _ in 0..=tickets {
        buckets.push(store.create()?);
    }
    store.accumulate(buckets[0], 0, 1.0)?;

    let mut remaining = population;
    for (tier, prize) in leading.iter().enumerate() {
        let t0 = Instant::now();
        apply_tier(store, odds, buckets, remaining, prize, cutoff)?;
        remaining -= prize.count;
        debug!(
            tier,
            count = prize.count,
            value = prize.value,
            live_nodes = store.live_nodes(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1e3,
            "prize tier applied"
        );
    }

    let t0 = Instant::now();
    apply_final_tier(store, buckets, remaining, last)?;
    debug!(
        tier = leading.len(),
        count = last.count,
        value = last.value,
        live_nodes = store.live_nodes(),
        elapsed_ms = t0.elapsed().as_secs_f64() * 1e3,
        "final prize tier applied"
    );
    Ok(())
}

fn apply_tier(
    store: &mut DistributionStore,
    odds: &mut OddsTable,
    buckets: &mut [DistId],
    remaining: u64,
    prize: &Prize,
    cutoff: f64,
) -> Result<()> {
    let tickets = buckets.len() - 1;
    for n in (0..tickets).rev() {
        if store.is_empty(buckets[n])? {
            continue;
        }
        let slice = odds.generate_core(remaining, prize.count, (tickets - n) as u64)?;

        let fresh = store.create()?;
        let previous = std::mem::replace(&mut buckets[n], fresh);
        let spread = spread_bucket(store, previous, slice, &buckets[n..], prize.value, cutoff);
        store.release(previous)?;
        spread?;
    }
    Ok(())
}

/// Fold one source bucket through a pmf slice. `targets[d]` receives the
/// mass of `d` additional matches.
fn spread_bucket(
    store: &mut DistributionStore,
    source: DistId,
    slice: &Odds,
    targets: &[DistId],
    value: u64,
    cutoff: f64,
) -> Result<()> {
    let cutoff_sq = cutoff * cutoff;
    let start = slice.start();
    let values = slice.values();
    let (rising, falling) = values.split_at((slice.peak() + 1).min(values.len()));

    let mut walk = store.walk(source)?;
    while let Some((key, p)) = store.step(&mut walk) {
        if p <= cutoff {
            continue;
        }
        for (i, &q) in rising.iter().enumerate().rev() {
            let pp = p * q;
            if pp <= cutoff_sq {
                break;
            }
            let d = start + i;
            store.accumulate(targets[d], offset_key(key, d as u64, value)?, pp)?;
        }
        for (i, &q) in falling.iter().enumerate() {
            let pp = p * q;
            if pp <= cutoff_sq {
                break;
            }
            let d = start + rising.len() + i;
            store.accumulate(targets[d], offset_key(key, d as u64, value)?, pp)?;
        }
    }
    Ok(())
}

fn apply_final_tier(
    store: &mut DistributionStore,
    buckets: &[DistId],
    remaining: u64,
    prize: &Prize,
) -> Result<()> {
    let tickets = buckets.len() - 1;
    let terminal = buckets[tickets];
    for n in (0..tickets).rev() {
        let source = buckets[n];
        if store.is_empty(source)? {
            continue;
        }
        let drawn = (tickets - n) as u64;
        let odds = calculate_final_odds(remaining, prize.count, drawn);
        if odds <= 0.0 {
            continue;
        }
        let mut walk = store.walk(source)?;
        while let Some((key, p)) = store.step(&mut walk) {
            if p > 0.0 {
                store.accumulate(terminal, offset_key(key, drawn, prize.value)?, p * odds)?;
            }
        }
    }
    Ok(())
}
