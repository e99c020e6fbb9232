//! Prize tiers: the bounded tier list fed to the aggregator, and the
//! [`Raffle`] builder that normalises a user-facing prize description.
//!
//! ## Normalisation
//!
//! | Step | Rule |
//! |------|------|
//! | merge | tiers with equal value are combined, counts summed |
//! | fill | with an audience, the members without a prize become a value-0 tier |
//! | order | rarest first: ascending count, ties by ascending value |
//!
//! Processing rare tiers first keeps the early pmf slices narrow; the common
//! tier last takes the cheap final-odds path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_P_CUTOFF, MAX_PRIZES};
use crate::cumulative::CumulativeDistribution;
use crate::engine::Engine;
use crate::error::{RaffleError, Result};
use crate::types::{Prize, Resource};

/// Ordered prize tiers with a fixed capacity.
#[derive(Clone, Debug)]
pub struct PrizeList {
    max_prizes: usize,
    tiers: Vec<Prize>,
}

impl Default for PrizeList {
    fn default() -> Self {
        Self::new(MAX_PRIZES)
    }
}

impl PrizeList {
    pub fn new(max_prizes: usize) -> Self {
        Self {
            max_prizes,
            tiers: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.tiers.clear();
    }

    /// Append a tier.
    pub fn add(&mut self, count: u64, value: u64) -> Result<()> {
        if self.tiers.len() >= self.max_prizes {
            return Err(RaffleError::capacity(
                Resource::Prizes,
                self.tiers.len() + 1,
                self.max_prizes,
            ));
        }
        self.tiers.push(Prize::new(count, value));
        Ok(())
    }

    pub fn as_slice(&self) -> &[Prize] {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Sum of all tier counts.
    pub fn population(&self) -> u64 {
        population(&self.tiers)
    }
}

pub(crate) fn population(tiers: &[Prize]) -> u64 {
    tiers.iter().fold(0u64, |acc, t| acc.saturating_add(t.count))
}

/// A raffle definition: what is on offer, among how many entrants.
///
/// Deserialising goes through [`Raffle::new`], so a definition read from JSON
/// is normalised and validated like one built in code.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RaffleDefinition")]
pub struct Raffle {
    audience: u64,
    tiers: Vec<Prize>,
    p_cutoff: f64,
}

/// Serialised form of a [`Raffle`] before normalisation.
#[derive(Deserialize)]
struct RaffleDefinition {
    audience: Option<u64>,
    #[serde(alias = "prizes")]
    tiers: Vec<Prize>,
    #[serde(default = "default_p_cutoff")]
    p_cutoff: f64,
}

fn default_p_cutoff() -> f64 {
    DEFAULT_P_CUTOFF
}

impl TryFrom<RaffleDefinition> for Raffle {
    type Error = RaffleError;

    fn try_from(def: RaffleDefinition) -> Result<Self> {
        Ok(Raffle::new(def.audience, &def.tiers)?.with_cutoff(def.p_cutoff))
    }
}

impl Raffle {
    /// Normalise `prizes` into processing order.
    ///
    /// Without an `audience` the population is the total prize count, i.e.
    /// every entrant wins something.
    pub fn new(audience: Option<u64>, prizes: &[Prize]) -> Result<Self> {
        let mut by_value: BTreeMap<u64, u64> = BTreeMap::new();
        let mut prize_count: u64 = 0;
        for prize in prizes {
            if prize.count > 0 {
                *by_value.entry(prize.value).or_default() += prize.count;
            }
            prize_count = prize_count
                .checked_add(prize.count)
                .ok_or_else(|| RaffleError::InvalidInput("prize count overflows".into()))?;
        }

        let audience = match audience {
            None => prize_count,
            Some(audience) if audience < prize_count => {
                return Err(RaffleError::InvalidInput(format!(
                    "too many prizes ({prize_count}) for audience of {audience}"
                )));
            }
            Some(audience) => {
                if audience > prize_count {
                    *by_value.entry(0).or_default() += audience - prize_count;
                }
                audience
            }
        };

        // BTreeMap yields ascending values, so a stable sort by count breaks ties by value.
        let mut tiers: Vec<Prize> = by_value
            .into_iter()
            .map(|(value, count)| Prize::new(count, value))
            .collect();
        tiers.sort_by_key(|t| t.count);

        Ok(Self {
            audience,
            tiers,
            p_cutoff: DEFAULT_P_CUTOFF,
        })
    }

    /// Pruning cutoff used by [`Self::enter`].
    pub fn with_cutoff(mut self, p_cutoff: f64) -> Self {
        self.p_cutoff = p_cutoff;
        self
    }

    pub fn audience(&self) -> u64 {
        self.audience
    }

    /// Tiers in processing order.
    pub fn prizes(&self) -> &[Prize] {
        &self.tiers
    }

    pub fn p_cutoff(&self) -> f64 {
        self.p_cutoff
    }

    /// Load the tiers into `engine` and compute the winnings of holding `tickets` tickets.
    pub fn enter(&self, engine: &mut Engine, tickets: u64) -> Result<CumulativeDistribution> {
        if tickets > self.audience {
            return Err(RaffleError::InvalidInput(format!(
                "ticket count {tickets} exceeds audience of {}",
                self.audience
            )));
        }
        engine.reset_prizes();
        for tier in &self.tiers {
            engine.add_prize(tier.count, tier.value)?;
        }
        engine.calculate_cumulative_probability_map(tickets, self.p_cutoff)
    }
}
