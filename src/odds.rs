//! Hypergeometric odds tables.
//!
//! For a population of `total` members of which `targets` are marked, the
//! probability that `samples` draws without replacement hit exactly `n`
//! marked members is
//!
//! ```text
//!            C(targets, n) · C(total − targets, samples − n)
//! P(n)  =   ------------------------------------------------
//!                          C(total, samples)
//! ```
//!
//! Only the mode is computed through [`ln_factorial`]; the values above it
//! come from the ratio
//!
//! ```text
//! P(n+1) / P(n) = (targets − n)(samples − n) / ((n + 1 − B)(n + 1)),   B = targets + samples − total
//! ```
//!
//! and the values below it from its inverse. This needs one multiply and one
//! divide per entry and keeps the relative error flat across long supports.
//! Starting at the mode means any value too small for an `f64` lies in a
//! tail, never at the start of the recurrence.
//!
//! Degenerate inputs never reach the logarithms: no samples or no targets is a
//! point mass at 0, a fully marked population is a point mass at `samples`,
//! and a single sample is a Bernoulli trial.

use crate::constants::MAX_ODDS_BUCKETS;
use crate::error::{RaffleError, Result};
use crate::ln_factorial::ln_factorial;
use crate::types::Resource;

/// A pmf over successes `start..start + len()`. Values outside that range are zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Odds {
    start: usize,
    values: Vec<f64>,
}

impl Odds {
    /// First success count covered by [`Self::values`].
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// P(n), zero outside the stored range.
    pub fn get(&self, n: usize) -> f64 {
        n.checked_sub(self.start)
            .and_then(|i| self.values.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Index into [`Self::values`] of the mode.
    ///
    /// The pmf is unimodal, so this is the entry before the first decrease.
    pub fn peak(&self) -> usize {
        let mut previous = 0.0;
        for (i, &v) in self.values.iter().enumerate() {
            if v < previous {
                return i - 1;
            }
            previous = v;
        }
        self.values.len().saturating_sub(1)
    }
}

/// Odds generator with a reusable output buffer and a fixed bucket capacity.
///
/// Each call overwrites the previous result; callers that need to keep a
/// table clone it or use the owning [`calculate_odds`] functions.
#[derive(Clone, Debug)]
pub struct OddsTable {
    max_buckets: usize,
    odds: Odds,
}

impl Default for OddsTable {
    fn default() -> Self {
        Self::new(MAX_ODDS_BUCKETS)
    }
}

impl OddsTable {
    pub fn new(max_buckets: usize) -> Self {
        Self {
            max_buckets,
            odds: Odds {
                start: 0,
                values: Vec::with_capacity(max_buckets),
            },
        }
    }

    pub fn max_buckets(&self) -> usize {
        self.max_buckets
    }

    /// The pmf restricted to its true support
    /// `[max(0, targets + samples − total), min(targets, samples)]`.
    pub fn generate_core(&mut self, total: u64, targets: u64, samples: u64) -> Result<&Odds> {
        check_domain(total, targets, samples)?;
        let values = &mut self.odds.values;
        values.clear();

        if samples == 0 || targets == 0 {
            self.odds.start = 0;
            values.push(1.0);
            return Ok(&self.odds);
        }
        if targets == total {
            check_width(1, self.max_buckets)?;
            self.odds.start = samples as usize;
            values.push(1.0);
            return Ok(&self.odds);
        }
        if samples == 1 {
            check_width(2, self.max_buckets)?;
            let p = targets as f64 / total as f64;
            self.odds.start = 0;
            values.push(1.0 - p);
            values.push(p);
            return Ok(&self.odds);
        }

        let b = targets as i128 + samples as i128 - total as i128;
        let begin = b.max(0) as u64;
        let limit = targets.min(samples) + 1;
        let width = (limit - begin) as usize;
        check_width(width, self.max_buckets)?;

        let mode = hypergeometric_mode(total, targets, samples).clamp(begin, limit - 1);
        values.resize(width, 0.0);
        values[(mode - begin) as usize] = ln_pmf(total, targets, samples, mode).exp();

        let ratio = |n: u64| {
            let up = (targets - n) as f64 * (samples - n) as f64;
            let down = (n as i128 + 1 - b) as f64 * (n + 1) as f64;
            up / down
        };
        for n in mode..limit - 1 {
            let i = (n - begin) as usize;
            values[i + 1] = values[i] * ratio(n);
        }
        for n in (begin..mode).rev() {
            let i = (n - begin) as usize;
            values[i] = values[i + 1] / ratio(n);
        }
        self.odds.start = begin as usize;
        Ok(&self.odds)
    }

    /// The pmf over every success count `0..=samples`, zero-padded outside the support.
    pub fn generate(&mut self, total: u64, targets: u64, samples: u64) -> Result<&Odds> {
        let width = usize::try_from(samples)
            .ok()
            .and_then(|s| s.checked_add(1))
            .unwrap_or(usize::MAX);
        check_width(width, self.max_buckets)?;
        self.generate_core(total, targets, samples)?;

        let start = self.odds.start;
        let values = &mut self.odds.values;
        if start > 0 {
            values.splice(0..0, std::iter::repeat(0.0).take(start));
        }
        values.resize(width, 0.0);
        self.odds.start = 0;
        Ok(&self.odds)
    }
}

/// ⌊(targets + 1)(samples + 1) / (total + 2)⌋, the most likely success count.
fn hypergeometric_mode(total: u64, targets: u64, samples: u64) -> u64 {
    let m = (targets as u128 + 1) * (samples as u128 + 1) / (total as u128 + 2);
    m as u64
}

/// ln P(n) from the closed form; `n` must lie in the support.
fn ln_pmf(total: u64, targets: u64, samples: u64, n: u64) -> f64 {
    ln_choose(targets, n) + ln_choose(total - targets, samples - n) - ln_choose(total, samples)
}

fn ln_choose(n: u64, k: u64) -> f64 {
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

fn check_domain(total: u64, targets: u64, samples: u64) -> Result<()> {
    if targets > total || samples > total {
        return Err(RaffleError::InvalidInput(format!(
            "odds need targets ({targets}) and samples ({samples}) within total ({total})"
        )));
    }
    Ok(())
}

fn check_width(width: usize, max_buckets: usize) -> Result<()> {
    if width > max_buckets {
        return Err(RaffleError::capacity(
            Resource::OddsBuckets,
            width,
            max_buckets,
        ));
    }
    Ok(())
}

/// Owned, zero-padded pmf over `0..=samples` with the default bucket capacity.
pub fn calculate_odds(total: u64, targets: u64, samples: u64) -> Result<Odds> {
    let mut table = OddsTable::default();
    table.generate(total, targets, samples)?;
    Ok(table.odds)
}

/// Owned pmf over the true support only.
pub fn calculate_odds_core(total: u64, targets: u64, samples: u64) -> Result<Odds> {
    let mut table = OddsTable::default();
    table.generate_core(total, targets, samples)?;
    Ok(table.odds)
}

/// P(n = samples): every draw hits a target. No table is built.
///
/// Impossible outcomes (`samples > targets`, or arguments outside the
/// population) give 0.
pub fn calculate_final_odds(total: u64, targets: u64, samples: u64) -> f64 {
    if samples > targets || targets > total {
        0.0
    } else if samples == 0 || targets == total {
        1.0
    } else if samples == 1 {
        targets as f64 / total as f64
    } else {
        (ln_factorial(total - samples) - ln_factorial(total) + ln_factorial(targets)
            - ln_factorial(targets - samples))
        .exp()
    }
}
