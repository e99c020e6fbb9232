//! Distribution algebra: convolution, repeated convolution, weighted mixtures.
//!
//! All operations prune: a product of masses at or below `cutoff` is dropped,
//! trading exactness for bounded size. With `cutoff = 0` only exact zeros are
//! lost.

use crate::cumulative::CumulativeDistribution;
use crate::distribution::{offset_key, DistId, DistributionStore};
use crate::error::Result;

/// Convolution with "no distribution" as identity.
///
/// `multiply(None, b) == b` and `multiply(a, None) == a` return the argument
/// handle itself, not a copy. `multiply(None, None) == None`.
pub fn multiply(
    store: &mut DistributionStore,
    a: Option<DistId>,
    b: Option<DistId>,
    cutoff: f64,
) -> Result<Option<DistId>> {
    match (a, b) {
        (None, b) => Ok(b),
        (a, None) => Ok(a),
        (Some(a), Some(b)) => convolve(store, a, b, cutoff).map(Some),
    }
}

/// Distribution of the sum of independent draws from `a` and `b`. Always a new handle.
pub fn convolve(
    store: &mut DistributionStore,
    a: DistId,
    b: DistId,
    cutoff: f64,
) -> Result<DistId> {
    let out = store.create()?;
    match convolve_into(store, a, b, out, cutoff) {
        Ok(()) => Ok(out),
        Err(err) => {
            store.release(out)?;
            Err(err)
        }
    }
}

fn convolve_into(
    store: &mut DistributionStore,
    a: DistId,
    b: DistId,
    out: DistId,
    cutoff: f64,
) -> Result<()> {
    let mut outer = store.walk(a)?;
    while let Some((ak, ap)) = store.step(&mut outer) {
        let mut inner = store.walk(b)?;
        while let Some((bk, bp)) = store.step(&mut inner) {
            let p = ap * bp;
            if p > cutoff {
                store.accumulate(out, offset_key(ak, 1, bk)?, p)?;
            }
        }
    }
    Ok(())
}

/// `base` convolved with itself `exponent` times, by binary exponentiation.
///
/// - `exponent == 0` gives a new unit distribution `{0: 1.0}`.
/// - `exponent == 1` returns `base` itself (same handle; release it once).
/// - otherwise a new handle; `base` is left untouched and still owned by the caller.
///
/// Intermediate squares and partial products are released as soon as they
/// are superseded, and on error.
pub fn power(
    store: &mut DistributionStore,
    base: DistId,
    exponent: u32,
    cutoff: f64,
) -> Result<DistId> {
    if exponent == 0 {
        return store.unit();
    }
    // Reject a stale handle before any work.
    store.len(base)?;

    let mut state = Power {
        base,
        last: base,
        full: base,
    };
    match state.run(store, exponent, cutoff) {
        Ok(result) => Ok(result),
        Err(err) => {
            state.release_intermediates(store);
            Err(err)
        }
    }
}

/// Binary exponentiation state: `last` is base^(2^k), `full` the product so far.
struct Power {
    base: DistId,
    last: DistId,
    full: DistId,
}

impl Power {
    fn run(&mut self, store: &mut DistributionStore, exponent: u32, cutoff: f64) -> Result<DistId> {
        let mut p = exponent;
        while p & 1 == 0 {
            self.square(store, cutoff)?;
            p >>= 1;
        }
        self.full = self.last;
        p >>= 1;
        while p != 0 {
            self.square(store, cutoff)?;
            if p & 1 == 1 {
                self.absorb(store, cutoff)?;
            }
            p >>= 1;
        }
        if self.last != self.full && self.last != self.base {
            store.release(self.last)?;
        }
        Ok(self.full)
    }

    fn square(&mut self, store: &mut DistributionStore, cutoff: f64) -> Result<()> {
        let old = self.last;
        self.last = convolve(store, old, old, cutoff)?;
        if old != self.base && old != self.full {
            store.release(old)?;
        }
        Ok(())
    }

    fn absorb(&mut self, store: &mut DistributionStore, cutoff: f64) -> Result<()> {
        let old = self.full;
        self.full = convolve(store, old, self.last, cutoff)?;
        if old != self.base && old != self.last {
            store.release(old)?;
        }
        Ok(())
    }

    fn release_intermediates(&self, store: &mut DistributionStore) {
        if self.full != self.base {
            let _ = store.release(self.full);
        }
        if self.last != self.base && self.last != self.full {
            let _ = store.release(self.last);
        }
    }
}

/// One weighted component of a [`compound`] mixture.
#[derive(Clone, Copy, Debug)]
pub struct CompoundPart<'a> {
    /// Weight of this component.
    pub probability: f64,
    /// Value added to every outcome of the component.
    pub value: u64,
    pub distribution: &'a CumulativeDistribution,
}

/// Mixture of shifted, weighted distributions: each row `(v, q)` of each part
/// adds `part.probability · q` at `part.value + v`, unless that is at or below `cutoff`.
pub fn compound(
    store: &mut DistributionStore,
    parts: &[CompoundPart<'_>],
    cutoff: f64,
) -> Result<DistId> {
    let out = store.create()?;
    let filled = parts.iter().try_for_each(|part| {
        for row in part.distribution.rows() {
            let p = part.probability * row.probability;
            if p > cutoff {
                store.accumulate(out, offset_key(part.value, 1, row.value)?, p)?;
            }
        }
        Ok(())
    });
    match filled {
        Ok(()) => Ok(out),
        Err(err) => {
            store.release(out)?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cumulative::extract_cumulative;
    use crate::error::RaffleError;

    fn store() -> DistributionStore {
        DistributionStore::new(64, 4096)
    }

    fn assert_entries(store: &DistributionStore, d: DistId, expected: &[(u64, f64)]) {
        let actual = store.to_vec(d).unwrap();
        assert_eq!(actual.len(), expected.len(), "entries: {actual:?}");
        for ((ak, ap), (ek, ep)) in actual.iter().zip(expected) {
            assert_eq!(ak, ek);
            assert!((ap - ep).abs() < 1e-9, "value {ak}: expected {ep}, got {ap}");
        }
    }

    #[test]
    fn test_multiplies_two_distributions() {
        let mut store = store();
        let a = store.from_entries(&[(0, 0.5), (1, 0.5)]).unwrap();
        let b = store.from_entries(&[(2, 0.25), (5, 0.25), (7, 0.5)]).unwrap();
        let m = convolve(&mut store, a, b, 0.0).unwrap();
        store.release(a).unwrap();
        store.release(b).unwrap();
        assert_entries(
            &store,
            m,
            &[(2, 0.125), (3, 0.125), (5, 0.125), (6, 0.125), (7, 0.25), (8, 0.25)],
        );
    }

    #[test]
    fn test_combines_incident_values() {
        let mut store = store();
        let a = store.from_entries(&[(0, 0.5), (2, 0.5)]).unwrap();
        let b = store.from_entries(&[(1, 0.5), (3, 0.5)]).unwrap();
        let m = convolve(&mut store, a, b, 0.0).unwrap();
        assert_entries(&store, m, &[(1, 0.25), (3, 0.5), (5, 0.25)]);
    }

    #[test]
    fn test_identity_with_none() {
        let mut store = store();
        let a = store.unit().unwrap();
        assert_eq!(multiply(&mut store, Some(a), None, 0.0).unwrap(), Some(a));
        assert_eq!(multiply(&mut store, None, Some(a), 0.0).unwrap(), Some(a));
        assert_eq!(multiply(&mut store, None, None, 0.0).unwrap(), None);
        assert_eq!(store.live_maps(), 1);
    }

    #[test]
    fn test_cutoff_drops_small_products() {
        let mut store = store();
        let a = store.from_entries(&[(0, 0.75), (1, 0.25)]).unwrap();
        let m = convolve(&mut store, a, a, 0.0625).unwrap();
        // 0.25 * 0.25 = 0.0625 is exactly at the cutoff and dropped
        assert_entries(&store, m, &[(0, 0.5625), (1, 0.375)]);
    }

    #[test]
    fn test_power_pascal_row() {
        let mut store = store();
        let coin = store.from_entries(&[(0, 0.5), (1, 0.5)]).unwrap();
        let p = power(&mut store, coin, 12, 0.0).unwrap();
        store.release(coin).unwrap();
        let row = [1.0, 12.0, 66.0, 220.0, 495.0, 792.0, 924.0, 792.0, 495.0, 220.0, 66.0, 12.0, 1.0];
        let expected: Vec<(u64, f64)> = row
            .iter()
            .enumerate()
            .map(|(k, c)| (k as u64, c / 4096.0))
            .collect();
        assert_entries(&store, p, &expected);
        store.release(p).unwrap();
        assert_eq!(store.live_maps(), 0);
        assert_eq!(store.live_nodes(), 0);
    }

    #[test]
    fn test_power_one_is_alias() {
        let mut store = store();
        let coin = store.from_entries(&[(0, 0.5), (1, 0.5)]).unwrap();
        assert_eq!(power(&mut store, coin, 1, 0.0).unwrap(), coin);
        assert_eq!(store.live_maps(), 1);
    }

    #[test]
    fn test_power_zero_is_unit() {
        let mut store = store();
        let coin = store.from_entries(&[(0, 0.5), (1, 0.5)]).unwrap();
        let p = power(&mut store, coin, 0, 0.0).unwrap();
        assert_ne!(p, coin);
        assert_entries(&store, p, &[(0, 1.0)]);
    }

    #[test]
    fn test_power_leaves_only_result_and_base() {
        for exponent in 2..=17u32 {
            let mut store = store();
            let die = store.from_entries(&[(1, 0.25), (2, 0.25), (3, 0.5)]).unwrap();
            let p = power(&mut store, die, exponent, 0.0).unwrap();
            assert_eq!(store.live_maps(), 2, "exponent {exponent}");
            assert!((store.total_mass(p).unwrap() - 1.0).abs() < 1e-9);
            assert_eq!(store.get(p, exponent as u64).unwrap(), 0.25f64.powi(exponent as i32));
            assert_entries(&store, die, &[(1, 0.25), (2, 0.25), (3, 0.5)]);
        }
    }

    #[test]
    fn test_power_failure_releases_intermediates() {
        let mut store = DistributionStore::new(64, 40);
        let die = store.from_entries(&[(0, 0.25), (1, 0.25), (2, 0.5)]).unwrap();
        let err = power(&mut store, die, 64, 0.0).unwrap_err();
        assert!(matches!(err, RaffleError::CapacityExceeded { .. }));
        assert_eq!(store.live_maps(), 1);
        assert_eq!(store.live_nodes(), 3);
    }

    #[test]
    fn test_compound_mixture() {
        let mut store = store();
        let coin = store.from_entries(&[(0, 0.5), (1, 0.5)]).unwrap();
        let c = extract_cumulative(&store, coin, 0.0, 16).unwrap();
        let parts = [
            CompoundPart {
                probability: 0.75,
                value: 0,
                distribution: &c,
            },
            CompoundPart {
                probability: 0.25,
                value: 10,
                distribution: &c,
            },
        ];
        let m = compound(&mut store, &parts, 0.0).unwrap();
        assert_entries(&store, m, &[(0, 0.375), (1, 0.375), (10, 0.125), (11, 0.125)]);
    }
}
