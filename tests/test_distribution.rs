//! Sparse distributions, the arena behind them, and the distribution algebra.

use raffle::algebra::{compound, convolve, multiply, power, CompoundPart};
use raffle::arena::{Arena, ArenaError};
use raffle::cumulative::{extract_cumulative, extract_distribution};
use raffle::distribution::{DistId, DistributionStore};
use raffle::error::RaffleError;
use raffle::types::{Limits, Resource};
use raffle::Engine;

fn assert_near(actual: &[(u64, f64)], expected: &[(u64, f64)], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "actual {actual:?}");
    for ((ak, ap), (ek, ep)) in actual.iter().zip(expected) {
        assert_eq!(ak, ek, "actual {actual:?}");
        assert!((ap - ep).abs() < tol, "value {ak}: expected {ep}, got {ap}");
    }
}

fn bernoulli(store: &mut DistributionStore, p: f64) -> DistId {
    store.from_entries(&[(0, 1.0 - p), (1, p)]).unwrap()
}

// ── Arena ───────────────────────────────────────────────────────────────

#[test]
fn test_arena_churn_keeps_capacity() {
    let mut arena = Arena::with_capacity(100);
    let mut live = Vec::new();
    for round in 0..50 {
        while live.len() < 100 {
            live.push(arena.allocate(round).unwrap());
        }
        assert_eq!(arena.allocate(0), Err(ArenaError::OutOfCapacity { capacity: 100 }));
        // free every other slot
        let mut kept = Vec::new();
        for (i, id) in live.into_iter().enumerate() {
            if i % 2 == 0 {
                arena.release(id).unwrap();
            } else {
                kept.push(id);
            }
        }
        live = kept;
        assert_eq!(arena.len(), 50);
    }
}

// ── SparseDistribution ──────────────────────────────────────────────────

#[test]
fn test_descending_and_ascending_builds_agree() {
    let mut store = DistributionStore::new(4, 256);
    let up = store.create().unwrap();
    let down = store.create().unwrap();
    for k in 0..100u64 {
        store.accumulate(up, k * 3, 0.01).unwrap();
        store.accumulate(down, (99 - k) * 3, 0.01).unwrap();
    }
    assert_eq!(store.to_vec(up).unwrap(), store.to_vec(down).unwrap());
    assert_eq!(store.len(up).unwrap(), 100);
    assert_eq!(store.get(up, 150).unwrap(), 0.01);
    assert_eq!(store.get(up, 151).unwrap(), 0.0);
}

#[test]
fn test_store_limits_distributions() {
    let limits = Limits {
        max_distributions: 2,
        ..Limits::default()
    };
    let mut store = DistributionStore::with_limits(&limits);
    let a = store.unit().unwrap();
    let _b = store.unit().unwrap();
    assert!(matches!(
        store.unit(),
        Err(RaffleError::CapacityExceeded {
            resource: Resource::Distributions,
            ..
        })
    ));
    store.release(a).unwrap();
    assert!(store.unit().is_ok());
}

#[test]
fn test_release_twice_is_stale() {
    let mut store = DistributionStore::new(4, 16);
    let d = store.unit().unwrap();
    store.release(d).unwrap();
    assert_eq!(store.release(d), Err(RaffleError::StaleHandle));
    assert_eq!(store.len(d), Err(RaffleError::StaleHandle));
    // a recycled slot does not revive the old handle
    let e = store.unit().unwrap();
    assert!(!store.contains(d));
    assert!(store.contains(e));
}

// ── Algebra ─────────────────────────────────────────────────────────────

#[test]
fn test_multiply_associative() {
    let mut store = DistributionStore::new(16, 1024);
    let a = store.from_entries(&[(0, 0.2), (3, 0.8)]).unwrap();
    let b = store.from_entries(&[(1, 0.5), (2, 0.5)]).unwrap();
    let c = store.from_entries(&[(0, 0.9), (10, 0.1)]).unwrap();

    let ab = convolve(&mut store, a, b, 0.0).unwrap();
    let ab_c = convolve(&mut store, ab, c, 0.0).unwrap();
    let bc = convolve(&mut store, b, c, 0.0).unwrap();
    let a_bc = convolve(&mut store, a, bc, 0.0).unwrap();

    let left = store.to_vec(ab_c).unwrap();
    let right = store.to_vec(a_bc).unwrap();
    assert_near(&left, &right, 1e-12);
}

#[test]
fn test_multiply_identity_laws() {
    let mut store = DistributionStore::new(4, 64);
    let empty = store.create().unwrap();
    assert_eq!(multiply(&mut store, None, Some(empty), 0.0).unwrap(), Some(empty));
    assert_eq!(multiply(&mut store, None, None, 0.0).unwrap(), None);

    // an empty distribution is not the identity: it annihilates
    let coin = bernoulli(&mut store, 0.5);
    let product = multiply(&mut store, Some(coin), Some(empty), 0.0).unwrap().unwrap();
    assert!(store.is_empty(product).unwrap());
}

#[test]
fn test_power_matches_repeated_multiply() {
    let mut store = DistributionStore::new(32, 4096);
    let die = store
        .from_entries(&[(1, 0.1), (2, 0.2), (3, 0.3), (4, 0.4)])
        .unwrap();

    let mut acc = store.unit().unwrap();
    for _ in 0..7 {
        let next = convolve(&mut store, acc, die, 0.0).unwrap();
        store.release(acc).unwrap();
        acc = next;
    }
    let p = power(&mut store, die, 7, 0.0).unwrap();

    let expected = store.to_vec(acc).unwrap();
    assert_near(&store.to_vec(p).unwrap(), &expected, 1e-12);
    assert_eq!(store.live_maps(), 3);
}

#[test]
fn test_power_of_bernoulli_is_binomial() {
    let mut store = DistributionStore::new(32, 4096);
    let coin = bernoulli(&mut store, 0.5);
    let p = power(&mut store, coin, 12, 0.0).unwrap();
    let row = [1.0, 12.0, 66.0, 220.0, 495.0, 792.0, 924.0, 792.0, 495.0, 220.0, 66.0, 12.0, 1.0];
    let expected: Vec<(u64, f64)> = row
        .iter()
        .enumerate()
        .map(|(k, c)| (k as u64, c / 4096.0))
        .collect();
    assert_near(&store.to_vec(p).unwrap(), &expected, 1e-12);
}

#[test]
fn test_power_with_cutoff_drops_tails() {
    let mut store = DistributionStore::new(32, 4096);
    let coin = bernoulli(&mut store, 0.5);
    let exact = power(&mut store, coin, 20, 0.0).unwrap();
    let pruned = power(&mut store, coin, 20, 1e-4).unwrap();
    assert!(store.len(pruned).unwrap() < store.len(exact).unwrap());
    let mass = store.total_mass(pruned).unwrap();
    assert!(mass < 1.0 && mass > 0.99, "mass={mass}");
}

#[test]
fn test_compound_weights_parts() {
    let mut store = DistributionStore::new(8, 256);
    let low = store.from_entries(&[(0, 0.5), (2, 0.5)]).unwrap();
    let high = store.from_entries(&[(0, 0.25), (1, 0.75)]).unwrap();
    let low = extract_cumulative(&store, low, 0.0, 64).unwrap();
    let high = extract_cumulative(&store, high, 0.0, 64).unwrap();

    let mixed = compound(
        &mut store,
        &[
            CompoundPart {
                probability: 0.6,
                value: 0,
                distribution: &low,
            },
            CompoundPart {
                probability: 0.4,
                value: 1,
                distribution: &high,
            },
        ],
        0.0,
    )
    .unwrap();
    assert_near(
        &store.to_vec(mixed).unwrap(),
        &[(0, 0.3), (1, 0.1), (2, 0.3 + 0.3)],
        1e-12,
    );
}

#[test]
fn test_cumulative_round_trip() {
    let mut store = DistributionStore::new(8, 256);
    let d = store.from_entries(&[(5, 0.1), (7, 0.6), (9, 0.3)]).unwrap();
    let table = extract_cumulative(&store, d, 0.0, 64).unwrap();
    let back = extract_distribution(&mut store, &table).unwrap();
    assert_near(&store.to_vec(back).unwrap(), &store.to_vec(d).unwrap(), 1e-12);
}

#[test]
fn test_engine_algebra_round_trip() {
    let mut engine = Engine::default();
    let coin = bernoulli(engine.store_mut(), 0.5);
    let same = engine.power_distribution(coin, 1, 0.0).unwrap();
    assert_eq!(same, coin);
    let two = engine
        .multiply_distribution(Some(coin), Some(coin), 0.0)
        .unwrap()
        .unwrap();
    assert_near(
        &engine.store().to_vec(two).unwrap(),
        &[(0, 0.25), (1, 0.5), (2, 0.25)],
        1e-15,
    );
    engine.release_distribution(two).unwrap();
    engine.release_distribution(coin).unwrap();
    assert_eq!(engine.store().live_maps(), 0);
    assert_eq!(engine.store().live_nodes(), 0);
}
