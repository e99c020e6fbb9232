//! Hypergeometric odds tables and the ln-factorial primitive.

use raffle::error::RaffleError;
use raffle::ln_factorial::{self, ln_factorial};
use raffle::odds::{calculate_final_odds, calculate_odds, calculate_odds_core, OddsTable};
use raffle::types::Resource;
use raffle::Engine;

fn binomial(n: u64, k: u64) -> f64 {
    if k > n {
        return 0.0;
    }
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

fn hypergeometric(total: u64, targets: u64, samples: u64, n: u64) -> f64 {
    if n > samples {
        return 0.0;
    }
    binomial(targets, n) * binomial(total - targets, samples - n) / binomial(total, samples)
}

#[test]
fn test_ln_factorial_known_values() {
    ln_factorial::init();
    let expected = [
        (0u64, 0.0),
        (1, 0.0),
        (2, 0.693_147_180_559_945),
        (3, 1.791_759_469_228_055),
        (4, 3.178_053_830_347_945),
        (256, 1_167.257_278_562_880_2),
    ];
    for (n, e) in expected {
        let v = ln_factorial(n);
        assert!((v - e).abs() < 1e-6, "ln({n}!) = {v}, expected {e}");
    }
}

#[test]
fn test_ln_factorial_huge_difference() {
    let step = (ln_factorial(1_000_000_001) - ln_factorial(1_000_000_000)).exp();
    assert!(
        (step - 1_000_000_001.0).abs() < 1e4,
        "exp(ln(n+1)! - ln(n!)) = {step}"
    );
}

#[test]
fn test_table_matches_closed_form() {
    for &(total, targets, samples) in &[(9u64, 5u64, 4u64), (50, 10, 20), (120, 60, 30), (40, 39, 3)] {
        let odds = calculate_odds(total, targets, samples).unwrap();
        for n in 0..=samples {
            let e = hypergeometric(total, targets, samples, n);
            let v = odds.values()[n as usize];
            assert!(
                (v - e).abs() < 1e-9,
                "({total}, {targets}, {samples}) n={n}: expected {e}, got {v}"
            );
        }
    }
}

#[test]
fn test_nine_five_four() {
    let odds = calculate_odds(9, 5, 4).unwrap();
    let expected = [1.0, 20.0, 60.0, 40.0, 5.0];
    assert_eq!(odds.len(), expected.len());
    for (v, e) in odds.values().iter().zip(expected) {
        assert!((v - e / 126.0).abs() < 1e-6);
    }
}

#[test]
fn test_large_population_stays_normalised() {
    // Past the exact ln-factorial range and well into the cached Stirling range.
    let odds = calculate_odds(100_000, 2_500, 400).unwrap();
    let sum: f64 = odds.values().iter().sum();
    assert!((sum - 1.0).abs() < 1e-6, "sum={sum}");
    let mean: f64 = odds
        .values()
        .iter()
        .enumerate()
        .map(|(n, p)| n as f64 * p)
        .sum();
    assert!((mean - 10.0).abs() < 1e-6, "mean={mean}");
}

#[test]
fn test_core_support_window() {
    let core = calculate_odds_core(20, 15, 10).unwrap();
    assert_eq!(core.start(), 5);
    assert_eq!(core.len(), 6);
    let sum: f64 = core.values().iter().sum();
    assert!((sum - 1.0).abs() < 1e-9);
    assert_eq!(core.get(4), 0.0);
}

#[test]
fn test_reused_table_overwrites() {
    let mut table = OddsTable::new(64);
    let first = table.generate(9, 5, 4).unwrap().clone();
    let second = table.generate(3, 3, 2).unwrap().clone();
    assert_eq!(first.len(), 5);
    assert_eq!(second.values(), &[0.0, 0.0, 1.0]);
}

#[test]
fn test_width_capacity_is_recoverable() {
    let mut table = OddsTable::new(16);
    assert_eq!(
        table.generate(100, 50, 40),
        Err(RaffleError::CapacityExceeded {
            resource: Resource::OddsBuckets,
            requested: 41,
            limit: 16
        })
    );
    // The table is still usable after the failure.
    assert_eq!(table.generate(9, 5, 4).unwrap().len(), 5);
}

#[test]
fn test_final_odds_edge_cases() {
    assert_eq!(calculate_final_odds(10, 3, 0), 1.0);
    assert_eq!(calculate_final_odds(10, 10, 7), 1.0);
    assert!((calculate_final_odds(10, 3, 1) - 0.3).abs() < 1e-15);
    assert_eq!(calculate_final_odds(10, 3, 4), 0.0);
    let e = hypergeometric(30, 12, 5, 5);
    assert!((calculate_final_odds(30, 12, 5) - e).abs() < 1e-12);
}

#[test]
fn test_engine_odds_are_owned() {
    let mut engine = Engine::default();
    let a = engine.calculate_odds(9, 5, 4).unwrap();
    let _ = engine.calculate_odds(20, 2, 10).unwrap();
    assert!((a[1] - 20.0 / 126.0).abs() < 1e-9);
    assert_eq!(engine.calculate_final_odds(9, 5, 4), calculate_final_odds(9, 5, 4));
}
