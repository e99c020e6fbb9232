//! raffle-sweep: winnings summary for every ticket count 1..=N.
//!
//! Ticket counts are independent, so each runs on its own rayon task with its
//! own [`Engine`] (and arenas). Output is a JSON array, one object per count.

use std::fs;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use raffle::cumulative::DistributionSummary;
use raffle::env_config::{init_rayon_threads, init_tracing, limits_from_env};
use raffle::prizes::Raffle;
use raffle::{ln_factorial, Engine, Prize};

#[derive(Serialize)]
struct SweepRow {
    tickets: u64,
    elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<DistributionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn print_usage() {
    eprintln!("Usage: raffle_sweep --prize COUNT:VALUE [--prize ...] [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --prize COUNT:VALUE  Prize tier (repeatable)");
    eprintln!("  --audience N         Population size; unfilled places win nothing");
    eprintln!("  --max-tickets N      Sweep 1..=N tickets (default 10)");
    eprintln!("  --cutoff P           Pruning cutoff (default 0)");
    eprintln!("  --output PATH        JSON output file (default raffle_sweep.json)");
}

fn parse_prize(arg: &str) -> Option<Prize> {
    let (count, value) = arg.split_once(':')?;
    Some(Prize::new(count.trim().parse().ok()?, value.trim().parse().ok()?))
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut prizes: Vec<Prize> = Vec::new();
    let mut audience: Option<u64> = None;
    let mut max_tickets: u64 = 10;
    let mut cutoff: f64 = 0.0;
    let mut output = "raffle_sweep.json".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--prize" => {
                i += 1;
                let prize = args.get(i).and_then(|a| parse_prize(a));
                prizes.push(prize.unwrap_or_else(|| {
                    eprintln!("Invalid --prize value, expected COUNT:VALUE");
                    std::process::exit(1);
                }));
            }
            "--audience" => {
                i += 1;
                audience = Some(args.get(i).and_then(|a| a.parse().ok()).unwrap_or_else(|| {
                    eprintln!("Invalid --audience value");
                    std::process::exit(1);
                }));
            }
            "--max-tickets" => {
                i += 1;
                max_tickets = args.get(i).and_then(|a| a.parse().ok()).unwrap_or_else(|| {
                    eprintln!("Invalid --max-tickets value");
                    std::process::exit(1);
                });
            }
            "--cutoff" => {
                i += 1;
                cutoff = args.get(i).and_then(|a| a.parse().ok()).unwrap_or_else(|| {
                    eprintln!("Invalid --cutoff value");
                    std::process::exit(1);
                });
            }
            "--output" => {
                i += 1;
                output = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("Missing --output path");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    init_tracing();
    let num_threads = init_rayon_threads();

    let raffle = match Raffle::new(audience, &prizes) {
        Ok(r) => r.with_cutoff(cutoff),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let max_tickets = max_tickets.min(raffle.audience());
    let limits = limits_from_env();

    println!("=== raffle-sweep ===");
    println!(
        "Audience {}, {} tier(s), tickets 1..={}, {} threads",
        raffle.audience(),
        raffle.prizes().len(),
        max_tickets,
        num_threads
    );

    ln_factorial::init();
    let t_total = Instant::now();

    let rows: Vec<SweepRow> = (1..=max_tickets)
        .into_par_iter()
        .map(|tickets| {
            let t0 = Instant::now();
            let mut engine = Engine::new(limits);
            let (summary, error) = match raffle.enter(&mut engine, tickets) {
                Ok(c) => (c.summary(), None),
                Err(e) => (None, Some(e.to_string())),
            };
            SweepRow {
                tickets,
                elapsed_ms: t0.elapsed().as_secs_f64() * 1e3,
                summary,
                error,
            }
        })
        .collect();

    let failed = rows.iter().filter(|r| r.error.is_some()).count();
    println!(
        "Swept {} ticket counts in {:.2}s ({} failed)",
        rows.len(),
        t_total.elapsed().as_secs_f64(),
        failed
    );

    let json = match serde_json::to_string_pretty(&rows) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to serialise sweep: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = fs::write(&output, json) {
        eprintln!("Failed to write {}: {}", output, e);
        std::process::exit(1);
    }
    println!("Wrote {}", output);
}
