//! raffle: winnings distribution for one raffle and one ticket count.
//!
//! ```text
//! raffle --prize 1:100 --prize 3:20 --audience 500 --tickets 10
//! raffle --prize 1:100 --audience 500 --tickets 10 --power 4 --json
//! ```

use std::time::Instant;

use serde::Serialize;

use raffle::cumulative::{CumulativeDistribution, DistributionSummary};
use raffle::env_config::{init_tracing, limits_from_env};
use raffle::prizes::Raffle;
use raffle::simulation::{simulate_raffle, SimulationResult};
use raffle::{ln_factorial, Engine, Prize};

#[derive(Serialize)]
struct Report<'a> {
    audience: u64,
    tickets: u64,
    power: u32,
    cutoff: f64,
    prizes: &'a [Prize],
    summary: Option<DistributionSummary>,
    distribution: &'a CumulativeDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<&'a SimulationResult>,
}

fn print_usage() {
    eprintln!("Usage: raffle --prize COUNT:VALUE [--prize ...] --tickets N [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --prize COUNT:VALUE  Prize tier (repeatable)");
    eprintln!("  --audience N         Population size; unfilled places win nothing");
    eprintln!("  --tickets N          Tickets held (default 1)");
    eprintln!("  --cutoff P           Pruning cutoff (default 0)");
    eprintln!("  --power N            Combine N independent entries (default 1)");
    eprintln!("  --simulate GAMES     Cross-check with a Monte-Carlo run");
    eprintln!("  --json               Print the report as JSON");
}

fn parse_prize(arg: &str) -> Option<Prize> {
    let (count, value) = arg.split_once(':')?;
    Some(Prize::new(count.trim().parse().ok()?, value.trim().parse().ok()?))
}

fn parse_or_exit<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> T {
    match value.and_then(|v| v.parse().ok()) {
        Some(v) => v,
        None => {
            eprintln!("Invalid or missing value for {}", flag);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut prizes: Vec<Prize> = Vec::new();
    let mut audience: Option<u64> = None;
    let mut tickets: u64 = 1;
    let mut cutoff: f64 = 0.0;
    let mut power: u32 = 1;
    let mut simulate: Option<usize> = None;
    let mut json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--prize" => {
                i += 1;
                match args.get(i).and_then(|a| parse_prize(a)) {
                    Some(p) => prizes.push(p),
                    None => {
                        eprintln!("Invalid --prize value, expected COUNT:VALUE");
                        std::process::exit(1);
                    }
                }
            }
            "--audience" => {
                i += 1;
                audience = Some(parse_or_exit("--audience", args.get(i)));
            }
            "--tickets" => {
                i += 1;
                tickets = parse_or_exit("--tickets", args.get(i));
            }
            "--cutoff" => {
                i += 1;
                cutoff = parse_or_exit("--cutoff", args.get(i));
            }
            "--power" => {
                i += 1;
                power = parse_or_exit("--power", args.get(i));
            }
            "--simulate" => {
                i += 1;
                simulate = Some(parse_or_exit("--simulate", args.get(i)));
            }
            "--json" => {
                json = true;
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

    let raffle = match Raffle::new(audience, &prizes) {
        Ok(r) => r.with_cutoff(cutoff),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let t0 = Instant::now();
    ln_factorial::init();
    let mut engine = Engine::new(limits_from_env());

    let single = match raffle.enter(&mut engine, tickets) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Calculation failed: {}", e);
            std::process::exit(1);
        }
    };
    let result = if power == 1 {
        single
    } else {
        match engine.pow_cumulative(&single, power, cutoff) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Power calculation failed: {}", e);
                std::process::exit(1);
            }
        }
    };
    let elapsed = t0.elapsed();

    let simulation = match simulate {
        Some(games) if power == 1 => match simulate_raffle(raffle.prizes(), tickets, games, 42) {
            Ok(s) => Some(s),
            Err(e) => {
                eprintln!("Simulation failed: {}", e);
                std::process::exit(1);
            }
        },
        Some(_) => {
            eprintln!("--simulate is only supported without --power; skipping");
            None
        }
        None => None,
    };

    if json {
        let report = Report {
            audience: raffle.audience(),
            tickets,
            power,
            cutoff,
            prizes: raffle.prizes(),
            summary: result.summary(),
            distribution: &result,
            simulation: simulation.as_ref(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Failed to serialise report: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("=== raffle ===");
    println!(
        "Audience {}, {} tier(s), {} ticket(s), power {}, cutoff {}",
        raffle.audience(),
        raffle.prizes().len(),
        tickets,
        power,
        cutoff
    );
    for p in raffle.prizes() {
        println!("  {:>10} × {}", p.count, p.value);
    }
    println!("Computed in {:.3}s", elapsed.as_secs_f64());
    println!();

    println!("{:>12} {:>14} {:>14}", "value", "p", "cumulative");
    for row in result.rows() {
        println!(
            "{:>12} {:>14.8} {:>14.8}",
            row.value, row.probability, row.cumulative
        );
    }

    if let Some(s) = result.summary() {
        println!();
        println!(
            "Mean {:.4}, std dev {:.4}, min {}, max {}, retained mass {:.8}",
            s.mean, s.std_dev, s.min, s.max, s.total_probability
        );
        let pcts: Vec<String> = s
            .percentiles
            .iter()
            .map(|(k, v)| format!("p{}={}", k, v))
            .collect();
        println!("Percentiles: {}", pcts.join(" "));
    }

    if let Some(sim) = &simulation {
        println!();
        println!(
            "Simulation: {} games in {:.2}s, mean {:.4} (exact {:.4})",
            sim.games,
            sim.elapsed.as_secs_f64(),
            sim.mean,
            result.mean()
        );
        let max_gap = result
            .rows()
            .iter()
            .map(|r| (sim.frequency(r.value) - r.probability).abs())
            .fold(0.0f64, f64::max);
        println!("Largest per-value gap: {:.5}", max_gap);
    }
}
