//! `trajrec` command-line front end.
//!
//! ```bash
//! # Missing-measurement sweep, results appended to out/
//! trajrec sweep --complexities 3 --anchors 4 --positions 5,8 --n-its 10 --out out/
//!
//! # Re-run a stored configuration
//! trajrec sweep --parameters out/ --out out/
//!
//! # Summed success rates of every run in out/
//! trajrec results out/
//!
//! # Closed-form full-rank probability and its large-N limit
//! trajrec probability --dimension 2 --constraints 3 --positions 10,100,1000
//!
//! # Monte-Carlo covering-condition estimate
//! trajrec feasibility --constraints 3 --min-anchors 3 --mean-extra 2 --trials 10000
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trajrec::{
    estimate_feasibility, probability_full_matrix, probability_full_matrix_limit, run_sweep,
    Config, FeasibilityConfig, Outcome, SolverKind, SweepParameters, SweepResults,
};

#[derive(Parser, Debug)]
#[command(
    name = "trajrec",
    version,
    about = "Trajectory recovery from range measurements",
    long_about = None,
)]
struct Args {
    /// Log filter (overridden by RUST_LOG).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a missing-measurement sweep.
    Sweep {
        /// parameters.json (or a directory holding one) to run instead of the grid flags.
        #[arg(long, conflicts_with_all = ["complexities", "anchors", "positions"])]
        parameters: Option<PathBuf>,
        #[arg(long, value_delimiter = ',')]
        complexities: Vec<usize>,
        #[arg(long, value_delimiter = ',')]
        anchors: Vec<usize>,
        #[arg(long, value_delimiter = ',')]
        positions: Vec<usize>,
        #[arg(long, default_value_t = 10)]
        n_its: usize,
        #[arg(long, default_value_t = 2)]
        dimension: usize,
        /// right_inverse or semidefinite_relaxation.
        #[arg(long, default_value_t = SolverKind::SemidefiniteRelaxation)]
        solver: SolverKind,
        #[arg(long, default_value_t = 0.0)]
        noise_std: f64,
        #[arg(long, default_value_t = 1e-6)]
        tolerance: f64,
        /// Output directory for parameters.json and result CSVs.
        #[arg(long)]
        out: Option<PathBuf>,
        /// RNG seed (random if omitted).
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print summed results of an output directory.
    Results { dir: PathBuf },
    /// Closed-form probability of a full-rank minimal measurement set.
    Probability {
        #[arg(long, default_value_t = 2)]
        dimension: usize,
        #[arg(long)]
        constraints: usize,
        #[arg(long, value_delimiter = ',')]
        positions: Vec<usize>,
    },
    /// Monte-Carlo estimate of the anchor/position covering conditions.
    Feasibility {
        #[arg(long)]
        constraints: usize,
        #[arg(long)]
        min_anchors: usize,
        #[arg(long, default_value_t = 1.0)]
        mean_extra: f64,
        #[arg(long, default_value_t = 10_000)]
        trials: usize,
        /// Use exact subset enumeration instead of the fast condition.
        #[arg(long, default_value_t = false)]
        exact: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn rng_from(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(rand::random);
    info!("RNG seed {}", seed);
    StdRng::seed_from_u64(seed)
}

fn print_results(results: &SweepResults) {
    let p = &results.parameters;
    println!(
        "complexities {:?}, anchors {:?}, n_its {}, solver {}",
        p.complexities, p.anchors, p.n_its, p.solver
    );
    let (rows, cols) = results.table.shape();
    for row in 0..rows {
        let n_positions = p.positions.get(row).copied().unwrap_or(0);
        let mut line = format!("positions {:>4}:", n_positions);
        for missing in 0..cols {
            let total = results.table.total(row, missing).unwrap_or(0);
            if total == 0 {
                continue;
            }
            let ok = results.table.get(row, missing, Outcome::Success).unwrap_or(0);
            line.push_str(&format!(" {:.2}", ok as f64 / total as f64));
        }
        println!("{line}");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command {
        Command::Sweep {
            parameters,
            complexities,
            anchors,
            positions,
            n_its,
            dimension,
            solver,
            noise_std,
            tolerance,
            out,
            seed,
        } => {
            let config = match parameters {
                Some(path) => Config::FromFile(path),
                None => Config::Inline(SweepParameters {
                    dimension,
                    solver,
                    noise_std,
                    tolerance,
                    ..SweepParameters::new(complexities, anchors, positions, n_its)
                }),
            };
            let mut rng = rng_from(seed);
            let results = run_sweep(config, out.as_deref(), &mut rng)?;
            print_results(&results);
        }
        Command::Results { dir } => {
            let results = SweepResults::load(&dir)?;
            print_results(&results);
        }
        Command::Probability {
            dimension,
            constraints,
            positions,
        } => {
            let limit = probability_full_matrix_limit(dimension, constraints);
            println!("limit: {limit:.6}");
            for n in positions {
                let p = probability_full_matrix(dimension, constraints, n);
                println!("N = {n:>6}: {p:.6} (ratio to limit {:.4})", p / limit);
            }
        }
        Command::Feasibility {
            constraints,
            min_anchors,
            mean_extra,
            trials,
            exact,
            seed,
        } => {
            let config = FeasibilityConfig {
                trials,
                mean_extra,
                use_fast_condition: !exact,
                ..Default::default()
            };
            let mut rng = rng_from(seed);
            let c = estimate_feasibility(constraints, min_anchors, &config, &mut rng)?;
            println!(
                "evaluated {} of {} draws: anchors ok {}, positions ok {}, both ok {} ({:.4})",
                c.total,
                trials,
                c.anchors_feasible,
                c.positions_feasible,
                c.both_feasible,
                c.both_fraction()
            );
        }
    }
    Ok(())
}
