//! Missing-measurement sweep.
//!
//! For every trajectory complexity, anchor count, trial and position count
//! the sweep draws a fresh trajectory and anchor set, measures every
//! (anchor, position) pair, then removes `m = 0, 1, ...` measurements at
//! random and solves each reduced set. Outcomes are tallied per
//! (position count, `m`) cell of an [`OutcomeTable`].
//!
//! Solver failures and inaccurate results are counted; input errors abort
//! the sweep. When an output directory is given, its stored parameters are
//! checked before any solve and the results are appended afterwards.

pub mod storage;
pub mod table;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::anchors::Anchors;
use crate::constraints::{build_frame, ConstraintSystem};
use crate::error::{InputError, SweepError};
use crate::measurement::MeasurementSet;
use crate::solver::{solve_and_classify, Outcome, SolveConfig, SolveStatus, SolverKind};
use crate::trajectory::Trajectory;

pub use table::OutcomeTable;

fn default_dimension() -> usize {
    2
}

fn default_solver() -> SolverKind {
    SolverKind::SemidefiniteRelaxation
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_anchor_scale() -> f64 {
    10.0
}

/// Sweep configuration, stored as `parameters.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepParameters {
    /// Trajectory complexities (number of basis functions K).
    pub complexities: Vec<usize>,
    /// Anchor counts.
    pub anchors: Vec<usize>,
    /// Position (sample) counts; one table row each.
    pub positions: Vec<usize>,
    /// Independent trials per (complexity, anchor count).
    pub n_its: usize,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_solver")]
    pub solver: SolverKind,
    /// Standard deviation of Gaussian distance noise. 0 = noiseless.
    #[serde(default)]
    pub noise_std: f64,
    /// Coefficient tolerance for non-exact solves.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Anchors are drawn uniformly in `[0, anchor_scale)^dimension`.
    #[serde(default = "default_anchor_scale")]
    pub anchor_scale: f64,
    /// Seconds since the Unix epoch, stamped when saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl SweepParameters {
    pub fn new(complexities: Vec<usize>, anchors: Vec<usize>, positions: Vec<usize>, n_its: usize) -> Self {
        Self {
            complexities,
            anchors,
            positions,
            n_its,
            dimension: default_dimension(),
            solver: default_solver(),
            noise_std: 0.0,
            tolerance: default_tolerance(),
            anchor_scale: default_anchor_scale(),
            time: None,
        }
    }

    /// Reject empty or zero-valued grids before anything runs.
    pub fn validate(&self) -> Result<(), InputError> {
        let lists: [(&'static str, &Vec<usize>); 3] = [
            ("complexities", &self.complexities),
            ("anchors", &self.anchors),
            ("positions", &self.positions),
        ];
        for (name, values) in lists {
            if values.is_empty() || values.contains(&0) {
                return Err(InputError::NonPositive { name });
            }
        }
        if self.dimension == 0 {
            return Err(InputError::NonPositive { name: "dimension" });
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(InputError::NonFinite("noise_std"));
        }
        if !self.anchor_scale.is_finite() || self.anchor_scale <= 0.0 {
            return Err(InputError::NonPositive { name: "anchor_scale" });
        }
        Ok(())
    }

    /// Names of the fields that differ from `other`, ignoring `time`.
    pub fn differing_fields(&self, other: &SweepParameters) -> anyhow::Result<Vec<String>> {
        let mine = serde_json::to_value(Self { time: None, ..self.clone() })?;
        let theirs = serde_json::to_value(Self { time: None, ..other.clone() })?;
        let (Some(mine), Some(theirs)) = (mine.as_object(), theirs.as_object()) else {
            anyhow::bail!("parameters did not serialize to an object");
        };
        let mut keys: Vec<&String> = mine.keys().chain(theirs.keys()).collect();
        keys.sort();
        keys.dedup();
        Ok(keys
            .into_iter()
            .filter(|k| mine.get(*k) != theirs.get(*k))
            .cloned()
            .collect())
    }

    /// Solve configuration implied by these parameters.
    pub fn solve_config(&self) -> SolveConfig {
        SolveConfig {
            accuracy_tolerance: self.tolerance,
            noiseless: self.noise_std == 0.0,
            ..SolveConfig::new(self.solver)
        }
    }

    /// Table width: the largest possible number of measurements.
    pub fn max_measurements(&self) -> usize {
        let max_positions = self.positions.iter().copied().max().unwrap_or(0);
        let max_anchors = self.anchors.iter().copied().max().unwrap_or(0);
        max_positions * max_anchors
    }
}

/// Where the sweep parameters come from.
#[derive(Debug, Clone)]
pub enum Config {
    /// A `parameters.json` file, or a directory containing one.
    FromFile(PathBuf),
    Inline(SweepParameters),
}

impl Config {
    /// Load (if needed) and validate the parameters.
    pub fn resolve(self) -> Result<SweepParameters, SweepError> {
        let parameters = match self {
            Config::FromFile(path) => {
                let path = if path.is_dir() {
                    storage::parameters_path(&path)
                } else {
                    path
                };
                storage::load_parameters(&path)?
            }
            Config::Inline(parameters) => parameters,
        };
        parameters.validate()?;
        Ok(parameters)
    }
}

/// Output of [`run_sweep`].
#[derive(Debug, Clone)]
pub struct SweepResults {
    /// Parameters of the run (with `time` set if they were saved).
    pub parameters: SweepParameters,
    pub table: OutcomeTable,
}

impl SweepResults {
    /// Load the parameters and summed result files of an output directory.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let parameters = storage::load_parameters(&storage::parameters_path(dir))?;
        let matrices = storage::read_results(dir)?;
        let table = OutcomeTable::from_matrices(&matrices)
            .with_context(|| format!("combining results in {}", dir.display()))?;
        Ok(Self { parameters, table })
    }
}

/// Run one sweep over the configured grid.
///
/// With `outdir`, the sweep first checks `outdir/parameters.json` and fails
/// with [`SweepError::ConfigConflict`] before any solve if it describes a
/// different run. On completion the parameters are stamped and written and
/// the result tables are saved next to any earlier ones.
pub fn run_sweep<R: RngExt + ?Sized>(
    config: Config,
    outdir: Option<&Path>,
    rng: &mut R,
) -> Result<SweepResults, SweepError> {
    let mut parameters = config.resolve()?;
    if let Some(dir) = outdir {
        storage::check_parameters(dir, &parameters)?;
    }

    let solve_config = parameters.solve_config();
    let mut table = OutcomeTable::new(parameters.positions.len(), parameters.max_measurements());
    info!(
        "Sweep: complexities {:?}, anchors {:?}, positions {:?}, {} trials, solver {}",
        parameters.complexities, parameters.anchors, parameters.positions, parameters.n_its, parameters.solver
    );

    for &n_constraints in &parameters.complexities {
        for &n_anchors in &parameters.anchors {
            debug!("Complexity {}, {} anchors", n_constraints, n_anchors);
            for trial in 0..parameters.n_its {
                for (row, &n_positions) in parameters.positions.iter().enumerate() {
                    let frame = build_frame(n_constraints, n_positions)?;
                    let truth = Trajectory::random(parameters.dimension, n_constraints, rng)?;
                    let anchors =
                        Anchors::random(parameters.dimension, n_anchors, parameters.anchor_scale, rng)?;
                    let mut complete = MeasurementSet::complete(&truth, &anchors, &frame)?;
                    if parameters.noise_std > 0.0 {
                        complete = complete.with_noise(parameters.noise_std, rng)?;
                    }

                    for missing in 0..complete.len() {
                        let measurements = complete.without_random(missing, rng)?;
                        let system = ConstraintSystem::new(&anchors, &frame, &measurements)?;
                        let status = solve_and_classify(&system, &truth, &solve_config)?;
                        if status != SolveStatus::SolvedExact && status != SolveStatus::SolvedAccurate {
                            debug!(
                                "{:?}: complexity {}, anchors {}, trial {}, positions {}, missing {}",
                                status, n_constraints, n_anchors, trial, n_positions, missing
                            );
                        }
                        table.increment(row, missing, status.outcome())?;
                    }
                }
            }
        }
    }

    info!(
        "Sweep done: {} successes, {} solver errors, {} inaccurate",
        table.outcome_total(Outcome::Success),
        table.outcome_total(Outcome::SolverError),
        table.outcome_total(Outcome::AccuracyError)
    );

    if let Some(dir) = outdir {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before Unix epoch")?;
        parameters.time = Some(now.as_secs_f64());
        storage::save_parameters(dir, &parameters)?;
        storage::save_results(dir, &table)?;
    }

    Ok(SweepResults { parameters, table })
}
