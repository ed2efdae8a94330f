//! Trajectory solver.
//!
//! Recovers trajectory coefficients from a [`ConstraintSystem`](crate::ConstraintSystem)
//! with one of two strategies:
//!
//! 1. **Right-inverse**: minimum-norm solve of the stacked linear system via
//!    SVD. Exact for noiseless data when the coefficients are identifiable.
//! 2. **Semidefinite relaxation**: lifts `CᵀC` into a PSD matrix variable and
//!    solves a trace-regularized least-squares relaxation with ADMM. Tolerates
//!    noise and missing measurements at a higher cost.
//!
//! Solver failures are returned as [`SolverError`](crate::SolverError);
//! comparing a result to ground truth gives a [`SolveStatus`] which maps onto
//! the three sweep [`Outcome`]s.

pub mod right_inverse;
pub mod sdp;
pub mod solve;

use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::trajectory::Trajectory;

// ── Strategy selector ───────────────────────────────────────────────────────

/// Solving strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Direct (pseudo-)inverse of the stacked constraint matrix.
    RightInverse,
    /// ADMM on the semidefinite relaxation.
    SemidefiniteRelaxation,
}

impl SolverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::RightInverse => "right_inverse",
            SolverKind::SemidefiniteRelaxation => "semidefinite_relaxation",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "right_inverse" | "rightInverseOfConstraints" => Ok(SolverKind::RightInverse),
            "semidefinite_relaxation" | "semidefRelaxationNoiseless" | "sdp" => {
                Ok(SolverKind::SemidefiniteRelaxation)
            }
            other => Err(format!("unknown solver '{other}'")),
        }
    }
}

// ── Status codes ────────────────────────────────────────────────────────────

/// Classification of one solve attempt against ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Noiseless right-inverse solve within the exact tolerance.
    SolvedExact,
    /// Solved within the user tolerance.
    SolvedAccurate,
    /// Solved, but the coefficients deviate beyond tolerance.
    SolvedInaccurate,
    /// The solver returned a [`SolverError`](crate::SolverError).
    SolverFailed,
}

impl SolveStatus {
    pub fn outcome(&self) -> Outcome {
        match self {
            SolveStatus::SolvedExact | SolveStatus::SolvedAccurate => Outcome::Success,
            SolveStatus::SolvedInaccurate => Outcome::AccuracyError,
            SolveStatus::SolverFailed => Outcome::SolverError,
        }
    }
}

/// Counted outcome of a solve in a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    Success,
    SolverError,
    AccuracyError,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Success, Outcome::SolverError, Outcome::AccuracyError];

    /// Key used in result file names.
    pub fn key(&self) -> &'static str {
        match self {
            Outcome::Success => "successes",
            Outcome::SolverError => "num-not-solved",
            Outcome::AccuracyError => "num-not-accurate",
        }
    }

    pub fn from_key(key: &str) -> Option<Outcome> {
        Outcome::ALL.into_iter().find(|o| o.key() == key)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Outcome::Success => 0,
            Outcome::SolverError => 1,
            Outcome::AccuracyError => 2,
        }
    }
}

// ── Configuration ───────────────────────────────────────────────────────────

/// Parameters of the ADMM semidefinite relaxation.
#[derive(Debug, Clone)]
pub struct SdpConfig {
    /// Iteration cap. Default 50000.
    pub max_iterations: usize,
    /// Relative primal/dual residual tolerance. Default 1e-9.
    pub tolerance: f64,
    /// Initial ADMM penalty. Default 1.0.
    pub rho: f64,
    /// Rebalance `rho` when primal and dual residuals drift apart. Default true.
    pub adaptive_rho: bool,
    /// Weight of the trace regularizer. Default 1e-8.
    pub trace_weight: f64,
}

impl Default for SdpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50_000,
            tolerance: 1e-9,
            rho: 1.0,
            adaptive_rho: true,
            trace_weight: 1e-8,
        }
    }
}

/// Parameters controlling a solve and its classification.
#[derive(Debug, Clone)]
pub struct SolveConfig {
    /// Strategy. Default semidefinite relaxation.
    pub solver: SolverKind,
    /// Coefficient tolerance for noisy or relaxed solves. Default 1e-6.
    pub accuracy_tolerance: f64,
    /// Coefficient tolerance for noiseless right-inverse solves. Default 1e-10.
    pub exact_tolerance: f64,
    /// Singular values below `rank_tolerance * σ_max` count as zero. Default 1e-10.
    pub rank_tolerance: f64,
    /// Distances are exact, so the right-inverse is held to `exact_tolerance`.
    /// Default true.
    pub noiseless: bool,
    /// Timeout in milliseconds. None = no timeout (default).
    pub solve_timeout_ms: Option<u64>,
    pub sdp: SdpConfig,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            solver: SolverKind::SemidefiniteRelaxation,
            accuracy_tolerance: 1e-6,
            exact_tolerance: 1e-10,
            rank_tolerance: 1e-10,
            noiseless: true,
            solve_timeout_ms: None,
            sdp: SdpConfig::default(),
        }
    }
}

impl SolveConfig {
    pub fn new(solver: SolverKind) -> Self {
        Self {
            solver,
            ..Default::default()
        }
    }

    /// True when results are judged against the exact tolerance.
    pub fn exact_mode(&self) -> bool {
        self.noiseless && self.solver == SolverKind::RightInverse
    }
}

// ── Solve result ────────────────────────────────────────────────────────────

/// Estimate produced by a successful solve.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Recovered `D x K` coefficients.
    pub trajectory: Trajectory,
    /// Full unknown vector of the linear system (right-inverse) or the
    /// vectorized relaxation matrix (semidefinite relaxation).
    pub solution: DVector<f64>,
    /// RMS of the measurement residual `d² - model`.
    pub residual_rms: f64,
    /// Numerical rank of the stacked constraint matrix (right-inverse), or of
    /// the relaxation matrix.
    pub rank: usize,
    /// ADMM iterations (0 for the right-inverse).
    pub iterations: usize,
    pub solver: SolverKind,
    /// Wall-clock time spent solving, in milliseconds.
    pub solve_time_ms: f32,
}

impl SolveResult {
    /// Compare against ground truth and classify.
    pub fn classify(&self, truth: &Trajectory, config: &SolveConfig) -> Result<SolveStatus, InputError> {
        let deviation = self.trajectory.max_abs_deviation(truth)?;
        Ok(if config.exact_mode() {
            if deviation <= config.exact_tolerance {
                SolveStatus::SolvedExact
            } else {
                SolveStatus::SolvedInaccurate
            }
        } else if deviation <= config.accuracy_tolerance {
            SolveStatus::SolvedAccurate
        } else {
            SolveStatus::SolvedInaccurate
        })
    }
}

pub use solve::{solve, solve_and_classify};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_keys_round_trip() {
        for o in Outcome::ALL {
            assert_eq!(Outcome::from_key(o.key()), Some(o));
        }
        assert_eq!(Outcome::from_key("bogus"), None);
    }

    #[test]
    fn status_maps_to_outcome() {
        assert_eq!(SolveStatus::SolvedExact.outcome(), Outcome::Success);
        assert_eq!(SolveStatus::SolvedAccurate.outcome(), Outcome::Success);
        assert_eq!(SolveStatus::SolvedInaccurate.outcome(), Outcome::AccuracyError);
        assert_eq!(SolveStatus::SolverFailed.outcome(), Outcome::SolverError);
    }

    #[test]
    fn solver_kind_names() {
        assert_eq!("right_inverse".parse::<SolverKind>(), Ok(SolverKind::RightInverse));
        assert_eq!(
            "semidefRelaxationNoiseless".parse::<SolverKind>(),
            Ok(SolverKind::SemidefiniteRelaxation)
        );
        assert!("nope".parse::<SolverKind>().is_err());
        let json = serde_json::to_string(&SolverKind::SemidefiniteRelaxation).unwrap();
        assert_eq!(json, "\"semidefinite_relaxation\"");
    }

    #[test]
    fn exact_mode_only_for_noiseless_right_inverse() {
        assert!(SolveConfig::new(SolverKind::RightInverse).exact_mode());
        assert!(!SolveConfig::new(SolverKind::SemidefiniteRelaxation).exact_mode());
        let noisy = SolveConfig {
            noiseless: false,
            ..SolveConfig::new(SolverKind::RightInverse)
        };
        assert!(!noisy.exact_mode());
    }
}
