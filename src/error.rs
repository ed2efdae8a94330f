//! Error types.
//!
//! Failures fall into three families that callers must be able to tell apart:
//!
//! - [`InputError`]: malformed requests (bad sizes, out-of-range indices,
//!   shape mismatches). These are never caught inside the crate.
//! - [`SolverError`]: the numerical solve itself failed (singular system,
//!   relaxation did not converge, timeout). The sweep harness counts these
//!   instead of aborting.
//! - [`SweepError`]: run-level failures, most importantly a conflicting
//!   parameter file in the output directory.
//!
//! An inaccurate reconstruction is not an error at all; see
//! [`SolveStatus::SolvedInaccurate`](crate::SolveStatus::SolvedInaccurate).

use std::path::PathBuf;

use thiserror::Error;

/// Invalid arguments: wrong sizes, indices or shapes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// A size argument that must be strictly positive was zero.
    #[error("{name} must be positive")]
    NonPositive { name: &'static str },

    /// An anchor or frame index points past the end of its container.
    #[error("{what} index {index} out of range (length {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Two arrays that must agree in shape do not.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The same (anchor, frame) pair appears twice in a measurement set.
    #[error("duplicate measurement for anchor {anchor} at frame index {frame_index}")]
    DuplicateMeasurement { anchor: usize, frame_index: usize },

    /// More measurements were requested than the anchor/position grid holds.
    #[error("requested {requested} measurements but only {available} are available")]
    TooManyMeasurements { requested: usize, available: usize },

    /// A measurement set must contain at least one measurement.
    #[error("measurement set is empty")]
    NoMeasurements,

    /// NaN or infinite values in an input array.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// A stored outcome counter is negative, fractional, infinite or larger
    /// than `u32::MAX`.
    #[error("invalid outcome counter {0}")]
    InvalidCounter(f64),

    /// The exact feasibility predicate would enumerate too many subsets.
    #[error("exact feasibility check needs {subsets} subsets, limit is {limit}")]
    EnumerationTooLarge { subsets: u128, limit: u128 },
}

/// The solve could not produce an estimate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The trajectory coefficients are not determined by the measurements.
    #[error(
        "coefficients not identifiable: rank {rank} of {unknowns} unknowns from {measurements} measurements"
    )]
    Singular {
        rank: usize,
        unknowns: usize,
        measurements: usize,
    },

    /// The semidefinite relaxation ran out of iterations.
    #[error(
        "relaxation did not converge in {iterations} iterations (primal {primal_residual:.3e}, dual {dual_residual:.3e})"
    )]
    NotConverged {
        iterations: usize,
        primal_residual: f64,
        dual_residual: f64,
    },

    /// The wall-clock budget was exhausted.
    #[error("solve timed out after {elapsed_ms:.1} ms")]
    Timeout { elapsed_ms: f32 },

    /// A decomposition failed or produced non-finite values.
    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Error returned by [`solve`](crate::solve).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Error returned by [`run_sweep`](crate::run_sweep).
#[derive(Error, Debug)]
pub enum SweepError {
    /// The output directory already holds parameters for a different run.
    #[error("parameters in {} differ from the requested run: {detail}", path.display())]
    ConfigConflict { path: PathBuf, detail: String },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
