//! # trajrec
//!
//! Offline **trajectory recovery from range measurements**.
//!
//! A point moves along a trajectory described by a truncated cosine
//! expansion, `p(n) = C f(n)` with a `D x K` coefficient matrix `C`. Fixed
//! anchors at known positions measure their distance to the point at some of
//! the `N` sample times. `trajrec` turns those distances into a linear
//! system in the coefficients, predicts whether a measurement pattern can
//! determine it, solves it, and measures how the solver degrades as
//! measurements go missing.
//!
//! ## Example
//!
//! ```no_run
//! use rand::{rngs::StdRng, SeedableRng};
//! use trajrec::{
//!     build_frame, solve, Anchors, ConstraintSystem, MeasurementSet, SolveConfig, SolverKind,
//!     Trajectory,
//! };
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let truth = Trajectory::random(2, 3, &mut rng).unwrap();
//! let anchors = Anchors::random(2, 4, 10.0, &mut rng).unwrap();
//! let frame = build_frame(3, 10).unwrap();
//!
//! // every anchor measured at every sample, then drop a few
//! let measurements = MeasurementSet::complete(&truth, &anchors, &frame)
//!     .unwrap()
//!     .without_random(5, &mut rng)
//!     .unwrap();
//!
//! let system = ConstraintSystem::new(&anchors, &frame, &measurements).unwrap();
//! let result = solve(&system, &SolveConfig::new(SolverKind::RightInverse)).unwrap();
//! println!(
//!     "deviation {:.2e} in {:.2} ms",
//!     result.trajectory.max_abs_deviation(&truth).unwrap(),
//!     result.solve_time_ms
//! );
//! ```
//!
//! ## Components
//!
//! 1. **Constraints** ([`constraints`]): cosine frame, left and reduced-right
//!    constraint matrices, and the measurement-ordered [`ConstraintSystem`].
//! 2. **Feasibility** ([`feasibility`]): closed-form and Monte-Carlo estimates
//!    of how likely a random measurement pattern gives a full-rank system.
//! 3. **Solver** ([`solver`]): SVD right-inverse and an ADMM semidefinite
//!    relaxation, with results classified as exact, accurate, inaccurate or
//!    failed.
//! 4. **Sweep** ([`sweep`]): Monte-Carlo degradation curves over
//!    (complexity, anchors, positions, missing count), persisted as JSON
//!    parameters and CSV tables.
//! 5. **Alignment** ([`alignment`]): orthogonal Procrustes fit between
//!    corresponding point sets.

pub mod alignment;
pub mod anchors;
pub mod constraints;
pub mod error;
pub mod feasibility;
pub mod measurement;
pub mod solver;
pub mod sweep;
pub mod trajectory;

pub use alignment::{align, Alignment};
pub use anchors::Anchors;
pub use constraints::{
    build_frame, build_left_matrix, build_reduced_right_matrix, ConstraintSystem, Frame,
};
pub use error::{InputError, SolveError, SolverError, SweepError};
pub use feasibility::{
    estimate_feasibility, probability_full_matrix, probability_full_matrix_limit,
    FeasibilityConfig, FeasibilityCounts,
};
pub use measurement::{Measurement, MeasurementSet};
pub use solver::{
    solve, solve_and_classify, Outcome, SdpConfig, SolveConfig, SolveResult, SolveStatus,
    SolverKind,
};
pub use sweep::{run_sweep, Config, OutcomeTable, SweepParameters, SweepResults};
pub use trajectory::Trajectory;
