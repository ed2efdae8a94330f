//! Solve entry points.

use tracing::debug;

use super::right_inverse::solve_right_inverse;
use super::sdp::solve_sdp;
use super::{SolveConfig, SolveResult, SolveStatus, SolverKind};
use crate::constraints::ConstraintSystem;
use crate::error::{InputError, SolveError};
use crate::trajectory::Trajectory;

/// Recover trajectory coefficients from `system` with the configured strategy.
///
/// Input errors and solver errors come back as distinct [`SolveError`]
/// variants so callers can abort on the former and count the latter.
pub fn solve(system: &ConstraintSystem<'_>, config: &SolveConfig) -> Result<SolveResult, SolveError> {
    let result = match config.solver {
        SolverKind::RightInverse => solve_right_inverse(system, config)?,
        SolverKind::SemidefiniteRelaxation => solve_sdp(system, config)?,
    };
    debug!(
        "Solved with {} in {:.2}ms: rank {}, residual rms {:.3e}",
        result.solver, result.solve_time_ms, result.rank, result.residual_rms
    );
    Ok(result)
}

/// Solve and classify against the ground-truth trajectory.
///
/// Solver errors become [`SolveStatus::SolverFailed`]; input errors propagate.
pub fn solve_and_classify(
    system: &ConstraintSystem<'_>,
    truth: &Trajectory,
    config: &SolveConfig,
) -> Result<SolveStatus, InputError> {
    match solve(system, config) {
        Ok(result) => result.classify(truth, config),
        Err(SolveError::Solver(err)) => {
            debug!("Solver failed: {}", err);
            Ok(SolveStatus::SolverFailed)
        }
        Err(SolveError::Input(err)) => Err(err),
    }
}
