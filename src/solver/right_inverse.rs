//! Right-inverse strategy.
//!
//! Solves `Tᵀ θ = d² - |a|²` with the SVD pseudo-inverse of `Tᵀ` and reads
//! `C = -θ[..DK] / 2`. The minimum-norm solution is only meaningful when
//! every coefficient coordinate lies in the row space of `Tᵀ`; otherwise the
//! system is reported singular.

use std::time::Instant;

use tracing::debug;

use super::{SolveConfig, SolveResult, SolverKind};
use crate::constraints::ConstraintSystem;
use crate::error::SolverError;
use crate::trajectory::Trajectory;

/// Squared row-space projection a coefficient axis must reach to count as
/// identifiable.
const IDENTIFIABLE_MIN: f64 = 1.0 - 1e-6;

pub fn solve_right_inverse(
    system: &ConstraintSystem<'_>,
    config: &SolveConfig,
) -> Result<SolveResult, SolverError> {
    let t0 = Instant::now();
    let a = system.stacked().transpose();
    let y = system.rhs();
    let (n_measurements, n_unknowns) = a.shape();

    let svd = a.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    let tol = sigma_max * config.rank_tolerance;
    let rank = svd.singular_values.iter().filter(|&&s| s > tol).count();

    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| SolverError::Numerical("SVD did not return V".to_string()))?;

    // Coefficient axis j is determined iff its projection onto the span of
    // the retained right singular vectors has unit length.
    let n_coeffs = system.num_coefficients();
    let identifiable = (0..n_coeffs).all(|j| {
        let proj: f64 = svd
            .singular_values
            .iter()
            .enumerate()
            .filter(|(_, &s)| s > tol)
            .map(|(r, _)| v_t[(r, j)] * v_t[(r, j)])
            .sum();
        proj >= IDENTIFIABLE_MIN
    });
    debug!(
        "Right-inverse: {} measurements, {} unknowns, rank {}, identifiable {}",
        n_measurements, n_unknowns, rank, identifiable
    );
    if !identifiable {
        return Err(SolverError::Singular {
            rank,
            unknowns: n_unknowns,
            measurements: n_measurements,
        });
    }

    let theta = svd
        .solve(y, tol)
        .map_err(|e| SolverError::Numerical(e.to_string()))?;
    if theta.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::Numerical("non-finite solution".to_string()));
    }

    let residual = &a * &theta - y;
    let residual_rms = residual.norm() / (n_measurements as f64).sqrt();

    let flat: Vec<f64> = theta.rows(0, n_coeffs).iter().map(|v| -0.5 * v).collect();
    let trajectory = Trajectory::from_flat(system.dim(), system.n_constraints(), &flat)
        .map_err(|e| SolverError::Numerical(e.to_string()))?;

    Ok(SolveResult {
        trajectory,
        solution: theta,
        residual_rms,
        rank,
        iterations: 0,
        solver: SolverKind::RightInverse,
        solve_time_ms: t0.elapsed().as_secs_f32() * 1000.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::Anchors;
    use crate::constraints::build_frame;
    use crate::measurement::MeasurementSet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn recovers_noiseless_trajectory() {
        let mut rng = StdRng::seed_from_u64(100);
        let truth = Trajectory::random(2, 3, &mut rng).unwrap();
        let anchors = Anchors::random(2, 4, 10.0, &mut rng).unwrap();
        let frame = build_frame(3, 10).unwrap();
        let ms = MeasurementSet::complete(&truth, &anchors, &frame).unwrap();
        let system = ConstraintSystem::new(&anchors, &frame, &ms).unwrap();

        let result = solve_right_inverse(&system, &SolveConfig::default()).unwrap();
        assert_eq!(result.rank, system.num_unknowns());
        let dev = result.trajectory.max_abs_deviation(&truth).unwrap();
        assert!(dev < 1e-10, "deviation {dev}");
        assert!(result.residual_rms < 1e-8);
    }

    #[test]
    fn too_few_measurements_are_singular() {
        let mut rng = StdRng::seed_from_u64(101);
        let truth = Trajectory::random(2, 3, &mut rng).unwrap();
        let anchors = Anchors::random(2, 3, 10.0, &mut rng).unwrap();
        let frame = build_frame(3, 5).unwrap();
        let full = MeasurementSet::complete(&truth, &anchors, &frame).unwrap();
        // 5 measurements cannot determine 6 coefficients
        let sparse = full.without_random(10, &mut rng).unwrap();
        let system = ConstraintSystem::new(&anchors, &frame, &sparse).unwrap();
        assert!(matches!(
            solve_right_inverse(&system, &SolveConfig::default()),
            Err(SolverError::Singular { .. })
        ));
    }
}
