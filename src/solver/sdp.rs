//! Semidefinite relaxation solved with ADMM.
//!
//! The relaxation variable is the symmetric `(D+K) x (D+K)` matrix
//!
//! ```text
//!     Z = [ I_D  C ]
//!         [ Cᵀ   L ]      Z ⪰ 0,
//! ```
//!
//! where `L` stands in for `CᵀC`. Each measurement is linear in `Z`:
//! `d² - |a|² = -2 aᵀ C f + fᵀ L f`. We minimize
//!
//! ```text
//!     ½ Σ (<A_i, Z> - (d_i² - |a_i|²))² + w trace(Z)
//! ```
//!
//! subject to the identity block and `Z ⪰ 0`. The least-squares form keeps
//! the problem feasible under noise; the trace term favors low rank when
//! measurements are missing.
//!
//! Symmetric matrices are handled as `svec` vectors (upper triangle,
//! row-major, off-diagonals scaled by √2) so that `<A, Z> = svec(A)·svec(Z)`.
//! ADMM splits `Z` into an affine/quadratic copy `x` and a PSD copy `y`:
//!
//! 1. `x`: equality-constrained QP, solved through a cached KKT inverse.
//! 2. `y`: projection onto the PSD cone (eigenvalue clipping).
//! 3. `u`: scaled dual update, with residual balancing of `ρ`.

use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::{SolveConfig, SolveResult, SolverKind};
use crate::constraints::ConstraintSystem;
use crate::error::{InputError, SolveError, SolverError};
use crate::trajectory::Trajectory;

/// Residual ratio that triggers a `ρ` update.
const BALANCE_RATIO: f64 = 10.0;
/// Factor applied to `ρ` on rebalancing.
const BALANCE_SCALE: f64 = 2.0;
/// Iterations between balancing checks.
const BALANCE_EVERY: usize = 25;
/// Eigenvalues of the PSD copy below this fraction of the largest are
/// treated as zero when reporting rank.
const RANK_RELATIVE: f64 = 1e-6;

fn svec_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Position of `(i, j)`, `i <= j`, in the `svec` of an `n x n` matrix.
fn svec_index(n: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i <= j { (i, j) } else { (j, i) };
    i * n - i * i.saturating_sub(1) / 2 + (j - i)
}

fn svec(m: &DMatrix<f64>) -> DVector<f64> {
    let n = m.nrows();
    let mut v = DVector::zeros(svec_len(n));
    for i in 0..n {
        for j in i..n {
            let scale = if i == j { 1.0 } else { std::f64::consts::SQRT_2 };
            v[svec_index(n, i, j)] = scale * m[(i, j)];
        }
    }
    v
}

fn smat(v: &DVector<f64>, n: usize) -> DMatrix<f64> {
    let mut m = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let value = v[svec_index(n, i, j)];
            if i == j {
                m[(i, i)] = value;
            } else {
                let value = value / std::f64::consts::SQRT_2;
                m[(i, j)] = value;
                m[(j, i)] = value;
            }
        }
    }
    m
}

/// Euclidean projection onto the PSD cone.
fn project_psd(v: &DVector<f64>, n: usize) -> DVector<f64> {
    let mut eig = smat(v, n).symmetric_eigen();
    eig.eigenvalues.apply(|e| *e = e.max(0.0));
    svec(&eig.recompose())
}

/// Measurement rows `svec(A_i)` and the identity-block selector.
struct Relaxation {
    n: usize,
    measurements: DMatrix<f64>,
    targets: DVector<f64>,
    identity_rows: DMatrix<f64>,
    identity_targets: DVector<f64>,
}

impl Relaxation {
    fn build(system: &ConstraintSystem<'_>) -> Result<Self, InputError> {
        let dim = system.dim();
        let k = system.n_constraints();
        let n = dim + k;
        let p = svec_len(n);
        let ms = system.measurements();

        let mut measurements = DMatrix::zeros(ms.len(), p);
        for (row, m) in ms.iter().enumerate() {
            let a = system.anchors().position(m.anchor)?;
            let f = system.frame().column(m.frame_index)?;
            let mut coeff = DMatrix::<f64>::zeros(n, n);
            for d in 0..dim {
                for kk in 0..k {
                    coeff[(d, dim + kk)] = -a[d] * f[kk];
                    coeff[(dim + kk, d)] = -a[d] * f[kk];
                }
            }
            for kk in 0..k {
                for l in 0..k {
                    coeff[(dim + kk, dim + l)] = f[kk] * f[l];
                }
            }
            measurements.row_mut(row).copy_from(&svec(&coeff).transpose());
        }

        let n_identity = svec_len(dim);
        let mut identity_rows = DMatrix::zeros(n_identity, p);
        let mut identity_targets = DVector::zeros(n_identity);
        let mut row = 0;
        for i in 0..dim {
            for j in i..dim {
                identity_rows[(row, svec_index(n, i, j))] = 1.0;
                identity_targets[row] = if i == j { 1.0 } else { 0.0 };
                row += 1;
            }
        }

        Ok(Self {
            n,
            measurements,
            targets: system.rhs().clone(),
            identity_rows,
            identity_targets,
        })
    }

    /// Inverse of the KKT matrix of the `x` update for penalty `rho`.
    fn kkt_inverse(&self, gram: &DMatrix<f64>, rho: f64) -> Result<DMatrix<f64>, SolverError> {
        let p = gram.nrows();
        let e = self.identity_rows.nrows();
        let mut kkt = DMatrix::zeros(p + e, p + e);
        kkt.view_mut((0, 0), (p, p)).copy_from(gram);
        for i in 0..p {
            kkt[(i, i)] += rho;
        }
        kkt.view_mut((p, 0), (e, p)).copy_from(&self.identity_rows);
        kkt.view_mut((0, p), (p, e))
            .copy_from(&self.identity_rows.transpose());
        kkt.try_inverse()
            .ok_or_else(|| SolverError::Numerical("singular KKT system".to_string()))
    }
}

pub fn solve_sdp(
    system: &ConstraintSystem<'_>,
    config: &SolveConfig,
) -> Result<SolveResult, SolveError> {
    let t0 = Instant::now();
    let sdp = &config.sdp;
    let relaxation = Relaxation::build(system)?;
    let n = relaxation.n;
    let p = svec_len(n);
    let e = relaxation.identity_rows.nrows();

    let gram = relaxation.measurements.transpose() * &relaxation.measurements;
    let linear = relaxation.measurements.transpose() * &relaxation.targets
        - svec(&DMatrix::identity(n, n)) * sdp.trace_weight;

    let mut rho = sdp.rho;
    let mut kkt_inv = relaxation.kkt_inverse(&gram, rho)?;
    let mut x = svec(&DMatrix::identity(n, n));
    let mut y = x.clone();
    let mut u = DVector::<f64>::zeros(p);
    let sqrt_p = (p as f64).sqrt();

    let mut iterations = 0;
    let mut primal = f64::INFINITY;
    let mut dual = f64::INFINITY;
    let mut converged = false;
    while iterations < sdp.max_iterations {
        if let Some(t) = config.solve_timeout_ms {
            let elapsed = t0.elapsed().as_secs_f32() * 1000.0;
            if elapsed >= t as f32 {
                debug!("SDP timeout after {:.1}ms ({} iterations)", elapsed, iterations);
                return Err(SolverError::Timeout { elapsed_ms: elapsed }.into());
            }
        }
        iterations += 1;

        let mut rhs = DVector::<f64>::zeros(p + e);
        rhs.rows_mut(0, p)
            .copy_from(&(&linear + (&y - &u) * rho));
        rhs.rows_mut(p, e).copy_from(&relaxation.identity_targets);
        x = (&kkt_inv * rhs).rows(0, p).into_owned();

        let y_prev = y;
        y = project_psd(&(&x + &u), n);
        u += &x - &y;

        primal = (&x - &y).norm();
        dual = rho * (&y - &y_prev).norm();
        if !primal.is_finite() || !dual.is_finite() {
            return Err(SolverError::Numerical(format!(
                "non-finite residual at iteration {iterations}"
            ))
            .into());
        }
        let eps_primal = sdp.tolerance * (sqrt_p + x.norm().max(y.norm()));
        let eps_dual = sdp.tolerance * (sqrt_p + rho * u.norm());
        if primal <= eps_primal && dual <= eps_dual {
            converged = true;
            break;
        }

        if sdp.adaptive_rho && iterations % BALANCE_EVERY == 0 {
            let scale = if primal > BALANCE_RATIO * dual {
                BALANCE_SCALE
            } else if dual > BALANCE_RATIO * primal {
                1.0 / BALANCE_SCALE
            } else {
                1.0
            };
            if scale != 1.0 {
                rho *= scale;
                u /= scale;
                kkt_inv = relaxation.kkt_inverse(&gram, rho)?;
            }
        }
    }

    debug!(
        "SDP: {} iterations, primal {:.3e}, dual {:.3e}, rho {:.3e}",
        iterations, primal, dual, rho
    );
    if !converged {
        return Err(SolverError::NotConverged {
            iterations,
            primal_residual: primal,
            dual_residual: dual,
        }
        .into());
    }

    let z = smat(&x, n);
    let dim = system.dim();
    let k = system.n_constraints();
    let coeffs = z.view((0, dim), (dim, k)).into_owned();
    let trajectory =
        Trajectory::new(coeffs).map_err(|err| SolverError::Numerical(err.to_string()))?;

    let residual = &relaxation.measurements * &x - &relaxation.targets;
    let residual_rms = residual.norm() / (relaxation.targets.len() as f64).sqrt();
    let eigenvalues = smat(&y, n).symmetric_eigenvalues();
    let cutoff = eigenvalues.amax() * RANK_RELATIVE;
    let rank = eigenvalues.iter().filter(|&&v| v > cutoff).count();

    Ok(SolveResult {
        trajectory,
        solution: x,
        residual_rms,
        rank,
        iterations,
        solver: SolverKind::SemidefiniteRelaxation,
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
    fn svec_preserves_inner_product() {
        let a = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 5.0, 3.0, 5.0, 6.0]);
        let b = DMatrix::from_row_slice(3, 3, &[0.5, -1.0, 0.0, -1.0, 2.0, 1.5, 0.0, 1.5, -3.0]);
        let full: f64 = a.component_mul(&b).sum();
        assert!((svec(&a).dot(&svec(&b)) - full).abs() < 1e-12);
        assert!((smat(&svec(&a), 3) - &a).amax() < 1e-15);
    }

    #[test]
    fn svec_indices_are_dense() {
        let n = 4;
        let mut seen = vec![false; svec_len(n)];
        for i in 0..n {
            for j in i..n {
                seen[svec_index(n, i, j)] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(svec_index(n, 2, 1), svec_index(n, 1, 2));
    }

    #[test]
    fn psd_projection_clips_negative_eigenvalues() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -2.0]);
        let projected = smat(&project_psd(&svec(&m), 2), 2);
        assert!((projected - DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0])).amax() < 1e-12);
    }

    #[test]
    fn measurement_rows_reproduce_rhs() {
        let mut rng = StdRng::seed_from_u64(7);
        let truth = Trajectory::random(2, 3, &mut rng).unwrap();
        let anchors = Anchors::random(2, 3, 10.0, &mut rng).unwrap();
        let frame = build_frame(3, 6).unwrap();
        let ms = MeasurementSet::complete(&truth, &anchors, &frame).unwrap();
        let system = ConstraintSystem::new(&anchors, &frame, &ms).unwrap();
        let relaxation = Relaxation::build(&system).unwrap();

        let c = truth.coeffs();
        let mut z = DMatrix::<f64>::identity(5, 5);
        z.view_mut((0, 2), (2, 3)).copy_from(c);
        z.view_mut((2, 0), (3, 2)).copy_from(&c.transpose());
        z.view_mut((2, 2), (3, 3)).copy_from(&(c.transpose() * c));
        let model = &relaxation.measurements * svec(&z);
        assert!((model - &relaxation.targets).amax() < 1e-9);
    }

    #[test]
    fn recovers_noiseless_trajectory() {
        let mut rng = StdRng::seed_from_u64(8);
        let truth = Trajectory::random(2, 3, &mut rng).unwrap();
        let anchors = Anchors::random(2, 4, 10.0, &mut rng).unwrap();
        let frame = build_frame(3, 10).unwrap();
        let ms = MeasurementSet::complete(&truth, &anchors, &frame).unwrap();
        let system = ConstraintSystem::new(&anchors, &frame, &ms).unwrap();
        let result = solve_sdp(&system, &SolveConfig::default()).unwrap();
        let dev = result.trajectory.max_abs_deviation(&truth).unwrap();
        println!("SDP: {} iterations, deviation {:.3e}", result.iterations, dev);
        assert!(dev < 1e-6, "deviation {dev}");
    }

    #[test]
    fn iteration_cap_reports_not_converged() {
        let mut rng = StdRng::seed_from_u64(9);
        let truth = Trajectory::random(2, 3, &mut rng).unwrap();
        let anchors = Anchors::random(2, 4, 10.0, &mut rng).unwrap();
        let frame = build_frame(3, 10).unwrap();
        let ms = MeasurementSet::complete(&truth, &anchors, &frame).unwrap();
        let system = ConstraintSystem::new(&anchors, &frame, &ms).unwrap();
        let mut config = SolveConfig::default();
        config.sdp.max_iterations = 2;
        assert!(matches!(
            solve_sdp(&system, &config),
            Err(SolveError::Solver(SolverError::NotConverged { iterations: 2, .. }))
        ));
    }

    #[test]
    fn zero_time_budget_times_out() {
        let mut rng = StdRng::seed_from_u64(10);
        let truth = Trajectory::random(2, 3, &mut rng).unwrap();
        let anchors = Anchors::random(2, 4, 10.0, &mut rng).unwrap();
        let frame = build_frame(3, 10).unwrap();
        let ms = MeasurementSet::complete(&truth, &anchors, &frame).unwrap();
        let system = ConstraintSystem::new(&anchors, &frame, &ms).unwrap();
        let config = SolveConfig {
            solve_timeout_ms: Some(0),
            ..SolveConfig::default()
        };
        assert!(matches!(
            solve_sdp(&system, &config),
            Err(SolveError::Solver(SolverError::Timeout { .. }))
        ));
    }
}
