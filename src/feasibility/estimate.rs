//! Monte-Carlo estimate of how often random incidence patterns satisfy the
//! anchor and position covering conditions needed for a full-rank left
//! matrix.

use nalgebra::DMatrix;
use rand::RngExt;
use rand_distr::{Distribution, Poisson};
use tracing::debug;

use super::subsets::covers_after_any_removal;
use super::{FeasibilityConfig, FeasibilityCounts};
use crate::error::InputError;

/// Sufficient condition on per-item measurement counts.
///
/// The `a` best-covered items each need `b` measurements. Whatever the
/// remaining items hold must make up for the shortfall of the best `a`.
pub fn fast_condition(counts: &[usize], a: usize, b: usize) -> bool {
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let split = sorted.len().saturating_sub(a);
    let extra: usize = sorted[..split].iter().sum();
    let absent = a.saturating_sub(sorted.len());
    let missing: usize =
        sorted[split..].iter().map(|&c| b.saturating_sub(c)).sum::<usize>() + absent * b;
    extra >= missing
}

/// Exact condition: removing any `critical - 1` items leaves at least
/// `requirement` measurements.
pub fn exact_condition(
    counts: &[usize],
    critical: usize,
    requirement: usize,
    max_subsets: u128,
) -> Result<bool, InputError> {
    covers_after_any_removal(counts, critical.saturating_sub(1), requirement, max_subsets)
}

/// Per-anchor and per-position measurement counts of an
/// `n_anchors x n_positions` incidence matrix.
pub fn marginal_counts(incidence: &DMatrix<u8>) -> (Vec<usize>, Vec<usize>) {
    let per_anchor = incidence
        .row_iter()
        .map(|r| r.iter().map(|&v| v as usize).sum())
        .collect();
    let per_position = incidence
        .column_iter()
        .map(|c| c.iter().map(|&v| v as usize).sum())
        .collect();
    (per_anchor, per_position)
}

/// Evaluate both covering conditions on one incidence matrix.
///
/// Returns `(anchors_feasible, positions_feasible)`.
pub fn check_incidence(
    incidence: &DMatrix<u8>,
    n_constraints: usize,
    min_anchors: usize,
    config: &FeasibilityConfig,
) -> Result<(bool, bool), InputError> {
    let (per_anchor, per_position) = marginal_counts(incidence);
    if config.use_fast_condition {
        Ok((
            fast_condition(&per_anchor, min_anchors, n_constraints),
            fast_condition(&per_position, n_constraints, min_anchors),
        ))
    } else {
        Ok((
            exact_condition(&per_anchor, min_anchors, n_constraints, config.max_exact_subsets)?,
            exact_condition(&per_position, n_constraints, min_anchors, config.max_exact_subsets)?,
        ))
    }
}

fn extra_count<R: RngExt + ?Sized>(poisson: Option<&Poisson<f64>>, rng: &mut R) -> usize {
    match poisson {
        Some(p) => p.sample(rng) as usize,
        None => 0,
    }
}

/// Run `config.trials` random incidence draws and count how many satisfy the
/// anchor condition, the position condition, and both.
///
/// Only draws holding at least `n_constraints * min_anchors` measurements
/// are evaluated and counted in `total`. The caller seeds `rng`.
pub fn estimate_feasibility<R: RngExt + ?Sized>(
    n_constraints: usize,
    min_anchors: usize,
    config: &FeasibilityConfig,
    rng: &mut R,
) -> Result<FeasibilityCounts, InputError> {
    if n_constraints == 0 {
        return Err(InputError::NonPositive { name: "n_constraints" });
    }
    if min_anchors == 0 {
        return Err(InputError::NonPositive { name: "min_anchors" });
    }
    if !config.mean_extra.is_finite() || config.mean_extra < 0.0 {
        return Err(InputError::NonFinite("poisson mean"));
    }
    // Poisson rejects a zero mean; zero extra items is the same draw.
    let poisson = if config.mean_extra > 0.0 {
        Some(
            Poisson::new(config.mean_extra)
                .map_err(|_| InputError::NonFinite("poisson mean"))?,
        )
    } else {
        None
    };

    let needed = n_constraints * min_anchors;
    let mut counts = FeasibilityCounts::default();
    for _ in 0..config.trials {
        let n_anchors = min_anchors + extra_count(poisson.as_ref(), rng);
        let n_positions = n_constraints + extra_count(poisson.as_ref(), rng);
        let p = (needed as f64 / (n_anchors * n_positions) as f64).min(1.0);
        let incidence = DMatrix::from_fn(n_anchors, n_positions, |_, _| rng.random_bool(p) as u8);

        let n_measurements: usize = incidence.iter().map(|&v| v as usize).sum();
        if n_measurements < needed {
            continue;
        }
        counts.total += 1;
        let (anchors_ok, positions_ok) =
            check_incidence(&incidence, n_constraints, min_anchors, config)?;
        counts.anchors_feasible += anchors_ok as usize;
        counts.positions_feasible += positions_ok as usize;
        counts.both_feasible += (anchors_ok && positions_ok) as usize;
    }
    debug!(
        "Feasibility K={} min_anchors={}: {:?}",
        n_constraints, min_anchors, counts
    );
    Ok(counts)
}
