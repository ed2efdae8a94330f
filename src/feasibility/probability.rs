//! Closed-form probabilities that a minimal measurement set is full rank.
//!
//! The smallest invertible left matrix has `(D+1) K` columns and needs at
//! least `D+1` anchors. With exactly `D+1` anchors every anchor must
//! contribute exactly `K` of the `(D+1) K` measurements drawn from the
//! `(D+1) N` available ones.

/// Natural log of the binomial coefficient, summed term by term.
fn ln_binomial(n: usize, k: usize) -> f64 {
    (0..k)
        .map(|i| ((n - i) as f64).ln() - ((i + 1) as f64).ln())
        .sum()
}

/// `C(N, K)^(D+1) / C((D+1) N, (D+1) K)`.
///
/// Returns NaN when `n_positions < n_constraints` and exactly 1 when they
/// are equal. Otherwise the log-space value is clamped to `[0, 1]`.
pub fn probability_full_matrix(n_dimensions: usize, n_constraints: usize, n_positions: usize) -> f64 {
    if n_positions < n_constraints {
        return f64::NAN;
    }
    if n_positions == n_constraints {
        return 1.0;
    }
    let groups = n_dimensions + 1;
    let full = groups as f64 * ln_binomial(n_positions, n_constraints);
    let total = ln_binomial(groups * n_positions, groups * n_constraints);
    (full - total).exp().clamp(0.0, 1.0)
}

/// Limit of [`probability_full_matrix`] for `n_positions -> inf`.
///
/// `sqrt(D+1) / (2 pi K)^(D/2)`. Stirling-based, so it is only tight for
/// large `n_constraints`.
pub fn probability_full_matrix_limit(n_dimensions: usize, n_constraints: usize) -> f64 {
    let d = n_dimensions as f64;
    (d + 1.0).sqrt() / (2.0 * std::f64::consts::PI * n_constraints as f64).powf(d / 2.0)
}
