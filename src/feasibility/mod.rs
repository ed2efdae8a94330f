//! Rank feasibility of the left constraint matrix.
//!
//! Predicts, without solving, whether a measurement pattern can give a
//! uniquely determined system:
//!
//! 1. **Closed form**: probability that a minimal random measurement set
//!    spreads evenly over the minimal number of anchors, and its large-N
//!    limit.
//! 2. **Monte-Carlo**: random anchor/position incidence patterns checked
//!    against covering conditions, either exactly (bounded subset
//!    enumeration, exponential in the table size) or through a fast
//!    sufficient condition on sorted row/column sums.

pub mod estimate;
pub mod probability;
pub mod subsets;

pub use estimate::{check_incidence, estimate_feasibility, fast_condition};
pub use probability::{probability_full_matrix, probability_full_matrix_limit};

/// Parameters of the Monte-Carlo feasibility estimator.
#[derive(Debug, Clone)]
pub struct FeasibilityConfig {
    /// Number of random incidence patterns to draw. Default 10000.
    pub trials: usize,
    /// Mean of the Poisson-distributed number of anchors and positions added
    /// on top of the minimum. Default 1.0.
    pub mean_extra: f64,
    /// Use the fast sufficient condition instead of exact enumeration.
    /// Default true.
    pub use_fast_condition: bool,
    /// Upper bound on the subsets the exact condition may enumerate per
    /// check. Default 1_000_000.
    pub max_exact_subsets: u128,
}

impl Default for FeasibilityConfig {
    fn default() -> Self {
        Self {
            trials: 10_000,
            mean_extra: 1.0,
            use_fast_condition: true,
            max_exact_subsets: 1_000_000,
        }
    }
}

/// Outcome counters of [`estimate_feasibility`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeasibilityCounts {
    /// Draws whose per-anchor counts satisfied the anchor condition.
    pub anchors_feasible: usize,
    /// Draws whose per-position counts satisfied the position condition.
    pub positions_feasible: usize,
    /// Draws satisfying both.
    pub both_feasible: usize,
    /// Draws with enough measurements to be evaluated at all.
    pub total: usize,
}

impl FeasibilityCounts {
    /// Fraction of evaluated draws satisfying both conditions (NaN if none).
    pub fn both_fraction(&self) -> f64 {
        self.both_feasible as f64 / self.total as f64
    }
}
