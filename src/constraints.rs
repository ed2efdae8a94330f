//! Cosine frame and the bilinear constraint system.
//!
//! For an anchor `a` and a trajectory `C` sampled at frame column `f`, the
//! squared range is
//!
//! ```text
//! d² = |a|² - 2 aᵀ C f + fᵀ CᵀC f
//! ```
//!
//! The linear part is captured by the *left* matrix, whose column for a
//! measurement is `vec([a; 1] ⊗ f)`. The quadratic term `fᵀ CᵀC f` is a
//! combination of `cos(j x)`, `j = 0..2K-2`; the `[1] ⊗ f` rows already span
//! `j < K`, and the *reduced right* matrix `f[1..] · f[K-1]` supplies the
//! remaining `K-1` harmonics, since
//! `cos(j x) cos((K-1) x) = (cos((j+K-1) x) + cos((K-1-j) x)) / 2`.
//! This identity is specific to the cosine frame.
//!
//! Stacking both gives `T`, of shape `((D+2)K - 1) x M`, and the system
//! `Tᵀ θ = d² - |a|²` with unknowns `θ = [vec(-2C); b; c]`.

use nalgebra::{DMatrix, DVector};

use crate::anchors::Anchors;
use crate::error::InputError;
use crate::measurement::{Measurement, MeasurementSet};

/// Cosine sampling frame, `F[k, n] = cos(k n π / N)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    matrix: DMatrix<f64>,
}

impl Frame {
    /// Number of basis functions K (rows).
    pub fn n_constraints(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of samples N (columns).
    pub fn n_positions(&self) -> usize {
        self.matrix.ncols()
    }

    /// The `K x N` frame matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Frame column for sample `index`.
    pub fn column(&self, index: usize) -> Result<DVector<f64>, InputError> {
        if index >= self.n_positions() {
            return Err(InputError::IndexOutOfRange {
                what: "frame",
                index,
                len: self.n_positions(),
            });
        }
        Ok(self.matrix.column(index).into_owned())
    }
}

/// Build the `n_constraints x n_positions` cosine frame.
pub fn build_frame(n_constraints: usize, n_positions: usize) -> Result<Frame, InputError> {
    if n_constraints == 0 {
        return Err(InputError::NonPositive { name: "n_constraints" });
    }
    if n_positions == 0 {
        return Err(InputError::NonPositive { name: "n_positions" });
    }
    let scale = std::f64::consts::PI / n_positions as f64;
    let matrix = DMatrix::from_fn(n_constraints, n_positions, |k, n| {
        ((k * n) as f64 * scale).cos()
    });
    Ok(Frame { matrix })
}

/// Left submatrix, shape `((D+1) K) x M`.
///
/// Column `i` is `[a; 1] ⊗ f` flattened row-major for measurement `i`, so
/// entry `d * K + k` holds `a_d f_k` (with `a_D = 1`).
pub fn build_left_matrix(
    measurements: &[Measurement],
    anchors: &Anchors,
    frame: &Frame,
) -> Result<DMatrix<f64>, InputError> {
    let k = frame.n_constraints();
    let rows = (anchors.dim() + 1) * k;
    let mut left = DMatrix::<f64>::zeros(rows, measurements.len());
    for (i, m) in measurements.iter().enumerate() {
        let a = anchors.extended(m.anchor)?;
        let f = frame.column(m.frame_index)?;
        for (d, &ad) in a.iter().enumerate() {
            for (kk, &fk) in f.iter().enumerate() {
                left[(d * k + kk, i)] = ad * fk;
            }
        }
    }
    Ok(left)
}

/// Reduced right submatrix, shape `(K-1) x M`: column `i` is `f[1..] * f[K-1]`.
pub fn build_reduced_right_matrix(
    frame_indices: &[usize],
    frame: &Frame,
) -> Result<DMatrix<f64>, InputError> {
    let k = frame.n_constraints();
    let mut right = DMatrix::<f64>::zeros(k - 1, frame_indices.len());
    for (i, &n) in frame_indices.iter().enumerate() {
        let f = frame.column(n)?;
        let last = f[k - 1];
        for kk in 1..k {
            right[(kk - 1, i)] = f[kk] * last;
        }
    }
    Ok(right)
}

/// The full linear system for one measurement set.
///
/// Holds references to the anchors, frame and measurements it was built from,
/// so the solvers see matrices and distances in a single, consistent order.
#[derive(Debug, Clone)]
pub struct ConstraintSystem<'a> {
    anchors: &'a Anchors,
    frame: &'a Frame,
    measurements: &'a MeasurementSet,
    left: DMatrix<f64>,
    right: DMatrix<f64>,
    rhs: DVector<f64>,
}

impl<'a> ConstraintSystem<'a> {
    pub fn new(
        anchors: &'a Anchors,
        frame: &'a Frame,
        measurements: &'a MeasurementSet,
    ) -> Result<Self, InputError> {
        if measurements.is_empty() {
            return Err(InputError::NoMeasurements);
        }
        let left = build_left_matrix(measurements.as_slice(), anchors, frame)?;
        let right = build_reduced_right_matrix(&measurements.frame_indices(), frame)?;
        let mut rhs = measurements.distances_squared();
        for (i, m) in measurements.iter().enumerate() {
            rhs[i] -= anchors.norm_squared(m.anchor)?;
        }
        Ok(Self {
            anchors,
            frame,
            measurements,
            left,
            right,
            rhs,
        })
    }

    pub fn anchors(&self) -> &Anchors {
        self.anchors
    }

    pub fn frame(&self) -> &Frame {
        self.frame
    }

    pub fn measurements(&self) -> &MeasurementSet {
        self.measurements
    }

    pub fn dim(&self) -> usize {
        self.anchors.dim()
    }

    pub fn n_constraints(&self) -> usize {
        self.frame.n_constraints()
    }

    pub fn left(&self) -> &DMatrix<f64> {
        &self.left
    }

    pub fn right(&self) -> &DMatrix<f64> {
        &self.right
    }

    /// `d² - |a|²` per measurement.
    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Length of `θ`: `(D+2) K - 1`.
    pub fn num_unknowns(&self) -> usize {
        (self.dim() + 2) * self.n_constraints() - 1
    }

    /// Number of trajectory coefficients `D K` at the head of `θ`.
    pub fn num_coefficients(&self) -> usize {
        self.dim() * self.n_constraints()
    }

    /// Left and right blocks stacked vertically, shape `num_unknowns x M`.
    pub fn stacked(&self) -> DMatrix<f64> {
        let (nl, m) = self.left.shape();
        let nr = self.right.nrows();
        let mut t = DMatrix::<f64>::zeros(nl + nr, m);
        t.rows_mut(0, nl).copy_from(&self.left);
        t.rows_mut(nl, nr).copy_from(&self.right);
        t
    }

    /// Numerical rank of the stacked matrix.
    ///
    /// Singular values below `relative_tolerance * σ_max` count as zero.
    pub fn rank(&self, relative_tolerance: f64) -> usize {
        let sv = self.stacked().singular_values();
        let tol = sv.max() * relative_tolerance;
        sv.iter().filter(|&&s| s > tol).count()
    }

    /// True when the stacked matrix has rank equal to the number of unknowns.
    pub fn is_full_rank(&self, relative_tolerance: f64) -> bool {
        self.rank(relative_tolerance) == self.num_unknowns()
    }
}
