//! Trajectory parameterized by a truncated cosine expansion.
//!
//! A trajectory in D dimensions with K basis functions is the `D x K`
//! coefficient matrix `C`; the position at abstract sample `n` of `N` is
//! `p_n = C f_n` where `f_n` is column `n` of the [`Frame`].

use nalgebra::{DMatrix, DVector};
use rand::RngExt;
use rand_distr::{Distribution, StandardNormal};

use crate::constraints::Frame;
use crate::error::InputError;

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    coeffs: DMatrix<f64>,
}

impl Trajectory {
    /// Wrap a `D x K` coefficient matrix.
    pub fn new(coeffs: DMatrix<f64>) -> Result<Self, InputError> {
        if coeffs.nrows() == 0 {
            return Err(InputError::NonPositive { name: "trajectory dimension" });
        }
        if coeffs.ncols() == 0 {
            return Err(InputError::NonPositive { name: "n_constraints" });
        }
        if coeffs.iter().any(|v| !v.is_finite()) {
            return Err(InputError::NonFinite("trajectory coefficients"));
        }
        Ok(Self { coeffs })
    }

    /// Build from a row-major flattened `D * K` vector.
    pub fn from_flat(dim: usize, n_constraints: usize, flat: &[f64]) -> Result<Self, InputError> {
        if flat.len() != dim * n_constraints {
            return Err(InputError::ShapeMismatch {
                expected: (dim * n_constraints, 1),
                actual: (flat.len(), 1),
            });
        }
        Self::new(DMatrix::from_row_slice(dim, n_constraints, flat))
    }

    /// Random trajectory with standard-normal coefficients.
    pub fn random<R: RngExt + ?Sized>(
        dim: usize,
        n_constraints: usize,
        rng: &mut R,
    ) -> Result<Self, InputError> {
        let coeffs = DMatrix::from_fn(dim, n_constraints, |_, _| {
            let v: f64 = StandardNormal.sample(rng);
            v
        });
        Self::new(coeffs)
    }

    pub fn dim(&self) -> usize {
        self.coeffs.nrows()
    }

    /// Number of basis functions K.
    pub fn n_constraints(&self) -> usize {
        self.coeffs.ncols()
    }

    pub fn coeffs(&self) -> &DMatrix<f64> {
        &self.coeffs
    }

    /// Coefficients flattened row-major (all of dimension 0 first).
    pub fn flattened(&self) -> Vec<f64> {
        let (d, k) = self.coeffs.shape();
        let mut out = Vec::with_capacity(d * k);
        for i in 0..d {
            for j in 0..k {
                out.push(self.coeffs[(i, j)]);
            }
        }
        out
    }

    /// Positions at every sample of `frame`, as a `D x N` matrix.
    pub fn positions(&self, frame: &Frame) -> Result<DMatrix<f64>, InputError> {
        self.check_frame(frame)?;
        Ok(&self.coeffs * frame.matrix())
    }

    /// Position at sample `index` of `frame`.
    pub fn position(&self, frame: &Frame, index: usize) -> Result<DVector<f64>, InputError> {
        self.check_frame(frame)?;
        let f = frame.column(index)?;
        Ok(&self.coeffs * f)
    }

    /// Positions at continuous times `t` (in sample units, `0 <= t < n_positions`).
    ///
    /// Integer times reproduce [`Trajectory::positions`] for a frame with the
    /// same `n_positions`.
    pub fn sample(&self, times: &[f64], n_positions: usize) -> Result<DMatrix<f64>, InputError> {
        if n_positions == 0 {
            return Err(InputError::NonPositive { name: "n_positions" });
        }
        let k = self.n_constraints();
        let basis = DMatrix::from_fn(k, times.len(), |kk, j| {
            (kk as f64 * times[j] * std::f64::consts::PI / n_positions as f64).cos()
        });
        Ok(&self.coeffs * basis)
    }

    /// Largest absolute coefficient difference to `other`.
    pub fn max_abs_deviation(&self, other: &Trajectory) -> Result<f64, InputError> {
        if self.coeffs.shape() != other.coeffs.shape() {
            return Err(InputError::ShapeMismatch {
                expected: self.coeffs.shape(),
                actual: other.coeffs.shape(),
            });
        }
        Ok((&self.coeffs - &other.coeffs).amax())
    }

    fn check_frame(&self, frame: &Frame) -> Result<(), InputError> {
        if frame.n_constraints() != self.n_constraints() {
            return Err(InputError::ShapeMismatch {
                expected: (self.n_constraints(), frame.n_positions()),
                actual: frame.matrix().shape(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::build_frame;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn flattened_is_row_major() {
        let t = Trajectory::from_flat(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(t.coeffs()[(1, 0)], 4.0);
        assert_eq!(t.flattened(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn continuous_sampling_matches_frame_at_integers() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = Trajectory::random(2, 4, &mut rng).unwrap();
        let frame = build_frame(4, 9).unwrap();
        let discrete = t.positions(&frame).unwrap();
        let times: Vec<f64> = (0..9).map(|n| n as f64).collect();
        let continuous = t.sample(&times, 9).unwrap();
        assert!((discrete - continuous).amax() < 1e-12);
    }

    #[test]
    fn first_sample_is_coefficient_sum() {
        // cos(0) = 1 for every basis function.
        let t = Trajectory::from_flat(1, 3, &[1.0, -2.0, 0.5]).unwrap();
        let frame = build_frame(3, 5).unwrap();
        let p0 = t.position(&frame, 0).unwrap();
        assert!((p0[0] - (-0.5)).abs() < 1e-15);
    }

    #[test]
    fn frame_size_must_match() {
        let t = Trajectory::from_flat(1, 3, &[1.0, 2.0, 3.0]).unwrap();
        let frame = build_frame(4, 5).unwrap();
        assert!(matches!(
            t.positions(&frame),
            Err(InputError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn deviation_detects_difference() {
        let a = Trajectory::from_flat(1, 2, &[1.0, 2.0]).unwrap();
        let b = Trajectory::from_flat(1, 2, &[1.0, 2.5]).unwrap();
        assert_eq!(a.max_abs_deviation(&b).unwrap(), 0.5);
    }
}
