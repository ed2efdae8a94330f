//! Anchor set: fixed reference points to which ranges are measured.
//!
//! Anchors are stored column-wise in a `D x n_anchors` matrix and identified by
//! column index only. Two anchors may share a position.

use nalgebra::{DMatrix, DVector};
use rand::RngExt;

use crate::error::InputError;

#[derive(Debug, Clone, PartialEq)]
pub struct Anchors {
    positions: DMatrix<f64>,
}

impl Anchors {
    /// Wrap a `D x n_anchors` matrix of anchor positions.
    pub fn new(positions: DMatrix<f64>) -> Result<Self, InputError> {
        if positions.nrows() == 0 {
            return Err(InputError::NonPositive { name: "anchor dimension" });
        }
        if positions.ncols() == 0 {
            return Err(InputError::NonPositive { name: "n_anchors" });
        }
        if positions.iter().any(|v| !v.is_finite()) {
            return Err(InputError::NonFinite("anchor positions"));
        }
        Ok(Self { positions })
    }

    /// Draw `n_anchors` anchors uniformly in `[0, scale)^dim`.
    pub fn random<R: RngExt + ?Sized>(
        dim: usize,
        n_anchors: usize,
        scale: f64,
        rng: &mut R,
    ) -> Result<Self, InputError> {
        let positions = DMatrix::from_fn(dim, n_anchors, |_, _| scale * rng.random::<f64>());
        Self::new(positions)
    }

    /// Spatial dimension D.
    pub fn dim(&self) -> usize {
        self.positions.nrows()
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.positions.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.ncols() == 0
    }

    /// All positions as a `D x n_anchors` matrix.
    pub fn positions(&self) -> &DMatrix<f64> {
        &self.positions
    }

    /// Position of anchor `index`.
    pub fn position(&self, index: usize) -> Result<DVector<f64>, InputError> {
        self.check_index(index)?;
        Ok(self.positions.column(index).into_owned())
    }

    /// Anchor position extended by a trailing 1 (homogeneous coordinates).
    pub fn extended(&self, index: usize) -> Result<DVector<f64>, InputError> {
        self.check_index(index)?;
        let d = self.dim();
        Ok(DVector::from_fn(d + 1, |i, _| {
            if i < d {
                self.positions[(i, index)]
            } else {
                1.0
            }
        }))
    }

    /// Squared norm of anchor `index`.
    pub fn norm_squared(&self, index: usize) -> Result<f64, InputError> {
        self.check_index(index)?;
        Ok(self.positions.column(index).norm_squared())
    }

    fn check_index(&self, index: usize) -> Result<(), InputError> {
        if index >= self.len() {
            return Err(InputError::IndexOutOfRange {
                what: "anchor",
                index,
                len: self.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_anchors_lie_in_box() {
        let mut rng = StdRng::seed_from_u64(7);
        let anchors = Anchors::random(3, 12, 10.0, &mut rng).unwrap();
        assert_eq!(anchors.dim(), 3);
        assert_eq!(anchors.len(), 12);
        assert!(anchors.positions().iter().all(|&v| (0.0..10.0).contains(&v)));
    }

    #[test]
    fn extended_appends_one() {
        let anchors = Anchors::new(DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 2.0, 4.0])).unwrap();
        let ext = anchors.extended(1).unwrap();
        assert_eq!(ext.as_slice(), &[3.0, 4.0, 1.0]);
        assert_eq!(anchors.norm_squared(1).unwrap(), 25.0);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let anchors = Anchors::new(DMatrix::zeros(2, 3)).unwrap();
        assert_eq!(
            anchors.position(3),
            Err(InputError::IndexOutOfRange {
                what: "anchor",
                index: 3,
                len: 3
            })
        );
    }

    #[test]
    fn duplicate_positions_are_legal() {
        let anchors = Anchors::new(DMatrix::from_element(2, 4, 1.5)).unwrap();
        assert_eq!(anchors.len(), 4);
    }
}
