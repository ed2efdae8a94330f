//! Range measurements and measurement sets.
//!
//! A [`Measurement`] ties one observed distance to the anchor and the frame
//! sample it was taken at. A [`MeasurementSet`] is the ordered list the
//! constraint builder and the solvers consume: the column order of every
//! constraint matrix follows the order of the set, so the distance always
//! travels together with its indices.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};
use rand::seq::index;
use rand::RngExt;
use rand_distr::{Distribution, Normal};

use crate::anchors::Anchors;
use crate::constraints::Frame;
use crate::error::InputError;
use crate::trajectory::Trajectory;

/// One observed range sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Index of the anchor the range was measured to.
    pub anchor: usize,
    /// Index of the frame sample (abstract time) of the measurement.
    pub frame_index: usize,
    /// Measured distance (not squared).
    pub distance: f64,
}

impl Measurement {
    pub fn new(anchor: usize, frame_index: usize, distance: f64) -> Self {
        Self {
            anchor,
            frame_index,
            distance,
        }
    }

    pub fn distance_squared(&self) -> f64 {
        self.distance * self.distance
    }
}

/// Ordered measurements without duplicate (anchor, frame_index) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSet {
    measurements: Vec<Measurement>,
}

impl MeasurementSet {
    pub fn new(measurements: Vec<Measurement>) -> Result<Self, InputError> {
        let mut seen = HashSet::with_capacity(measurements.len());
        for m in &measurements {
            if !m.distance.is_finite() {
                return Err(InputError::NonFinite("measured distance"));
            }
            if !seen.insert((m.anchor, m.frame_index)) {
                return Err(InputError::DuplicateMeasurement {
                    anchor: m.anchor,
                    frame_index: m.frame_index,
                });
            }
        }
        Ok(Self { measurements })
    }

    /// Noiseless measurements for the given (anchor, frame_index) pairs.
    pub fn from_pairs(
        pairs: &[(usize, usize)],
        trajectory: &Trajectory,
        anchors: &Anchors,
        frame: &Frame,
    ) -> Result<Self, InputError> {
        if anchors.dim() != trajectory.dim() {
            return Err(InputError::ShapeMismatch {
                expected: (trajectory.dim(), anchors.len()),
                actual: anchors.positions().shape(),
            });
        }
        let positions = trajectory.positions(frame)?;
        let measurements = pairs
            .iter()
            .map(|&(a, n)| {
                let anchor = anchors.position(a)?;
                if n >= positions.ncols() {
                    return Err(InputError::IndexOutOfRange {
                        what: "frame",
                        index: n,
                        len: positions.ncols(),
                    });
                }
                let distance = (positions.column(n) - anchor).norm();
                Ok(Measurement::new(a, n, distance))
            })
            .collect::<Result<Vec<_>, InputError>>()?;
        Self::new(measurements)
    }

    /// Every anchor measured at every frame sample, anchor-major order.
    pub fn complete(
        trajectory: &Trajectory,
        anchors: &Anchors,
        frame: &Frame,
    ) -> Result<Self, InputError> {
        let pairs: Vec<(usize, usize)> = (0..anchors.len())
            .flat_map(|a| (0..frame.n_positions()).map(move |n| (a, n)))
            .collect();
        Self::from_pairs(&pairs, trajectory, anchors, frame)
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.iter()
    }

    pub fn as_slice(&self) -> &[Measurement] {
        &self.measurements
    }

    /// (anchor, frame_index) pairs in set order.
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        self.measurements
            .iter()
            .map(|m| (m.anchor, m.frame_index))
            .collect()
    }

    pub fn frame_indices(&self) -> Vec<usize> {
        self.measurements.iter().map(|m| m.frame_index).collect()
    }

    pub fn distances_squared(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.measurements.len(),
            self.measurements.iter().map(Measurement::distance_squared),
        )
    }

    /// Copy of this set with `n_missing` measurements removed at random.
    ///
    /// The surviving measurements keep their relative order.
    pub fn without_random<R: RngExt + ?Sized>(
        &self,
        n_missing: usize,
        rng: &mut R,
    ) -> Result<Self, InputError> {
        if n_missing > self.len() {
            return Err(InputError::TooManyMeasurements {
                requested: n_missing,
                available: self.len(),
            });
        }
        let mut dropped = vec![false; self.len()];
        for i in index::sample(rng, self.len(), n_missing).iter() {
            dropped[i] = true;
        }
        let measurements = self
            .measurements
            .iter()
            .zip(&dropped)
            .filter(|(_, &d)| !d)
            .map(|(m, _)| *m)
            .collect();
        Ok(Self { measurements })
    }

    /// Copy of this set with zero-mean Gaussian noise added to every distance.
    ///
    /// `std_dev` must be finite and non-negative.
    pub fn with_noise<R: RngExt + ?Sized>(&self, std_dev: f64, rng: &mut R) -> Result<Self, InputError> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(InputError::NonFinite("noise standard deviation"));
        }
        let normal =
            Normal::new(0.0, std_dev).map_err(|_| InputError::NonFinite("noise standard deviation"))?;
        let measurements = self
            .measurements
            .iter()
            .map(|m| Measurement {
                distance: m.distance + normal.sample(rng),
                ..*m
            })
            .collect();
        Ok(Self { measurements })
    }

    /// 0/1 incidence matrix of shape `n_anchors x n_positions`.
    pub fn incidence_matrix(&self, n_anchors: usize, n_positions: usize) -> Result<DMatrix<u8>, InputError> {
        indexes_to_matrix(&self.pairs(), n_anchors, n_positions)
    }
}

/// Draw `n_measurements` distinct (anchor, frame_index) pairs uniformly.
pub fn random_indexes<R: RngExt + ?Sized>(
    n_anchors: usize,
    n_positions: usize,
    n_measurements: usize,
    rng: &mut R,
) -> Result<Vec<(usize, usize)>, InputError> {
    let available = n_anchors * n_positions;
    if n_measurements > available {
        return Err(InputError::TooManyMeasurements {
            requested: n_measurements,
            available,
        });
    }
    Ok(index::sample(rng, available, n_measurements)
        .iter()
        .map(|flat| (flat / n_positions, flat % n_positions))
        .collect())
}

/// Mark each (anchor, frame_index) pair in an `n_anchors x n_positions` matrix.
pub fn indexes_to_matrix(
    pairs: &[(usize, usize)],
    n_anchors: usize,
    n_positions: usize,
) -> Result<DMatrix<u8>, InputError> {
    let mut matrix = DMatrix::<u8>::zeros(n_anchors, n_positions);
    for &(a, n) in pairs {
        if a >= n_anchors {
            return Err(InputError::IndexOutOfRange {
                what: "anchor",
                index: a,
                len: n_anchors,
            });
        }
        if n >= n_positions {
            return Err(InputError::IndexOutOfRange {
                what: "frame",
                index: n,
                len: n_positions,
            });
        }
        matrix[(a, n)] = 1;
    }
    Ok(matrix)
}

/// Non-zero entries of an incidence matrix, in row-major order.
pub fn matrix_to_indexes(matrix: &DMatrix<u8>) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for a in 0..matrix.nrows() {
        for n in 0..matrix.ncols() {
            if matrix[(a, n)] != 0 {
                pairs.push((a, n));
            }
        }
    }
    pairs
}
