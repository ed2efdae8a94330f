//! Rigid alignment of corresponding point sets (orthogonal Procrustes).
//!
//! Point `i` of the moving set is matched to point `i` of the reference set;
//! there is no nearest-neighbour search.

use nalgebra::{DMatrix, DVector};

use crate::error::InputError;

/// Result of [`align`].
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Moving points after rotation and translation, `D x N`.
    pub points: DMatrix<f64>,
    /// Orthogonal `D x D` matrix with `rotation * moving_centered ≈ reference_centered`.
    pub rotation: DMatrix<f64>,
}

impl Alignment {
    /// RMS distance between the aligned points and `reference`.
    pub fn rms_error(&self, reference: &DMatrix<f64>) -> Result<f64, InputError> {
        if reference.shape() != self.points.shape() {
            return Err(InputError::ShapeMismatch {
                expected: self.points.shape(),
                actual: reference.shape(),
            });
        }
        Ok((&self.points - reference).norm() / (self.points.ncols() as f64).sqrt())
    }
}

fn centered(points: &DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let centroid = points.column_mean();
    let mut c = points.clone();
    for mut col in c.column_iter_mut() {
        col -= &centroid;
    }
    (c, centroid)
}

/// Rotate and translate `moving` onto `reference` in the least-squares sense.
///
/// Both are `D x N` with columns in correspondence. The rotation is the
/// orthogonal factor `U Vᵀ` of the cross-covariance SVD, so for degenerate
/// (e.g. collinear) sets it may include a reflection.
pub fn align(reference: &DMatrix<f64>, moving: &DMatrix<f64>) -> Result<Alignment, InputError> {
    if reference.shape() != moving.shape() {
        return Err(InputError::ShapeMismatch {
            expected: reference.shape(),
            actual: moving.shape(),
        });
    }
    if reference.ncols() == 0 {
        return Err(InputError::NonPositive { name: "number of points" });
    }
    if reference.iter().chain(moving.iter()).any(|v| !v.is_finite()) {
        return Err(InputError::NonFinite("alignment points"));
    }

    let (ref_c, ref_centroid) = centered(reference);
    let (mov_c, _) = centered(moving);

    let h = &ref_c * mov_c.transpose();
    let svd = h.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(InputError::NonFinite("alignment cross-covariance")),
    };
    let rotation = u * v_t;

    let mut points = &rotation * mov_c;
    for mut col in points.column_iter_mut() {
        col += &ref_centroid;
    }
    Ok(Alignment { points, rotation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation2, Rotation3, Vector3};
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};

    #[test]
    fn recovers_planar_rigid_motion() {
        let mut rng = StdRng::seed_from_u64(12);
        let reference = DMatrix::from_fn(2, 8, |_, _| rng.random::<f64>() * 10.0);
        let rot = Rotation2::new(0.7);
        let r = DMatrix::from_column_slice(2, 2, rot.matrix().as_slice());
        let mut moving = &r * &reference;
        for mut col in moving.column_iter_mut() {
            col[0] += 3.0;
            col[1] -= 1.5;
        }

        let aligned = align(&reference, &moving).unwrap();
        let err = aligned.rms_error(&reference).unwrap();
        assert!(err < 1e-10, "rms error {err}");
        // rotation undoes r
        assert!((&aligned.rotation * &r - DMatrix::identity(2, 2)).amax() < 1e-10);
    }

    #[test]
    fn rotation_is_orthogonal_in_3d() {
        let mut rng = StdRng::seed_from_u64(13);
        let reference = DMatrix::from_fn(3, 10, |_, _| rng.random::<f64>());
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), 1.1)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), -0.4);
        let r = DMatrix::from_column_slice(3, 3, rot.matrix().as_slice());
        let moving = &r * &reference;

        let aligned = align(&reference, &moving).unwrap();
        let rtr = aligned.rotation.transpose() * &aligned.rotation;
        assert!((rtr - DMatrix::identity(3, 3)).amax() < 1e-12);
        assert!((aligned.rotation.determinant().abs() - 1.0).abs() < 1e-12);
        assert!(aligned.rms_error(&reference).unwrap() < 1e-10);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let a = DMatrix::<f64>::zeros(2, 4);
        let b = DMatrix::<f64>::zeros(2, 5);
        assert!(matches!(align(&a, &b), Err(InputError::ShapeMismatch { .. })));
    }
}
