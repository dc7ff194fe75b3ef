//! Homogeneous 4x4 matrix helpers shared by grids and transforms.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::{Matrix3, Vector3};

use crate::error::{Result, TransformError};

pub type Matrix4 = nalgebra::Matrix4<f64>;
pub type Point3 = nalgebra::Point3<f64>;
pub type Vector3d = Vector3<f64>;
pub type Direction3 = Matrix3<f64>;

/// Tolerance on the `[0, 0, 0, 1]` bottom row of an affine matrix.
pub const AFFINE_TOLERANCE: f64 = 1e-9;

/// Check that a matrix is affine (no perspective component).
pub fn validate_affine(matrix: &Matrix4) -> Result<()> {
    let row = [matrix[(3, 0)], matrix[(3, 1)], matrix[(3, 2)], matrix[(3, 3)]];
    let expected = [0.0, 0.0, 0.0, 1.0];
    let ok = row
        .iter()
        .zip(expected.iter())
        .all(|(a, b)| (a - b).abs() <= AFFINE_TOLERANCE);
    if ok {
        Ok(())
    } else {
        Err(TransformError::InvalidBottomRow(row))
    }
}

/// Build a 4x4 affine from row-major rows, validating shape and bottom row.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<Matrix4> {
    let cols = rows.first().map(|r| r.len()).unwrap_or(0);
    if rows.len() != 4 || rows.iter().any(|r| r.len() != 4) {
        return Err(TransformError::InvalidMatrix {
            rows: rows.len(),
            cols,
        });
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let matrix = Matrix4::from_row_slice(&flat);
    validate_affine(&matrix)?;
    Ok(matrix)
}

/// Invert an affine matrix or report which matrix was singular.
pub fn invert(matrix: &Matrix4, what: &str) -> Result<Matrix4> {
    matrix
        .try_inverse()
        .ok_or_else(|| TransformError::singular(format!("{what} is not invertible")))
}

/// Round entries lying within [`AFFINE_TOLERANCE`] of an integer.
///
/// Voxel-to-voxel matrices between matching grids carry floating-point
/// residue from the world round trip; snapping keeps them exact.
pub fn snap_to_integers(matrix: &Matrix4) -> Matrix4 {
    matrix.map(|v| {
        let rounded = v.round();
        if (v - rounded).abs() <= AFFINE_TOLERANCE {
            rounded
        } else {
            v
        }
    })
}

/// Apply a homogeneous matrix to a single point.
pub fn transform_point(matrix: &Matrix4, point: &Point3) -> Point3 {
    matrix.transform_point(point)
}

/// Apply a homogeneous matrix to a batch of points.
///
/// # Arguments
/// * `points` - Tensor of shape `[N, 3]`
/// * `matrix` - 4x4 affine
///
/// # Returns
/// Tensor of shape `[N, 3]`, `p' = R p + t` for every row
pub fn transform_points<B: Backend>(points: Tensor<B, 2>, matrix: &Matrix4) -> Tensor<B, 2> {
    let device = points.device();

    // Row-vector form: P' = P @ R^T + t
    let mut rt = Vec::with_capacity(9);
    for r in 0..3 {
        for c in 0..3 {
            rt.push(matrix[(c, r)] as f32);
        }
    }
    let rt = Tensor::<B, 2>::from_data(TensorData::new(rt, Shape::new([3, 3])), &device);

    let t = vec![
        matrix[(0, 3)] as f32,
        matrix[(1, 3)] as f32,
        matrix[(2, 3)] as f32,
    ];
    let t = Tensor::<B, 2>::from_data(TensorData::new(t, Shape::new([1, 3])), &device);

    points.matmul(rt) + t
}
