use std::sync::Arc;

use burn_ndarray::NdArray;
use proptest::prelude::*;
use regtrix_core::geometry::{Direction3, Matrix4, Point3, Vector3d};
use regtrix_core::{
    chain, compose, Affine, AffineSeries, DisplacementField, NonLinearTransform, Transform, TransformError,
    TransformKind, VoxelGrid,
};

type B = NdArray<f32>;

fn grid(shape: [usize; 3], spacing: f64) -> VoxelGrid {
    VoxelGrid::from_spacing(
        shape,
        Point3::new(-10.0, 5.0, 0.0),
        Vector3d::new(spacing, spacing, spacing),
        Direction3::identity(),
    )
    .unwrap()
}

fn rigid(angle: f64, t: [f64; 3]) -> Matrix4 {
    let (s, c) = angle.sin_cos();
    let mut m = Matrix4::identity();
    m[(0, 0)] = c;
    m[(0, 1)] = -s;
    m[(1, 0)] = s;
    m[(1, 1)] = c;
    m[(0, 3)] = t[0];
    m[(1, 3)] = t[1];
    m[(2, 3)] = t[2];
    m
}

fn nlt() -> NonLinearTransform<B> {
    let device = Default::default();
    let g = grid([6, 6, 6], 2.0);
    NonLinearTransform::new(DisplacementField::zeros(g, g, &device))
}

proptest! {
    #[test]
    fn test_inverse_of_inverse(
        a00 in 0.5f64..2.0, a11 in 0.5f64..2.0, a22 in 0.5f64..2.0,
        a01 in -0.3f64..0.3, a12 in -0.3f64..0.3, a20 in -0.3f64..0.3,
        tx in -50.0f64..50.0, ty in -50.0f64..50.0, tz in -50.0f64..50.0
    ) {
        let m = Matrix4::new(
            a00, a01, 0.0, tx,
            0.0, a11, a12, ty,
            a20, 0.0, a22, tz,
            0.0, 0.0, 0.0, 1.0,
        );
        let affine = Affine::from_world(m).unwrap();
        let twice = affine.inverse().unwrap().inverse().unwrap();
        prop_assert!((twice.matrix() - m).abs().max() < 1e-9);
    }

    #[test]
    fn test_compose_is_matrix_product(
        a1 in -3.14f64..3.14, a2 in -3.14f64..3.14,
        t1 in -20.0f64..20.0, t2 in -20.0f64..20.0
    ) {
        let a = Affine::from_world(rigid(a1, [t1, 0.0, t2])).unwrap();
        let b = Affine::from_world(rigid(a2, [0.0, t2, t1])).unwrap();
        let composed = compose::<B, _, _>(a.clone(), b.clone()).unwrap();
        prop_assert_eq!(composed.as_affine().unwrap().matrix(), &(a.matrix() * b.matrix()));
    }
}

#[test]
fn test_chain_of_one_is_unchanged() {
    let g1 = grid([4, 4, 4], 1.0);
    let g2 = grid([8, 8, 8], 0.5);
    let a = Affine::from_world_with_grids(rigid(0.3, [1.0, 2.0, 3.0]), Some(g1), Some(g2)).unwrap();

    let chained = chain::<B, _>([a.clone()]).unwrap();
    let out = chained.as_affine().unwrap();
    assert_eq!(out, &a);
    assert_eq!(chained.source_grid(), Some(&g1));
    assert_eq!(chained.reference_grid(), Some(&g2));
}

#[test]
fn test_chain_grids_follow_ends() {
    let g1 = grid([4, 4, 4], 1.0);
    let g2 = grid([5, 5, 5], 1.0);
    let g3 = grid([6, 6, 6], 1.0);
    let a = Affine::from_world_with_grids(rigid(0.1, [1.0, 0.0, 0.0]), Some(g1), Some(g2)).unwrap();
    let b = Affine::from_world_with_grids(rigid(-0.2, [0.0, 1.0, 0.0]), Some(g2), Some(g3)).unwrap();

    let chained = chain::<B, _>([a.clone(), b.clone()]).unwrap();
    let direct = compose::<B, _, _>(b.clone(), a.clone()).unwrap();
    assert_eq!(chained.as_affine(), direct.as_affine());
    assert_eq!(chained.source_grid(), Some(&g1));
    assert_eq!(chained.reference_grid(), Some(&g3));
}

#[test]
fn test_affine_after_series() {
    let matrices: Vec<Matrix4> = (0..4).map(|i| rigid(0.05 * i as f64, [i as f64, 0.0, 0.0])).collect();
    let series = AffineSeries::new(matrices.clone(), None, None, None).unwrap();
    let affine = Affine::from_world(rigid(0.4, [0.0, -3.0, 2.0])).unwrap();

    let composed = compose::<B, _, _>(affine.clone(), series).unwrap();
    assert_eq!(composed.kind(), TransformKind::AffineSeries);
    let out = composed.as_affine_series().unwrap();
    assert_eq!(out.len(), 4);
    for (i, m) in out.matrices().iter().enumerate() {
        assert_eq!(m, &(affine.matrix() * matrices[i]));
    }
}

#[test]
fn test_nonlinear_after_affine_changes_only_pre() {
    let n = nlt();
    let affine = Affine::from_world(rigid(0.2, [4.0, 0.0, 0.0])).unwrap();

    let composed = compose(n.clone(), affine.clone()).unwrap();
    let out = composed.as_nonlinear().unwrap();
    assert_eq!(out.pre(), &(n.pre() * affine.matrix()));
    assert_eq!(out.post(), n.post());
    assert!(Arc::ptr_eq(out.field(), n.field()));
}

#[test]
fn test_bare_matrix_on_either_side() {
    let series = AffineSeries::new(vec![Matrix4::identity(); 2], None, None, None).unwrap();
    let shift = rigid(0.0, [1.0, 1.0, 1.0]);

    let left = compose::<B, _, _>(shift, series.clone()).unwrap();
    let right = compose::<B, _, _>(series, shift).unwrap();
    assert_eq!(left.kind(), TransformKind::AffineSeries);
    assert_eq!(right.as_affine_series().unwrap().matrices()[1], shift);
}

#[test]
fn test_unequal_series_rejected() {
    let a = AffineSeries::new(vec![Matrix4::identity(); 3], None, None, None).unwrap();
    let b = AffineSeries::new(vec![Matrix4::identity(); 4], None, None, None).unwrap();
    let err = compose::<B, _, _>(a, b).unwrap_err();
    assert!(matches!(err, TransformError::LengthMismatch { outer: 3, inner: 4 }));
}

#[test]
fn test_field_with_field_rejected() {
    let err = compose(nlt(), nlt()).unwrap_err();
    assert!(matches!(err, TransformError::UnsupportedComposition { .. }));
}

#[test]
fn test_operands_untouched_by_composition() {
    let a = Affine::from_world(rigid(0.7, [1.0, 0.0, 0.0])).unwrap();
    let before = a.clone();
    let t: Transform<B> = a.clone().into();
    let _ = compose::<B, _, _>(&t, &t).unwrap();
    assert_eq!(t.as_affine(), Some(&before));
}

#[test]
fn test_nonlinear_inverse_not_supported() {
    let t: Transform<B> = nlt().into();
    assert!(matches!(t.inverse().unwrap_err(), TransformError::NotSupported(_)));
}

#[test]
fn test_length_one_series_not_broadcast_in_composition() {
    let one = AffineSeries::new(vec![Matrix4::identity()], None, None, None).unwrap();
    let three = AffineSeries::new(vec![Matrix4::identity(); 3], None, None, None).unwrap();
    let err = compose::<B, _, _>(one, three).unwrap_err();
    assert!(matches!(err, TransformError::LengthMismatch { outer: 1, inner: 3 }));
}
