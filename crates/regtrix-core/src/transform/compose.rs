//! Transform composition.
//!
//! `compose(outer, inner)` applies `inner` first, then `outer`. The result
//! kind is the higher of the two operand kinds in promotion order
//! (`Affine < AffineSeries < NonLinear < NonLinearSeries`), except that an
//! affine series folded into a single non-linear transform yields a
//! non-linear series.

use std::sync::Arc;

use burn::tensor::backend::Backend;

use crate::error::{Result, TransformError};
use crate::geometry::Matrix4;

use super::affine::Affine;
use super::kind::{IntoTransform, Transform};
use super::nonlinear::{NonLinearSeries, NonLinearTransform};
use super::series::AffineSeries;

/// Compose two transforms: `inner` is applied first, then `outer`.
///
/// Either operand may be a bare [`Matrix4`], promoted to a world-convention
/// affine without grids.
///
/// # Errors
/// * `LengthMismatch` when two series of different length meet
/// * `UnsupportedComposition` when both operands carry a displacement field
pub fn compose<B, O, I>(outer: O, inner: I) -> Result<Transform<B>>
where
    B: Backend,
    O: IntoTransform<B>,
    I: IntoTransform<B>,
{
    let outer = outer.into_transform()?;
    let inner = inner.into_transform()?;
    tracing::trace!(outer = %outer.kind(), inner = %inner.kind(), "compose");

    match (outer, inner) {
        (Transform::Affine(a), Transform::Affine(b)) => Ok(Transform::Affine(Affine::with_parts(
            a.matrix() * b.matrix(),
            b.source_grid().copied(),
            a.reference_grid().copied(),
        ))),

        (Transform::Affine(a), Transform::AffineSeries(s)) => {
            let matrices = s.matrices().iter().map(|m| a.matrix() * m).collect();
            AffineSeries::from_matrices_world(
                matrices,
                s.source_grid().copied(),
                a.reference_grid().copied(),
            )
            .map(Transform::AffineSeries)
        }

        (Transform::AffineSeries(s), Transform::Affine(a)) => {
            let matrices = s.matrices().iter().map(|m| m * a.matrix()).collect();
            AffineSeries::from_matrices_world(
                matrices,
                a.source_grid().copied(),
                s.reference_grid().copied(),
            )
            .map(Transform::AffineSeries)
        }

        (Transform::AffineSeries(outer), Transform::AffineSeries(inner)) => {
            check_lengths(outer.len(), inner.len())?;
            let matrices = outer
                .matrices()
                .iter()
                .zip(inner.matrices())
                .map(|(o, i)| o * i)
                .collect();
            AffineSeries::from_matrices_world(
                matrices,
                inner.source_grid().copied(),
                outer.reference_grid().copied(),
            )
            .map(Transform::AffineSeries)
        }

        (Transform::NonLinear(n), Transform::Affine(a)) => {
            let source = a.source_grid().copied().unwrap_or(*n.source_grid());
            Ok(Transform::NonLinear(NonLinearTransform::from_parts(
                Arc::clone(n.field()),
                source,
                *n.reference_grid(),
                n.pre() * a.matrix(),
                *n.post(),
            )))
        }

        (Transform::Affine(a), Transform::NonLinear(n)) => {
            let reference = a.reference_grid().copied().unwrap_or(*n.reference_grid());
            Ok(Transform::NonLinear(NonLinearTransform::from_parts(
                Arc::clone(n.field()),
                *n.source_grid(),
                reference,
                *n.pre(),
                a.matrix() * n.post(),
            )))
        }

        (Transform::NonLinear(n), Transform::AffineSeries(s)) => {
            let source = s.source_grid().copied().unwrap_or(*n.source_grid());
            let pairs = s
                .matrices()
                .iter()
                .map(|m| (n.pre() * m, *n.post()))
                .collect();
            NonLinearSeries::new(Arc::clone(n.field()), source, *n.reference_grid(), pairs)
                .map(Transform::NonLinearSeries)
        }

        (Transform::AffineSeries(s), Transform::NonLinear(n)) => {
            let reference = s.reference_grid().copied().unwrap_or(*n.reference_grid());
            let pairs = s
                .matrices()
                .iter()
                .map(|m| (*n.pre(), m * n.post()))
                .collect();
            NonLinearSeries::new(Arc::clone(n.field()), *n.source_grid(), reference, pairs)
                .map(Transform::NonLinearSeries)
        }

        (Transform::NonLinearSeries(ns), Transform::Affine(a)) => {
            let source = a.source_grid().copied().unwrap_or(*ns.source_grid());
            let pairs = ns
                .pairs()
                .iter()
                .map(|(pre, post)| (pre * a.matrix(), *post))
                .collect();
            NonLinearSeries::new(Arc::clone(ns.field()), source, *ns.reference_grid(), pairs)
                .map(Transform::NonLinearSeries)
        }

        (Transform::Affine(a), Transform::NonLinearSeries(ns)) => {
            let reference = a.reference_grid().copied().unwrap_or(*ns.reference_grid());
            let pairs = ns
                .pairs()
                .iter()
                .map(|(pre, post)| (*pre, a.matrix() * post))
                .collect();
            NonLinearSeries::new(Arc::clone(ns.field()), *ns.source_grid(), reference, pairs)
                .map(Transform::NonLinearSeries)
        }

        (Transform::NonLinearSeries(ns), Transform::AffineSeries(s)) => {
            check_lengths(ns.len(), s.len())?;
            let source = s.source_grid().copied().unwrap_or(*ns.source_grid());
            let pairs = ns
                .pairs()
                .iter()
                .zip(s.matrices())
                .map(|((pre, post), m)| (pre * m, *post))
                .collect();
            NonLinearSeries::new(Arc::clone(ns.field()), source, *ns.reference_grid(), pairs)
                .map(Transform::NonLinearSeries)
        }

        (Transform::AffineSeries(s), Transform::NonLinearSeries(ns)) => {
            check_lengths(s.len(), ns.len())?;
            let reference = s.reference_grid().copied().unwrap_or(*ns.reference_grid());
            let pairs = s
                .matrices()
                .iter()
                .zip(ns.pairs())
                .map(|(m, (pre, post))| (*pre, m * post))
                .collect();
            NonLinearSeries::new(Arc::clone(ns.field()), *ns.source_grid(), reference, pairs)
                .map(Transform::NonLinearSeries)
        }

        (
            outer @ (Transform::NonLinear(_) | Transform::NonLinearSeries(_)),
            inner @ (Transform::NonLinear(_) | Transform::NonLinearSeries(_)),
        ) => Err(TransformError::UnsupportedComposition {
            outer: outer.kind(),
            inner: inner.kind(),
        }),
    }
}

/// Compose a sequence in application order: the first element is applied
/// first.
///
/// Equivalent to `compose(tn, compose(tn-1, ... compose(t2, t1)))`. A single
/// element is returned unchanged.
///
/// # Errors
/// `InvalidConfiguration` for an empty sequence; any composition error.
pub fn chain<B, I>(transforms: I) -> Result<Transform<B>>
where
    B: Backend,
    I: IntoIterator,
    I::Item: IntoTransform<B>,
{
    let mut iter = transforms.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| TransformError::invalid_configuration("cannot chain an empty sequence of transforms"))?
        .into_transform()?;

    iter.try_fold(first, |acc, next| compose(next, acc))
}

fn check_lengths(outer: usize, inner: usize) -> Result<()> {
    if outer != inner {
        return Err(TransformError::LengthMismatch { outer, inner });
    }
    Ok(())
}

impl Affine {
    /// `self` after `inner`, both affine.
    pub fn then(&self, outer: &Affine) -> Affine {
        let m: Matrix4 = outer.matrix() * self.matrix();
        Affine::with_parts(m, self.source_grid().copied(), outer.reference_grid().copied())
    }
}
