//! Backend dispatch facade
//!
//! Thin forwarding layer between the operation surface and a backend. It
//! never validates or promotes and never catches backend errors; callers
//! hand it operands that the dtype algebra has already approved.

use arrow::array::ArrayRef;

use crate::algebra::BinaryOp;
use crate::backend::{BackendRef, BinaryOperand, SeriesBackend};
use crate::config::default_backend;
use crate::dtype::DType;
use crate::error::SeriesResult;
use crate::series::Series;
use crate::value::Operand;

/// Run a backend call that produces a plain value (aggregates, introspection)
pub(crate) fn apply<T>(
    series: &Series,
    operation: &'static str,
    f: impl FnOnce(&dyn SeriesBackend, &ArrayRef) -> SeriesResult<T>,
) -> SeriesResult<T> {
    let backend = series.backend();
    tracing::trace!(
        backend = backend.name(),
        operation,
        len = series.size(),
        "dispatch"
    );
    f(backend.as_ref(), series.array())
}

/// Run a backend call producing a payload and wrap it as a series
///
/// The result takes `dtype` when given, otherwise the dtype of `series`.
pub(crate) fn apply_series(
    series: &Series,
    operation: &'static str,
    dtype: Option<DType>,
    f: impl FnOnce(&dyn SeriesBackend, &ArrayRef) -> SeriesResult<ArrayRef>,
) -> SeriesResult<Series> {
    let array = apply(series, operation, f)?;
    Ok(Series::from_parts(
        dtype.unwrap_or(series.dtype()),
        array,
        series.backend().clone(),
    ))
}

/// Run a two-series backend call on the backend of `left`
pub(crate) fn apply_pair(
    left: &Series,
    right: &Series,
    operation: &'static str,
    dtype: DType,
    f: impl FnOnce(&dyn SeriesBackend, &ArrayRef, &ArrayRef) -> SeriesResult<ArrayRef>,
) -> SeriesResult<Series> {
    let backend = left.backend();
    tracing::trace!(
        backend = backend.name(),
        operation,
        left = left.size(),
        right = right.size(),
        "dispatch pair"
    );
    let array = f(backend.as_ref(), left.array(), right.array())?;
    Ok(Series::from_parts(dtype, array, backend.clone()))
}

/// Forward a promoted binary operation to the backend of whichever side is a
/// series
pub(crate) fn apply_binary(
    op: BinaryOp,
    left: &Operand,
    right: &Operand,
    output: DType,
) -> SeriesResult<Series> {
    let backend = operand_backend(left, right);
    tracing::trace!(
        backend = backend.name(),
        operation = op.name(),
        left = %left.describe(),
        right = %right.describe(),
        "dispatch binary"
    );
    let array = backend.binary(op, as_binary_operand(left), as_binary_operand(right))?;
    Ok(Series::from_parts(output, array, backend))
}

fn operand_backend(left: &Operand, right: &Operand) -> BackendRef {
    match (left, right) {
        (Operand::Series(s), _) | (_, Operand::Series(s)) => s.backend().clone(),
        _ => default_backend(),
    }
}

fn as_binary_operand(operand: &Operand) -> BinaryOperand<'_> {
    match operand {
        Operand::Series(s) => BinaryOperand::Array(s.array()),
        Operand::Scalar(v) => BinaryOperand::Scalar(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_apply_binary_uses_series_backend() {
        let series = Series::from_ints(vec![1, 2, 3]);
        let result = apply_binary(
            BinaryOp::Add,
            &Operand::Scalar(Value::Integer(1)),
            &Operand::Series(series),
            DType::Integer,
        )
        .unwrap();
        assert_eq!(result.dtype(), DType::Integer);
        assert_eq!(
            result.to_list().unwrap(),
            vec![Value::Integer(2), Value::Integer(3), Value::Integer(4)]
        );
    }

    #[test]
    fn test_apply_series_inherits_dtype() {
        let series = Series::from_floats(vec![3.0, 1.0]);
        let sorted = apply_series(&series, "sort", None, |b, a| b.sort(a, false)).unwrap();
        assert_eq!(sorted.dtype(), DType::Float);
        assert_eq!(sorted.to_list().unwrap(), vec![Value::Float(1.0), Value::Float(3.0)]);
    }

    #[test]
    fn test_backend_errors_surface_unchanged() {
        let series = Series::from_ints(vec![1]);
        let err = apply(&series, "fetch", |b, a| b.fetch(a, 4)).unwrap_err();
        assert_eq!(err, crate::error::SeriesError::OutOfBounds { index: 4, size: 1 });
    }
}
