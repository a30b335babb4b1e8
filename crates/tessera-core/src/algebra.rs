//! Dtype algebra: which operations accept which dtypes, how operands are
//! promoted, and what dtype each operation produces
//!
//! Everything here is pure. Functions only inspect operand dtypes; the
//! promotion they describe is applied by the caller before dispatch.

use crate::dtype::{DType, NUMERIC, NUMERIC_OR_BOOL, NUMERIC_OR_TEMPORAL};
use crate::error::{SeriesError, SeriesResult};
use crate::value::{Operand, Value};

/// Element-wise binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Quotient,
    Remainder,
    Pow,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Get the operation name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Quotient => "quotient",
            BinaryOp::Remainder => "remainder",
            BinaryOp::Pow => "pow",
            BinaryOp::Equal => "equal",
            BinaryOp::NotEqual => "not_equal",
            BinaryOp::Greater => "greater",
            BinaryOp::GreaterEqual => "greater_equal",
            BinaryOp::Less => "less",
            BinaryOp::LessEqual => "less_equal",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// Whole-series reductions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Sum,
    Min,
    Max,
    Mean,
    Median,
    Var,
    Std,
    /// Nearest-rank quantile, `q` in `[0, 1]`
    Quantile(f64),
}

impl Aggregation {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Mean => "mean",
            Aggregation::Median => "median",
            Aggregation::Var => "var",
            Aggregation::Std => "std",
            Aggregation::Quantile(_) => "quantile",
        }
    }

    #[must_use]
    pub fn supported(self) -> &'static [DType] {
        match self {
            Aggregation::Sum => NUMERIC_OR_BOOL,
            Aggregation::Min | Aggregation::Max | Aggregation::Quantile(_) => NUMERIC_OR_TEMPORAL,
            Aggregation::Mean | Aggregation::Median | Aggregation::Var | Aggregation::Std => {
                NUMERIC
            }
        }
    }

    /// Dtype of the value produced for an input of `dtype`
    #[must_use]
    pub fn output(self, dtype: DType) -> DType {
        match self {
            Aggregation::Sum if dtype == DType::Boolean => DType::Integer,
            Aggregation::Sum | Aggregation::Min | Aggregation::Max | Aggregation::Quantile(_) => {
                dtype
            }
            Aggregation::Mean | Aggregation::Median | Aggregation::Var | Aggregation::Std => {
                DType::Float
            }
        }
    }
}

/// Running reductions producing a series of the input size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CumulativeOp {
    Sum,
    Min,
    Max,
}

impl CumulativeOp {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CumulativeOp::Sum => "cumulative_sum",
            CumulativeOp::Min => "cumulative_min",
            CumulativeOp::Max => "cumulative_max",
        }
    }

    #[must_use]
    pub fn supported(self) -> &'static [DType] {
        match self {
            CumulativeOp::Sum => NUMERIC,
            CumulativeOp::Min | CumulativeOp::Max => NUMERIC_OR_TEMPORAL,
        }
    }
}

/// Rolling-window reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOp {
    Sum,
    Mean,
    Min,
    Max,
}

impl WindowOp {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            WindowOp::Sum => "window_sum",
            WindowOp::Mean => "window_mean",
            WindowOp::Min => "window_min",
            WindowOp::Max => "window_max",
        }
    }

    #[must_use]
    pub fn supported(self) -> &'static [DType] {
        NUMERIC
    }

    /// Mean is always Float; weights turn any window result into Float
    #[must_use]
    pub fn output(self, dtype: DType, weighted: bool) -> DType {
        if self == WindowOp::Mean || weighted {
            DType::Float
        } else {
            dtype
        }
    }
}

/// Which extreme `peaks` marks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakKind {
    Max,
    Min,
}

/// Dtypes each operand must be promoted to, and the dtype of the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryPlan {
    pub left: DType,
    pub right: DType,
    pub output: DType,
}

impl BinaryPlan {
    fn uniform(operand: DType, output: DType) -> Self {
        Self {
            left: operand,
            right: operand,
            output,
        }
    }
}

/// Fail with `DtypeUnsupported` unless `dtype` is in `supported`
pub fn check_dtype(
    operation: &'static str,
    dtype: DType,
    supported: &'static [DType],
) -> SeriesResult<()> {
    if supported.contains(&dtype) {
        Ok(())
    } else {
        Err(SeriesError::DtypeUnsupported {
            operation,
            dtype,
            supported: supported.to_vec(),
        })
    }
}

/// Decide promotion and result dtype for `left op right`
pub fn binary(op: BinaryOp, left: &Operand, right: &Operand) -> SeriesResult<BinaryPlan> {
    if left.as_series().is_none() && right.as_series().is_none() {
        return Err(SeriesError::invalid_option(
            op.name(),
            "at least one operand must be a series",
        ));
    }

    match op {
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Pow => {
            let (l, r) = typed_operands(op, left, right, NUMERIC)?;
            let output = widen(l, r);
            Ok(BinaryPlan::uniform(output, output))
        }
        BinaryOp::Divide => {
            typed_operands(op, left, right, NUMERIC)?;
            Ok(BinaryPlan::uniform(DType::Float, DType::Float))
        }
        BinaryOp::Quotient | BinaryOp::Remainder => {
            typed_operands(op, left, right, &[DType::Integer])?;
            Ok(BinaryPlan::uniform(DType::Integer, DType::Integer))
        }
        BinaryOp::Equal | BinaryOp::NotEqual => equality(op, left, right),
        BinaryOp::Greater | BinaryOp::GreaterEqual | BinaryOp::Less | BinaryOp::LessEqual => {
            ordered(op, left, right)
        }
        BinaryOp::And | BinaryOp::Or => logical(op, left, right),
    }
}

/// Integer with Integer stays Integer; anything involving Float is Float
fn widen(left: DType, right: DType) -> DType {
    if left == DType::Integer && right == DType::Integer {
        DType::Integer
    } else {
        DType::Float
    }
}

/// Series sides must be in `supported` (unsupported-dtype error); scalar
/// sides must be too (mismatch error)
fn typed_operands(
    op: BinaryOp,
    left: &Operand,
    right: &Operand,
    supported: &'static [DType],
) -> SeriesResult<(DType, DType)> {
    for side in [left, right] {
        if let Some(series) = side.as_series() {
            check_dtype(op.name(), series.dtype(), supported)?;
        }
    }
    match (left.dtype(), right.dtype()) {
        (Some(l), Some(r)) if supported.contains(&l) && supported.contains(&r) => Ok((l, r)),
        _ => Err(SeriesError::mismatch(
            op.name(),
            left.describe(),
            right.describe(),
        )),
    }
}

fn equality(op: BinaryOp, left: &Operand, right: &Operand) -> SeriesResult<BinaryPlan> {
    match (left.dtype(), right.dtype()) {
        (Some(l), Some(r)) if l == r => Ok(BinaryPlan {
            left: l,
            right: r,
            output: DType::Boolean,
        }),
        (Some(l), Some(r)) if l.is_numeric() && r.is_numeric() => {
            Ok(BinaryPlan::uniform(DType::Float, DType::Boolean))
        }
        _ => Err(SeriesError::mismatch(
            op.name(),
            left.describe(),
            right.describe(),
        )),
    }
}

fn ordered(op: BinaryOp, left: &Operand, right: &Operand) -> SeriesResult<BinaryPlan> {
    let both_series = left.as_series().is_some() && right.as_series().is_some();
    match (left.dtype(), right.dtype()) {
        (Some(l), Some(r)) if l.is_numeric() && r.is_numeric() => Ok(BinaryPlan::uniform(
            widen(l, r),
            DType::Boolean,
        )),
        // Any same-dtype pair of series is ordered by the backend; against a
        // scalar only temporal dtypes are
        (Some(l), Some(r)) if l == r && (both_series || l.is_temporal()) => Ok(BinaryPlan {
            left: l,
            right: r,
            output: DType::Boolean,
        }),
        _ => Err(SeriesError::mismatch(
            op.name(),
            left.describe(),
            right.describe(),
        )),
    }
}

fn logical(op: BinaryOp, left: &Operand, right: &Operand) -> SeriesResult<BinaryPlan> {
    for side in [left, right] {
        match side {
            Operand::Series(s) => check_dtype(op.name(), s.dtype(), &[DType::Boolean])?,
            Operand::Scalar(_) => {
                return Err(SeriesError::mismatch(
                    op.name(),
                    left.describe(),
                    right.describe(),
                ))
            }
        }
    }
    Ok(BinaryPlan::uniform(DType::Boolean, DType::Boolean))
}

/// Dtype unification used by `concat` and `coalesce`
///
/// Identical dtypes unify trivially, Integer and Float unify to Float, any
/// other pairing is an error naming both dtypes.
pub fn unify(operation: &'static str, left: DType, right: DType) -> SeriesResult<DType> {
    match (left, right) {
        (l, r) if l == r => Ok(l),
        (DType::Integer, DType::Float) | (DType::Float, DType::Integer) => Ok(DType::Float),
        (l, r) => Err(SeriesError::mismatch(operation, l, r)),
    }
}

/// Result dtype of filling the nulls of a `dtype` series with `value`
pub fn fill_value(dtype: DType, value: &Value) -> SeriesResult<DType> {
    match value.dtype() {
        Some(v) if v == dtype => Ok(dtype),
        Some(_) if value.is_numeric() && dtype.is_numeric() => Ok(DType::Float),
        _ => Err(SeriesError::mismatch("fill_missing", dtype, value)),
    }
}
