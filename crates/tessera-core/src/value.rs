//! Scalar values and binary-operation operands

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::dtype::DType;
use crate::error::SeriesResult;
use crate::series::Series;

/// A single element of a series, or a bare scalar operand
///
/// A scalar carries no dtype tag of its own; [`Value::dtype`] infers one from
/// the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Create a string value
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// The dtype this value would have as a series element, `None` for Null
    #[must_use]
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(DType::Integer),
            Value::Float(_) => Some(DType::Float),
            Value::Boolean(_) => Some(DType::Boolean),
            Value::String(_) => Some(DType::String),
            Value::Date(_) => Some(DType::Date),
            Value::DateTime(_) => Some(DType::DateTime),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Numeric value widened to f64
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Widen an Integer to Float; other values are returned unchanged
    #[must_use]
    pub(crate) fn promote(self, target: DType) -> Self {
        match (self, target) {
            (Value::Integer(i), DType::Float) => Value::Float(i as f64),
            (value, _) => value,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "nil"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One side of a binary operation: a series or a bare scalar
#[derive(Debug, Clone)]
pub enum Operand {
    Series(Series),
    Scalar(Value),
}

impl Operand {
    /// The dtype of the series, or the inferred dtype of the scalar
    #[must_use]
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Operand::Series(s) => Some(s.dtype()),
            Operand::Scalar(v) => v.dtype(),
        }
    }

    #[must_use]
    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Operand::Series(s) => Some(s),
            Operand::Scalar(_) => None,
        }
    }

    /// How this operand is named in a mismatch error: dtype for a series,
    /// the value itself for a scalar
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Operand::Series(s) => s.dtype().to_string(),
            Operand::Scalar(v) => v.to_string(),
        }
    }

    /// Bring this operand to `target`, casting a series or widening a scalar
    pub(crate) fn promote(self, target: DType) -> SeriesResult<Self> {
        match self {
            Operand::Series(s) if s.dtype() != target => {
                tracing::debug!(from = %s.dtype(), to = %target, "promoting series operand");
                Ok(Operand::Series(s.cast(target)?))
            }
            Operand::Scalar(v) => Ok(Operand::Scalar(v.promote(target))),
            series => Ok(series),
        }
    }
}

impl From<Series> for Operand {
    fn from(s: Series) -> Self {
        Operand::Series(s)
    }
}

impl From<&Series> for Operand {
    fn from(s: &Series) -> Self {
        Operand::Series(s.clone())
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Scalar(v)
    }
}

macro_rules! scalar_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Scalar(Value::from(v))
                }
            }
        )*
    };
}

scalar_operand!(i64, i32, f64, bool, &str, String, NaiveDate, NaiveDateTime);
