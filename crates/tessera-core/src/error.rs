//! Error types for series operations

use thiserror::Error;

use crate::dtype::DType;

/// Result type for series operations
pub type SeriesResult<T> = Result<T, SeriesError>;

/// Errors that can occur while validating or dispatching a series operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// Operation invoked on a dtype outside its supported set
    #[error(
        "{operation} not supported for dtype {dtype}, valid dtypes are [{}]",
        join_dtypes(.supported)
    )]
    DtypeUnsupported {
        operation: &'static str,
        dtype: DType,
        supported: Vec<DType>,
    },

    /// Two operands with incompatible dtypes
    #[error("cannot invoke {operation} with mismatched dtypes: {left} and {right}")]
    DtypeMismatch {
        operation: &'static str,
        left: String,
        right: String,
    },

    /// Index outside `[-size, size - 1]`
    #[error("requested index {index} out of bounds for series of size {size}")]
    OutOfBounds { index: i64, size: usize },

    /// A literal sequence contains a value that disagrees with the inferred dtype
    #[error("the value {value} does not match the inferred series dtype {dtype}")]
    Construction { value: String, dtype: DType },

    /// An option or argument value that cannot be honoured
    #[error("invalid option for {operation}: {message}")]
    InvalidOption {
        operation: &'static str,
        message: String,
    },

    /// Element-wise operation over series of different sizes
    #[error("{operation} requires series of equal size, got {left} and {right}")]
    LengthMismatch {
        operation: &'static str,
        left: usize,
        right: usize,
    },

    /// Failure reported by the Arrow compute layer
    #[error("Arrow error: {0}")]
    Arrow(String),
}

impl SeriesError {
    /// Shorthand for [`SeriesError::InvalidOption`]
    pub(crate) fn invalid_option(operation: &'static str, message: impl Into<String>) -> Self {
        SeriesError::InvalidOption {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(
        operation: &'static str,
        left: impl ToString,
        right: impl ToString,
    ) -> Self {
        SeriesError::DtypeMismatch {
            operation,
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

fn join_dtypes(dtypes: &[DType]) -> String {
    dtypes
        .iter()
        .map(DType::name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<arrow::error::ArrowError> for SeriesError {
    fn from(err: arrow::error::ArrowError) -> Self {
        SeriesError::Arrow(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SeriesError::DtypeUnsupported {
            operation: "mean",
            dtype: DType::String,
            supported: vec![DType::Integer, DType::Float],
        };
        assert_eq!(
            err.to_string(),
            "mean not supported for dtype string, valid dtypes are [integer, float]"
        );

        let err = SeriesError::mismatch("concat", DType::String, DType::Integer);
        assert_eq!(
            err.to_string(),
            "cannot invoke concat with mismatched dtypes: string and integer"
        );

        let err = SeriesError::OutOfBounds { index: 5, size: 3 };
        assert_eq!(
            err.to_string(),
            "requested index 5 out of bounds for series of size 3"
        );
    }

    #[test]
    fn test_from_arrow_error() {
        let err: SeriesError = arrow::error::ArrowError::DivideByZero.into();
        assert!(matches!(err, SeriesError::Arrow(_)));
    }
}
