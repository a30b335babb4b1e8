//! Series dtypes and their mapping onto Arrow physical types

use std::fmt;

use arrow::datatypes::{DataType as ArrowDataType, TimeUnit};
use serde::{Deserialize, Serialize};

/// The single declared element type of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Integer,
    Float,
    Boolean,
    String,
    Date,
    DateTime,
}

/// Integer and Float
pub const NUMERIC: &[DType] = &[DType::Integer, DType::Float];

/// Numeric dtypes plus Boolean
pub const NUMERIC_OR_BOOL: &[DType] = &[DType::Integer, DType::Float, DType::Boolean];

/// Numeric dtypes plus Date and DateTime
pub const NUMERIC_OR_TEMPORAL: &[DType] =
    &[DType::Integer, DType::Float, DType::Date, DType::DateTime];

/// Every dtype a series can carry
pub const ALL: &[DType] = &[
    DType::Integer,
    DType::Float,
    DType::Boolean,
    DType::String,
    DType::Date,
    DType::DateTime,
];

impl DType {
    /// Lowercase name used in error messages and serialization
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DType::Integer => "integer",
            DType::Float => "float",
            DType::Boolean => "boolean",
            DType::String => "string",
            DType::Date => "date",
            DType::DateTime => "datetime",
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Integer | DType::Float)
    }

    #[must_use]
    pub fn is_numeric_or_bool(self) -> bool {
        self.is_numeric() || self == DType::Boolean
    }

    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(self, DType::Date | DType::DateTime)
    }

    #[must_use]
    pub fn is_numeric_or_temporal(self) -> bool {
        self.is_numeric() || self.is_temporal()
    }

    /// The Arrow type used to store a series of this dtype
    #[must_use]
    pub fn to_arrow(self) -> ArrowDataType {
        match self {
            DType::Integer => ArrowDataType::Int64,
            DType::Float => ArrowDataType::Float64,
            DType::Boolean => ArrowDataType::Boolean,
            DType::String => ArrowDataType::Utf8,
            DType::Date => ArrowDataType::Date32,
            DType::DateTime => ArrowDataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }

    /// The dtype whose storage type is exactly `arrow_type`
    ///
    /// # Returns
    /// - `Some(DType)` for the six storage types produced by [`DType::to_arrow`]
    /// - `None` for everything else; callers cast first with [`DType::for_arrow`]
    #[must_use]
    pub fn from_arrow(arrow_type: &ArrowDataType) -> Option<Self> {
        match arrow_type {
            ArrowDataType::Int64 => Some(DType::Integer),
            ArrowDataType::Float64 => Some(DType::Float),
            ArrowDataType::Boolean => Some(DType::Boolean),
            ArrowDataType::Utf8 => Some(DType::String),
            ArrowDataType::Date32 => Some(DType::Date),
            ArrowDataType::Timestamp(TimeUnit::Microsecond, None) => Some(DType::DateTime),
            _ => None,
        }
    }

    /// The dtype an arbitrary Arrow array should be adopted as
    #[must_use]
    pub fn for_arrow(arrow_type: &ArrowDataType) -> Option<Self> {
        match arrow_type {
            // Integer types - all widen to Integer
            ArrowDataType::Int8
            | ArrowDataType::Int16
            | ArrowDataType::Int32
            | ArrowDataType::Int64
            | ArrowDataType::UInt8
            | ArrowDataType::UInt16
            | ArrowDataType::UInt32
            | ArrowDataType::UInt64 => Some(DType::Integer),

            ArrowDataType::Float16 | ArrowDataType::Float32 | ArrowDataType::Float64 => {
                Some(DType::Float)
            }

            ArrowDataType::Boolean => Some(DType::Boolean),

            ArrowDataType::Utf8 | ArrowDataType::LargeUtf8 | ArrowDataType::Utf8View => {
                Some(DType::String)
            }

            ArrowDataType::Date32 | ArrowDataType::Date64 => Some(DType::Date),

            ArrowDataType::Timestamp(_, _) => Some(DType::DateTime),

            // An all-null array has no element type of its own
            ArrowDataType::Null => Some(DType::Float),

            ArrowDataType::Dictionary(_, value_type) => Self::for_arrow(value_type),

            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Physical in-memory representation of a series, as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemType {
    Signed(u8),
    Unsigned(u8),
    Float(u8),
    Boolean,
    Utf8,
}

impl MemType {
    #[must_use]
    pub fn of(arrow_type: &ArrowDataType) -> Option<Self> {
        let memtype = match arrow_type {
            ArrowDataType::Int8 => MemType::Signed(8),
            ArrowDataType::Int16 => MemType::Signed(16),
            ArrowDataType::Int32 | ArrowDataType::Date32 => MemType::Signed(32),
            ArrowDataType::Int64 | ArrowDataType::Date64 | ArrowDataType::Timestamp(_, _) => {
                MemType::Signed(64)
            }
            ArrowDataType::UInt8 => MemType::Unsigned(8),
            ArrowDataType::UInt16 => MemType::Unsigned(16),
            ArrowDataType::UInt32 => MemType::Unsigned(32),
            ArrowDataType::UInt64 => MemType::Unsigned(64),
            ArrowDataType::Float32 => MemType::Float(32),
            ArrowDataType::Float64 => MemType::Float(64),
            ArrowDataType::Boolean => MemType::Boolean,
            ArrowDataType::Utf8 | ArrowDataType::LargeUtf8 => MemType::Utf8,
            _ => return None,
        };
        Some(memtype)
    }
}
