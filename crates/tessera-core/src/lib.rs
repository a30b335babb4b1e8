//! Tessera Core - typed, nullable columnar series
//!
//! This crate provides:
//! - DType: the six element types and their Arrow storage
//! - Algebra: dtype eligibility, promotion and result dtypes per operation
//! - Backend: the storage-engine trait and its Arrow implementation
//! - Series: the immutable column type and its operation surface
//! - Access: positional fetch and removal
//! - Coercion: construction from literals, concat and coalesce

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Positional access protocol
pub mod access;

/// Dtype algebra - pure eligibility and promotion rules
pub mod algebra;

/// Storage backends
pub mod backend;

/// Construction and multi-series combinators
pub mod coerce;

/// Process-wide defaults
pub mod config;

mod dispatch;

/// Element types
pub mod dtype;

/// Error types
pub mod error;

/// The series value object
pub mod series;

/// Scalars and operands
pub mod value;

pub use access::SeriesAccess;
pub use algebra::{Aggregation, BinaryOp, CumulativeOp, PeakKind, WindowOp};
pub use backend::{
    ArrowBackend, BackendRef, FillStrategy, InspectOptions, SeriesBackend, WindowOptions,
};
pub use coerce::{coalesce, concat, ListOptions};
pub use config::{default_backend, set_default_backend, SeriesConfig};
pub use dtype::{DType, MemType};
pub use error::{SeriesError, SeriesResult};
pub use series::{SampleOptions, SampleSize, Series, ValueCounts};
pub use value::{Operand, Value};
