//! Storage backends
//!
//! A backend owns the physical column payloads and performs every
//! computation on them. The dispatch layer only hands it payloads whose
//! dtypes have already been validated and promoted, so implementations may
//! assume well-typed input.

mod arrow_compute;

use std::fmt;
use std::sync::Arc;

use arrow::array::ArrayRef;
use serde::{Deserialize, Serialize};

use crate::algebra::{Aggregation, BinaryOp, CumulativeOp, PeakKind, WindowOp};
use crate::dtype::{DType, MemType};
use crate::error::SeriesResult;
use crate::value::Value;

pub use arrow_compute::ArrowBackend;
pub(crate) use arrow_compute::clear_unrepresentable;

/// Shared handle to a backend implementation
pub type BackendRef = Arc<dyn SeriesBackend>;

/// One side of a binary operation as seen by a backend
#[derive(Debug, Clone, Copy)]
pub enum BinaryOperand<'a> {
    Array(&'a ArrayRef),
    Scalar(&'a Value),
}

/// Options for the rolling-window family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowOptions {
    /// Multiplied element-wise with the values in each window
    pub weights: Option<Vec<f64>>,
    /// Minimum non-null values a window needs, defaults to the window size
    pub min_periods: Option<usize>,
    /// Center the window on each position instead of trailing it
    pub center: bool,
}

impl WindowOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    #[must_use]
    pub fn with_min_periods(mut self, min_periods: usize) -> Self {
        self.min_periods = Some(min_periods);
        self
    }

    #[must_use]
    pub fn centered(mut self) -> Self {
        self.center = true;
        self
    }
}

/// How `fill_missing` replaces nulls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillStrategy {
    /// Carry the previous non-null value forward
    Forward,
    /// Carry the next non-null value backward
    Backward,
    Min,
    Max,
    Mean,
    /// A literal of the series dtype
    Value(Value),
}

impl FillStrategy {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            FillStrategy::Forward => "forward",
            FillStrategy::Backward => "backward",
            FillStrategy::Min => "min",
            FillStrategy::Max => "max",
            FillStrategy::Mean => "mean",
            FillStrategy::Value(_) => "value",
        }
    }
}

impl From<Value> for FillStrategy {
    fn from(value: Value) -> Self {
        FillStrategy::Value(value)
    }
}

/// Formatting options for [`SeriesBackend::inspect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectOptions {
    /// Maximum number of rows rendered
    pub limit: usize,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self { limit: 10 }
    }
}

/// The operation set every storage engine implements
///
/// Payloads are Arrow arrays whose data type is one of the storage types
/// produced by [`DType::to_arrow`].
pub trait SeriesBackend: fmt::Debug + Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Build a payload from values that already agree with `dtype`
    fn from_list(&self, values: &[Value], dtype: DType) -> SeriesResult<ArrayRef>;

    fn to_list(&self, array: &ArrayRef) -> SeriesResult<Vec<Value>>;

    fn size(&self, array: &ArrayRef) -> usize {
        array.len()
    }

    fn memtype(&self, array: &ArrayRef) -> SeriesResult<MemType>;

    /// Value at a position already known to be in bounds
    fn fetch(&self, array: &ArrayRef, index: usize) -> SeriesResult<Value>;

    fn slice(&self, array: &ArrayRef, offset: usize, length: usize) -> SeriesResult<ArrayRef>;

    fn take(&self, array: &ArrayRef, indices: &[usize]) -> SeriesResult<ArrayRef>;

    fn head(&self, array: &ArrayRef, n: usize) -> SeriesResult<ArrayRef> {
        self.slice(array, 0, n.min(array.len()))
    }

    fn tail(&self, array: &ArrayRef, n: usize) -> SeriesResult<ArrayRef> {
        let n = n.min(array.len());
        self.slice(array, array.len() - n, n)
    }

    fn first(&self, array: &ArrayRef) -> SeriesResult<Value> {
        if array.is_empty() {
            return Ok(Value::Null);
        }
        self.fetch(array, 0)
    }

    fn last(&self, array: &ArrayRef) -> SeriesResult<Value> {
        match array.len() {
            0 => Ok(Value::Null),
            len => self.fetch(array, len - 1),
        }
    }

    fn take_every(&self, array: &ArrayRef, n: usize) -> SeriesResult<ArrayRef> {
        let indices: Vec<usize> = (0..array.len()).step_by(n.max(1)).collect();
        self.take(array, &indices)
    }

    fn reverse(&self, array: &ArrayRef) -> SeriesResult<ArrayRef> {
        let indices: Vec<usize> = (0..array.len()).rev().collect();
        self.take(array, &indices)
    }

    fn sample(
        &self,
        array: &ArrayRef,
        n: usize,
        replacement: bool,
        seed: Option<u64>,
    ) -> SeriesResult<ArrayRef>;

    /// Keep the positions where `mask` is true
    fn mask(&self, array: &ArrayRef, mask: &ArrayRef) -> SeriesResult<ArrayRef>;

    fn concat(&self, left: &ArrayRef, right: &ArrayRef) -> SeriesResult<ArrayRef>;

    /// Position-wise: `left` where non-null, otherwise `right`
    fn coalesce(&self, left: &ArrayRef, right: &ArrayRef) -> SeriesResult<ArrayRef>;

    fn cast(&self, array: &ArrayRef, dtype: DType) -> SeriesResult<ArrayRef>;

    fn aggregate(&self, array: &ArrayRef, aggregation: Aggregation) -> SeriesResult<Value>;

    fn cumulative(
        &self,
        array: &ArrayRef,
        op: CumulativeOp,
        reverse: bool,
    ) -> SeriesResult<ArrayRef>;

    /// Boolean payload marking positions equal to the series max (or min)
    fn peaks(&self, array: &ArrayRef, kind: PeakKind) -> SeriesResult<ArrayRef> {
        let aggregation = match kind {
            PeakKind::Max => Aggregation::Max,
            PeakKind::Min => Aggregation::Min,
        };
        let extreme = self.aggregate(array, aggregation)?;
        if extreme.is_null() {
            return self.is_not_nil(array);
        }
        self.binary(
            BinaryOp::Equal,
            BinaryOperand::Array(array),
            BinaryOperand::Scalar(&extreme),
        )
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: BinaryOperand<'_>,
        right: BinaryOperand<'_>,
    ) -> SeriesResult<ArrayRef>;

    /// Same size and the same value, or null, at every position
    fn all_equal(&self, left: &ArrayRef, right: &ArrayRef) -> SeriesResult<bool>;

    fn sort(&self, array: &ArrayRef, reverse: bool) -> SeriesResult<ArrayRef>;

    /// Integer payload of the positions that would sort the series
    fn argsort(&self, array: &ArrayRef, reverse: bool) -> SeriesResult<ArrayRef>;

    /// Unique values in order of first occurrence
    fn distinct(&self, array: &ArrayRef) -> SeriesResult<ArrayRef>;

    /// Unique values in unspecified order
    fn unordered_distinct(&self, array: &ArrayRef) -> SeriesResult<ArrayRef>;

    fn n_distinct(&self, array: &ArrayRef) -> SeriesResult<usize>;

    /// Distinct values and their occurrence counts
    fn count(&self, array: &ArrayRef) -> SeriesResult<(ArrayRef, ArrayRef)>;

    fn window(
        &self,
        array: &ArrayRef,
        op: WindowOp,
        window_size: usize,
        options: &WindowOptions,
    ) -> SeriesResult<ArrayRef>;

    fn fill_missing(&self, array: &ArrayRef, strategy: &FillStrategy) -> SeriesResult<ArrayRef>;

    fn is_nil(&self, array: &ArrayRef) -> SeriesResult<ArrayRef>;

    fn is_not_nil(&self, array: &ArrayRef) -> SeriesResult<ArrayRef>;

    /// Apply `f` to every element through a plain list round-trip
    fn transform(
        &self,
        array: &ArrayRef,
        f: &mut dyn FnMut(Value) -> Value,
    ) -> SeriesResult<Vec<Value>> {
        Ok(self.to_list(array)?.into_iter().map(f).collect())
    }

    fn inspect(&self, array: &ArrayRef, options: &InspectOptions) -> SeriesResult<String>;
}
