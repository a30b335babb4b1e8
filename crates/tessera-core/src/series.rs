//! Series - a typed, nullable column and its operation surface
//!
//! A `Series` is an immutable value: a dtype tag, a reference-counted Arrow
//! payload and the backend that owns it. Every operation validates operand
//! dtypes first, applies any promotion, and only then dispatches to the
//! backend, returning a new series.

use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array};
use arrow::array::{StringArray, TimestampMicrosecondArray};
use arrow::datatypes::Date32Type;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::algebra::{
    self, check_dtype, Aggregation, BinaryOp, CumulativeOp, PeakKind, WindowOp,
};
use crate::backend::{
    clear_unrepresentable, BackendRef, FillStrategy, InspectOptions, WindowOptions,
};
use crate::coerce::{self, ListOptions};
use crate::config::default_backend;
use crate::dispatch;
use crate::dtype::{DType, MemType, NUMERIC, NUMERIC_OR_TEMPORAL};
use crate::error::{SeriesError, SeriesResult};
use crate::value::{Operand, Value};

/// A typed, nullable, immutable column
#[derive(Clone)]
pub struct Series {
    dtype: DType,
    array: ArrayRef,
    backend: BackendRef,
}

/// How many elements `sample` draws
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SampleSize {
    Count(usize),
    /// Share of the series size, truncated to a whole count
    Fraction(f64),
}

impl From<usize> for SampleSize {
    fn from(n: usize) -> Self {
        SampleSize::Count(n)
    }
}

impl From<f64> for SampleSize {
    fn from(fraction: f64) -> Self {
        SampleSize::Fraction(fraction)
    }
}

/// Options for [`Series::sample`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleOptions {
    pub replacement: bool,
    /// Seed for a reproducible draw (None = seeded from entropy)
    pub seed: Option<u64>,
}

impl SampleOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_replacement(mut self) -> Self {
        self.replacement = true;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Result of [`Series::count`]: each distinct value with its occurrences
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCounts {
    /// Distinct values, most frequent first
    pub values: Series,
    /// Integer occurrence counts aligned with `values`
    pub counts: Series,
}

impl Series {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Wrap a payload whose storage type already matches `dtype`
    pub(crate) fn from_parts(dtype: DType, array: ArrayRef, backend: BackendRef) -> Self {
        Self {
            dtype,
            array,
            backend,
        }
    }

    fn with_default_backend(dtype: DType, array: ArrayRef) -> Self {
        Self::from_parts(dtype, array, default_backend())
    }

    /// Create an Integer series
    #[must_use]
    pub fn from_ints(values: Vec<i64>) -> Self {
        Self::with_default_backend(DType::Integer, Arc::new(Int64Array::from(values)))
    }

    /// Create an Integer series with nulls
    #[must_use]
    pub fn from_optional_ints(values: Vec<Option<i64>>) -> Self {
        Self::with_default_backend(DType::Integer, Arc::new(Int64Array::from(values)))
    }

    /// Create a Float series
    #[must_use]
    pub fn from_floats(values: Vec<f64>) -> Self {
        Self::with_default_backend(DType::Float, Arc::new(Float64Array::from(values)))
    }

    /// Create a Float series with nulls
    #[must_use]
    pub fn from_optional_floats(values: Vec<Option<f64>>) -> Self {
        Self::with_default_backend(DType::Float, Arc::new(Float64Array::from(values)))
    }

    /// Create a Boolean series
    #[must_use]
    pub fn from_bools(values: Vec<bool>) -> Self {
        Self::with_default_backend(DType::Boolean, Arc::new(BooleanArray::from(values)))
    }

    /// Create a String series
    #[must_use]
    pub fn from_strings(values: Vec<&str>) -> Self {
        Self::with_default_backend(DType::String, Arc::new(StringArray::from(values)))
    }

    /// Create a Date series
    #[must_use]
    pub fn from_dates(values: Vec<NaiveDate>) -> Self {
        let days: Vec<i32> = values.into_iter().map(Date32Type::from_naive_date).collect();
        Self::with_default_backend(DType::Date, Arc::new(Date32Array::from(days)))
    }

    /// Create a DateTime series
    #[must_use]
    pub fn from_datetimes(values: Vec<NaiveDateTime>) -> Self {
        let micros: Vec<i64> = values
            .iter()
            .map(|dt| dt.and_utc().timestamp_micros())
            .collect();
        Self::with_default_backend(
            DType::DateTime,
            Arc::new(TimestampMicrosecondArray::from(micros)),
        )
    }

    /// Build a series from a mixed literal sequence, inferring its dtype
    ///
    /// # Errors
    /// Returns `Construction` when a value disagrees with the dtype inferred
    /// from the values before it.
    pub fn from_list(values: &[Value]) -> SeriesResult<Self> {
        coerce::from_list(values, &ListOptions::default())
    }

    /// [`Series::from_list`] with an explicit dtype or backend
    ///
    /// # Errors
    /// Fails on inference errors or when the inferred dtype cannot be cast to
    /// the requested one.
    pub fn from_list_with(values: &[Value], options: &ListOptions) -> SeriesResult<Self> {
        coerce::from_list(values, options)
    }

    /// Adopt an Arrow array, normalising it to the storage type of its dtype
    ///
    /// # Errors
    /// Returns `InvalidOption` for Arrow types with no series dtype, or the
    /// Arrow error if normalisation fails.
    ///
    /// Date and DateTime offsets outside the representable calendar become
    /// null.
    pub fn from_array(array: ArrayRef) -> SeriesResult<Self> {
        let dtype = DType::for_arrow(array.data_type()).ok_or_else(|| {
            SeriesError::invalid_option(
                "from_array",
                format!("no series dtype for Arrow type {:?}", array.data_type()),
            )
        })?;
        let storage = dtype.to_arrow();
        let array = if array.data_type() == &storage {
            array
        } else {
            arrow::compute::cast(&array, &storage)?
        };
        let array = clear_unrepresentable(array, dtype)?;
        Ok(Self::with_default_backend(dtype, array))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements, nulls included
    #[must_use]
    pub fn size(&self) -> usize {
        self.backend.size(&self.array)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The underlying Arrow payload
    #[must_use]
    pub fn array(&self) -> &ArrayRef {
        &self.array
    }

    /// The backend this series was built on
    #[must_use]
    pub fn backend(&self) -> &BackendRef {
        &self.backend
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn memtype(&self) -> SeriesResult<MemType> {
        dispatch::apply(self, "memtype", |b, a| b.memtype(a))
    }

    #[must_use]
    pub fn null_count(&self) -> usize {
        self.array.null_count()
    }

    /// Materialise every element
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn to_list(&self) -> SeriesResult<Vec<Value>> {
        dispatch::apply(self, "to_list", |b, a| b.to_list(a))
    }

    /// Iterate over the elements in order
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn iter(&self) -> SeriesResult<impl Iterator<Item = Value>> {
        Ok(self.to_list()?.into_iter())
    }

    /// Render a preview of at most `options.limit` rows
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn inspect(&self, options: &InspectOptions) -> SeriesResult<String> {
        dispatch::apply(self, "inspect", |b, a| b.inspect(a, options))
    }

    // ========================================================================
    // Slicing and selection
    // ========================================================================

    /// # Errors
    /// Propagates backend errors.
    pub fn head(&self, n: usize) -> SeriesResult<Series> {
        dispatch::apply_series(self, "head", None, |b, a| b.head(a, n))
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn tail(&self, n: usize) -> SeriesResult<Series> {
        dispatch::apply_series(self, "tail", None, |b, a| b.tail(a, n))
    }

    /// First element, nil for an empty series
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn first(&self) -> SeriesResult<Value> {
        dispatch::apply(self, "first", |b, a| b.first(a))
    }

    /// Last element, nil for an empty series
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn last(&self) -> SeriesResult<Value> {
        dispatch::apply(self, "last", |b, a| b.last(a))
    }

    /// Every `n`th element starting with the first
    ///
    /// # Errors
    /// Returns `InvalidOption` when `n` is zero.
    pub fn take_every(&self, n: usize) -> SeriesResult<Series> {
        if n == 0 {
            return Err(SeriesError::invalid_option(
                "take_every",
                "step must be at least 1",
            ));
        }
        dispatch::apply_series(self, "take_every", None, |b, a| b.take_every(a, n))
    }

    /// Up to `length` elements starting at `offset`; a negative offset counts
    /// from the end
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn slice(&self, offset: i64, length: usize) -> SeriesResult<Series> {
        let size = self.size();
        let start = if offset < 0 {
            size.saturating_sub(offset.unsigned_abs() as usize)
        } else {
            (offset as usize).min(size)
        };
        let length = length.min(size - start);
        dispatch::apply_series(self, "slice", None, |b, a| b.slice(a, start, length))
    }

    /// Elements at `indices`, in the order given
    ///
    /// # Errors
    /// Returns `OutOfBounds` for the first index past the end.
    pub fn take(&self, indices: &[usize]) -> SeriesResult<Series> {
        let size = self.size();
        if let Some(&index) = indices.iter().find(|&&i| i >= size) {
            return Err(SeriesError::OutOfBounds {
                index: index as i64,
                size,
            });
        }
        dispatch::apply_series(self, "take", None, |b, a| b.take(a, indices))
    }

    /// Draw a random sample
    ///
    /// Without replacement the sample cannot exceed the series size.
    ///
    /// # Errors
    /// Returns `InvalidOption` for an oversized sample without replacement, a
    /// negative or non-finite fraction, or sampling an empty series with
    /// replacement.
    pub fn sample(
        &self,
        size: impl Into<SampleSize>,
        options: &SampleOptions,
    ) -> SeriesResult<Series> {
        let total = self.size();
        let n = match size.into() {
            SampleSize::Count(n) => n,
            SampleSize::Fraction(fraction) => {
                if !fraction.is_finite() || fraction < 0.0 {
                    return Err(SeriesError::invalid_option(
                        "sample",
                        format!("fraction must be a non-negative number, got {fraction}"),
                    ));
                }
                if fraction > 1.0 && !options.replacement {
                    return Err(SeriesError::invalid_option(
                        "sample",
                        "in order to sample more than 100% of the series, replacement must be true",
                    ));
                }
                (fraction * total as f64) as usize
            }
        };

        if n > total && !options.replacement {
            return Err(SeriesError::invalid_option(
                "sample",
                format!(
                    "in order to sample {n} elements from a series of size {total}, replacement must be true"
                ),
            ));
        }
        if n > 0 && total == 0 {
            return Err(SeriesError::invalid_option(
                "sample",
                "cannot sample from an empty series",
            ));
        }

        dispatch::apply_series(self, "sample", None, |b, a| {
            b.sample(a, n, options.replacement, options.seed)
        })
    }

    /// Keep the positions where `mask` is true
    ///
    /// # Errors
    /// The mask must be a Boolean series of the same size.
    pub fn mask(&self, mask: &Series) -> SeriesResult<Series> {
        check_dtype("mask", mask.dtype, &[DType::Boolean])?;
        check_length("mask", self, mask)?;
        dispatch::apply_series(self, "mask", None, |b, a| b.mask(a, mask.array()))
    }

    // ========================================================================
    // Combination and conversion
    // ========================================================================

    /// Append `other`, unifying Integer with Float
    ///
    /// # Errors
    /// Returns `DtypeMismatch` for any other dtype pairing.
    pub fn concat(&self, other: &Series) -> SeriesResult<Series> {
        coerce::concat(&[self.clone(), other.clone()])
    }

    /// Fill the nulls of this series from `other`, position-wise
    ///
    /// # Errors
    /// Returns `DtypeMismatch` for incompatible dtypes and `LengthMismatch`
    /// for series of different sizes.
    pub fn coalesce(&self, other: &Series) -> SeriesResult<Series> {
        coerce::coalesce_pair(self, other)
    }

    /// Convert to `dtype`; returns the same series when the dtype already
    /// matches
    ///
    /// Integer to Date reads days since the Unix epoch, Integer to DateTime
    /// reads microseconds since the Unix epoch.
    ///
    /// # Errors
    /// Propagates the backend error for conversions it cannot perform.
    pub fn cast(&self, dtype: DType) -> SeriesResult<Series> {
        if self.dtype == dtype {
            return Ok(self.clone());
        }
        dispatch::apply_series(self, "cast", Some(dtype), |b, a| b.cast(a, dtype))
    }

    // ========================================================================
    // Aggregations
    // ========================================================================

    /// Reduce the series to a single value; nulls are skipped
    ///
    /// # Errors
    /// Returns `DtypeUnsupported` outside the aggregation's dtype set and
    /// `InvalidOption` for a quantile outside `[0, 1]`.
    pub fn aggregate(&self, aggregation: Aggregation) -> SeriesResult<Value> {
        check_dtype(aggregation.name(), self.dtype, aggregation.supported())?;
        if let Aggregation::Quantile(q) = aggregation {
            if !(0.0..=1.0).contains(&q) {
                return Err(SeriesError::invalid_option(
                    "quantile",
                    format!("quantile must be between 0 and 1, got {q}"),
                ));
            }
        }
        dispatch::apply(self, aggregation.name(), |b, a| b.aggregate(a, aggregation))
    }

    /// # Errors
    /// Numeric and Boolean series only.
    pub fn sum(&self) -> SeriesResult<Value> {
        self.aggregate(Aggregation::Sum)
    }

    /// # Errors
    /// Numeric and temporal series only.
    pub fn min(&self) -> SeriesResult<Value> {
        self.aggregate(Aggregation::Min)
    }

    /// # Errors
    /// Numeric and temporal series only.
    pub fn max(&self) -> SeriesResult<Value> {
        self.aggregate(Aggregation::Max)
    }

    /// # Errors
    /// Numeric series only.
    pub fn mean(&self) -> SeriesResult<Value> {
        self.aggregate(Aggregation::Mean)
    }

    /// # Errors
    /// Numeric series only.
    pub fn median(&self) -> SeriesResult<Value> {
        self.aggregate(Aggregation::Median)
    }

    /// Sample variance
    ///
    /// # Errors
    /// Numeric series only.
    pub fn var(&self) -> SeriesResult<Value> {
        self.aggregate(Aggregation::Var)
    }

    /// Sample standard deviation
    ///
    /// # Errors
    /// Numeric series only.
    pub fn std(&self) -> SeriesResult<Value> {
        self.aggregate(Aggregation::Std)
    }

    /// Nearest-rank quantile
    ///
    /// # Errors
    /// Numeric and temporal series only, with `q` in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> SeriesResult<Value> {
        self.aggregate(Aggregation::Quantile(q))
    }

    /// Running reduction; nulls stay null and do not reset the running value
    ///
    /// # Errors
    /// Returns `DtypeUnsupported` outside the operation's dtype set.
    pub fn cumulative(&self, op: CumulativeOp, reverse: bool) -> SeriesResult<Series> {
        check_dtype(op.name(), self.dtype, op.supported())?;
        dispatch::apply_series(self, op.name(), None, |b, a| b.cumulative(a, op, reverse))
    }

    /// # Errors
    /// Numeric series only.
    pub fn cumulative_sum(&self, reverse: bool) -> SeriesResult<Series> {
        self.cumulative(CumulativeOp::Sum, reverse)
    }

    /// # Errors
    /// Numeric and temporal series only.
    pub fn cumulative_min(&self, reverse: bool) -> SeriesResult<Series> {
        self.cumulative(CumulativeOp::Min, reverse)
    }

    /// # Errors
    /// Numeric and temporal series only.
    pub fn cumulative_max(&self, reverse: bool) -> SeriesResult<Series> {
        self.cumulative(CumulativeOp::Max, reverse)
    }

    /// Boolean series marking the positions holding the maximum (or minimum)
    ///
    /// # Errors
    /// Numeric and temporal series only.
    pub fn peaks(&self, kind: PeakKind) -> SeriesResult<Series> {
        check_dtype("peaks", self.dtype, NUMERIC_OR_TEMPORAL)?;
        dispatch::apply_series(self, "peaks", Some(DType::Boolean), |b, a| b.peaks(a, kind))
    }

    // ========================================================================
    // Element-wise binary operations
    // ========================================================================

    /// Validate, promote and dispatch `left op right`
    ///
    /// Either side may be a bare scalar, but not both.
    ///
    /// # Errors
    /// Returns the dtype algebra's error for ineligible operands and
    /// `LengthMismatch` for two series of different sizes.
    pub fn binary(
        op: BinaryOp,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> SeriesResult<Series> {
        let (left, right) = (left.into(), right.into());
        let plan = algebra::binary(op, &left, &right)?;
        if let (Operand::Series(l), Operand::Series(r)) = (&left, &right) {
            check_length(op.name(), l, r)?;
        }
        let left = left.promote(plan.left)?;
        let right = right.promote(plan.right)?;
        dispatch::apply_binary(op, &left, &right, plan.output)
    }

    /// # Errors
    /// Numeric operands only.
    pub fn add(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Add, left, right)
    }

    /// # Errors
    /// Numeric operands only.
    pub fn subtract(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Subtract, left, right)
    }

    /// # Errors
    /// Numeric operands only.
    pub fn multiply(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Multiply, left, right)
    }

    /// Float division, whatever the operand dtypes
    ///
    /// # Errors
    /// Numeric operands only.
    pub fn divide(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Divide, left, right)
    }

    /// Floor division of integers; null where the divisor is zero
    ///
    /// # Errors
    /// Integer operands only.
    pub fn quotient(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Quotient, left, right)
    }

    /// Remainder of [`Series::quotient`]; null where the divisor is zero
    ///
    /// # Errors
    /// Integer operands only.
    pub fn remainder(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Remainder, left, right)
    }

    /// # Errors
    /// Numeric operands only.
    pub fn pow(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Pow, left, right)
    }

    /// # Errors
    /// See [`Series::binary`].
    pub fn equal(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Equal, left, right)
    }

    /// # Errors
    /// See [`Series::binary`].
    pub fn not_equal(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::NotEqual, left, right)
    }

    /// # Errors
    /// See [`Series::binary`].
    pub fn greater(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Greater, left, right)
    }

    /// # Errors
    /// See [`Series::binary`].
    pub fn greater_equal(
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> SeriesResult<Series> {
        Self::binary(BinaryOp::GreaterEqual, left, right)
    }

    /// # Errors
    /// See [`Series::binary`].
    pub fn less(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Less, left, right)
    }

    /// # Errors
    /// See [`Series::binary`].
    pub fn less_equal(left: impl Into<Operand>, right: impl Into<Operand>) -> SeriesResult<Series> {
        Self::binary(BinaryOp::LessEqual, left, right)
    }

    /// # Errors
    /// Boolean series only.
    pub fn and(left: &Series, right: &Series) -> SeriesResult<Series> {
        Self::binary(BinaryOp::And, left, right)
    }

    /// # Errors
    /// Boolean series only.
    pub fn or(left: &Series, right: &Series) -> SeriesResult<Series> {
        Self::binary(BinaryOp::Or, left, right)
    }

    /// Structural equality: same dtype, size, and value or null at every
    /// position
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn all_equal(&self, other: &Series) -> SeriesResult<bool> {
        if self.dtype != other.dtype {
            return Ok(false);
        }
        dispatch::apply(self, "all_equal", |b, a| b.all_equal(a, other.array()))
    }

    // ========================================================================
    // Ordering and uniqueness
    // ========================================================================

    /// Sort values, nulls last
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn sort(&self, reverse: bool) -> SeriesResult<Series> {
        dispatch::apply_series(self, "sort", None, |b, a| b.sort(a, reverse))
    }

    /// Integer series of the positions that would sort this series
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn argsort(&self, reverse: bool) -> SeriesResult<Series> {
        dispatch::apply_series(self, "argsort", Some(DType::Integer), |b, a| {
            b.argsort(a, reverse)
        })
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn reverse(&self) -> SeriesResult<Series> {
        dispatch::apply_series(self, "reverse", None, |b, a| b.reverse(a))
    }

    /// Unique values in order of first occurrence
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn distinct(&self) -> SeriesResult<Series> {
        dispatch::apply_series(self, "distinct", None, |b, a| b.distinct(a))
    }

    /// Unique values in no particular order
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn unordered_distinct(&self) -> SeriesResult<Series> {
        dispatch::apply_series(self, "unordered_distinct", None, |b, a| {
            b.unordered_distinct(a)
        })
    }

    /// Number of unique values; null counts as one
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn n_distinct(&self) -> SeriesResult<usize> {
        dispatch::apply(self, "n_distinct", |b, a| b.n_distinct(a))
    }

    /// Occurrences of each distinct value, most frequent first
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn count(&self) -> SeriesResult<ValueCounts> {
        let (values, counts) = dispatch::apply(self, "count", |b, a| b.count(a))?;
        Ok(ValueCounts {
            values: Series::from_parts(self.dtype, values, self.backend.clone()),
            counts: Series::from_parts(DType::Integer, counts, self.backend.clone()),
        })
    }

    // ========================================================================
    // Rolling windows
    // ========================================================================

    /// Rolling reduction over `window_size` positions
    ///
    /// # Errors
    /// Numeric series only; `window_size` must be at least 1 and weights, if
    /// given, must have exactly `window_size` entries.
    pub fn window(
        &self,
        op: WindowOp,
        window_size: usize,
        options: &WindowOptions,
    ) -> SeriesResult<Series> {
        check_dtype(op.name(), self.dtype, op.supported())?;
        if window_size == 0 {
            return Err(SeriesError::invalid_option(
                op.name(),
                "window size must be at least 1",
            ));
        }
        if let Some(weights) = &options.weights {
            if weights.len() != window_size {
                return Err(SeriesError::invalid_option(
                    op.name(),
                    format!(
                        "expected {window_size} weights, got {}",
                        weights.len()
                    ),
                ));
            }
        }
        let output = op.output(self.dtype, options.weights.is_some());
        dispatch::apply_series(self, op.name(), Some(output), |b, a| {
            b.window(a, op, window_size, options)
        })
    }

    /// # Errors
    /// See [`Series::window`].
    pub fn window_sum(&self, window_size: usize, options: &WindowOptions) -> SeriesResult<Series> {
        self.window(WindowOp::Sum, window_size, options)
    }

    /// # Errors
    /// See [`Series::window`].
    pub fn window_mean(&self, window_size: usize, options: &WindowOptions) -> SeriesResult<Series> {
        self.window(WindowOp::Mean, window_size, options)
    }

    /// # Errors
    /// See [`Series::window`].
    pub fn window_min(&self, window_size: usize, options: &WindowOptions) -> SeriesResult<Series> {
        self.window(WindowOp::Min, window_size, options)
    }

    /// # Errors
    /// See [`Series::window`].
    pub fn window_max(&self, window_size: usize, options: &WindowOptions) -> SeriesResult<Series> {
        self.window(WindowOp::Max, window_size, options)
    }

    // ========================================================================
    // Missing values
    // ========================================================================

    /// Replace nulls by strategy or with a literal value
    ///
    /// Filling an Integer series with its mean, or with a Float literal,
    /// produces a Float series.
    ///
    /// # Errors
    /// Returns `DtypeUnsupported` when the strategy does not apply to this
    /// dtype and `DtypeMismatch` for a literal of an incompatible dtype.
    pub fn fill_missing(&self, strategy: impl Into<FillStrategy>) -> SeriesResult<Series> {
        let strategy = strategy.into();
        let output = match &strategy {
            FillStrategy::Forward | FillStrategy::Backward => self.dtype,
            FillStrategy::Min | FillStrategy::Max => {
                check_dtype("fill_missing", self.dtype, NUMERIC_OR_TEMPORAL)?;
                self.dtype
            }
            FillStrategy::Mean => {
                check_dtype("fill_missing", self.dtype, NUMERIC)?;
                DType::Float
            }
            FillStrategy::Value(value) => algebra::fill_value(self.dtype, value)?,
        };
        if output != self.dtype {
            tracing::debug!(
                strategy = strategy.name(),
                from = %self.dtype,
                to = %output,
                "fill_missing widens series"
            );
        }
        let strategy = match strategy {
            FillStrategy::Value(value) => FillStrategy::Value(value.promote(output)),
            other => other,
        };
        let source = self.cast(output)?;
        dispatch::apply_series(&source, "fill_missing", None, |b, a| {
            b.fill_missing(a, &strategy)
        })
    }

    /// Boolean series, true where the element is null
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn is_nil(&self) -> SeriesResult<Series> {
        dispatch::apply_series(self, "is_nil", Some(DType::Boolean), |b, a| b.is_nil(a))
    }

    /// Boolean series, true where the element is present
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn is_not_nil(&self) -> SeriesResult<Series> {
        dispatch::apply_series(self, "is_not_nil", Some(DType::Boolean), |b, a| {
            b.is_not_nil(a)
        })
    }

    // ========================================================================
    // Element-level transforms
    // ========================================================================

    /// Apply `f` to every element and infer the dtype of the results
    ///
    /// This materialises the whole series as values and rebuilds it, so it
    /// is far slower than any backend kernel.
    ///
    /// # Errors
    /// Returns `Construction` when `f` produces values of mixed dtypes.
    pub fn transform(&self, mut f: impl FnMut(Value) -> Value) -> SeriesResult<Series> {
        let values = dispatch::apply(self, "transform", |b, a| b.transform(a, &mut f))?;
        self.rebuild(&values)
    }

    /// Replace the element at `index` (negative counts from the end) with
    /// `f(current)`
    ///
    /// Goes through a full list round-trip, like [`Series::transform`].
    ///
    /// # Errors
    /// Returns `OutOfBounds` for an index outside `[-size, size - 1]`.
    pub fn update(&self, index: i64, f: impl FnOnce(Value) -> Value) -> SeriesResult<Series> {
        let position = resolve_index(index, self.size())?;
        let mut values = self.to_list()?;
        let current = std::mem::replace(&mut values[position], Value::Null);
        values[position] = f(current);
        self.rebuild(&values)
    }

    /// Rebuild from values on this series' backend; an all-null result keeps
    /// the current dtype
    fn rebuild(&self, values: &[Value]) -> SeriesResult<Series> {
        let mut options = ListOptions::new().with_backend(self.backend.clone());
        if values.iter().all(Value::is_null) {
            options = options.with_dtype(self.dtype);
        }
        coerce::from_list(values, &options)
    }
}

/// Fail with `LengthMismatch` unless both series have the same size
pub(crate) fn check_length(
    operation: &'static str,
    left: &Series,
    right: &Series,
) -> SeriesResult<()> {
    if left.size() != right.size() {
        return Err(SeriesError::LengthMismatch {
            operation,
            left: left.size(),
            right: right.size(),
        });
    }
    Ok(())
}

/// Resolve a possibly negative index against `size`
pub(crate) fn resolve_index(index: i64, size: usize) -> SeriesResult<usize> {
    let signed = size as i64;
    let resolved = if index < 0 { index + signed } else { index };
    if resolved < 0 || resolved >= signed {
        return Err(SeriesError::OutOfBounds { index, size });
    }
    Ok(resolved as usize)
}

impl PartialEq for Series {
    fn eq(&self, other: &Self) -> bool {
        self.all_equal(other).unwrap_or(false)
    }
}

impl fmt::Debug for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Series {{ dtype: {}, len: {}, backend: {} }}",
            self.dtype,
            self.size(),
            self.backend.name()
        )
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview = self
            .inspect(&InspectOptions::default())
            .map_err(|_| fmt::Error)?;
        f.write_str(&preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::SeriesAccess;

    #[test]
    fn test_series_creation() {
        let s = Series::from_ints(vec![1, 2, 3]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.dtype(), DType::Integer);
        assert_eq!(s.get(0).unwrap(), Value::Integer(1));
        assert_eq!(s.get(-1).unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_null_handling() {
        let s = Series::from_optional_ints(vec![Some(1), None, Some(3)]);
        assert_eq!(s.null_count(), 1);
        assert_eq!(s.get(1).unwrap(), Value::Null);
        assert_eq!(s.sum().unwrap(), Value::Integer(4));
    }

    #[test]
    fn test_from_array_normalises_storage() {
        let array: ArrayRef = Arc::new(arrow::array::Int32Array::from(vec![1, 2]));
        let s = Series::from_array(array).unwrap();
        assert_eq!(s.dtype(), DType::Integer);
        assert_eq!(s.memtype().unwrap(), MemType::Signed(64));
    }

    // ===== Arithmetic Operations Tests =====

    #[test]
    fn test_add_series() {
        let a = Series::from_ints(vec![1, 2, 3]);
        let b = Series::from_ints(vec![10, 20, 30]);
        let result = Series::add(&a, &b).unwrap();
        assert_eq!(result.dtype(), DType::Integer);
        assert_eq!(result.get(0).unwrap(), Value::Integer(11));
        assert_eq!(result.get(2).unwrap(), Value::Integer(33));
    }

    #[test]
    fn test_add_float_scalar_promotes_series() {
        let a = Series::from_ints(vec![1, 2]);
        let result = Series::add(&a, 0.5).unwrap();
        assert_eq!(result.dtype(), DType::Float);
        assert_eq!(result.get(1).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_scalar_on_left() {
        let a = Series::from_ints(vec![1, 2]);
        let result = Series::subtract(10, &a).unwrap();
        assert_eq!(result.to_list().unwrap(), vec![Value::Integer(9), Value::Integer(8)]);
    }

    #[test]
    fn test_divide_by_zero_is_infinite() {
        let a = Series::from_ints(vec![1, -1]);
        let result = Series::divide(&a, 0).unwrap();
        assert_eq!(result.dtype(), DType::Float);
        assert_eq!(result.get(0).unwrap(), Value::Float(f64::INFINITY));
        assert_eq!(result.get(1).unwrap(), Value::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn test_quotient_and_remainder() {
        let a = Series::from_ints(vec![10, 11, 10, -7]);
        let b = Series::from_ints(vec![2, 2, 0, 2]);
        let q = Series::quotient(&a, &b).unwrap();
        assert_eq!(
            q.to_list().unwrap(),
            vec![Value::Integer(5), Value::Integer(5), Value::Null, Value::Integer(-4)]
        );
        let r = Series::remainder(&a, &b).unwrap();
        assert_eq!(
            r.to_list().unwrap(),
            vec![Value::Integer(0), Value::Integer(1), Value::Null, Value::Integer(1)]
        );
    }

    #[test]
    fn test_pow() {
        let a = Series::from_ints(vec![2, 3]);
        let result = Series::pow(&a, 2).unwrap();
        assert_eq!(result.dtype(), DType::Integer);
        assert_eq!(result.to_list().unwrap(), vec![Value::Integer(4), Value::Integer(9)]);

        let negative = Series::pow(&a, -1).unwrap();
        assert_eq!(negative.get(0).unwrap(), Value::Null);

        let floats = Series::pow(&a, 0.5).unwrap();
        assert_eq!(floats.dtype(), DType::Float);
    }

    #[test]
    fn test_integer_overflow_is_null() {
        let s = Series::from_ints(vec![i64::MAX, 1]);
        assert_eq!(
            Series::add(&s, 1).unwrap().to_list().unwrap(),
            vec![Value::Null, Value::Integer(2)]
        );
        assert_eq!(
            Series::subtract(i64::MIN, &s).unwrap().to_list().unwrap(),
            vec![Value::Null, Value::Null]
        );
        assert_eq!(
            Series::multiply(&s, 2).unwrap().to_list().unwrap(),
            vec![Value::Null, Value::Integer(2)]
        );
        assert_eq!(s.sum().unwrap(), Value::Null);
        assert_eq!(
            s.cumulative_sum(false).unwrap().to_list().unwrap(),
            vec![Value::Integer(i64::MAX), Value::Null]
        );
        assert_eq!(
            s.window_sum(2, &WindowOptions::new().with_min_periods(1))
                .unwrap()
                .to_list()
                .unwrap(),
            vec![Value::Integer(i64::MAX), Value::Null]
        );
    }

    #[test]
    fn test_length_mismatch() {
        let a = Series::from_ints(vec![1, 2]);
        let b = Series::from_ints(vec![1]);
        assert!(matches!(
            Series::add(&a, &b),
            Err(SeriesError::LengthMismatch { .. })
        ));
    }

    // ===== Comparison Operations Tests =====

    #[test]
    fn test_compare_mixed_numeric() {
        let a = Series::from_ints(vec![1, 2, 3]);
        let b = Series::from_floats(vec![1.0, 2.5, 2.0]);
        let eq = Series::equal(&a, &b).unwrap();
        assert_eq!(eq.dtype(), DType::Boolean);
        assert_eq!(
            eq.to_list().unwrap(),
            vec![Value::Boolean(true), Value::Boolean(false), Value::Boolean(false)]
        );
        let gt = Series::greater(&a, &b).unwrap();
        assert_eq!(gt.get(2).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_compare_string_scalar() {
        let s = Series::from_strings(vec!["a", "b"]);
        let eq = Series::equal(&s, "b").unwrap();
        assert_eq!(eq.get(1).unwrap(), Value::Boolean(true));
        assert!(Series::equal(&s, false).is_err());
    }

    #[test]
    fn test_compare_dates() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let s = Series::from_dates(vec![d(1), d(2), d(3)]);
        let result = Series::greater_equal(&s, d(2)).unwrap();
        assert_eq!(
            result.to_list().unwrap(),
            vec![Value::Boolean(false), Value::Boolean(true), Value::Boolean(true)]
        );
    }

    // ===== Logical Operations Tests =====

    #[test]
    fn test_and_or() {
        let a = Series::from_bools(vec![true, true, false]);
        let b = Series::from_bools(vec![true, false, false]);
        let and = Series::and(&a, &b).unwrap();
        assert_eq!(
            and.to_list().unwrap(),
            vec![Value::Boolean(true), Value::Boolean(false), Value::Boolean(false)]
        );
        let or = Series::or(&a, &b).unwrap();
        assert_eq!(or.get(1).unwrap(), Value::Boolean(true));
    }

    // ===== Aggregation Tests =====

    #[test]
    fn test_aggregations() {
        let s = Series::from_ints(vec![4, 1, 3, 2]);
        assert_eq!(s.sum().unwrap(), Value::Integer(10));
        assert_eq!(s.min().unwrap(), Value::Integer(1));
        assert_eq!(s.max().unwrap(), Value::Integer(4));
        assert_eq!(s.mean().unwrap(), Value::Float(2.5));
        assert_eq!(s.median().unwrap(), Value::Float(2.5));
        assert_eq!(s.quantile(0.0).unwrap(), Value::Integer(1));
        assert_eq!(s.quantile(1.0).unwrap(), Value::Integer(4));
    }

    #[test]
    fn test_boolean_sum() {
        let s = Series::from_bools(vec![true, false, true]);
        assert_eq!(s.sum().unwrap(), Value::Integer(2));
        assert!(s.mean().is_err());
    }

    #[test]
    fn test_temporal_min_max() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let s = Series::from_dates(vec![d(5), d(1), d(9)]);
        assert_eq!(s.min().unwrap(), Value::Date(d(1)));
        assert_eq!(s.max().unwrap(), Value::Date(d(9)));
    }

    #[test]
    fn test_quantile_range() {
        let s = Series::from_floats(vec![1.0]);
        assert!(matches!(
            s.quantile(1.5),
            Err(SeriesError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_unsupported_aggregation() {
        let s = Series::from_strings(vec!["a"]);
        let err = s.sum().unwrap_err();
        assert_eq!(
            err.to_string(),
            "sum not supported for dtype string, valid dtypes are [integer, float, boolean]"
        );
    }

    #[test]
    fn test_cumulative() {
        let s = Series::from_optional_ints(vec![Some(1), None, Some(3)]);
        let result = s.cumulative_sum(false).unwrap();
        assert_eq!(
            result.to_list().unwrap(),
            vec![Value::Integer(1), Value::Null, Value::Integer(4)]
        );
        let reversed = s.cumulative_max(true).unwrap();
        assert_eq!(reversed.get(0).unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_peaks() {
        let s = Series::from_ints(vec![1, 5, 2, 5]);
        let max = s.peaks(PeakKind::Max).unwrap();
        assert_eq!(
            max.to_list().unwrap(),
            vec![
                Value::Boolean(false),
                Value::Boolean(true),
                Value::Boolean(false),
                Value::Boolean(true)
            ]
        );
        let min = s.peaks(PeakKind::Min).unwrap();
        assert_eq!(min.get(0).unwrap(), Value::Boolean(true));
    }

    // ===== Window Tests =====

    #[test]
    fn test_window_sum() {
        let s = Series::from_ints(vec![1, 2, 3, 4]);
        let result = s.window_sum(2, &WindowOptions::new()).unwrap();
        assert_eq!(result.dtype(), DType::Integer);
        assert_eq!(
            result.to_list().unwrap(),
            vec![Value::Null, Value::Integer(3), Value::Integer(5), Value::Integer(7)]
        );
    }

    #[test]
    fn test_window_weighted_and_mean() {
        let s = Series::from_ints(vec![1, 2, 3]);
        let options = WindowOptions::new().with_weights(vec![1.0, 2.0]).with_min_periods(1);
        let result = s.window_sum(2, &options).unwrap();
        assert_eq!(result.dtype(), DType::Float);
        assert_eq!(
            result.to_list().unwrap(),
            vec![Value::Float(2.0), Value::Float(5.0), Value::Float(8.0)]
        );

        let mean = s.window_mean(3, &WindowOptions::new().centered().with_min_periods(1)).unwrap();
        assert_eq!(mean.get(0).unwrap(), Value::Float(1.5));
        assert_eq!(mean.get(1).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_window_options_validated() {
        let s = Series::from_ints(vec![1, 2, 3]);
        assert!(s.window_sum(0, &WindowOptions::new()).is_err());
        let options = WindowOptions::new().with_weights(vec![1.0]);
        assert!(s.window_max(2, &options).is_err());
    }

    // ===== Missing Value Tests =====

    #[test]
    fn test_fill_forward_backward() {
        let s = Series::from_optional_ints(vec![None, Some(1), None, Some(3), None]);
        let forward = s.fill_missing(FillStrategy::Forward).unwrap();
        assert_eq!(
            forward.to_list().unwrap(),
            vec![Value::Null, Value::Integer(1), Value::Integer(1), Value::Integer(3), Value::Integer(3)]
        );
        let backward = s.fill_missing(FillStrategy::Backward).unwrap();
        assert_eq!(
            backward.to_list().unwrap(),
            vec![Value::Integer(1), Value::Integer(1), Value::Integer(3), Value::Integer(3), Value::Null]
        );
    }

    #[test]
    fn test_fill_mean_promotes_integer() {
        let s = Series::from_optional_ints(vec![Some(1), None, Some(2)]);
        let filled = s.fill_missing(FillStrategy::Mean).unwrap();
        assert_eq!(filled.dtype(), DType::Float);
        assert_eq!(filled.get(1).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_fill_value() {
        let s = Series::from_optional_ints(vec![Some(1), None]);
        let filled = s.fill_missing(Value::Integer(0)).unwrap();
        assert_eq!(filled.dtype(), DType::Integer);
        assert_eq!(filled.get(1).unwrap(), Value::Integer(0));

        let widened = s.fill_missing(Value::Float(0.5)).unwrap();
        assert_eq!(widened.dtype(), DType::Float);
        assert_eq!(widened.get(1).unwrap(), Value::Float(0.5));

        assert!(matches!(
            s.fill_missing(Value::string("x")),
            Err(SeriesError::DtypeMismatch { .. })
        ));
    }

    #[test]
    fn test_fill_min_max() {
        let s = Series::from_optional_ints(vec![Some(4), None, Some(2)]);
        let low = s.fill_missing(FillStrategy::Min).unwrap();
        assert_eq!(low.dtype(), DType::Integer);
        assert_eq!(low.get(1).unwrap(), Value::Integer(2));
        assert_eq!(s.fill_missing(FillStrategy::Max).unwrap().get(1).unwrap(), Value::Integer(4));

        let early = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let late = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let dates = Series::from_list(&[Value::Date(late), Value::Null, Value::Date(early)]).unwrap();
        let filled = dates.fill_missing(FillStrategy::Min).unwrap();
        assert_eq!(filled.dtype(), DType::Date);
        assert_eq!(filled.get(1).unwrap(), Value::Date(early));
        assert_eq!(dates.fill_missing(FillStrategy::Max).unwrap().get(1).unwrap(), Value::Date(late));

        assert!(matches!(
            Series::from_strings(vec!["a"]).fill_missing(FillStrategy::Min),
            Err(SeriesError::DtypeUnsupported { .. })
        ));
    }

    #[test]
    fn test_fill_all_null_is_unchanged() {
        let s = Series::from_optional_ints(vec![None, None]);
        for strategy in [FillStrategy::Min, FillStrategy::Max] {
            let filled = s.fill_missing(strategy).unwrap();
            assert_eq!(filled.dtype(), DType::Integer);
            assert_eq!(filled.null_count(), 2);
        }
    }

    #[test]
    fn test_is_nil() {
        let s = Series::from_optional_floats(vec![Some(1.0), None, Some(f64::NAN)]);
        let nil = s.is_nil().unwrap();
        assert_eq!(nil.dtype(), DType::Boolean);
        assert_eq!(
            nil.to_list().unwrap(),
            vec![Value::Boolean(false), Value::Boolean(true), Value::Boolean(false)]
        );
        assert_eq!(
            s.is_not_nil().unwrap().to_list().unwrap(),
            vec![Value::Boolean(true), Value::Boolean(false), Value::Boolean(true)]
        );
        assert!(Series::from_ints(vec![]).is_nil().unwrap().is_empty());
    }

    // ===== Selection Tests =====

    #[test]
    fn test_slice_negative_offset() {
        let s = Series::from_ints(vec![1, 2, 3, 4]);
        let tail = s.slice(-2, 10).unwrap();
        assert_eq!(tail.to_list().unwrap(), vec![Value::Integer(3), Value::Integer(4)]);
        assert!(s.slice(10, 1).unwrap().is_empty());
    }

    #[test]
    fn test_head_tail_first_last() {
        let s = Series::from_ints(vec![1, 2, 3]);
        assert_eq!(s.head(2).unwrap().len(), 2);
        assert_eq!(s.tail(5).unwrap().len(), 3);
        assert_eq!(s.first().unwrap(), Value::Integer(1));
        assert_eq!(s.last().unwrap(), Value::Integer(3));
        assert_eq!(Series::from_ints(vec![]).first().unwrap(), Value::Null);
        assert_eq!(s.take_every(2).unwrap().to_list().unwrap(), vec![Value::Integer(1), Value::Integer(3)]);
        assert!(s.take_every(0).is_err());
    }

    #[test]
    fn test_sample() {
        let s = Series::from_ints(vec![1, 2, 3]);
        assert!(s.sample(4_usize, &SampleOptions::new()).is_err());
        let seeded = SampleOptions::new().with_replacement().with_seed(7);
        let sampled = s.sample(10_usize, &seeded).unwrap();
        assert_eq!(sampled.len(), 10);
        let again = s.sample(10_usize, &seeded).unwrap();
        assert_eq!(sampled, again);
        assert!(s.sample(1.5, &SampleOptions::new()).is_err());
        assert_eq!(s.sample(1.0, &SampleOptions::new()).unwrap().len(), 3);
    }

    #[test]
    fn test_mask() {
        let s = Series::from_ints(vec![1, 2, 3]);
        let m = Series::from_bools(vec![true, false, true]);
        let masked = s.mask(&m).unwrap();
        assert_eq!(masked.to_list().unwrap(), vec![Value::Integer(1), Value::Integer(3)]);
        assert!(s.mask(&s).is_err());
    }

    // ===== Ordering Tests =====

    #[test]
    fn test_sort_nulls_last() {
        let s = Series::from_optional_ints(vec![Some(3), None, Some(1)]);
        let sorted = s.sort(false).unwrap();
        assert_eq!(
            sorted.to_list().unwrap(),
            vec![Value::Integer(1), Value::Integer(3), Value::Null]
        );
        let desc = s.sort(true).unwrap();
        assert_eq!(desc.get(0).unwrap(), Value::Integer(3));
        let order = s.argsort(false).unwrap();
        assert_eq!(order.dtype(), DType::Integer);
        assert_eq!(
            order.to_list().unwrap(),
            vec![Value::Integer(2), Value::Integer(0), Value::Integer(1)]
        );
    }

    #[test]
    fn test_distinct_and_count() {
        let s = Series::from_strings(vec!["b", "a", "b", "c", "a", "b"]);
        let distinct = s.distinct().unwrap();
        assert_eq!(
            distinct.to_list().unwrap(),
            vec![Value::string("b"), Value::string("a"), Value::string("c")]
        );
        assert_eq!(s.n_distinct().unwrap(), 3);
        assert_eq!(s.unordered_distinct().unwrap().len(), 3);

        let counts = s.count().unwrap();
        assert_eq!(counts.values, distinct);
        assert_eq!(
            counts.counts.to_list().unwrap(),
            vec![Value::Integer(3), Value::Integer(2), Value::Integer(1)]
        );
    }

    #[test]
    fn test_reverse() {
        let s = Series::from_optional_ints(vec![Some(1), None, Some(3)]);
        let reversed = s.reverse().unwrap();
        assert_eq!(reversed.dtype(), DType::Integer);
        assert_eq!(
            reversed.to_list().unwrap(),
            vec![Value::Integer(3), Value::Null, Value::Integer(1)]
        );
        assert_eq!(reversed.reverse().unwrap(), s);
        assert!(Series::from_strings(vec![]).reverse().unwrap().is_empty());
    }

    #[test]
    fn test_unordered_distinct_values() {
        let s = Series::from_optional_ints(vec![Some(2), None, Some(1), Some(2), None, Some(3)]);
        let distinct = s.unordered_distinct().unwrap();
        assert_eq!(distinct.dtype(), DType::Integer);
        let mut found: Vec<Option<i64>> = distinct
            .to_list()
            .unwrap()
            .into_iter()
            .map(|v| match v {
                Value::Integer(i) => Some(i),
                _ => None,
            })
            .collect();
        found.sort_unstable();
        assert_eq!(found, vec![None, Some(1), Some(2), Some(3)]);
    }

    // ===== Conversion Tests =====

    #[test]
    fn test_cast_identity() {
        let s = Series::from_floats(vec![1.5]);
        let same = s.cast(DType::Float).unwrap();
        assert!(Arc::ptr_eq(same.array(), s.array()));
    }

    #[test]
    fn test_cast_to_string() {
        let s = Series::from_ints(vec![1, 2]);
        let strings = s.cast(DType::String).unwrap();
        assert_eq!(strings.get(1).unwrap(), Value::string("2"));
    }

    #[test]
    fn test_all_equal() {
        let a = Series::from_ints(vec![1, 2]);
        let b = Series::from_floats(vec![1.0, 2.0]);
        assert!(!a.all_equal(&b).unwrap());
        assert!(a.all_equal(&Series::from_ints(vec![1, 2])).unwrap());
        assert!(!a.all_equal(&Series::from_ints(vec![1, 3])).unwrap());
    }

    #[test]
    fn test_transform_and_update() {
        let s = Series::from_ints(vec![1, 2, 3]);
        let doubled = s
            .transform(|v| match v {
                Value::Integer(i) => Value::Integer(i * 2),
                other => other,
            })
            .unwrap();
        assert_eq!(doubled.get(2).unwrap(), Value::Integer(6));

        let updated = s.update(-1, |_| Value::Float(0.5)).unwrap();
        assert_eq!(updated.dtype(), DType::Float);
        assert_eq!(updated.get(0).unwrap(), Value::Float(1.0));
        assert!(s.update(3, |v| v).is_err());

        let nulls = s.transform(|_| Value::Null).unwrap();
        assert_eq!(nulls.dtype(), DType::Integer);
    }

    #[test]
    fn test_display() {
        let s = Series::from_ints((0..12).collect());
        let text = s.to_string();
        assert!(text.starts_with("Series[12] integer\n"));
        assert!(text.contains("  0: 0\n"));
        assert!(text.contains("  ... (2 more rows)"));
    }

    #[test]
    fn test_unrepresentable_epoch_offsets_are_null() {
        let days = Series::from_optional_ints(vec![Some(i64::from(i32::MAX)), Some(0), None])
            .cast(DType::Date)
            .unwrap();
        assert_eq!(days.null_count(), 2);
        assert_eq!(days.to_list().unwrap()[0], Value::Null);
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(days.min().unwrap(), Value::Date(epoch));
        assert_eq!(days.max().unwrap(), Value::Date(epoch));
        assert_eq!(days.quantile(0.5).unwrap(), Value::Date(epoch));
        assert_eq!(days.fill_missing(FillStrategy::Max).unwrap().null_count(), 0);

        let micros = Series::from_ints(vec![i64::MAX]).cast(DType::DateTime).unwrap();
        assert_eq!(micros.null_count(), 1);

        let raw: ArrayRef = Arc::new(Date32Array::from(vec![i32::MIN, 0]));
        let adopted = Series::from_array(raw).unwrap();
        assert_eq!(adopted.null_count(), 1);
        assert_eq!(adopted.min().unwrap(), Value::Date(epoch));
    }
}
