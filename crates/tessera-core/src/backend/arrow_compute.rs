//! Arrow-backed storage engine

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Date32Array, Datum, Float64Array, Int64Array, Scalar,
    StringArray, TimestampMicrosecondArray, UInt64Array,
};
use arrow::compute::kernels::{boolean, cmp, numeric};
use arrow::compute::{self, SortOptions};
use arrow::datatypes::{DataType, Date32Type, Float64Type, Int64Type, TimestampMicrosecondType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{BinaryOperand, FillStrategy, InspectOptions, SeriesBackend, WindowOptions};
use crate::algebra::{Aggregation, BinaryOp, CumulativeOp, WindowOp};
use crate::config::should_parallelize;
use crate::dtype::{DType, MemType};
use crate::error::{SeriesError, SeriesResult};
use crate::value::Value;

/// Backend computing with arrow-rs kernels over in-memory Arrow arrays
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrowBackend;

impl ArrowBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SeriesBackend for ArrowBackend {
    fn name(&self) -> &'static str {
        "arrow"
    }

    fn from_list(&self, values: &[Value], dtype: DType) -> SeriesResult<ArrayRef> {
        build_array(values, dtype)
    }

    fn to_list(&self, array: &ArrayRef) -> SeriesResult<Vec<Value>> {
        let dtype = dtype_of(array)?;
        Ok((0..array.len()).map(|i| value_at(array, dtype, i)).collect())
    }

    fn memtype(&self, array: &ArrayRef) -> SeriesResult<MemType> {
        MemType::of(array.data_type()).ok_or_else(|| unsupported_storage(array))
    }

    fn fetch(&self, array: &ArrayRef, index: usize) -> SeriesResult<Value> {
        if index >= array.len() {
            return Err(SeriesError::OutOfBounds {
                index: index as i64,
                size: array.len(),
            });
        }
        Ok(value_at(array, dtype_of(array)?, index))
    }

    fn slice(&self, array: &ArrayRef, offset: usize, length: usize) -> SeriesResult<ArrayRef> {
        let offset = offset.min(array.len());
        let length = length.min(array.len() - offset);
        Ok(array.slice(offset, length))
    }

    fn take(&self, array: &ArrayRef, indices: &[usize]) -> SeriesResult<ArrayRef> {
        let indices = UInt64Array::from_iter_values(indices.iter().map(|&i| i as u64));
        Ok(compute::take(array.as_ref(), &indices, None)?)
    }

    fn sample(
        &self,
        array: &ArrayRef,
        n: usize,
        replacement: bool,
        seed: Option<u64>,
    ) -> SeriesResult<ArrayRef> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let len = array.len();
        let indices: Vec<usize> = if replacement {
            (0..n).map(|_| rng.gen_range(0..len)).collect()
        } else {
            rand::seq::index::sample(&mut rng, len, n).into_vec()
        };
        self.take(array, &indices)
    }

    fn mask(&self, array: &ArrayRef, mask: &ArrayRef) -> SeriesResult<ArrayRef> {
        let mask = mask
            .as_boolean_opt()
            .ok_or_else(|| unsupported_storage(mask))?;
        Ok(compute::filter(array.as_ref(), mask)?)
    }

    fn concat(&self, left: &ArrayRef, right: &ArrayRef) -> SeriesResult<ArrayRef> {
        Ok(compute::concat(&[left.as_ref(), right.as_ref()])?)
    }

    fn coalesce(&self, left: &ArrayRef, right: &ArrayRef) -> SeriesResult<ArrayRef> {
        let combined = self.concat(left, right)?;
        let offset = left.len();
        let indices: Vec<usize> = (0..left.len())
            .map(|i| if left.is_valid(i) { i } else { offset + i })
            .collect();
        self.take(&combined, &indices)
    }

    fn cast(&self, array: &ArrayRef, dtype: DType) -> SeriesResult<ArrayRef> {
        let from = dtype_of(array)?;
        // Epoch semantics: days for Date, microseconds for DateTime
        let staging = match (from, dtype) {
            (DType::Integer | DType::Float | DType::Boolean, DType::Date)
            | (DType::Date, DType::Integer | DType::Float | DType::Boolean) => {
                Some(DataType::Int32)
            }
            (DType::Float | DType::Boolean, DType::DateTime)
            | (DType::DateTime, DType::Float | DType::Boolean) => Some(DataType::Int64),
            _ => None,
        };
        let staged = match staging {
            Some(physical) => compute::cast(array, &physical)?,
            None => Arc::clone(array),
        };
        let cast = compute::cast(&staged, &dtype.to_arrow())?;
        clear_unrepresentable(cast, dtype)
    }

    fn aggregate(&self, array: &ArrayRef, aggregation: Aggregation) -> SeriesResult<Value> {
        let dtype = dtype_of(array)?;
        if let (Aggregation::Sum, DType::Boolean) = (aggregation, dtype) {
            return Ok(Value::Integer(array.as_boolean().true_count() as i64));
        }

        let value = match (aggregation, physical(array, dtype)?) {
            (Aggregation::Sum, Physical::Ints(values)) => {
                // Overflow has no integer result
                values
                    .iter()
                    .flatten()
                    .try_fold(0_i64, |acc, v| acc.checked_add(*v))
                    .map_or(Value::Null, Value::Integer)
            }
            (Aggregation::Sum, Physical::Floats(values)) => {
                Value::Float(values.iter().flatten().sum())
            }
            (Aggregation::Min, Physical::Ints(values)) => values
                .iter()
                .flatten()
                .min()
                .map_or(Value::Null, |v| physical_value(*v, dtype)),
            (Aggregation::Max, Physical::Ints(values)) => values
                .iter()
                .flatten()
                .max()
                .map_or(Value::Null, |v| physical_value(*v, dtype)),
            (Aggregation::Min, Physical::Floats(values)) => values
                .iter()
                .flatten()
                .copied()
                .reduce(f64::min)
                .map_or(Value::Null, Value::Float),
            (Aggregation::Max, Physical::Floats(values)) => values
                .iter()
                .flatten()
                .copied()
                .reduce(f64::max)
                .map_or(Value::Null, Value::Float),
            (Aggregation::Quantile(q), Physical::Ints(values)) => {
                let mut present: Vec<i64> = values.into_iter().flatten().collect();
                present.sort_unstable();
                nearest(&present, q).map_or(Value::Null, |v| physical_value(v, dtype))
            }
            (Aggregation::Quantile(q), Physical::Floats(values)) => {
                let mut present: Vec<f64> = values.into_iter().flatten().collect();
                present.sort_by(f64::total_cmp);
                nearest(&present, q).map_or(Value::Null, Value::Float)
            }
            (Aggregation::Mean, physical) => mean(&physical.present_f64()).map_or(Value::Null, Value::Float),
            (Aggregation::Median, physical) => {
                let mut present = physical.present_f64();
                present.sort_by(f64::total_cmp);
                median(&present).map_or(Value::Null, Value::Float)
            }
            (Aggregation::Var, physical) => {
                variance(&physical.present_f64()).map_or(Value::Null, Value::Float)
            }
            (Aggregation::Std, physical) => variance(&physical.present_f64())
                .map_or(Value::Null, |v| Value::Float(v.sqrt())),
        };
        Ok(value)
    }

    fn cumulative(
        &self,
        array: &ArrayRef,
        op: CumulativeOp,
        reverse: bool,
    ) -> SeriesResult<ArrayRef> {
        let dtype = dtype_of(array)?;
        let result = match physical(array, dtype)? {
            Physical::Ints(values) => {
                let scanned = match op {
                    CumulativeOp::Sum => scan(&values, reverse, i64::checked_add),
                    CumulativeOp::Min => scan(&values, reverse, |a, b| Some(a.min(b))),
                    CumulativeOp::Max => scan(&values, reverse, |a, b| Some(a.max(b))),
                };
                ints_array(scanned, dtype)
            }
            Physical::Floats(values) => {
                let scanned = match op {
                    CumulativeOp::Sum => scan(&values, reverse, |a, b| Some(a + b)),
                    CumulativeOp::Min => scan(&values, reverse, |a, b| Some(a.min(b))),
                    CumulativeOp::Max => scan(&values, reverse, |a, b| Some(a.max(b))),
                };
                Arc::new(Float64Array::from(scanned)) as ArrayRef
            }
        };
        Ok(result)
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: BinaryOperand<'_>,
        right: BinaryOperand<'_>,
    ) -> SeriesResult<ArrayRef> {
        let result: ArrayRef = match op {
            BinaryOp::Add => arithmetic(left, right, i64::checked_add, numeric::add)?,
            BinaryOp::Subtract => arithmetic(left, right, i64::checked_sub, numeric::sub)?,
            BinaryOp::Multiply => arithmetic(left, right, i64::checked_mul, numeric::mul)?,
            // Float division: zero divisors give infinities, not errors
            BinaryOp::Divide => float_binary(left, right, |a, b| Some(a / b))?,
            BinaryOp::Quotient => int_binary(left, right, floor_div)?,
            BinaryOp::Remainder => int_binary(left, right, floor_rem)?,
            BinaryOp::Pow => pow(left, right)?,
            BinaryOp::Equal => compare(left, right, cmp::eq)?,
            BinaryOp::NotEqual => compare(left, right, cmp::neq)?,
            BinaryOp::Greater => compare(left, right, cmp::gt)?,
            BinaryOp::GreaterEqual => compare(left, right, cmp::gt_eq)?,
            BinaryOp::Less => compare(left, right, cmp::lt)?,
            BinaryOp::LessEqual => compare(left, right, cmp::lt_eq)?,
            BinaryOp::And => Arc::new(boolean::and(as_bools(left)?, as_bools(right)?)?),
            BinaryOp::Or => Arc::new(boolean::or(as_bools(left)?, as_bools(right)?)?),
        };
        Ok(result)
    }

    fn all_equal(&self, left: &ArrayRef, right: &ArrayRef) -> SeriesResult<bool> {
        Ok(left.len() == right.len() && left.to_data() == right.to_data())
    }

    fn sort(&self, array: &ArrayRef, reverse: bool) -> SeriesResult<ArrayRef> {
        Ok(compute::sort(array.as_ref(), Some(sort_options(reverse)))?)
    }

    fn argsort(&self, array: &ArrayRef, reverse: bool) -> SeriesResult<ArrayRef> {
        let indices = compute::sort_to_indices(array.as_ref(), Some(sort_options(reverse)), None)?;
        Ok(compute::cast(&indices, &DataType::Int64)?)
    }

    fn distinct(&self, array: &ArrayRef) -> SeriesResult<ArrayRef> {
        let values = self.to_list(array)?;
        let mut seen = HashSet::new();
        let indices: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, value)| seen.insert(Key::from(*value)))
            .map(|(i, _)| i)
            .collect();
        self.take(array, &indices)
    }

    fn unordered_distinct(&self, array: &ArrayRef) -> SeriesResult<ArrayRef> {
        let values = self.to_list(array)?;
        let mut first_seen: HashMap<Key, usize> = HashMap::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            first_seen.entry(Key::from(value)).or_insert(i);
        }
        let indices: Vec<usize> = first_seen.into_values().collect();
        self.take(array, &indices)
    }

    fn n_distinct(&self, array: &ArrayRef) -> SeriesResult<usize> {
        let values = self.to_list(array)?;
        Ok(values.iter().map(Key::from).collect::<HashSet<_>>().len())
    }

    fn count(&self, array: &ArrayRef) -> SeriesResult<(ArrayRef, ArrayRef)> {
        let values = self.to_list(array)?;
        // key -> (first position, occurrences)
        let mut tally: HashMap<Key, (usize, i64)> = HashMap::new();
        for (i, value) in values.iter().enumerate() {
            tally.entry(Key::from(value)).or_insert((i, 0)).1 += 1;
        }
        let mut rows: Vec<(usize, i64)> = tally.into_values().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let firsts: Vec<usize> = rows.iter().map(|(first, _)| *first).collect();
        let distinct = self.take(array, &firsts)?;
        let counts = Int64Array::from_iter_values(rows.iter().map(|(_, count)| *count));
        Ok((distinct, Arc::new(counts)))
    }

    fn window(
        &self,
        array: &ArrayRef,
        op: WindowOp,
        window_size: usize,
        options: &WindowOptions,
    ) -> SeriesResult<ArrayRef> {
        let dtype = dtype_of(array)?;
        let window = Window {
            size: window_size,
            min_periods: options.min_periods.unwrap_or(window_size),
            center: options.center,
        };
        let weights = options.weights.as_deref();

        match (physical(array, dtype)?, weights, op) {
            (Physical::Ints(values), None, WindowOp::Sum | WindowOp::Min | WindowOp::Max) => {
                let rolled = window.roll(&values, |frame| {
                    let mut present = frame.iter().map(|&(_, v)| v);
                    match op {
                        WindowOp::Sum => present.try_fold(0_i64, i64::checked_add),
                        WindowOp::Min => present.min(),
                        WindowOp::Max | WindowOp::Mean => present.max(),
                    }
                });
                Ok(Arc::new(Int64Array::from(rolled)))
            }
            (physical, weights, op) => {
                let values = physical.into_f64();
                let weight = |k: usize| weights.and_then(|w| w.get(k).copied()).unwrap_or(1.0);
                let rolled = window.roll(&values, |frame| {
                    let weighted = frame.iter().map(|&(k, v)| v * weight(k));
                    match op {
                        WindowOp::Sum => Some(weighted.sum()),
                        WindowOp::Mean if frame.is_empty() => None,
                        WindowOp::Mean => Some(weighted.sum::<f64>() / frame.len() as f64),
                        WindowOp::Min => weighted.reduce(f64::min),
                        WindowOp::Max => weighted.reduce(f64::max),
                    }
                });
                Ok(Arc::new(Float64Array::from(rolled)))
            }
        }
    }

    fn fill_missing(&self, array: &ArrayRef, strategy: &FillStrategy) -> SeriesResult<ArrayRef> {
        let fill = match strategy {
            FillStrategy::Forward => {
                let mut last = None;
                let indices: Vec<Option<u64>> = (0..array.len())
                    .map(|i| {
                        if array.is_valid(i) {
                            last = Some(i as u64);
                        }
                        last
                    })
                    .collect();
                return take_nullable(array, indices);
            }
            FillStrategy::Backward => {
                let mut next = None;
                let mut indices: Vec<Option<u64>> = (0..array.len())
                    .rev()
                    .map(|i| {
                        if array.is_valid(i) {
                            next = Some(i as u64);
                        }
                        next
                    })
                    .collect();
                indices.reverse();
                return take_nullable(array, indices);
            }
            FillStrategy::Min => self.aggregate(array, Aggregation::Min)?,
            FillStrategy::Max => self.aggregate(array, Aggregation::Max)?,
            FillStrategy::Mean => self.aggregate(array, Aggregation::Mean)?,
            FillStrategy::Value(value) => value.clone(),
        };

        if fill.is_null() || array.null_count() == 0 {
            return Ok(Arc::clone(array));
        }
        let literal = build_array(std::slice::from_ref(&fill), dtype_of(array)?)?;
        let combined = self.concat(array, &literal)?;
        let fill_at = array.len();
        let indices: Vec<usize> = (0..array.len())
            .map(|i| if array.is_valid(i) { i } else { fill_at })
            .collect();
        self.take(&combined, &indices)
    }

    fn is_nil(&self, array: &ArrayRef) -> SeriesResult<ArrayRef> {
        Ok(Arc::new(compute::is_null(array.as_ref())?))
    }

    fn is_not_nil(&self, array: &ArrayRef) -> SeriesResult<ArrayRef> {
        Ok(Arc::new(compute::is_not_null(array.as_ref())?))
    }

    fn inspect(&self, array: &ArrayRef, options: &InspectOptions) -> SeriesResult<String> {
        let dtype = dtype_of(array)?;
        let len = array.len();
        let mut out = String::new();
        let _ = writeln!(out, "Series[{len}] {dtype}");
        for i in 0..len.min(options.limit) {
            let _ = writeln!(out, "  {i}: {}", value_at(array, dtype, i));
        }
        if len > options.limit {
            let _ = writeln!(out, "  ... ({} more rows)", len - options.limit);
        }
        Ok(out)
    }
}

// ============================================================================
// Payload conversion
// ============================================================================

fn dtype_of(array: &ArrayRef) -> SeriesResult<DType> {
    DType::from_arrow(array.data_type()).ok_or_else(|| unsupported_storage(array))
}

fn unsupported_storage(array: &ArrayRef) -> SeriesError {
    SeriesError::Arrow(format!(
        "unsupported storage type {:?}",
        array.data_type()
    ))
}

/// Collect the non-null values of `values` through `extract`, failing on the
/// first value `extract` rejects
fn collect_as<'a, T>(
    values: &'a [Value],
    dtype: DType,
    extract: impl Fn(&'a Value) -> Option<T>,
) -> SeriesResult<Vec<Option<T>>> {
    values
        .iter()
        .map(|value| {
            if value.is_null() {
                return Ok(None);
            }
            extract(value)
                .map(Some)
                .ok_or_else(|| SeriesError::Construction {
                    value: value.to_string(),
                    dtype,
                })
        })
        .collect()
}

fn build_array(values: &[Value], dtype: DType) -> SeriesResult<ArrayRef> {
    let array: ArrayRef = match dtype {
        DType::Integer => Arc::new(Int64Array::from(collect_as(values, dtype, |v| match v {
            Value::Integer(i) => Some(*i),
            _ => None,
        })?)),
        DType::Float => Arc::new(Float64Array::from(collect_as(
            values,
            dtype,
            Value::as_f64,
        )?)),
        DType::Boolean => Arc::new(BooleanArray::from(collect_as(values, dtype, |v| match v {
            Value::Boolean(b) => Some(*b),
            _ => None,
        })?)),
        DType::String => Arc::new(StringArray::from(collect_as(values, dtype, |v| match v {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })?)),
        DType::Date => Arc::new(Date32Array::from(collect_as(values, dtype, |v| match v {
            Value::Date(d) => Some(Date32Type::from_naive_date(*d)),
            _ => None,
        })?)),
        DType::DateTime => Arc::new(TimestampMicrosecondArray::from(collect_as(
            values,
            dtype,
            |v| match v {
                Value::DateTime(dt) => Some(dt.and_utc().timestamp_micros()),
                _ => None,
            },
        )?)),
    };
    Ok(array)
}

fn value_at(array: &ArrayRef, dtype: DType, index: usize) -> Value {
    if array.is_null(index) {
        return Value::Null;
    }
    match dtype {
        DType::Integer => Value::Integer(array.as_primitive::<Int64Type>().value(index)),
        DType::Float => Value::Float(array.as_primitive::<Float64Type>().value(index)),
        DType::Boolean => Value::Boolean(array.as_boolean().value(index)),
        DType::String => Value::String(array.as_string::<i32>().value(index).to_string()),
        DType::Date => array
            .as_primitive::<Date32Type>()
            .value_as_date(index)
            .map_or(Value::Null, Value::Date),
        DType::DateTime => array
            .as_primitive::<TimestampMicrosecondType>()
            .value_as_datetime(index)
            .map_or(Value::Null, Value::DateTime),
    }
}

/// Numeric view of a payload: temporal dtypes are read as their epoch offsets
enum Physical {
    Ints(Vec<Option<i64>>),
    Floats(Vec<Option<f64>>),
}

impl Physical {
    fn into_f64(self) -> Vec<Option<f64>> {
        match self {
            Physical::Ints(values) => values.into_iter().map(|v| v.map(|i| i as f64)).collect(),
            Physical::Floats(values) => values,
        }
    }

    fn present_f64(self) -> Vec<f64> {
        self.into_f64().into_iter().flatten().collect()
    }
}

fn physical(array: &ArrayRef, dtype: DType) -> SeriesResult<Physical> {
    let physical = match dtype {
        DType::Integer => Physical::Ints(array.as_primitive::<Int64Type>().iter().collect()),
        DType::Date => Physical::Ints(
            array
                .as_primitive::<Date32Type>()
                .iter()
                .map(|v| v.map(i64::from))
                .collect(),
        ),
        DType::DateTime => Physical::Ints(
            array
                .as_primitive::<TimestampMicrosecondType>()
                .iter()
                .collect(),
        ),
        DType::Float => Physical::Floats(array.as_primitive::<Float64Type>().iter().collect()),
        DType::Boolean | DType::String => {
            return Err(SeriesError::Arrow(format!(
                "{dtype} payloads have no numeric representation"
            )))
        }
    };
    Ok(physical)
}

/// Rebuild a payload of `dtype` from epoch offsets or integers
fn ints_array(values: Vec<Option<i64>>, dtype: DType) -> ArrayRef {
    match dtype {
        DType::Date => Arc::new(Date32Array::from(
            values
                .into_iter()
                .map(|v| v.map(|days| days as i32))
                .collect::<Vec<_>>(),
        )),
        DType::DateTime => Arc::new(TimestampMicrosecondArray::from(values)),
        _ => Arc::new(Int64Array::from(values)),
    }
}

/// Null out epoch offsets that fall outside the calendar chrono can represent
pub(crate) fn clear_unrepresentable(array: ArrayRef, dtype: DType) -> SeriesResult<ArrayRef> {
    let outside: BooleanArray = match dtype {
        DType::Date => {
            let dates = array.as_primitive::<Date32Type>();
            (0..dates.len())
                .map(|i| Some(dates.is_valid(i) && dates.value_as_date(i).is_none()))
                .collect()
        }
        DType::DateTime => {
            let stamps = array.as_primitive::<TimestampMicrosecondType>();
            (0..stamps.len())
                .map(|i| Some(stamps.is_valid(i) && stamps.value_as_datetime(i).is_none()))
                .collect()
        }
        _ => return Ok(array),
    };
    if outside.true_count() == 0 {
        return Ok(array);
    }
    tracing::debug!(%dtype, count = outside.true_count(), "nulling unrepresentable epoch offsets");
    Ok(compute::nullif(array.as_ref(), &outside)?)
}

fn physical_value(value: i64, dtype: DType) -> Value {
    match dtype {
        DType::Date => value
            .checked_mul(86_400)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map_or(Value::Null, |dt| Value::Date(dt.date_naive())),
        DType::DateTime => DateTime::from_timestamp_micros(value)
            .map_or(Value::Null, |dt| Value::DateTime(dt.naive_utc())),
        _ => Value::Integer(value),
    }
}

fn take_nullable(array: &ArrayRef, indices: Vec<Option<u64>>) -> SeriesResult<ArrayRef> {
    let indices = UInt64Array::from(indices);
    Ok(compute::take(array.as_ref(), &indices, None)?)
}

fn sort_options(reverse: bool) -> SortOptions {
    SortOptions {
        descending: reverse,
        nulls_first: false,
    }
}

// ============================================================================
// Binary kernels
// ============================================================================

/// A binary operand materialised for Arrow's `Datum` kernels
enum Side {
    Array(ArrayRef),
    Scalar(Scalar<ArrayRef>),
}

impl Side {
    fn new(operand: BinaryOperand<'_>) -> SeriesResult<Self> {
        match operand {
            BinaryOperand::Array(array) => Ok(Side::Array(Arc::clone(array))),
            BinaryOperand::Scalar(value) => {
                let dtype = value.dtype().ok_or_else(|| {
                    SeriesError::Arrow("cannot broadcast a nil scalar".to_string())
                })?;
                let array = build_array(std::slice::from_ref(value), dtype)?;
                Ok(Side::Scalar(Scalar::new(array)))
            }
        }
    }

    fn datum(&self) -> &dyn Datum {
        match self {
            Side::Array(array) => array,
            Side::Scalar(scalar) => scalar,
        }
    }
}

fn compare<F>(left: BinaryOperand<'_>, right: BinaryOperand<'_>, kernel: F) -> SeriesResult<ArrayRef>
where
    F: Fn(&dyn Datum, &dyn Datum) -> Result<BooleanArray, arrow::error::ArrowError>,
{
    let result = kernel(Side::new(left)?.datum(), Side::new(right)?.datum())?;
    Ok(Arc::new(result))
}

fn as_bools<'a>(operand: BinaryOperand<'a>) -> SeriesResult<&'a BooleanArray> {
    match operand {
        BinaryOperand::Array(array) => array
            .as_boolean_opt()
            .ok_or_else(|| unsupported_storage(array)),
        BinaryOperand::Scalar(value) => Err(SeriesError::Arrow(format!(
            "logical kernels take boolean arrays, found scalar {value}"
        ))),
    }
}

fn operand_dtype(operand: BinaryOperand<'_>) -> Option<DType> {
    match operand {
        BinaryOperand::Array(array) => DType::from_arrow(array.data_type()),
        BinaryOperand::Scalar(value) => value.dtype(),
    }
}

/// Length of the broadcast result: the array side wins over a scalar
fn broadcast_len(left: BinaryOperand<'_>, right: BinaryOperand<'_>) -> usize {
    match (left, right) {
        (BinaryOperand::Array(array), _) | (_, BinaryOperand::Array(array)) => array.len(),
        _ => 1,
    }
}

fn int_values(operand: BinaryOperand<'_>, len: usize) -> SeriesResult<Vec<Option<i64>>> {
    match operand {
        BinaryOperand::Array(array) => array
            .as_primitive_opt::<Int64Type>()
            .map(|ints| ints.iter().collect())
            .ok_or_else(|| unsupported_storage(array)),
        BinaryOperand::Scalar(Value::Integer(i)) => Ok(vec![Some(*i); len]),
        BinaryOperand::Scalar(other) => Err(SeriesError::Arrow(format!(
            "expected an integer scalar, found {other}"
        ))),
    }
}

fn float_values(operand: BinaryOperand<'_>, len: usize) -> SeriesResult<Vec<Option<f64>>> {
    match operand {
        BinaryOperand::Array(array) => array
            .as_primitive_opt::<Float64Type>()
            .map(|floats| floats.iter().collect())
            .ok_or_else(|| unsupported_storage(array)),
        BinaryOperand::Scalar(value) => value
            .as_f64()
            .map(|f| vec![Some(f); len])
            .ok_or_else(|| {
                SeriesError::Arrow(format!("expected a numeric scalar, found {value}"))
            }),
    }
}

/// Integer kernel where `f` returning None marks the position null
fn int_binary(
    left: BinaryOperand<'_>,
    right: BinaryOperand<'_>,
    f: impl Fn(i64, i64) -> Option<i64>,
) -> SeriesResult<ArrayRef> {
    let len = broadcast_len(left, right);
    let (lhs, rhs) = (int_values(left, len)?, int_values(right, len)?);
    let result: Int64Array = lhs
        .into_iter()
        .zip(rhs)
        .map(|(a, b)| a.zip(b).and_then(|(a, b)| f(a, b)))
        .collect();
    Ok(Arc::new(result))
}

fn float_binary(
    left: BinaryOperand<'_>,
    right: BinaryOperand<'_>,
    f: impl Fn(f64, f64) -> Option<f64>,
) -> SeriesResult<ArrayRef> {
    let len = broadcast_len(left, right);
    let (lhs, rhs) = (float_values(left, len)?, float_values(right, len)?);
    let result: Float64Array = lhs
        .into_iter()
        .zip(rhs)
        .map(|(a, b)| a.zip(b).and_then(|(a, b)| f(a, b)))
        .collect();
    Ok(Arc::new(result))
}

/// Integer pairs are checked per position (overflow is null); anything else
/// goes through the Arrow kernel
fn arithmetic<K>(
    left: BinaryOperand<'_>,
    right: BinaryOperand<'_>,
    checked: fn(i64, i64) -> Option<i64>,
    kernel: K,
) -> SeriesResult<ArrayRef>
where
    K: Fn(&dyn Datum, &dyn Datum) -> Result<ArrayRef, arrow::error::ArrowError>,
{
    if integral(left, right) {
        return int_binary(left, right, checked);
    }
    Ok(kernel(Side::new(left)?.datum(), Side::new(right)?.datum())?)
}

fn integral(left: BinaryOperand<'_>, right: BinaryOperand<'_>) -> bool {
    operand_dtype(left) == Some(DType::Integer) && operand_dtype(right) == Some(DType::Integer)
}

fn pow(left: BinaryOperand<'_>, right: BinaryOperand<'_>) -> SeriesResult<ArrayRef> {
    if integral(left, right) {
        // Negative exponents and overflow have no integer result
        int_binary(left, right, |base, exp| {
            u32::try_from(exp).ok().and_then(|e| base.checked_pow(e))
        })
    } else {
        float_binary(left, right, |base, exp| Some(base.powf(exp)))
    }
}

/// Floor division; None for a zero divisor or overflow
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

/// `a - b * floor_div(a, b)`, taking the sign of the divisor
fn floor_rem(a: i64, b: i64) -> Option<i64> {
    let q = floor_div(a, b)?;
    b.checked_mul(q).and_then(|m| a.checked_sub(m))
}

// ============================================================================
// Reductions
// ============================================================================

/// Running reduction that leaves null positions null
/// Running fold over present values; once `f` fails every later position is null
fn scan<T: Copy>(
    values: &[Option<T>],
    reverse: bool,
    f: impl Fn(T, T) -> Option<T>,
) -> Vec<Option<T>> {
    let mut out = vec![None; values.len()];
    let mut acc: Option<T> = None;
    let mut failed = false;
    let mut step = |i: usize| {
        if let (Some(v), false) = (values[i], failed) {
            let next = match acc {
                Some(a) => f(a, v),
                None => Some(v),
            };
            failed = next.is_none();
            acc = next;
            out[i] = next;
        }
    };
    if reverse {
        (0..values.len()).rev().for_each(&mut step);
    } else {
        (0..values.len()).for_each(&mut step);
    }
    out
}

/// Nearest-rank element of sorted values
fn nearest<T: Copy>(sorted: &[T], q: f64) -> Option<T> {
    let last = sorted.len().checked_sub(1)?;
    let index = (last as f64 * q).round() as usize;
    sorted.get(index.min(last)).copied()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// Sample variance (ddof = 1)
fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(sum_sq / (values.len() - 1) as f64)
}

/// Rolling window geometry
struct Window {
    size: usize,
    min_periods: usize,
    center: bool,
}

impl Window {
    /// Evaluate `reduce` over the non-null `(offset_in_window, value)` pairs
    /// of every window; windows with fewer than `min_periods` values are null
    fn roll<T, R>(
        &self,
        values: &[Option<T>],
        reduce: impl Fn(&[(usize, T)]) -> Option<R> + Sync,
    ) -> Vec<Option<R>>
    where
        T: Copy + Send + Sync,
        R: Send,
    {
        let eval = |i: usize| -> Option<R> {
            let start = if self.center {
                i as isize - (self.size / 2) as isize
            } else {
                i as isize + 1 - self.size as isize
            };
            let frame: Vec<(usize, T)> = (0..self.size)
                .filter_map(|k| {
                    let position = usize::try_from(start + k as isize).ok()?;
                    values.get(position).copied().flatten().map(|v| (k, v))
                })
                .collect();
            if frame.len() < self.min_periods {
                None
            } else {
                reduce(&frame)
            }
        };

        if should_parallelize(values.len()) {
            (0..values.len()).into_par_iter().map(&eval).collect()
        } else {
            (0..values.len()).map(&eval).collect()
        }
    }
}

/// Hashable identity of a value, used for distinct and counting
#[derive(Debug, PartialEq, Eq, Hash)]
enum Key {
    Null,
    Integer(i64),
    Float(u64),
    Boolean(bool),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl From<&Value> for Key {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Key::Null,
            Value::Integer(i) => Key::Integer(*i),
            // -0.0 and 0.0 are the same value
            Value::Float(f) if *f == 0.0 => Key::Float(0),
            Value::Float(f) => Key::Float(f.to_bits()),
            Value::Boolean(b) => Key::Boolean(*b),
            Value::String(s) => Key::String(s.clone()),
            Value::Date(d) => Key::Date(*d),
            Value::DateTime(dt) => Key::DateTime(*dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: Vec<Option<i64>>) -> ArrayRef {
        Arc::new(Int64Array::from(values))
    }

    #[test]
    fn test_floor_division() {
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_div(7, 0), None);
        assert_eq!(floor_div(i64::MIN, -1), None);
        assert_eq!(floor_rem(7, 2), Some(1));
        assert_eq!(floor_rem(-7, 2), Some(1));
        assert_eq!(floor_rem(7, -2), Some(-1));
        assert_eq!(floor_rem(7, 0), None);
    }

    #[test]
    fn test_scan_skips_nulls() {
        let values = vec![Some(1), None, Some(3), Some(2)];
        assert_eq!(
            scan(&values, false, i64::checked_add),
            vec![Some(1), None, Some(4), Some(6)]
        );
        assert_eq!(
            scan(&values, true, |a: i64, b| Some(a.max(b))),
            vec![Some(3), None, Some(3), Some(2)]
        );
    }

    #[test]
    fn test_scan_stops_after_overflow() {
        let values = vec![Some(i64::MAX - 1), Some(1), Some(1), None, Some(-5)];
        assert_eq!(
            scan(&values, false, i64::checked_add),
            vec![Some(i64::MAX - 1), Some(i64::MAX), None, None, None]
        );
    }

    #[test]
    fn test_physical_date_out_of_range() {
        assert_eq!(
            physical_value(0, DType::Date),
            Value::Date(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
        );
        assert_eq!(physical_value(i64::from(i32::MAX), DType::Date), Value::Null);
        assert_eq!(physical_value(i64::MAX, DType::DateTime), Value::Null);
    }

    #[test]
    fn test_nearest_quantile() {
        let sorted = [1, 2, 3, 4, 5];
        assert_eq!(nearest(&sorted, 0.0), Some(1));
        assert_eq!(nearest(&sorted, 0.5), Some(3));
        assert_eq!(nearest(&sorted, 1.0), Some(5));
        assert_eq!(nearest::<i64>(&[], 0.5), None);
    }

    #[test]
    fn test_statistics() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(median(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(variance(&[1.0]), None);
        let var = variance(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((var - 1.666_666_666).abs() < 1e-6);
    }

    #[test]
    fn test_window_geometry() {
        let values = vec![Some(1_i64), Some(2), Some(3), Some(4)];
        let trailing = Window {
            size: 2,
            min_periods: 2,
            center: false,
        };
        let sums = trailing.roll(&values, |frame| Some(frame.iter().map(|&(_, v)| v).sum::<i64>()));
        assert_eq!(sums, vec![None, Some(3), Some(5), Some(7)]);

        let centered = Window {
            size: 3,
            min_periods: 1,
            center: true,
        };
        let sums = centered.roll(&values, |frame| Some(frame.iter().map(|&(_, v)| v).sum::<i64>()));
        assert_eq!(sums, vec![Some(3), Some(6), Some(9), Some(7)]);
    }

    #[test]
    fn test_coalesce_kernel() {
        let backend = ArrowBackend::new();
        let left = ints(vec![Some(1), None, None]);
        let right = ints(vec![Some(9), Some(2), None]);
        let result = backend.coalesce(&left, &right).unwrap();
        assert_eq!(
            backend.to_list(&result).unwrap(),
            vec![Value::Integer(1), Value::Integer(2), Value::Null]
        );
    }

    #[test]
    fn test_cast_integer_epochs() {
        let backend = ArrowBackend::new();
        let days = ints(vec![Some(0), Some(1)]);
        let dates = backend.cast(&days, DType::Date).unwrap();
        assert_eq!(
            backend.fetch(&dates, 1).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap())
        );

        let micros = ints(vec![Some(1_000_000)]);
        let stamps = backend.cast(&micros, DType::DateTime).unwrap();
        let expected = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 1)
            .unwrap();
        assert_eq!(backend.fetch(&stamps, 0).unwrap(), Value::DateTime(expected));
    }

    #[test]
    fn test_key_normalises_zero() {
        assert_eq!(Key::from(&Value::Float(0.0)), Key::from(&Value::Float(-0.0)));
        assert_ne!(Key::from(&Value::Integer(1)), Key::from(&Value::Float(1.0)));
    }
}
