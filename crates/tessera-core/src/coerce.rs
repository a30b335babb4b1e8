//! Construction from literal values and multi-series combinators
//!
//! `from_list` infers a single dtype for a heterogeneous sequence, widening
//! Integer with Float. `concat` and `coalesce` fold pairwise over a list,
//! unifying each pair of dtypes before the backend sees it.

use crate::algebra::unify;
use crate::backend::BackendRef;
use crate::config::default_backend;
use crate::dispatch;
use crate::dtype::DType;
use crate::error::{SeriesError, SeriesResult};
use crate::series::{check_length, Series};
use crate::value::Value;

/// Options for [`from_list`]
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Cast to this dtype after inference; also the dtype of an all-null
    /// sequence
    pub dtype: Option<DType>,
    /// Build on this backend instead of the process default
    pub backend: Option<BackendRef>,
}

impl ListOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    #[must_use]
    pub fn with_backend(mut self, backend: BackendRef) -> Self {
        self.backend = Some(backend);
        self
    }
}

/// The dtype a literal sequence would be built with
///
/// All-null and empty sequences are Float.
///
/// # Errors
/// Returns `Construction` naming the first value that disagrees with the
/// dtype inferred so far.
pub fn infer_dtype(values: &[Value]) -> SeriesResult<DType> {
    Ok(scan_dtype(values)?.unwrap_or(DType::Float))
}

fn scan_dtype(values: &[Value]) -> SeriesResult<Option<DType>> {
    let mut inferred: Option<DType> = None;
    for value in values {
        let Some(dtype) = value.dtype() else {
            continue;
        };
        inferred = Some(match inferred {
            None => dtype,
            Some(current) if current == dtype => current,
            Some(current) if current.is_numeric() && dtype.is_numeric() => DType::Float,
            Some(current) => {
                return Err(SeriesError::Construction {
                    value: value.to_string(),
                    dtype: current,
                })
            }
        });
    }
    Ok(inferred)
}

/// Build a series from literal values
///
/// # Errors
/// Returns `Construction` on incompatible values, or the cast error when the
/// inferred dtype cannot become `options.dtype`.
pub fn from_list(values: &[Value], options: &ListOptions) -> SeriesResult<Series> {
    let backend = options.backend.clone().unwrap_or_else(default_backend);
    let dtype = match scan_dtype(values)? {
        Some(dtype) => dtype,
        None => options.dtype.unwrap_or(DType::Float),
    };
    tracing::trace!(backend = backend.name(), %dtype, len = values.len(), "from_list");

    let array = backend.from_list(values, dtype)?;
    let series = Series::from_parts(dtype, array, backend);
    match options.dtype {
        Some(target) => series.cast(target),
        None => Ok(series),
    }
}

/// Concatenate in order, unifying dtypes left to right
///
/// # Errors
/// Returns `DtypeMismatch` naming the pair of dtypes where unification
/// failed, or `InvalidOption` for an empty list.
pub fn concat(series: &[Series]) -> SeriesResult<Series> {
    let (first, rest) = series
        .split_first()
        .ok_or_else(|| SeriesError::invalid_option("concat", "expected at least one series"))?;
    rest.iter()
        .try_fold(first.clone(), |acc, next| concat_pair(&acc, next))
}

fn concat_pair(left: &Series, right: &Series) -> SeriesResult<Series> {
    let dtype = unify("concat", left.dtype(), right.dtype())?;
    let (left, right) = (left.cast(dtype)?, right.cast(dtype)?);
    dispatch::apply_pair(&left, &right, "concat", dtype, |b, l, r| b.concat(l, r))
}

/// Fill the nulls of `left` from `right`, position-wise
///
/// # Errors
/// Returns `DtypeMismatch` for dtypes that do not unify and
/// `LengthMismatch` for series of different sizes.
pub fn coalesce_pair(left: &Series, right: &Series) -> SeriesResult<Series> {
    let dtype = unify("coalesce", left.dtype(), right.dtype())?;
    check_length("coalesce", left, right)?;
    let (left, right) = (left.cast(dtype)?, right.cast(dtype)?);
    dispatch::apply_pair(&left, &right, "coalesce", dtype, |b, l, r| b.coalesce(l, r))
}

/// Coalesce a list left to right: each later series fills the positions
/// still null after combining the earlier ones
///
/// # Errors
/// As [`coalesce_pair`], or `InvalidOption` for an empty list.
pub fn coalesce(series: &[Series]) -> SeriesResult<Series> {
    let (first, rest) = series
        .split_first()
        .ok_or_else(|| SeriesError::invalid_option("coalesce", "expected at least one series"))?;
    rest.iter()
        .try_fold(first.clone(), |acc, next| coalesce_pair(&acc, next))
}
