//! Positional access and removal
//!
//! Negative indices count from the end. Single-index access is bounds
//! checked against `[-size, size - 1]`; ranges are resolved against the
//! positions `0..size` and clipped to them.

use std::ops::RangeInclusive;
use std::sync::Arc;

use arrow::array::BooleanArray;

use crate::dtype::DType;
use crate::error::SeriesResult;
use crate::series::{resolve_index, Series};
use crate::value::Value;

/// Random access and removal by index, range, or list of indices
pub trait SeriesAccess {
    /// The element at `index`
    ///
    /// # Errors
    /// Returns `OutOfBounds` outside `[-size, size - 1]`.
    fn get(&self, index: i64) -> SeriesResult<Value>;

    /// The elements covered by `range`, in order
    ///
    /// # Errors
    /// Propagates backend errors; out-of-range bounds are clipped.
    fn get_range(&self, range: RangeInclusive<i64>) -> SeriesResult<Series>;

    /// The elements at `indices`, in the order given
    ///
    /// # Errors
    /// Returns `OutOfBounds` for the first index outside the series.
    fn get_many(&self, indices: &[i64]) -> SeriesResult<Series>;

    /// Remove one element, returning it and the remaining series
    ///
    /// # Errors
    /// Returns `OutOfBounds` outside `[-size, size - 1]`.
    fn remove_at(&self, index: i64) -> SeriesResult<(Value, Series)>;

    /// Remove the elements covered by `range`, returning them and the rest
    ///
    /// # Errors
    /// Propagates backend errors.
    fn remove_range(&self, range: RangeInclusive<i64>) -> SeriesResult<(Series, Series)>;

    /// Remove the elements at `indices`, returning them (in position order)
    /// and the rest
    ///
    /// # Errors
    /// Returns `OutOfBounds` for the first index outside the series.
    fn remove_many(&self, indices: &[i64]) -> SeriesResult<(Series, Series)>;
}

impl SeriesAccess for Series {
    fn get(&self, index: i64) -> SeriesResult<Value> {
        let position = resolve_index(index, self.size())?;
        crate::dispatch::apply(self, "fetch", |b, a| b.fetch(a, position))
    }

    fn get_range(&self, range: RangeInclusive<i64>) -> SeriesResult<Series> {
        match range_positions(&range, self.size()) {
            Some((first, last)) => self.slice(first as i64, last - first + 1),
            None => self.slice(0, 0),
        }
    }

    fn get_many(&self, indices: &[i64]) -> SeriesResult<Series> {
        let positions = resolve_all(indices, self.size())?;
        self.take(&positions)
    }

    fn remove_at(&self, index: i64) -> SeriesResult<(Value, Series)> {
        let position = resolve_index(index, self.size())?;
        let removed = self.get(index)?;
        let remaining = self.mask(&position_mask(self, &[position], false))?;
        Ok((removed, remaining))
    }

    fn remove_range(&self, range: RangeInclusive<i64>) -> SeriesResult<(Series, Series)> {
        let positions: Vec<usize> = range_positions(&range, self.size())
            .map(|(first, last)| (first..=last).collect())
            .unwrap_or_default();
        split(self, &positions)
    }

    fn remove_many(&self, indices: &[i64]) -> SeriesResult<(Series, Series)> {
        let positions = resolve_all(indices, self.size())?;
        split(self, &positions)
    }
}

/// First and last position covered by `range`, or None when it is empty
fn range_positions(range: &RangeInclusive<i64>, size: usize) -> Option<(usize, usize)> {
    let signed = size as i64;
    let wrap = |i: i64| if i < 0 { i + signed } else { i };
    let first = wrap(*range.start()).max(0);
    let last = wrap(*range.end()).min(signed - 1);
    (first <= last).then_some((first as usize, last as usize))
}

fn resolve_all(indices: &[i64], size: usize) -> SeriesResult<Vec<usize>> {
    indices.iter().map(|&i| resolve_index(i, size)).collect()
}

/// Boolean series on the same backend: `marked` at `positions`, the
/// opposite everywhere else
fn position_mask(series: &Series, positions: &[usize], marked: bool) -> Series {
    let mut flags = vec![!marked; series.size()];
    for &position in positions {
        flags[position] = marked;
    }
    Series::from_parts(
        DType::Boolean,
        Arc::new(BooleanArray::from(flags)),
        series.backend().clone(),
    )
}

/// (removed, kept) for the given positions
fn split(series: &Series, positions: &[usize]) -> SeriesResult<(Series, Series)> {
    let removed = series.mask(&position_mask(series, positions, true))?;
    let kept = series.mask(&position_mask(series, positions, false))?;
    Ok((removed, kept))
}
