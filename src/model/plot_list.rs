use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use crate::core::{HorzTime, TimePoint};

use super::time_scale::TimePointIndex;

const CHUNK_SIZE: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PlotRowValueIndex {
    Open = 0,
    High = 1,
    Low = 2,
    Close = 3,
}

/// Per-row color overrides supplied with the data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowColors {
    pub color: Option<String>,
    pub border_color: Option<String>,
    pub wick_color: Option<String>,
}

/// Stored bar of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRow {
    /// Position of the row's time in the shared timeline.
    pub index: usize,
    pub time: TimePoint,
    /// Open, high, low, close; single-value series repeat the value.
    pub value: [f64; 4],
    pub original_time: HorzTime,
    pub colors: RowColors,
    pub custom_values: Option<Value>,
}

impl PlotRow {
    #[must_use]
    pub fn open(&self) -> f64 {
        self.value[PlotRowValueIndex::Open as usize]
    }

    #[must_use]
    pub fn high(&self) -> f64 {
        self.value[PlotRowValueIndex::High as usize]
    }

    #[must_use]
    pub fn low(&self) -> f64 {
        self.value[PlotRowValueIndex::Low as usize]
    }

    #[must_use]
    pub fn close(&self) -> f64 {
        self.value[PlotRowValueIndex::Close as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchDirection {
    None,
    NearestLeft,
    NearestRight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    #[must_use]
    pub fn merge(first: Option<Self>, second: Option<Self>) -> Option<Self> {
        match (first, second) {
            (Some(a), Some(b)) => Some(Self {
                min: a.min.min(b.min),
                max: a.max.max(b.max),
            }),
            (a, b) => a.or(b),
        }
    }
}

/// Index-sorted rows of one series with chunked min/max caching.
#[derive(Debug, Default)]
pub struct PlotList {
    items: Vec<PlotRow>,
    min_max_cache: RefCell<HashMap<(PlotRowValueIndex, i64), Option<MinMax>>>,
}

impl PlotList {
    #[must_use]
    pub fn size(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&PlotRow> {
        self.items.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&PlotRow> {
        self.items.last()
    }

    #[must_use]
    pub fn first_index(&self) -> Option<TimePointIndex> {
        self.items.first().map(|row| row.index as TimePointIndex)
    }

    #[must_use]
    pub fn last_index(&self) -> Option<TimePointIndex> {
        self.items.last().map(|row| row.index as TimePointIndex)
    }

    #[must_use]
    pub fn rows(&self) -> &[PlotRow] {
        &self.items
    }

    pub fn set_data(&mut self, rows: Vec<PlotRow>) {
        self.min_max_cache.get_mut().clear();
        self.items = rows;
    }

    /// Re-syncs row indices after the shared timeline was rebuilt.
    pub(crate) fn rows_mut(&mut self) -> &mut [PlotRow] {
        self.min_max_cache.get_mut().clear();
        &mut self.items
    }

    #[must_use]
    pub fn contains(&self, index: TimePointIndex) -> bool {
        self.search_position(index, MismatchDirection::None).is_some()
    }

    #[must_use]
    pub fn value_at(&self, index: TimePointIndex) -> Option<&PlotRow> {
        self.search(index, MismatchDirection::None)
    }

    #[must_use]
    pub fn search(&self, index: TimePointIndex, direction: MismatchDirection) -> Option<&PlotRow> {
        self.search_position(index, direction)
            .map(|position| &self.items[position])
    }

    /// Min/max of the given columns over rows with index in `[start, end]`.
    #[must_use]
    pub fn min_max_on_range_cached(
        &self,
        start: TimePointIndex,
        end: TimePointIndex,
        plots: &[PlotRowValueIndex],
    ) -> Option<MinMax> {
        if self.is_empty() {
            return None;
        }
        plots.iter().fold(None, |result, plot| {
            MinMax::merge(result, self.min_max_on_range_cached_impl(start, end, *plot))
        })
    }

    fn min_max_on_range_cached_impl(
        &self,
        start: TimePointIndex,
        end: TimePointIndex,
        plot: PlotRowValueIndex,
    ) -> Option<MinMax> {
        let first_index = self.first_index()?;
        let last_index = self.last_index()?;
        let s = start.max(first_index);
        let e = end.min(last_index);
        let cached_low = div_ceil(s, CHUNK_SIZE) * CHUNK_SIZE;
        let cached_high = cached_low.max(e.div_euclid(CHUNK_SIZE) * CHUNK_SIZE);

        let mut result = self.plot_min_max(
            self.lower_bound(s),
            self.upper_bound(e.min(cached_low).min(end)),
            plot,
        );

        let mut cache = self.min_max_cache.borrow_mut();
        let mut c = (cached_low + 1).max(s);
        while c < cached_high {
            let chunk = c.div_euclid(CHUNK_SIZE);
            let chunk_min_max = *cache.entry((plot, chunk)).or_insert_with(|| {
                self.plot_min_max(
                    self.lower_bound(chunk * CHUNK_SIZE),
                    self.upper_bound((chunk + 1) * CHUNK_SIZE - 1),
                    plot,
                )
            });
            result = MinMax::merge(result, chunk_min_max);
            c += CHUNK_SIZE;
        }

        let tail = self.plot_min_max(self.lower_bound(cached_high), self.upper_bound(e), plot);
        MinMax::merge(result, tail)
    }

    fn plot_min_max(&self, from: usize, to: usize, plot: PlotRowValueIndex) -> Option<MinMax> {
        if from >= to {
            return None;
        }
        self.items[from..to]
            .iter()
            .map(|row| row.value[plot as usize])
            .filter(|value| !value.is_nan())
            .fold(None, |result, value| {
                MinMax::merge(
                    result,
                    Some(MinMax {
                        min: value,
                        max: value,
                    }),
                )
            })
    }

    fn search_position(
        &self,
        index: TimePointIndex,
        direction: MismatchDirection,
    ) -> Option<usize> {
        let lower = self.lower_bound(index);
        if lower != self.items.len() && !(index < self.items[lower].index as TimePointIndex) {
            return Some(lower);
        }
        match direction {
            MismatchDirection::None => None,
            MismatchDirection::NearestLeft => {
                let position = lower.saturating_sub(1);
                (position != self.items.len()
                    && (self.items[position].index as TimePointIndex) < index)
                    .then_some(position)
            }
            MismatchDirection::NearestRight => {
                let position = self.upper_bound(index);
                (position != self.items.len()
                    && index < self.items[position].index as TimePointIndex)
                    .then_some(position)
            }
        }
    }

    fn lower_bound(&self, index: TimePointIndex) -> usize {
        self.items
            .partition_point(|row| (row.index as TimePointIndex) < index)
    }

    fn upper_bound(&self, index: TimePointIndex) -> usize {
        self.items
            .partition_point(|row| (row.index as TimePointIndex) <= index)
    }
}

fn div_ceil(value: i64, divisor: i64) -> i64 {
    -((-value).div_euclid(divisor))
}

#[cfg(test)]
mod tests {
    use super::{MismatchDirection, PlotList, PlotRow, PlotRowValueIndex, RowColors};
    use crate::core::{HorzTime, TimePoint};

    fn row(index: usize, low: f64, high: f64) -> PlotRow {
        PlotRow {
            index,
            time: TimePoint::from_timestamp(index as i64),
            value: [low, high, low, high],
            original_time: HorzTime::Timestamp(index as i64),
            colors: RowColors::default(),
            custom_values: None,
        }
    }

    fn sparse_list() -> PlotList {
        let mut list = PlotList::default();
        list.set_data(vec![row(2, 1.0, 2.0), row(5, 3.0, 4.0), row(9, 0.5, 8.0)]);
        list
    }

    #[test]
    fn search_respects_mismatch_direction() {
        let list = sparse_list();
        assert_eq!(list.value_at(5).map(|r| r.index), Some(5));
        assert!(list.value_at(6).is_none());
        assert_eq!(
            list.search(6, MismatchDirection::NearestLeft).map(|r| r.index),
            Some(5)
        );
        assert_eq!(
            list.search(6, MismatchDirection::NearestRight).map(|r| r.index),
            Some(9)
        );
        assert!(list.search(1, MismatchDirection::NearestLeft).is_none());
        assert!(list.search(10, MismatchDirection::NearestRight).is_none());
        assert_eq!(
            list.search(10, MismatchDirection::NearestLeft).map(|r| r.index),
            Some(9)
        );
    }

    #[test]
    fn min_max_skips_nan_and_merges_columns() {
        let mut list = PlotList::default();
        let mut rows: Vec<_> = (0..100).map(|i| row(i, i as f64, i as f64 + 1.0)).collect();
        rows[50].value = [f64::NAN; 4];
        list.set_data(rows);

        let result = list
            .min_max_on_range_cached(
                40,
                70,
                &[PlotRowValueIndex::Low, PlotRowValueIndex::High],
            )
            .expect("min max");
        assert_eq!(result.min, 40.0);
        assert_eq!(result.max, 71.0);
    }

    #[test]
    fn cache_is_dropped_on_set_data() {
        let mut list = PlotList::default();
        list.set_data((0..120).map(|i| row(i, 1.0, 2.0)).collect());
        let before = list
            .min_max_on_range_cached(0, 119, &[PlotRowValueIndex::High])
            .expect("min max");
        assert_eq!(before.max, 2.0);

        list.set_data((0..120).map(|i| row(i, 1.0, 5.0)).collect());
        let after = list
            .min_max_on_range_cached(0, 119, &[PlotRowValueIndex::High])
            .expect("min max");
        assert_eq!(after.max, 5.0);
    }

    #[test]
    fn empty_and_disjoint_ranges_yield_none() {
        let list = PlotList::default();
        assert!(list
            .min_max_on_range_cached(0, 10, &[PlotRowValueIndex::Close])
            .is_none());
        let list = sparse_list();
        assert!(list
            .min_max_on_range_cached(6, 8, &[PlotRowValueIndex::Close])
            .is_none());
    }
}
