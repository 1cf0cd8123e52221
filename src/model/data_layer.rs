//! Merges per-series rows into one shared, key-sorted timeline.
//!
//! Every series row carries the index of its time point in that timeline.
//! When a data update changes the set of distinct times, indices are
//! re-assigned from the first point that differs and all rows of all series
//! are re-synced.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::{HorzTime, SeriesId, TimePoint};
use crate::error::{ChartError, ChartResult};

use super::horz_scale_behavior::HorzScaleBehavior;
use super::plot_list::{PlotRow, RowColors};
use super::series::SeriesType;
use super::time_scale::{TimePointIndex, TimeScalePoint};

/// One input row. Rows with neither `open` nor `value` (nor `values` for
/// custom series) are whitespace: they occupy a time point but carry no data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDataItem {
    pub time: HorzTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Raw values of a custom series; the last one is its close.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wick_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_values: Option<Value>,
}

impl SeriesDataItem {
    #[must_use]
    pub fn whitespace(time: impl Into<HorzTime>) -> Self {
        Self {
            time: time.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn value(time: impl Into<HorzTime>, value: f64) -> Self {
        Self {
            time: time.into(),
            value: Some(value),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ohlc(time: impl Into<HorzTime>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time: time.into(),
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn is_whitespace(&self, series_type: SeriesType) -> bool {
        match series_type {
            SeriesType::Custom => {
                self.value.is_none() && self.values.as_ref().is_none_or(Vec::is_empty)
            }
            _ => self.open.is_none() && self.value.is_none(),
        }
    }
}

/// Whether an update only touched the right end of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesUpdateInfo {
    pub last_bar_updated_or_new_bars_added_to_the_right: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesChanges {
    pub data: Vec<PlotRow>,
    pub info: Option<SeriesUpdateInfo>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeScaleChanges {
    pub base_index: Option<TimePointIndex>,
    /// Present only when the timeline changed.
    pub points: Option<Vec<TimeScalePoint>>,
    pub first_changed_point_index: Option<usize>,
}

/// Everything the model must apply after a data update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataUpdateResponse {
    pub series: IndexMap<SeriesId, SeriesChanges>,
    pub time_scale: TimeScaleChanges,
}

#[derive(Debug, Clone)]
struct TimePointData {
    index: usize,
    time: TimePoint,
    /// Original time of every series row at this point, in insertion order.
    mapping: IndexMap<SeriesId, HorzTime>,
}

struct BuiltRow {
    key: OrderedFloat<f64>,
    time: TimePoint,
    original_time: HorzTime,
    row: Option<PlotRow>,
}

#[derive(Debug, Default)]
pub struct DataLayer {
    point_data_by_key: BTreeMap<OrderedFloat<f64>, TimePointData>,
    series_rows: IndexMap<SeriesId, Vec<PlotRow>>,
    series_last_time_point: IndexMap<SeriesId, TimePoint>,
    sorted_time_points: Vec<TimeScalePoint>,
}

impl DataLayer {
    #[must_use]
    pub fn sorted_time_points(&self) -> &[TimeScalePoint] {
        &self.sorted_time_points
    }

    #[must_use]
    pub fn series_rows(&self, series: SeriesId) -> Option<&[PlotRow]> {
        self.series_rows.get(&series).map(Vec::as_slice)
    }

    #[must_use]
    pub fn series_last_time_point(&self, series: SeriesId) -> Option<TimePoint> {
        self.series_last_time_point.get(&series).copied()
    }

    pub fn clear(&mut self) {
        self.point_data_by_key.clear();
        self.series_rows.clear();
        self.series_last_time_point.clear();
        self.sorted_time_points.clear();
    }

    /// Replaces all rows of `series`.
    ///
    /// Rows must be strictly ascending by time; nothing is mutated when the
    /// input is rejected.
    pub fn set_series_data(
        &mut self,
        behavior: &dyn HorzScaleBehavior,
        series: SeriesId,
        series_type: SeriesType,
        data: &[SeriesDataItem],
    ) -> ChartResult<DataUpdateResponse> {
        let built = build_rows(behavior, series_type, data)?;

        let mut need_cleanup_points = !self.point_data_by_key.is_empty();
        let mut is_time_scale_affected = false;

        let prev_series_rows = self.series_rows.get(&series).cloned();
        if prev_series_rows.is_some() {
            if self.series_rows.len() == 1 {
                need_cleanup_points = false;
                is_time_scale_affected = true;
                self.point_data_by_key.clear();
            } else {
                for point in self.point_data_by_key.values_mut() {
                    if point.mapping.shift_remove(&series).is_some() {
                        is_time_scale_affected = true;
                    }
                }
            }
        }

        let mut series_rows = Vec::with_capacity(built.len());
        let last_time = built.last().map(|item| item.time);
        for item in built {
            let point = self.point_data_by_key.entry(item.key).or_insert_with(|| {
                is_time_scale_affected = true;
                TimePointData {
                    index: 0,
                    time: item.time,
                    mapping: IndexMap::new(),
                }
            });
            point.mapping.insert(series, item.original_time);
            if let Some(mut row) = item.row {
                row.index = point.index;
                series_rows.push(row);
            }
        }

        if need_cleanup_points {
            self.point_data_by_key
                .retain(|_, point| !point.mapping.is_empty());
        }

        match last_time {
            Some(time) => {
                self.series_rows.insert(series, series_rows);
                self.series_last_time_point.insert(series, time);
            }
            None => {
                self.series_rows.shift_remove(&series);
                self.series_last_time_point.shift_remove(&series);
            }
        }

        let mut first_changed = None;
        if is_time_scale_affected {
            let new_points = self
                .point_data_by_key
                .values()
                .map(|point| TimeScalePoint {
                    index: 0,
                    time: point.time,
                    time_weight: 0,
                    original_time: point
                        .mapping
                        .values()
                        .next()
                        .cloned()
                        .unwrap_or_else(|| HorzTime::Timestamp(point.time.timestamp)),
                })
                .collect();
            first_changed = self.replace_time_scale_points(behavior, new_points);
            self.sync_row_indices(behavior);
        }

        let info = series_update_info(
            behavior,
            self.series_rows.get(&series).map(Vec::as_slice),
            prev_series_rows.as_deref(),
        );
        let response = self.update_response(series, first_changed, info);
        debug!(
            series = series.raw(),
            rows = data.len(),
            first_changed = ?first_changed,
            base_index = ?response.time_scale.base_index,
            "series data applied"
        );
        Ok(response)
    }

    /// Returns the first index whose key differs from the old timeline.
    fn replace_time_scale_points(
        &mut self,
        behavior: &dyn HorzScaleBehavior,
        mut new_points: Vec<TimeScalePoint>,
    ) -> Option<usize> {
        let mut first_changed = None;
        for (index, (old_point, new_point)) in self
            .sorted_time_points
            .iter()
            .zip(new_points.iter_mut())
            .enumerate()
        {
            if behavior.key(&old_point.time) != behavior.key(&new_point.time) {
                first_changed = Some(index);
                break;
            }
            new_point.time_weight = old_point.time_weight;
            new_point.index = index;
        }

        for (index, point) in self.point_data_by_key.values_mut().enumerate() {
            point.index = index;
        }

        if first_changed.is_none() && self.sorted_time_points.len() != new_points.len() {
            first_changed = Some(self.sorted_time_points.len().min(new_points.len()));
        }
        let first_changed = first_changed?;

        for (index, point) in new_points.iter_mut().enumerate().skip(first_changed) {
            point.index = index;
        }
        behavior.fill_weights_for_points(&mut new_points, first_changed);
        self.sorted_time_points = new_points;
        Some(first_changed)
    }

    fn sync_row_indices(&mut self, behavior: &dyn HorzScaleBehavior) {
        let point_data = &self.point_data_by_key;
        for rows in self.series_rows.values_mut() {
            for row in rows.iter_mut() {
                if let Some(point) = point_data.get(&OrderedFloat(behavior.key(&row.time))) {
                    row.index = point.index;
                }
            }
        }
    }

    fn base_index(&self) -> Option<TimePointIndex> {
        if self.series_rows.is_empty() {
            return None;
        }
        let base = self
            .series_rows
            .values()
            .filter_map(|rows| rows.last())
            .map(|row| row.index as TimePointIndex)
            .max()
            .unwrap_or(0);
        Some(base)
    }

    fn update_response(
        &self,
        updated: SeriesId,
        first_changed: Option<usize>,
        info: Option<SeriesUpdateInfo>,
    ) -> DataUpdateResponse {
        let mut response = DataUpdateResponse {
            series: IndexMap::new(),
            time_scale: TimeScaleChanges {
                base_index: self.base_index(),
                ..TimeScaleChanges::default()
            },
        };
        match first_changed {
            Some(first_changed) => {
                for (series, rows) in &self.series_rows {
                    response.series.insert(
                        *series,
                        SeriesChanges {
                            data: rows.clone(),
                            info: (*series == updated).then_some(info).flatten(),
                        },
                    );
                }
                response
                    .series
                    .entry(updated)
                    .or_insert(SeriesChanges { data: Vec::new(), info });
                response.time_scale.points = Some(self.sorted_time_points.clone());
                response.time_scale.first_changed_point_index = Some(first_changed);
            }
            None => {
                response.series.insert(
                    updated,
                    SeriesChanges {
                        data: self.series_rows.get(&updated).cloned().unwrap_or_default(),
                        info,
                    },
                );
            }
        }
        response
    }
}

fn series_update_info(
    behavior: &dyn HorzScaleBehavior,
    rows: Option<&[PlotRow]>,
    prev_rows: Option<&[PlotRow]>,
) -> Option<SeriesUpdateInfo> {
    let first_and_last = |rows: &[PlotRow]| -> Option<(f64, f64)> {
        Some((behavior.key(&rows.first()?.time), behavior.key(&rows.last()?.time)))
    };
    let (first, last) = first_and_last(rows?)?;
    let (prev_first, prev_last) = first_and_last(prev_rows?)?;
    Some(SeriesUpdateInfo {
        last_bar_updated_or_new_bars_added_to_the_right: last >= prev_last && first >= prev_first,
    })
}

/// Fails on the first row whose time is not strictly after its predecessor.
pub fn check_items_are_ordered(
    behavior: &dyn HorzScaleBehavior,
    times: &[TimePoint],
) -> ChartResult<()> {
    for (index, pair) in times.windows(2).enumerate() {
        let previous = behavior.key(&pair[0]);
        let current = behavior.key(&pair[1]);
        if current <= previous {
            return Err(ChartError::UnorderedData {
                index: index + 1,
                time: pair[1].timestamp as f64,
                previous: pair[0].timestamp as f64,
            });
        }
    }
    Ok(())
}

fn build_rows(
    behavior: &dyn HorzScaleBehavior,
    series_type: SeriesType,
    data: &[SeriesDataItem],
) -> ChartResult<Vec<BuiltRow>> {
    let Some(first) = data.first() else {
        return Ok(Vec::new());
    };
    let converter = behavior.create_converter(&first.time);
    let times = data
        .iter()
        .map(|item| converter.convert(&item.time))
        .collect::<ChartResult<Vec<_>>>()?;
    check_items_are_ordered(behavior, &times)?;

    data.iter()
        .zip(times)
        .map(|(item, time)| {
            let row = if item.is_whitespace(series_type) {
                None
            } else {
                Some(create_plot_row(series_type, time, item)?)
            };
            Ok(BuiltRow {
                key: OrderedFloat(behavior.key(&time)),
                time,
                original_time: item.time.clone(),
                row,
            })
        })
        .collect()
}

/// Builds the stored row for a fulfilled input item.
pub fn create_plot_row(
    series_type: SeriesType,
    time: TimePoint,
    item: &SeriesDataItem,
) -> ChartResult<PlotRow> {
    let value = match series_type {
        SeriesType::Bar | SeriesType::Candlestick => {
            let (Some(open), Some(high), Some(low), Some(close)) =
                (item.open, item.high, item.low, item.close)
            else {
                return Err(ChartError::InvalidData(format!(
                    "{series_type:?} row at {} needs open, high, low and close",
                    time.timestamp
                )));
            };
            [open, high, low, close]
        }
        SeriesType::Line | SeriesType::Area | SeriesType::Baseline | SeriesType::Histogram => {
            let value = item.value.ok_or_else(|| {
                ChartError::InvalidData(format!(
                    "{series_type:?} row at {} needs a value",
                    time.timestamp
                ))
            })?;
            [value; 4]
        }
        SeriesType::Custom => match (&item.values, item.value) {
            (Some(values), _) if !values.is_empty() => custom_row_value(values),
            (_, Some(value)) => [value; 4],
            _ => {
                return Err(ChartError::InvalidData(format!(
                    "custom row at {} has no values",
                    time.timestamp
                )));
            }
        },
    };
    if value.iter().any(|v| !v.is_finite()) {
        return Err(ChartError::InvalidData(format!(
            "row at {} contains a non-finite value",
            time.timestamp
        )));
    }

    let colors = RowColors {
        color: item.color.clone(),
        border_color: (series_type == SeriesType::Candlestick)
            .then(|| item.border_color.clone())
            .flatten(),
        wick_color: (series_type == SeriesType::Candlestick)
            .then(|| item.wick_color.clone())
            .flatten(),
    };
    Ok(PlotRow {
        index: 0,
        time,
        value,
        original_time: item.time.clone(),
        colors,
        custom_values: item.custom_values.clone(),
    })
}

/// Custom rows keep `[last, max, min, last]` of their raw values.
fn custom_row_value(values: &[f64]) -> [f64; 4] {
    let last = values[values.len() - 1];
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    [last, max, min, last]
}

#[cfg(test)]
mod tests {
    use super::{DataLayer, SeriesDataItem};
    use crate::core::SeriesId;
    use crate::error::ChartError;
    use crate::model::horz_scale_behavior::TimeBehavior;
    use crate::model::series::SeriesType;

    const DAY: i64 = 86_400;

    fn values(times: &[i64]) -> Vec<SeriesDataItem> {
        times
            .iter()
            .map(|t| SeriesDataItem::value(*t * DAY, *t as f64))
            .collect()
    }

    #[test]
    fn appending_a_bar_changes_only_the_tail() {
        let behavior = TimeBehavior::default();
        let mut layer = DataLayer::default();
        let series = SeriesId::new(0);
        let first = layer
            .set_series_data(&behavior, series, SeriesType::Line, &values(&[1, 2, 3]))
            .expect("valid data");
        assert_eq!(first.time_scale.first_changed_point_index, Some(0));
        assert_eq!(first.time_scale.base_index, Some(2));

        let second = layer
            .set_series_data(&behavior, series, SeriesType::Line, &values(&[1, 2, 3, 4]))
            .expect("valid data");
        assert_eq!(second.time_scale.first_changed_point_index, Some(3));
        assert_eq!(second.time_scale.base_index, Some(3));
        let changes = &second.series[&series];
        assert_eq!(changes.data.last().map(|row| row.index), Some(3));
        assert_eq!(
            changes.info.map(|info| info.last_bar_updated_or_new_bars_added_to_the_right),
            Some(true)
        );
    }

    #[test]
    fn same_data_twice_leaves_timeline_unchanged() {
        let behavior = TimeBehavior::default();
        let mut layer = DataLayer::default();
        let series = SeriesId::new(0);
        layer
            .set_series_data(&behavior, series, SeriesType::Line, &values(&[1, 2, 3]))
            .expect("valid data");
        let again = layer
            .set_series_data(&behavior, series, SeriesType::Line, &values(&[1, 2, 3]))
            .expect("valid data");
        assert_eq!(again.time_scale.first_changed_point_index, None);
        assert!(again.time_scale.points.is_none());
    }

    #[test]
    fn series_share_time_points_and_reindex() {
        let behavior = TimeBehavior::default();
        let mut layer = DataLayer::default();
        let a = SeriesId::new(0);
        let b = SeriesId::new(1);
        layer
            .set_series_data(&behavior, a, SeriesType::Line, &values(&[2, 4, 6]))
            .expect("valid data");
        let update = layer
            .set_series_data(&behavior, b, SeriesType::Line, &values(&[1, 4]))
            .expect("valid data");

        assert_eq!(layer.sorted_time_points().len(), 4);
        assert_eq!(update.time_scale.first_changed_point_index, Some(0));
        let a_indices: Vec<_> = update.series[&a].data.iter().map(|r| r.index).collect();
        let b_indices: Vec<_> = update.series[&b].data.iter().map(|r| r.index).collect();
        assert_eq!(a_indices, vec![1, 2, 3]);
        assert_eq!(b_indices, vec![0, 2]);
        assert_eq!(update.time_scale.base_index, Some(3));
    }

    #[test]
    fn whitespace_occupies_time_without_rows() {
        let behavior = TimeBehavior::default();
        let mut layer = DataLayer::default();
        let series = SeriesId::new(0);
        let data = vec![
            SeriesDataItem::value(DAY, 1.0),
            SeriesDataItem::whitespace(2 * DAY),
            SeriesDataItem::value(3 * DAY, 3.0),
        ];
        let update = layer
            .set_series_data(&behavior, series, SeriesType::Line, &data)
            .expect("valid data");
        assert_eq!(layer.sorted_time_points().len(), 3);
        let indices: Vec<_> = update.series[&series].data.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn clearing_reports_empty_series() {
        let behavior = TimeBehavior::default();
        let mut layer = DataLayer::default();
        let a = SeriesId::new(0);
        let b = SeriesId::new(1);
        layer
            .set_series_data(&behavior, a, SeriesType::Line, &values(&[1, 2]))
            .expect("valid data");
        layer
            .set_series_data(&behavior, b, SeriesType::Line, &values(&[3]))
            .expect("valid data");
        let update = layer
            .set_series_data(&behavior, b, SeriesType::Line, &[])
            .expect("empty data");
        assert!(update.series[&b].data.is_empty());
        assert_eq!(update.time_scale.first_changed_point_index, Some(2));
        assert_eq!(layer.sorted_time_points().len(), 2);
        assert!(layer.series_last_time_point(b).is_none());
    }

    #[test]
    fn rejects_unordered_and_malformed_rows() {
        let behavior = TimeBehavior::default();
        let mut layer = DataLayer::default();
        let series = SeriesId::new(0);
        let error = layer
            .set_series_data(&behavior, series, SeriesType::Line, &values(&[1, 3, 2]))
            .expect_err("unordered");
        assert!(matches!(error, ChartError::UnorderedData { index: 2, .. }));
        assert!(layer.sorted_time_points().is_empty());

        let error = layer
            .set_series_data(&behavior, series, SeriesType::Bar, &values(&[1]))
            .expect_err("bar needs ohlc");
        assert!(matches!(error, ChartError::InvalidData(_)));
    }

    #[test]
    fn custom_rows_keep_last_max_min_last() {
        let behavior = TimeBehavior::default();
        let mut layer = DataLayer::default();
        let series = SeriesId::new(0);
        let item = SeriesDataItem {
            values: Some(vec![4.0, 9.0, 1.0, 5.0]),
            ..SeriesDataItem::whitespace(DAY)
        };
        let update = layer
            .set_series_data(&behavior, series, SeriesType::Custom, &[item])
            .expect("valid data");
        assert_eq!(update.series[&series].data[0].value, [5.0, 9.0, 1.0, 5.0]);
    }
}
