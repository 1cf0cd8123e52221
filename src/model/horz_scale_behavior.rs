//! Pluggable semantics of the horizontal axis.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};

use crate::core::{HorzTime, TimeConverter, TimePoint};
use crate::error::ChartResult;

use super::options::TimeScaleOptions;
use super::tick_marks::TickMark;
use super::time_scale::TimeScalePoint;

/// Calendar granularity at which a point differs from its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TickMarkWeight {
    LessThanSecond = 0,
    Second = 10,
    Minute1 = 20,
    Minute5 = 21,
    Minute30 = 22,
    Hour1 = 30,
    Hour3 = 31,
    Hour6 = 32,
    Hour12 = 33,
    Day = 50,
    Month = 60,
    Year = 70,
}

impl TickMarkWeight {
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMarkType {
    Year,
    Month,
    DayOfMonth,
    Time,
    TimeWithSeconds,
}

const INTRADAY_DIVISORS_MS: [(i64, TickMarkWeight); 8] = [
    (1_000, TickMarkWeight::Second),
    (60_000, TickMarkWeight::Minute1),
    (5 * 60_000, TickMarkWeight::Minute5),
    (30 * 60_000, TickMarkWeight::Minute30),
    (3_600_000, TickMarkWeight::Hour1),
    (3 * 3_600_000, TickMarkWeight::Hour3),
    (6 * 3_600_000, TickMarkWeight::Hour6),
    (12 * 3_600_000, TickMarkWeight::Hour12),
];

/// Behavior consumed by the time scale and the data layer.
pub trait HorzScaleBehavior: fmt::Debug {
    /// Ordering key of a time point.
    fn key(&self, time: &TimePoint) -> f64;

    fn cache_key(&self, time: &TimePoint) -> i64;

    /// Picks the converter for a batch from its first item.
    fn create_converter(&self, first: &HorzTime) -> TimeConverter;

    fn convert_to_internal(&self, time: &HorzTime) -> ChartResult<TimePoint>;

    fn apply_options(&mut self, options: &TimeScaleOptions);

    fn format_horz_item(&self, time: &TimePoint) -> String;

    fn format_tick_mark(&self, mark: &TickMark) -> String;

    /// Assigns `time_weight` to every point from `start` onwards.
    fn fill_weights_for_points(&self, points: &mut [TimeScalePoint], start: usize);

    fn max_tick_mark_weight(&self, marks: &[TickMark]) -> u8;
}

/// UTC calendar time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBehavior {
    time_visible: bool,
    seconds_visible: bool,
}

impl Default for TimeBehavior {
    fn default() -> Self {
        Self {
            time_visible: false,
            seconds_visible: true,
        }
    }
}

impl TimeBehavior {
    #[must_use]
    pub fn new(options: &TimeScaleOptions) -> Self {
        Self {
            time_visible: options.time_visible,
            seconds_visible: options.seconds_visible,
        }
    }
}

impl HorzScaleBehavior for TimeBehavior {
    fn key(&self, time: &TimePoint) -> f64 {
        time.timestamp as f64
    }

    fn cache_key(&self, time: &TimePoint) -> i64 {
        time.timestamp
    }

    fn create_converter(&self, first: &HorzTime) -> TimeConverter {
        match first {
            HorzTime::Timestamp(_) => TimeConverter::Timestamp,
            HorzTime::BusinessDay(_) | HorzTime::Date(_) => TimeConverter::BusinessDay,
        }
    }

    fn convert_to_internal(&self, time: &HorzTime) -> ChartResult<TimePoint> {
        crate::core::convert_time(time)
    }

    fn apply_options(&mut self, options: &TimeScaleOptions) {
        self.time_visible = options.time_visible;
        self.seconds_visible = options.seconds_visible;
    }

    fn format_horz_item(&self, time: &TimePoint) -> String {
        let Some(date) = time.to_datetime() else {
            return String::new();
        };
        let mut label = date.format("%d %b '%y").to_string();
        if self.time_visible {
            let time_format = if self.seconds_visible {
                "%H:%M:%S"
            } else {
                "%H:%M"
            };
            label.push_str("   ");
            label.push_str(&date.format(time_format).to_string());
        }
        label
    }

    fn format_tick_mark(&self, mark: &TickMark) -> String {
        let Some(date) = mark.time.to_datetime() else {
            return String::new();
        };
        let pattern = match weight_to_tick_mark_type(
            mark.weight,
            self.time_visible,
            self.seconds_visible,
        ) {
            TickMarkType::Year => "%Y",
            TickMarkType::Month => "%b",
            TickMarkType::DayOfMonth => "%-d",
            TickMarkType::Time => "%H:%M",
            TickMarkType::TimeWithSeconds => "%H:%M:%S",
        };
        date.format(pattern).to_string()
    }

    fn fill_weights_for_points(&self, points: &mut [TimeScalePoint], start: usize) {
        fill_weights_for_points(points, start);
    }

    fn max_tick_mark_weight(&self, marks: &[TickMark]) -> u8 {
        let max_weight = marks.iter().map(|mark| mark.weight).max().unwrap_or(0);
        if max_weight > TickMarkWeight::Hour1.value() && max_weight < TickMarkWeight::Day.value() {
            TickMarkWeight::Hour1.value()
        } else {
            max_weight
        }
    }
}

#[must_use]
pub fn weight_to_tick_mark_type(
    weight: u8,
    time_visible: bool,
    seconds_visible: bool,
) -> TickMarkType {
    let weight_of = TickMarkWeight::value;
    match weight {
        w if w <= weight_of(TickMarkWeight::Second) => match (time_visible, seconds_visible) {
            (true, true) => TickMarkType::TimeWithSeconds,
            (true, false) => TickMarkType::Time,
            (false, _) => TickMarkType::DayOfMonth,
        },
        w if w <= weight_of(TickMarkWeight::Hour12) && time_visible => TickMarkType::Time,
        w if w >= weight_of(TickMarkWeight::Year) => TickMarkType::Year,
        w if w >= weight_of(TickMarkWeight::Month) => TickMarkType::Month,
        _ => TickMarkType::DayOfMonth,
    }
}

/// Weight of `current` relative to the point before it.
#[must_use]
pub fn weight_by_time(current: DateTime<Utc>, previous: DateTime<Utc>) -> TickMarkWeight {
    if current.year() != previous.year() {
        return TickMarkWeight::Year;
    }
    if current.month() != previous.month() {
        return TickMarkWeight::Month;
    }
    if current.day() != previous.day() {
        return TickMarkWeight::Day;
    }
    let current_ms = current.timestamp_millis();
    let previous_ms = previous.timestamp_millis();
    INTRADAY_DIVISORS_MS
        .iter()
        .rev()
        .find(|(divisor, _)| {
            previous_ms.div_euclid(*divisor) != current_ms.div_euclid(*divisor)
        })
        .map_or(TickMarkWeight::LessThanSecond, |(_, weight)| *weight)
}

pub fn fill_weights_for_points(points: &mut [TimeScalePoint], start: usize) {
    if points.is_empty() || start >= points.len() {
        return;
    }
    let mut previous = start
        .checked_sub(1)
        .map(|index| points[index].time.timestamp);
    let mut total_diff: i64 = 0;
    for point in &mut points[start..] {
        let current = point.time.timestamp;
        if let Some(prev) = previous {
            point.time_weight = weight_between(current, prev).value();
            total_diff += current - prev;
        }
        previous = Some(current);
    }

    if start == 0 && points.len() > 1 {
        let intervals = (points.len() - 1) as i64;
        let average_diff = (total_diff + intervals - 1).div_euclid(intervals);
        let first = points[0].time.timestamp;
        points[0].time_weight = weight_between(first, first - average_diff).value();
    }
}

fn weight_between(current: i64, previous: i64) -> TickMarkWeight {
    match (
        DateTime::<Utc>::from_timestamp(current, 0),
        DateTime::<Utc>::from_timestamp(previous, 0),
    ) {
        (Some(current), Some(previous)) => weight_by_time(current, previous),
        _ => TickMarkWeight::LessThanSecond,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        HorzScaleBehavior, TickMarkType, TickMarkWeight, TimeBehavior, fill_weights_for_points,
        weight_to_tick_mark_type,
    };
    use crate::core::{HorzTime, TimePoint};
    use crate::model::tick_marks::TickMark;
    use crate::model::time_scale::TimeScalePoint;

    const DAY: i64 = 86_400;

    fn points(times: &[i64]) -> Vec<TimeScalePoint> {
        times
            .iter()
            .enumerate()
            .map(|(index, time)| TimeScalePoint {
                index,
                time: TimePoint::from_timestamp(*time),
                time_weight: 0,
                original_time: HorzTime::Timestamp(*time),
            })
            .collect()
    }

    #[test]
    fn daily_points_get_day_month_and_year_weights() {
        // 2020-12-30, 2020-12-31, 2021-01-01, 2021-01-02, 2021-02-01
        let start = 1_609_286_400;
        let mut pts = points(&[start, start + DAY, start + 2 * DAY, start + 3 * DAY, 1_612_137_600]);
        fill_weights_for_points(&mut pts, 0);

        let weights: Vec<u8> = pts.iter().map(|p| p.time_weight).collect();
        assert_eq!(weights, vec![50, 50, 70, 50, 60]);
    }

    #[test]
    fn intraday_points_use_coarsest_changed_bucket() {
        let base = 1_609_459_200; // 2021-01-01 00:00
        let mut pts = points(&[base, base + 300, base + 3_600, base + 3_660, base + 3_661]);
        fill_weights_for_points(&mut pts, 1);

        assert_eq!(pts[1].time_weight, TickMarkWeight::Minute5.value());
        assert_eq!(pts[2].time_weight, TickMarkWeight::Hour1.value());
        assert_eq!(pts[3].time_weight, TickMarkWeight::Minute1.value());
        assert_eq!(pts[4].time_weight, TickMarkWeight::Second.value());
        assert_eq!(pts[0].time_weight, 0);
    }

    #[test]
    fn tick_mark_type_follows_visibility_flags() {
        assert_eq!(weight_to_tick_mark_type(10, true, true), TickMarkType::TimeWithSeconds);
        assert_eq!(weight_to_tick_mark_type(10, true, false), TickMarkType::Time);
        assert_eq!(weight_to_tick_mark_type(0, false, true), TickMarkType::DayOfMonth);
        assert_eq!(weight_to_tick_mark_type(31, true, true), TickMarkType::Time);
        assert_eq!(weight_to_tick_mark_type(33, false, true), TickMarkType::DayOfMonth);
        assert_eq!(weight_to_tick_mark_type(50, true, true), TickMarkType::DayOfMonth);
        assert_eq!(weight_to_tick_mark_type(60, false, false), TickMarkType::Month);
        assert_eq!(weight_to_tick_mark_type(70, false, false), TickMarkType::Year);
    }

    #[test]
    fn max_weight_collapses_intraday_hours() {
        let behavior = TimeBehavior::default();
        let mark = |weight| TickMark {
            index: 0,
            time: TimePoint::from_timestamp(0),
            weight,
            original_time: HorzTime::Timestamp(0),
        };
        assert_eq!(behavior.max_tick_mark_weight(&[mark(20), mark(32)]), 30);
        assert_eq!(behavior.max_tick_mark_weight(&[mark(20), mark(50)]), 50);
    }

    #[test]
    fn formats_tick_marks_by_weight() {
        let behavior = TimeBehavior::default();
        let time = TimePoint::from_timestamp(1_554_940_800); // 2019-04-11
        let mark = |weight| TickMark {
            index: 0,
            time,
            weight,
            original_time: HorzTime::Timestamp(time.timestamp),
        };
        assert_eq!(behavior.format_tick_mark(&mark(70)), "2019");
        assert_eq!(behavior.format_tick_mark(&mark(60)), "Apr");
        assert_eq!(behavior.format_tick_mark(&mark(50)), "11");
        assert_eq!(behavior.format_horz_item(&time), "11 Apr '19");
    }
}
