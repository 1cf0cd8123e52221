use std::collections::BTreeMap;

use crate::core::{HorzTime, TimePoint};

use super::invalidated::Invalidated;
use super::time_scale::TimeScalePoint;

#[derive(Debug, Clone, PartialEq)]
pub struct TickMark {
    pub index: usize,
    pub time: TimePoint,
    pub weight: u8,
    pub original_time: HorzTime,
}

#[derive(Debug, Clone, PartialEq)]
struct BuiltMarks {
    max_indexes_per_mark: usize,
    marks: Vec<TickMark>,
}

/// Candidate tick marks grouped by weight, thinned on demand to fit a label
/// width.
#[derive(Debug, Default)]
pub struct TickMarks {
    marks_by_weight: BTreeMap<u8, Vec<TickMark>>,
    cache: Invalidated<BuiltMarks>,
    uniform_distribution: bool,
}

impl TickMarks {
    pub fn set_uniform_distribution(&mut self, value: bool) {
        self.uniform_distribution = value;
        self.cache.invalidate();
    }

    pub fn set_time_scale_points(&mut self, points: &[TimeScalePoint], first_changed: usize) {
        self.remove_marks_since(first_changed);
        self.cache.invalidate();
        for (index, point) in points.iter().enumerate().skip(first_changed) {
            self.marks_by_weight
                .entry(point.time_weight)
                .or_default()
                .push(TickMark {
                    index,
                    time: point.time,
                    weight: point.time_weight,
                    original_time: point.original_time.clone(),
                });
        }
    }

    /// Marks at least `ceil(max_width / spacing)` indexes apart, heavier
    /// weights placed first.
    pub fn build(&mut self, spacing: f64, max_width: f64) -> &[TickMark] {
        let max_indexes_per_mark = (max_width / spacing).ceil().max(0.0) as usize;
        if self
            .cache
            .get()
            .is_some_and(|built| built.max_indexes_per_mark != max_indexes_per_mark)
        {
            self.cache.invalidate();
        }
        let marks_by_weight = &self.marks_by_weight;
        let uniform = self.uniform_distribution;
        &self
            .cache
            .get_or_update(|| BuiltMarks {
                max_indexes_per_mark,
                marks: build_marks(marks_by_weight, max_indexes_per_mark, uniform),
            })
            .marks
    }

    fn remove_marks_since(&mut self, since: usize) {
        if since == 0 {
            self.marks_by_weight.clear();
            return;
        }
        self.marks_by_weight.retain(|_, marks| {
            if marks.first().is_some_and(|first| since <= first.index) {
                return false;
            }
            let keep = marks.partition_point(|mark| mark.index < since);
            marks.truncate(keep);
            true
        });
    }
}

fn build_marks(
    marks_by_weight: &BTreeMap<u8, Vec<TickMark>>,
    max_indexes_per_mark: usize,
    uniform_distribution: bool,
) -> Vec<TickMark> {
    let mut marks: Vec<TickMark> = Vec::new();
    for current_weight in marks_by_weight.values().rev() {
        let prev_marks = std::mem::take(&mut marks);
        let mut prev_iter = prev_marks.iter().peekable();
        let mut right_index: Option<usize> = None;
        let mut left_index: Option<usize> = None;

        for mark in current_weight {
            let current = mark.index;
            while let Some(last) = prev_iter.peek() {
                if last.index < current {
                    marks.push((*last).clone());
                    left_index = Some(last.index);
                    right_index = None;
                    prev_iter.next();
                } else {
                    right_index = Some(last.index);
                    break;
                }
            }

            let fits_right =
                right_index.is_none_or(|right| right.saturating_sub(current) >= max_indexes_per_mark);
            let fits_left =
                left_index.is_none_or(|left| current.saturating_sub(left) >= max_indexes_per_mark);
            if fits_right && fits_left {
                marks.push(mark.clone());
                left_index = Some(current);
            } else if uniform_distribution {
                return prev_marks;
            }
        }
        marks.extend(prev_iter.cloned());
    }
    marks
}

#[cfg(test)]
mod tests {
    use super::TickMarks;
    use crate::core::{HorzTime, TimePoint};
    use crate::model::time_scale::TimeScalePoint;

    fn point(index: usize, weight: u8) -> TimeScalePoint {
        TimeScalePoint {
            index,
            time: TimePoint::from_timestamp(index as i64),
            time_weight: weight,
            original_time: HorzTime::Timestamp(index as i64),
        }
    }

    fn indexes(marks: &[super::TickMark]) -> Vec<usize> {
        marks.iter().map(|mark| mark.index).collect()
    }

    #[test]
    fn heavier_marks_anchor_before_lighter_ones() {
        let weights = [50, 50, 50, 60, 50, 50, 50, 50, 70, 50];
        let points: Vec<_> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| point(i, *w))
            .collect();
        let mut marks = TickMarks::default();
        marks.set_time_scale_points(&points, 0);

        assert_eq!(indexes(marks.build(10.0, 30.0)), vec![0, 3, 8]);
        assert_eq!(indexes(marks.build(10.0, 10.0)).len(), 10);
    }

    #[test]
    fn uniform_distribution_keeps_previous_level_on_conflict() {
        let weights = [50, 50, 50, 60, 50, 50, 50, 50, 70, 50];
        let points: Vec<_> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| point(i, *w))
            .collect();
        let mut marks = TickMarks::default();
        marks.set_uniform_distribution(true);
        marks.set_time_scale_points(&points, 0);

        assert_eq!(indexes(marks.build(10.0, 30.0)), vec![3, 8]);
    }

    #[test]
    fn replacing_tail_drops_stale_marks() {
        let points: Vec<_> = (0..6).map(|i| point(i, 50)).collect();
        let mut marks = TickMarks::default();
        marks.set_time_scale_points(&points, 0);

        let mut replaced = points[..3].to_vec();
        replaced.push(point(3, 70));
        marks.set_time_scale_points(&replaced, 3);

        let built = marks.build(1.0, 1.0).to_vec();
        assert_eq!(indexes(&built), vec![0, 1, 2, 3]);
        assert_eq!(built[3].weight, 70);
    }
}
