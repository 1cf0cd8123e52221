use tracing::trace;

use crate::core::{HorzTime, TimePoint};
use crate::error::{ChartError, ChartResult};

use super::horz_scale_behavior::HorzScaleBehavior;
use super::invalidated::Invalidated;
use super::kinetic_animation::{LinearAnimation, TimeScaleAnimation};
use super::observer::{SubscriptionToken, Subscribers};
use super::options::TimeScaleOptions;
use super::tick_marks::TickMarks;

/// Logical bar index; may lie outside the range of existing points.
pub type TimePointIndex = i64;

const MIN_VISIBLE_BARS_COUNT: f64 = 2.0;
const DEFAULT_TICK_MARK_MAX_CHARACTER_LENGTH: usize = 8;
pub const DEFAULT_ANIMATION_DURATION_MS: f64 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalRange {
    pub from: f64,
    pub to: f64,
}

impl LogicalRange {
    #[must_use]
    pub const fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub fn count(self) -> f64 {
        self.to - self.from + 1.0
    }
}

/// Inclusive integer bar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrictRange {
    left: TimePointIndex,
    right: TimePointIndex,
}

impl StrictRange {
    #[must_use]
    pub fn new(left: TimePointIndex, right: TimePointIndex) -> Self {
        debug_assert!(left <= right, "right should be >= left");
        Self { left, right }
    }

    #[must_use]
    pub fn left(self) -> TimePointIndex {
        self.left
    }

    #[must_use]
    pub fn right(self) -> TimePointIndex {
        self.right
    }

    #[must_use]
    pub fn count(self) -> f64 {
        (self.right - self.left + 1) as f64
    }

    #[must_use]
    pub fn contains(self, index: TimePointIndex) -> bool {
        self.left <= index && index <= self.right
    }
}

/// One entry of the shared, key-sorted timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeScalePoint {
    pub index: usize,
    pub time: TimePoint,
    pub time_weight: u8,
    pub original_time: HorzTime,
}

/// Label placed on the time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMark {
    pub coord: f64,
    pub label: String,
    pub weight: u8,
    pub need_align_coordinate: bool,
}

/// Item that carries a bar index and receives an x coordinate.
pub trait BarCoordinate {
    fn bar_index(&self) -> TimePointIndex;
    fn set_x(&mut self, x: f64);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TransitionState {
    bar_spacing: f64,
    right_offset: f64,
}

/// Horizontal coordinate system shared by every pane.
///
/// Mutators only touch the scale itself; callers that own panes are
/// responsible for recalculating them afterwards.
#[derive(Debug)]
pub struct TimeScale {
    options: TimeScaleOptions,
    width: f64,
    base_index: Option<TimePointIndex>,
    right_offset: f64,
    bar_spacing: f64,
    points: Vec<TimeScalePoint>,
    tick_marks: TickMarks,
    scroll_start_point: Option<f64>,
    scale_start_point: Option<f64>,
    common_transition_start_state: Option<TransitionState>,
    visible_range: Invalidated<Option<LogicalRange>>,
    last_visible_range: Option<LogicalRange>,
    time_marks: Invalidated<Vec<TimeMark>>,
    visible_bars_changed: Subscribers<Option<StrictRange>>,
    logical_range_changed: Subscribers<Option<LogicalRange>>,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(TimeScaleOptions::default())
    }
}

impl TimeScale {
    #[must_use]
    pub fn new(options: TimeScaleOptions) -> Self {
        let mut tick_marks = TickMarks::default();
        tick_marks.set_uniform_distribution(options.uniform_distribution);
        Self {
            width: 0.0,
            base_index: None,
            right_offset: options.right_offset,
            bar_spacing: options.bar_spacing,
            points: Vec::new(),
            tick_marks,
            scroll_start_point: None,
            scale_start_point: None,
            common_transition_start_state: None,
            visible_range: Invalidated::stale(),
            last_visible_range: None,
            time_marks: Invalidated::stale(),
            visible_bars_changed: Subscribers::default(),
            logical_range_changed: Subscribers::default(),
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &TimeScaleOptions {
        &self.options
    }

    /// Stores new options and re-applies the edge constraints.
    ///
    /// Spacing and offset changes are applied by the caller through
    /// [`TimeScale::set_bar_spacing`] and [`TimeScale::set_right_offset`].
    pub fn apply_options(&mut self, options: TimeScaleOptions) -> ChartResult<()> {
        options.validate()?;
        self.tick_marks
            .set_uniform_distribution(options.uniform_distribution);
        self.options = options;
        if self.options.fix_left_edge {
            self.do_fix_left_edge();
        }
        if self.options.fix_right_edge {
            self.correct_offset();
            self.correct_bar_spacing();
        }
        self.time_marks.invalidate();
        Ok(())
    }

    pub fn subscribe_visible_bars_changed(
        &mut self,
        handler: impl FnMut(&Option<StrictRange>) + 'static,
    ) -> SubscriptionToken {
        self.visible_bars_changed.subscribe(handler)
    }

    pub fn unsubscribe_visible_bars_changed(&mut self, token: SubscriptionToken) -> bool {
        self.visible_bars_changed.unsubscribe(token)
    }

    pub fn subscribe_logical_range_changed(
        &mut self,
        handler: impl FnMut(&Option<LogicalRange>) + 'static,
    ) -> SubscriptionToken {
        self.logical_range_changed.subscribe(handler)
    }

    pub fn unsubscribe_logical_range_changed(&mut self, token: SubscriptionToken) -> bool {
        self.logical_range_changed.unsubscribe(token)
    }

    #[must_use]
    pub fn points(&self) -> &[TimeScalePoint] {
        &self.points
    }

    #[must_use]
    pub fn index_to_time(&self, index: usize) -> Option<TimePoint> {
        self.points.get(index).map(|point| point.time)
    }

    #[must_use]
    pub fn index_to_time_scale_point(&self, index: usize) -> Option<&TimeScalePoint> {
        self.points.get(index)
    }

    /// Index of the point with the given time.
    ///
    /// With `find_nearest`, a missing time resolves to the next point on the
    /// right, or to the last point when the time is past the end.
    #[must_use]
    pub fn time_to_index(
        &self,
        behavior: &dyn HorzScaleBehavior,
        time: &TimePoint,
        find_nearest: bool,
    ) -> Option<usize> {
        let last = self.points.last()?;
        let key = behavior.key(time);
        if key > behavior.key(&last.time) {
            return find_nearest.then(|| self.points.len() - 1);
        }
        let index = self
            .points
            .partition_point(|point| behavior.key(&point.time) < key);
        if key < behavior.key(&self.points[index].time) {
            return find_nearest.then_some(index);
        }
        Some(index)
    }

    #[must_use]
    pub fn logical_range_for_time_range(
        &self,
        behavior: &dyn HorzScaleBehavior,
        from: &TimePoint,
        to: &TimePoint,
    ) -> Option<LogicalRange> {
        Some(LogicalRange::new(
            self.time_to_index(behavior, from, true)? as f64,
            self.time_to_index(behavior, to, true)? as f64,
        ))
    }

    #[must_use]
    pub fn format_date_time(
        &self,
        behavior: &dyn HorzScaleBehavior,
        point: &TimeScalePoint,
    ) -> String {
        behavior.format_horz_item(&point.time)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.points.is_empty() || self.base_index.is_none()
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Resizes the scale; non-finite or non-positive widths are ignored.
    pub fn set_width(&mut self, new_width: f64) {
        if !new_width.is_finite() || new_width <= 0.0 || self.width == new_width {
            return;
        }
        let previous_visible_range = self.visible_logical_range();
        let old_width = self.width;
        self.width = new_width;
        self.visible_range.invalidate();

        if self.options.lock_visible_time_range_on_resize && old_width != 0.0 {
            self.bar_spacing = self.bar_spacing * new_width / old_width;
        }

        // Keep the left edge pinned instead of the right one; otherwise the
        // first bar would shake while the price axis width settles.
        if self.options.fix_left_edge
            && let Some(range) = previous_visible_range
            && range.from <= 0.0
        {
            let delta = old_width - new_width;
            self.right_offset -= (delta / self.bar_spacing).round() + 1.0;
            self.visible_range.invalidate();
        }

        self.correct_bar_spacing();
        self.correct_offset();
    }

    #[must_use]
    pub fn base_index(&self) -> TimePointIndex {
        self.base_index.unwrap_or(0)
    }

    pub fn set_base_index(&mut self, base_index: Option<TimePointIndex>) {
        self.visible_range.invalidate();
        self.base_index = base_index;
        self.correct_offset();
        self.do_fix_left_edge();
    }

    /// Replaces the timeline; marks are rebuilt from `first_changed` onwards.
    pub fn update(&mut self, points: Vec<TimeScalePoint>, first_changed: usize) {
        self.visible_range.invalidate();
        self.tick_marks
            .set_time_scale_points(&points, first_changed);
        self.points = points;
        self.correct_offset();
    }

    #[must_use]
    pub fn right_offset(&self) -> f64 {
        self.right_offset
    }

    pub fn set_right_offset(&mut self, offset: f64) -> ChartResult<()> {
        if !offset.is_finite() {
            return Err(ChartError::InvalidOptions(format!(
                "right offset must be finite, given={offset}"
            )));
        }
        self.visible_range.invalidate();
        self.right_offset = offset;
        self.correct_offset();
        Ok(())
    }

    #[must_use]
    pub fn bar_spacing(&self) -> f64 {
        self.bar_spacing
    }

    pub fn set_bar_spacing(&mut self, spacing: f64) -> ChartResult<()> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(ChartError::InvalidOptions(format!(
                "bar spacing must be finite and > 0, given={spacing}"
            )));
        }
        self.apply_bar_spacing(spacing);
        self.correct_offset();
        Ok(())
    }

    pub fn restore_default(&mut self) -> ChartResult<()> {
        self.visible_range.invalidate();
        self.set_bar_spacing(self.options.bar_spacing)?;
        self.set_right_offset(self.options.right_offset)
    }

    /// Fits `range` (inclusive, in bar units) into the current width.
    pub fn set_visible_range(&mut self, range: LogicalRange) -> ChartResult<()> {
        let count = range.count();
        if !count.is_finite() || count <= 0.0 {
            return Err(ChartError::InvalidOptions(format!(
                "visible range must be non-empty, given={}..{}",
                range.from, range.to
            )));
        }
        self.apply_bar_spacing(self.width / count);
        self.right_offset = range.to - self.base_index() as f64;
        self.correct_offset();
        self.visible_range.invalidate();
        Ok(())
    }

    pub fn set_logical_range(&mut self, range: LogicalRange) -> ChartResult<()> {
        self.set_visible_range(range)
    }

    pub fn fit_content(&mut self) -> ChartResult<()> {
        if self.points.is_empty() {
            return Ok(());
        }
        let last = (self.points.len() - 1) as f64;
        self.set_visible_range(LogicalRange::new(0.0, last + self.options.right_offset))
    }

    #[must_use]
    pub fn index_to_coordinate(&self, index: TimePointIndex) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.index_to_coordinate_unchecked(index as f64)
    }

    /// Batch form of [`TimeScale::index_to_coordinate`] over `items[range]`.
    pub fn indexes_to_coordinates<T: BarCoordinate>(
        &self,
        items: &mut [T],
        range: Option<std::ops::Range<usize>>,
    ) {
        let range = range.unwrap_or(0..items.len());
        for item in &mut items[range] {
            let x = self.index_to_coordinate_unchecked(item.bar_index() as f64);
            item.set_x(x);
        }
    }

    #[must_use]
    pub fn coordinate_to_index(&self, x: f64) -> TimePointIndex {
        self.coordinate_to_float_index(x).ceil() as TimePointIndex
    }

    #[must_use]
    pub fn coordinate_to_float_index(&self, x: f64) -> f64 {
        let delta_from_right = (self.width - 1.0 - x) / self.bar_spacing;
        let index = self.base_index() as f64 + self.right_offset - delta_from_right;
        // Six digits are enough to hide float jitter without losing bars.
        (index * 1_000_000.0).round() / 1_000_000.0
    }

    /// Changes the spacing by `scale` tenths around `zoom_point`.
    pub fn zoom(&mut self, zoom_point: f64, scale: f64) -> ChartResult<()> {
        let index_at_zoom_point = self.coordinate_to_float_index(zoom_point);
        let spacing = self.bar_spacing;
        self.set_bar_spacing(spacing + scale * (spacing / 10.0))?;
        if !self.options.right_bar_stays_on_scroll {
            let shift = index_at_zoom_point - self.coordinate_to_float_index(zoom_point);
            self.set_right_offset(self.right_offset + shift)?;
        }
        Ok(())
    }

    pub fn start_scale(&mut self, x: f64) {
        if self.scroll_start_point.is_some() {
            self.end_scroll();
        }
        if self.scale_start_point.is_some()
            || self.common_transition_start_state.is_some()
            || self.is_empty()
        {
            return;
        }
        self.scale_start_point = Some(x);
        self.save_common_transition_start_state();
    }

    pub fn scale_to(&mut self, x: f64) -> ChartResult<()> {
        let (Some(start_state), Some(scale_start)) =
            (self.common_transition_start_state, self.scale_start_point)
        else {
            return Ok(());
        };
        let start_length_from_right = (self.width - x).clamp(0.0, self.width);
        let current_length_from_right = (self.width - scale_start).clamp(0.0, self.width);
        if start_length_from_right == 0.0 || current_length_from_right == 0.0 {
            return Ok(());
        }
        self.set_bar_spacing(
            start_state.bar_spacing * start_length_from_right / current_length_from_right,
        )
    }

    pub fn end_scale(&mut self) {
        if self.scale_start_point.take().is_some() {
            self.common_transition_start_state = None;
        }
    }

    pub fn start_scroll(&mut self, x: f64) {
        if self.scroll_start_point.is_some()
            || self.common_transition_start_state.is_some()
            || self.is_empty()
        {
            return;
        }
        self.scroll_start_point = Some(x);
        self.save_common_transition_start_state();
    }

    pub fn scroll_to(&mut self, x: f64) {
        let (Some(scroll_start), Some(start_state)) =
            (self.scroll_start_point, self.common_transition_start_state)
        else {
            return;
        };
        let shift_in_logical = (scroll_start - x) / self.bar_spacing;
        self.right_offset = start_state.right_offset + shift_in_logical;
        self.visible_range.invalidate();
        self.correct_offset();
    }

    pub fn end_scroll(&mut self) {
        if self.scroll_start_point.take().is_some() {
            self.common_transition_start_state = None;
        }
    }

    /// Builds an animation moving the right offset to `offset`.
    pub fn scroll_to_offset_animated(
        &self,
        offset: f64,
        duration_ms: f64,
        now: f64,
    ) -> ChartResult<TimeScaleAnimation> {
        if !offset.is_finite() {
            return Err(ChartError::InvalidAnimation(
                "offset is required and must be finite number".to_owned(),
            ));
        }
        if !duration_ms.is_finite() || duration_ms <= 0.0 {
            return Err(ChartError::InvalidAnimation(
                "animation duration must be finite positive number".to_owned(),
            ));
        }
        Ok(TimeScaleAnimation::Linear(LinearAnimation {
            from: self.right_offset,
            to: offset,
            start_time: now,
            duration: duration_ms,
        }))
    }

    pub fn scroll_to_real_time(&self, now: f64) -> ChartResult<TimeScaleAnimation> {
        self.scroll_to_offset_animated(self.options.right_offset, DEFAULT_ANIMATION_DURATION_MS, now)
    }

    pub fn visible_logical_range(&mut self) -> Option<LogicalRange> {
        self.update_visible_range();
        self.last_visible_range
    }

    pub fn visible_strict_range(&mut self) -> Option<StrictRange> {
        self.visible_logical_range().map(strict_range_of)
    }

    /// Tick labels for the visible range, cached until the range or spacing
    /// changes.
    pub fn marks(
        &mut self,
        behavior: &dyn HorzScaleBehavior,
        font_size: f64,
        interaction_disabled: bool,
    ) -> Option<&[TimeMark]> {
        if self.is_empty() {
            return None;
        }
        let visible = self.visible_strict_range()?;
        if !self.time_marks.is_fresh() {
            let marks = self.build_marks(behavior, font_size, interaction_disabled, visible);
            self.time_marks.set(marks);
        }
        self.time_marks.get().map(Vec::as_slice)
    }

    fn build_marks(
        &mut self,
        behavior: &dyn HorzScaleBehavior,
        font_size: f64,
        interaction_disabled: bool,
        visible: StrictRange,
    ) -> Vec<TimeMark> {
        let spacing = self.bar_spacing;
        let pixels_per_character =
            (font_size + 4.0) * 5.0 / DEFAULT_TICK_MARK_MAX_CHARACTER_LENGTH as f64;
        let max_characters = self
            .options
            .tick_mark_max_character_length
            .filter(|length| *length > 0)
            .unwrap_or(DEFAULT_TICK_MARK_MAX_CHARACTER_LENGTH);
        let max_label_width = pixels_per_character * max_characters as f64;
        let index_per_label = (max_label_width / spacing).round() as TimePointIndex;

        let first_bar = visible.left().max(visible.left() - index_per_label);
        let last_bar = visible.right().max(visible.right() - index_per_label);
        let earliest_index_of_second_label = index_per_label;
        let index_of_second_last_label = self.points.len() as TimePointIndex - 1 - index_per_label;
        let left_edge_fixed = self.options.fix_left_edge || interaction_disabled;
        let right_edge_fixed = self.options.fix_right_edge || interaction_disabled;
        let align_disabled = spacing > max_label_width / 2.0 && !interaction_disabled;

        let items = self.tick_marks.build(spacing, max_label_width).to_vec();
        let marks: Vec<TimeMark> = items
            .iter()
            .filter(|mark| {
                let index = mark.index as TimePointIndex;
                first_bar <= index && index <= last_bar
            })
            .map(|mark| {
                let index = mark.index as TimePointIndex;
                let need_align_coordinate = !align_disabled
                    && ((left_edge_fixed && index <= earliest_index_of_second_label)
                        || (right_edge_fixed && index >= index_of_second_last_label));
                TimeMark {
                    coord: self.index_to_coordinate(index),
                    label: behavior.format_tick_mark(mark),
                    weight: mark.weight,
                    need_align_coordinate,
                }
            })
            .collect();
        trace!(count = marks.len(), spacing, "rebuilt time marks");
        marks
    }

    fn index_to_coordinate_unchecked(&self, index: f64) -> f64 {
        let delta_from_right = self.base_index() as f64 + self.right_offset - index;
        self.width - (delta_from_right + 0.5) * self.bar_spacing - 1.0
    }

    fn apply_bar_spacing(&mut self, spacing: f64) {
        let old_spacing = self.bar_spacing;
        self.bar_spacing = spacing;
        self.correct_bar_spacing();
        if old_spacing != self.bar_spacing {
            self.visible_range.invalidate();
            self.time_marks.invalidate();
        }
    }

    fn update_visible_range(&mut self) {
        if self.visible_range.is_fresh() {
            return;
        }
        let range = if self.is_empty() {
            None
        } else {
            let bars_length = self.width / self.bar_spacing;
            let right_border = self.right_offset + self.base_index() as f64;
            Some(LogicalRange::new(
                right_border - bars_length + 1.0,
                right_border,
            ))
        };
        self.visible_range.set(range);

        let old = self.last_visible_range;
        self.last_visible_range = range;
        let new_strict = range.map(strict_range_of);
        if old.map(strict_range_of) != new_strict {
            self.visible_bars_changed.notify(&new_strict);
        }
        if old != range {
            self.logical_range_changed.notify(&range);
        }
        self.time_marks.invalidate();
    }

    fn correct_bar_spacing(&mut self) {
        let min_spacing = self.min_bar_spacing();
        if self.bar_spacing < min_spacing {
            self.bar_spacing = min_spacing;
            self.visible_range.invalidate();
        }
        if self.width != 0.0 {
            let max_spacing = self.width * 0.5;
            if self.bar_spacing > max_spacing {
                self.bar_spacing = max_spacing;
                self.visible_range.invalidate();
            }
        }
    }

    fn min_bar_spacing(&self) -> f64 {
        if self.options.fix_left_edge && self.options.fix_right_edge && !self.points.is_empty() {
            return self.width / self.points.len() as f64;
        }
        self.options.min_bar_spacing
    }

    fn correct_offset(&mut self) {
        let max_right_offset = self.max_right_offset();
        if self.right_offset > max_right_offset {
            self.right_offset = max_right_offset;
            self.visible_range.invalidate();
        }
        if let Some(min_right_offset) = self.min_right_offset()
            && self.right_offset < min_right_offset
        {
            self.right_offset = min_right_offset;
            self.visible_range.invalidate();
        }
    }

    fn min_right_offset(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        let base_index = self.base_index?;
        let bars_estimation = if self.options.fix_left_edge {
            self.width / self.bar_spacing
        } else {
            MIN_VISIBLE_BARS_COUNT.min(self.points.len() as f64)
        };
        Some(-(base_index as f64) - 1.0 + bars_estimation)
    }

    fn max_right_offset(&self) -> f64 {
        if self.options.fix_right_edge {
            0.0
        } else {
            self.width / self.bar_spacing - MIN_VISIBLE_BARS_COUNT.min(self.points.len() as f64)
        }
    }

    fn do_fix_left_edge(&mut self) {
        if !self.options.fix_left_edge || self.points.is_empty() {
            return;
        }
        let Some(visible) = self.visible_strict_range() else {
            return;
        };
        let delta = visible.left();
        if delta < 0 {
            self.visible_range.invalidate();
            self.right_offset -= delta as f64 + 1.0;
            self.correct_offset();
        }
        self.correct_bar_spacing();
    }

    fn save_common_transition_start_state(&mut self) {
        self.common_transition_start_state = Some(TransitionState {
            bar_spacing: self.bar_spacing,
            right_offset: self.right_offset,
        });
    }
}

fn strict_range_of(range: LogicalRange) -> StrictRange {
    StrictRange::new(
        range.from.floor() as TimePointIndex,
        range.to.ceil() as TimePointIndex,
    )
}
