use std::ops::Range;

#[cfg(feature = "parallel-projection")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::{PriceFormatter, PriceScaleId, SeriesId};
use crate::error::{ChartError, ChartResult};

use super::data_source::PriceDataSource;
use super::invalidated::Invalidated;
use super::observer::{SubscriptionToken, Subscribers};
use super::options::PriceScaleOptions;
use super::price_range::PriceRange;
use super::price_tick_marks::{PriceMark, PriceMarkScale, PriceTickMarkBuilder};
use super::time_scale::StrictRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriceScaleMode {
    #[default]
    Normal,
    Logarithmic,
    Percentage,
    IndexedTo100,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceScaleState {
    pub auto_scale: bool,
    pub is_inverted: bool,
    pub mode: PriceScaleMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceScaleStateChange {
    pub auto_scale: Option<bool>,
    pub is_inverted: Option<bool>,
    pub mode: Option<PriceScaleMode>,
}

/// Emitted to mode observers as `(old, new)`.
pub type PriceScaleModeChange = (PriceScaleState, PriceScaleState);

/// Price with its computed y coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedValue {
    pub price: f64,
    pub y: f64,
}

/// OHLC prices with their computed y coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BarPrices {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub open_y: f64,
    pub high_y: f64,
    pub low_y: f64,
    pub close_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LogFormula {
    logical_offset: f64,
    coord_offset: f64,
}

impl Default for LogFormula {
    fn default() -> Self {
        Self {
            logical_offset: 4.0,
            coord_offset: 0.0001,
        }
    }
}

/// Formatting inputs taken from the scale's first attached source.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SourceFormat {
    formatter: PriceFormatter,
    min_move: f64,
}

#[derive(Debug, Clone)]
struct MarksCache {
    marks: Vec<PriceMark>,
    first_value_is_none: bool,
}

/// Vertical coordinate system of one price axis.
///
/// Sources are referenced by id; callers hand the attached sources in
/// whenever the scale needs their data.
#[derive(Debug)]
pub struct PriceScale {
    id: PriceScaleId,
    options: PriceScaleOptions,
    font_size: f64,
    height: f64,
    internal_height: Invalidated<f64>,
    price_range: Option<PriceRange>,
    price_range_snapshot: Option<PriceRange>,
    range_valid: bool,
    margin_above: f64,
    margin_below: f64,
    scale_start_point: Option<f64>,
    scroll_start_point: Option<f64>,
    log_formula: LogFormula,
    formatter: PriceFormatter,
    source_format: Option<SourceFormat>,
    mark_builder: PriceTickMarkBuilder,
    marks_cache: Invalidated<MarksCache>,
    data_sources: Vec<SeriesId>,
    first_value: Option<f64>,
    marks_changed: Subscribers<()>,
    mode_changed: Subscribers<PriceScaleModeChange>,
}

impl PriceScale {
    #[must_use]
    pub fn new(id: PriceScaleId, options: PriceScaleOptions, font_size: f64) -> Self {
        Self {
            id,
            options,
            font_size,
            height: 0.0,
            internal_height: Invalidated::stale(),
            price_range: None,
            price_range_snapshot: None,
            range_valid: false,
            margin_above: 0.0,
            margin_below: 0.0,
            scale_start_point: None,
            scroll_start_point: None,
            log_formula: LogFormula::default(),
            formatter: PriceFormatter::default(),
            source_format: None,
            mark_builder: PriceTickMarkBuilder::default(),
            marks_cache: Invalidated::stale(),
            data_sources: Vec::new(),
            first_value: None,
            marks_changed: Subscribers::default(),
            mode_changed: Subscribers::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &PriceScaleId {
        &self.id
    }

    #[must_use]
    pub fn options(&self) -> &PriceScaleOptions {
        &self.options
    }

    /// Validates margins before anything is stored; mode changes go through
    /// [`PriceScale::set_mode`] so ranges are converted between modes.
    pub fn apply_options(&mut self, options: PriceScaleOptions) -> ChartResult<()> {
        options.scale_margins.validate()?;
        let new_mode = options.mode;
        let old_mode = self.options.mode;
        self.options = PriceScaleOptions {
            mode: old_mode,
            ..options
        };
        if new_mode != old_mode {
            self.set_mode(PriceScaleStateChange {
                mode: Some(new_mode),
                ..PriceScaleStateChange::default()
            });
        }
        self.invalidate_internal_height();
        self.marks_cache.invalidate();
        debug!(scale = %self.id, mode = ?self.options.mode, "price scale options applied");
        Ok(())
    }

    #[must_use]
    pub fn is_auto_scale(&self) -> bool {
        self.options.auto_scale
    }

    #[must_use]
    pub fn is_log(&self) -> bool {
        self.options.mode == PriceScaleMode::Logarithmic
    }

    #[must_use]
    pub fn is_percentage(&self) -> bool {
        self.options.mode == PriceScaleMode::Percentage
    }

    #[must_use]
    pub fn is_indexed_to_100(&self) -> bool {
        self.options.mode == PriceScaleMode::IndexedTo100
    }

    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.options.invert_scale
    }

    #[must_use]
    pub fn mode(&self) -> PriceScaleState {
        PriceScaleState {
            auto_scale: self.options.auto_scale,
            is_inverted: self.options.invert_scale,
            mode: self.options.mode,
        }
    }

    pub fn set_mode(&mut self, change: PriceScaleStateChange) {
        let old_mode = self.mode();
        if let Some(auto_scale) = change.auto_scale {
            self.options.auto_scale = auto_scale;
        }
        if let Some(mode) = change.mode {
            self.options.mode = mode;
            if matches!(mode, PriceScaleMode::Percentage | PriceScaleMode::IndexedTo100) {
                self.options.auto_scale = true;
            }
            self.range_valid = false;
        }

        let new_mode = self.options.mode;
        if old_mode.mode == PriceScaleMode::Logarithmic && new_mode != old_mode.mode {
            match self.price_range.map(|range| convert_range_from_log(range, self.log_formula)) {
                Some(raw) if raw.min_value.is_finite() && raw.max_value.is_finite() => {
                    self.set_price_range(Some(raw), false);
                }
                _ => self.options.auto_scale = true,
            }
        }
        if new_mode == PriceScaleMode::Logarithmic && new_mode != old_mode.mode {
            if let Some(range) = self.price_range {
                self.set_price_range(Some(convert_range_to_log(range, self.log_formula)), false);
            }
        }

        if old_mode.mode != new_mode {
            self.rebuild_formatter();
        }
        if let Some(inverted) = change.is_inverted
            && inverted != old_mode.is_inverted
        {
            self.options.invert_scale = inverted;
            self.marks_cache.invalidate();
        }
        let new_state = self.mode();
        self.mode_changed.notify(&(old_mode, new_state));
    }

    pub fn subscribe_mode_changed(
        &mut self,
        handler: impl FnMut(&PriceScaleModeChange) + 'static,
    ) -> SubscriptionToken {
        self.mode_changed.subscribe(handler)
    }

    pub fn unsubscribe_mode_changed(&mut self, token: SubscriptionToken) -> bool {
        self.mode_changed.unsubscribe(token)
    }

    pub fn subscribe_marks_changed(&mut self, handler: impl FnMut(&()) + 'static) -> SubscriptionToken {
        self.marks_changed.subscribe(handler)
    }

    pub fn unsubscribe_marks_changed(&mut self, token: SubscriptionToken) -> bool {
        self.marks_changed.unsubscribe(token)
    }

    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn set_font_size(&mut self, font_size: f64) {
        if self.font_size != font_size {
            self.font_size = font_size;
            self.marks_cache.invalidate();
        }
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_height(&mut self, value: f64) {
        if self.height == value {
            return;
        }
        self.height = value;
        self.invalidate_internal_height();
        self.marks_cache.invalidate();
    }

    /// Height without the top and bottom margins.
    #[must_use]
    pub fn internal_height(&self) -> f64 {
        self.internal_height
            .get()
            .copied()
            .unwrap_or_else(|| self.compute_internal_height())
    }

    #[must_use]
    pub fn price_range(&self) -> Option<PriceRange> {
        self.price_range
    }

    /// Stores a range; unchanged ranges are ignored unless `force` is set.
    pub fn set_price_range(&mut self, range: Option<PriceRange>, force: bool) {
        let old = self.price_range;
        if !force && !(old.is_none() && range.is_some()) && (old.is_none() || old == range) {
            return;
        }
        self.marks_cache.invalidate();
        self.price_range = range;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.height == 0.0 || self.price_range.is_none_or(PriceRange::is_empty)
    }

    /// Whether the range must be recomputed before it is trusted.
    #[must_use]
    pub fn needs_range_recalculation(&self) -> bool {
        !self.range_valid
    }

    #[must_use]
    pub fn inverted_coordinate(&self, coordinate: f64) -> f64 {
        if self.is_inverted() {
            coordinate
        } else {
            self.height - 1.0 - coordinate
        }
    }

    #[must_use]
    pub fn price_to_coordinate(&self, price: f64, base_value: f64) -> f64 {
        let logical = match self.options.mode {
            PriceScaleMode::Percentage => to_percent(price, base_value),
            PriceScaleMode::IndexedTo100 => to_indexed_to_100(price, base_value),
            PriceScaleMode::Normal | PriceScaleMode::Logarithmic => price,
        };
        self.logical_to_coordinate(logical)
    }

    #[must_use]
    pub fn coordinate_to_price(&self, coordinate: f64, base_value: f64) -> f64 {
        let logical = self.coordinate_to_logical(coordinate);
        self.logical_to_price(logical, base_value)
    }

    #[must_use]
    pub fn logical_to_price(&self, logical: f64, base_value: f64) -> f64 {
        match self.options.mode {
            PriceScaleMode::Percentage => from_percent(logical, base_value),
            PriceScaleMode::IndexedTo100 => from_indexed_to_100(logical, base_value),
            PriceScaleMode::Normal | PriceScaleMode::Logarithmic => logical,
        }
    }

    /// Fills `y` for every point in `range` (all points when `None`); NaN
    /// prices are skipped.
    pub fn points_to_coordinates(
        &self,
        points: &mut [PricedValue],
        base_value: f64,
        range: Option<Range<usize>>,
    ) {
        let Some(transform) = self.batch_transform(base_value) else {
            return;
        };
        let range = range.unwrap_or(0..points.len());
        for point in &mut points[range] {
            if point.price.is_nan() {
                continue;
            }
            point.y = transform.apply(point.price);
        }
    }

    pub fn bar_prices_to_coordinates(
        &self,
        bars: &mut [BarPrices],
        base_value: f64,
        range: Option<Range<usize>>,
    ) {
        let Some(transform) = self.batch_transform(base_value) else {
            return;
        };
        let range = range.unwrap_or(0..bars.len());
        let bars = &mut bars[range];

        #[cfg(feature = "parallel-projection")]
        bars.par_iter_mut().for_each(|bar| transform.apply_bar(bar));

        #[cfg(not(feature = "parallel-projection"))]
        for bar in bars {
            transform.apply_bar(bar);
        }
    }

    #[must_use]
    pub fn data_sources(&self) -> &[SeriesId] {
        &self.data_sources
    }

    #[must_use]
    pub fn has_source(&self, id: SeriesId) -> bool {
        self.data_sources.contains(&id)
    }

    pub fn add_data_source(&mut self, source: &dyn PriceDataSource) {
        let id = source.source_id();
        if self.data_sources.contains(&id) {
            return;
        }
        self.data_sources.push(id);
        if self.data_sources.len() == 1 {
            self.update_formatter(Some(source));
        }
    }

    /// Detaches a source; `formatter_source` is the new first attached source.
    ///
    /// An emptied scale returns to autoscale with no range.
    pub fn remove_data_source(
        &mut self,
        id: SeriesId,
        formatter_source: Option<&dyn PriceDataSource>,
    ) -> ChartResult<()> {
        let index = self
            .data_sources
            .iter()
            .position(|source| *source == id)
            .ok_or(ChartError::UnknownSeries(id))?;
        self.data_sources.remove(index);
        if self.data_sources.is_empty() {
            self.set_mode(PriceScaleStateChange {
                auto_scale: Some(true),
                ..PriceScaleStateChange::default()
            });
            self.set_price_range(None, true);
        }
        self.update_formatter(formatter_source);
        Ok(())
    }

    /// Cached first value of the attached sources.
    #[must_use]
    pub fn first_value(&self) -> Option<f64> {
        self.first_value
    }

    /// Picks the value of the source whose first visible bar is earliest.
    pub fn update_first_value(
        &mut self,
        sources: &[&dyn PriceDataSource],
        visible_bars: Option<StrictRange>,
    ) {
        let first = sources
            .iter()
            .filter_map(|source| source.first_value(visible_bars))
            .reduce(|best, candidate| {
                if candidate.time_point.timestamp < best.time_point.timestamp {
                    candidate
                } else {
                    best
                }
            })
            .map(|first| first.value);
        if first.is_none() != self.first_value.is_none() {
            self.marks_cache.invalidate();
        }
        self.first_value = first;
    }

    /// Tick marks for the current range, rebuilt when invalidated.
    pub fn marks(&mut self) -> &[PriceMark] {
        let first_value_is_none = self.first_value.is_none();
        let reusable = self.marks_cache.get().is_some_and(|cache| {
            first_value_is_none || cache.first_value_is_none == first_value_is_none
        });
        if !reusable {
            let marks = self.mark_builder.build(&*self);
            self.marks_cache.set(MarksCache {
                marks,
                first_value_is_none,
            });
            self.marks_changed.notify(&());
        }
        self.marks_cache
            .get()
            .map_or(&[][..], |cache| cache.marks.as_slice())
    }

    pub fn start_scale(&mut self, x: f64) {
        if self.is_percentage() || self.is_indexed_to_100() {
            return;
        }
        if self.scale_start_point.is_some() || self.price_range_snapshot.is_some() {
            return;
        }
        if self.is_empty() {
            return;
        }
        self.scale_start_point = Some(self.height - x);
        self.price_range_snapshot = self.price_range;
    }

    pub fn scale_to(&mut self, x: f64) {
        if self.is_percentage() || self.is_indexed_to_100() {
            return;
        }
        let Some(scale_start) = self.scale_start_point else {
            return;
        };
        self.set_mode(PriceScaleStateChange {
            auto_scale: Some(false),
            ..PriceScaleStateChange::default()
        });
        let x = (self.height - x).max(0.0);
        let extra = (self.height - 1.0) * 0.2;
        let coeff = ((scale_start + extra) / (x + extra)).max(0.1);
        if let Some(mut range) = self.price_range_snapshot {
            range.scale_around_center(coeff);
            self.set_price_range(Some(range), false);
        }
    }

    pub fn end_scale(&mut self) {
        if self.is_percentage() || self.is_indexed_to_100() {
            return;
        }
        self.scale_start_point = None;
        self.price_range_snapshot = None;
    }

    pub fn start_scroll(&mut self, x: f64) {
        if self.is_auto_scale() {
            return;
        }
        if self.scroll_start_point.is_some() || self.price_range_snapshot.is_some() {
            return;
        }
        if self.is_empty() {
            return;
        }
        self.scroll_start_point = Some(x);
        self.price_range_snapshot = self.price_range;
    }

    pub fn scroll_to(&mut self, x: f64) {
        if self.is_auto_scale() {
            return;
        }
        let (Some(scroll_start), Some(current), Some(mut snapshot)) =
            (self.scroll_start_point, self.price_range, self.price_range_snapshot)
        else {
            return;
        };
        let price_units_per_pixel = current.length() / (self.internal_height() - 1.0);
        let mut pixel_delta = x - scroll_start;
        if self.is_inverted() {
            pixel_delta = -pixel_delta;
        }
        snapshot.shift(pixel_delta * price_units_per_pixel);
        self.set_price_range(Some(snapshot), true);
        self.marks_cache.invalidate();
    }

    pub fn end_scroll(&mut self) {
        if self.is_auto_scale() || self.scroll_start_point.is_none() {
            return;
        }
        self.scroll_start_point = None;
        self.price_range_snapshot = None;
    }

    #[must_use]
    pub fn formatter(&self) -> &PriceFormatter {
        &self.formatter
    }

    #[must_use]
    pub fn format_price(&self, price: f64, first_value: f64) -> String {
        match self.options.mode {
            PriceScaleMode::Percentage => {
                self.formatter.format(to_percent(price, first_value))
            }
            PriceScaleMode::IndexedTo100 => {
                self.formatter.format(to_indexed_to_100(price, first_value))
            }
            PriceScaleMode::Normal | PriceScaleMode::Logarithmic => self.formatter.format(price),
        }
    }

    #[must_use]
    pub fn format_logical(&self, logical: f64) -> String {
        self.formatter.format(logical)
    }

    #[must_use]
    pub fn format_price_percentage(&self, price: f64, base_value: f64) -> String {
        PriceFormatter::percentage().format(to_percent(price, base_value))
    }

    /// Recomputes the range from the sources over `visible_bars`.
    ///
    /// Sources are merged in the scale's mode space; a flat result is widened
    /// by five minimal moves on each side and an empty one defaults to
    /// `[-0.5, 0.5]`.
    pub fn recalculate_price_range(
        &mut self,
        visible_bars: StrictRange,
        sources: &[&dyn PriceDataSource],
    ) {
        let mut price_range: Option<PriceRange> = None;
        let mut margin_above: f64 = 0.0;
        let mut margin_below: f64 = 0.0;

        for source in sources {
            if !source.visible() {
                continue;
            }
            let Some(first_value) = source.first_value(Some(visible_bars)) else {
                continue;
            };
            let Some(info) = source.autoscale_info(visible_bars.left(), visible_bars.right())
            else {
                continue;
            };
            let Some(source_range) = info.price_range else {
                continue;
            };
            let source_range = match self.options.mode {
                PriceScaleMode::Logarithmic => convert_range_to_log(source_range, self.log_formula),
                PriceScaleMode::Percentage => PriceRange::new(
                    to_percent(source_range.min_value, first_value.value),
                    to_percent(source_range.max_value, first_value.value),
                ),
                PriceScaleMode::IndexedTo100 => PriceRange::new(
                    to_indexed_to_100(source_range.min_value, first_value.value),
                    to_indexed_to_100(source_range.max_value, first_value.value),
                ),
                PriceScaleMode::Normal => source_range,
            };
            price_range = PriceRange::merge_optional(price_range, Some(source_range));
            if let Some(margins) = info.margins {
                margin_above = margin_above.max(margins.above);
                // Below margin is compared against the above one.
                margin_below = margin_above.max(margins.below);
            }
        }

        if self.has_visible_edge_marks() {
            let padding = self.font_size / 2.0;
            margin_above = margin_above.max(padding);
            margin_below = margin_below.max(padding);
        }
        if margin_above != self.margin_above || margin_below != self.margin_below {
            self.margin_above = margin_above;
            self.margin_below = margin_below;
            self.marks_cache.invalidate();
            self.invalidate_internal_height();
        }

        match price_range {
            Some(mut range) => {
                if range.min_value == range.max_value {
                    let min_move = match self.data_sources.first() {
                        Some(first) if !self.is_percentage() && !self.is_indexed_to_100() => sources
                            .iter()
                            .find(|source| source.source_id() == *first)
                            .map_or(1.0, |source| source.min_move()),
                        _ => 1.0,
                    };
                    let extend = 5.0 * min_move;
                    if self.is_log() {
                        range = convert_range_from_log(range, self.log_formula);
                    }
                    range = PriceRange::new(range.min_value - extend, range.max_value + extend);
                    if self.is_log() {
                        range = convert_range_to_log(range, self.log_formula);
                    }
                }
                if self.is_log() {
                    let raw = convert_range_from_log(range, self.log_formula);
                    let new_formula = log_formula_for_price_range(Some(raw));
                    if new_formula != self.log_formula {
                        let raw_snapshot = self
                            .price_range_snapshot
                            .map(|snapshot| convert_range_from_log(snapshot, self.log_formula));
                        self.log_formula = new_formula;
                        range = convert_range_to_log(raw, new_formula);
                        self.price_range_snapshot =
                            raw_snapshot.map(|snapshot| convert_range_to_log(snapshot, new_formula));
                    }
                }
                self.set_price_range(Some(range), false);
            }
            None => {
                if self.price_range.is_none() {
                    self.set_price_range(Some(PriceRange::new(-0.5, 0.5)), false);
                    self.log_formula = log_formula_for_price_range(None);
                }
            }
        }
        self.range_valid = true;
        trace!(scale = %self.id, range = ?self.price_range, "price range recalculated");
    }

    /// Remembers the formatter source and rebuilds the formatter and the
    /// tick base from it. Later mode changes reuse the remembered source.
    pub fn update_formatter(&mut self, formatter_source: Option<&dyn PriceDataSource>) {
        self.source_format = formatter_source.map(|source| SourceFormat {
            formatter: *source.formatter(),
            min_move: source.min_move(),
        });
        self.rebuild_formatter();
    }

    fn rebuild_formatter(&mut self) {
        self.marks_cache.invalidate();
        let (formatter, base) = match self.options.mode {
            PriceScaleMode::Percentage => (PriceFormatter::percentage(), 100.0),
            PriceScaleMode::IndexedTo100 => (PriceFormatter::default(), 100.0),
            PriceScaleMode::Normal | PriceScaleMode::Logarithmic => match self.source_format {
                Some(source) => (source.formatter, (1.0 / source.min_move).round()),
                None => (PriceFormatter::default(), 100.0),
            },
        };
        self.formatter = formatter;
        self.mark_builder = PriceTickMarkBuilder::new(base);
    }

    fn has_visible_edge_marks(&self) -> bool {
        self.options.ensure_edge_tick_marks_visible && self.options.auto_scale
    }

    fn compute_internal_height(&self) -> f64 {
        self.height - self.top_margin_px() - self.bottom_margin_px()
    }

    fn invalidate_internal_height(&mut self) {
        self.internal_height.invalidate();
        let height = self.compute_internal_height();
        self.internal_height.set(height);
    }

    fn top_margin_px(&self) -> f64 {
        let margins = self.options.scale_margins;
        if self.is_inverted() {
            margins.bottom * self.height + self.margin_below
        } else {
            margins.top * self.height + self.margin_above
        }
    }

    fn bottom_margin_px(&self) -> f64 {
        let margins = self.options.scale_margins;
        if self.is_inverted() {
            margins.top * self.height + self.margin_above
        } else {
            margins.bottom * self.height + self.margin_below
        }
    }

    fn logical_to_coordinate(&self, logical: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let Some(range) = self.price_range else {
            return 0.0;
        };
        let logical = if self.is_log() && logical != 0.0 {
            to_log(logical, self.log_formula)
        } else {
            logical
        };
        let inv_coordinate = self.bottom_margin_px()
            + (self.internal_height() - 1.0) * (logical - range.min_value) / range.length();
        self.inverted_coordinate(inv_coordinate)
    }

    fn coordinate_to_logical(&self, coordinate: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let Some(range) = self.price_range else {
            return 0.0;
        };
        let inv_coordinate = self.inverted_coordinate(coordinate);
        let logical = range.min_value
            + range.length()
                * ((inv_coordinate - self.bottom_margin_px()) / (self.internal_height() - 1.0));
        if self.is_log() {
            from_log(logical, self.log_formula)
        } else {
            logical
        }
    }

    fn batch_transform(&self, base_value: f64) -> Option<BatchTransform> {
        let range = self.price_range?;
        Some(BatchTransform {
            mode: self.options.mode,
            log_formula: self.log_formula,
            base_value,
            bottom: self.bottom_margin_px(),
            min: range.min_value,
            pixels_per_unit: (self.internal_height() - 1.0) / range.length(),
            height: self.height,
            inverted: self.is_inverted(),
        })
    }
}

/// Same mapping as `price_to_coordinate`, hoisted out of per-point loops.
struct BatchTransform {
    mode: PriceScaleMode,
    log_formula: LogFormula,
    base_value: f64,
    bottom: f64,
    min: f64,
    pixels_per_unit: f64,
    height: f64,
    inverted: bool,
}

impl BatchTransform {
    fn apply(&self, price: f64) -> f64 {
        let logical = match self.mode {
            PriceScaleMode::Percentage => to_percent(price, self.base_value),
            PriceScaleMode::IndexedTo100 => to_indexed_to_100(price, self.base_value),
            PriceScaleMode::Logarithmic => to_log(price, self.log_formula),
            PriceScaleMode::Normal => price,
        };
        let inv_coordinate = self.bottom + self.pixels_per_unit * (logical - self.min);
        if self.inverted {
            inv_coordinate
        } else {
            self.height - 1.0 - inv_coordinate
        }
    }

    fn apply_bar(&self, bar: &mut BarPrices) {
        bar.open_y = self.apply(bar.open);
        bar.high_y = self.apply(bar.high);
        bar.low_y = self.apply(bar.low);
        bar.close_y = self.apply(bar.close);
    }
}

impl PriceMarkScale for PriceScale {
    fn height(&self) -> f64 {
        self.height
    }

    fn font_size(&self) -> f64 {
        self.font_size
    }

    fn first_value(&self) -> Option<f64> {
        self.first_value
    }

    fn entire_text_only(&self) -> bool {
        self.options.entire_text_only
    }

    fn is_log(&self) -> bool {
        PriceScale::is_log(self)
    }

    fn coordinate_to_logical(&self, coordinate: f64, _base_value: f64) -> f64 {
        PriceScale::coordinate_to_logical(self, coordinate)
    }

    fn logical_to_coordinate(&self, logical: f64, _base_value: f64) -> f64 {
        PriceScale::logical_to_coordinate(self, logical)
    }

    fn format_logical(&self, logical: f64) -> String {
        PriceScale::format_logical(self, logical)
    }
}

fn from_percent(value: f64, base_value: f64) -> f64 {
    let value = if base_value < 0.0 { -value } else { value };
    (value / 100.0) * base_value + base_value
}

fn to_percent(value: f64, base_value: f64) -> f64 {
    let result = 100.0 * (value - base_value) / base_value;
    if base_value < 0.0 { -result } else { result }
}

fn from_indexed_to_100(value: f64, base_value: f64) -> f64 {
    let value = value - 100.0;
    let value = if base_value < 0.0 { -value } else { value };
    (value / 100.0) * base_value + base_value
}

fn to_indexed_to_100(value: f64, base_value: f64) -> f64 {
    let result = 100.0 * (value - base_value) / base_value + 100.0;
    if base_value < 0.0 { -result } else { result }
}

fn to_log(price: f64, formula: LogFormula) -> f64 {
    let magnitude = price.abs();
    if magnitude < 1e-15 {
        return 0.0;
    }
    let value = (magnitude + formula.coord_offset).log10() + formula.logical_offset;
    if price < 0.0 { -value } else { value }
}

fn from_log(logical: f64, formula: LogFormula) -> f64 {
    let magnitude = logical.abs();
    if magnitude < 1e-15 {
        return 0.0;
    }
    let value = 10f64.powf(magnitude - formula.logical_offset) - formula.coord_offset;
    if logical < 0.0 { -value } else { value }
}

fn convert_range_to_log(range: PriceRange, formula: LogFormula) -> PriceRange {
    PriceRange::new(to_log(range.min_value, formula), to_log(range.max_value, formula))
}

fn convert_range_from_log(range: PriceRange, formula: LogFormula) -> PriceRange {
    PriceRange::new(from_log(range.min_value, formula), from_log(range.max_value, formula))
}

/// Adds digits to the log offset for sub-unit ranges.
fn log_formula_for_price_range(range: Option<PriceRange>) -> LogFormula {
    let default = LogFormula::default();
    let Some(range) = range else {
        return default;
    };
    let diff = (range.max_value - range.min_value).abs();
    if !(1e-15..1.0).contains(&diff) {
        return default;
    }
    let digits = diff.log10().abs().ceil();
    let logical_offset = default.logical_offset + digits;
    LogFormula {
        logical_offset,
        coord_offset: 1.0 / 10f64.powf(logical_offset),
    }
}
