use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::core::{PaneId, PriceScaleId, SeriesId, TimePoint};
use crate::error::{ChartError, ChartResult};

use super::crosshair::Crosshair;
use super::data_layer::{DataLayer, DataUpdateResponse, SeriesDataItem};
use super::data_source::PriceDataSource;
use super::horz_scale_behavior::{HorzScaleBehavior, TimeBehavior};
use super::invalidate_mask::{
    InvalidateMask, InvalidationLevel, PaneInvalidation, TimeScaleInvalidation,
};
use super::kinetic_animation::TimeScaleAnimation;
use super::observer::{SubscriptionToken, Subscribers};
use super::options::{ChartOptions, PriceScaleOptions, SeriesOptions};
use super::pane::{DEFAULT_STRETCH_FACTOR, Pane, SeriesArena};
use super::price_scale::PriceScale;
use super::price_tick_marks::PriceMark;
use super::series::{AutoscaleInfoProvider, LastValueData, Series};
use super::time_scale::{LogicalRange, TimeMark, TimePointIndex, TimeScale, TimeScalePoint};

/// Payload of the crosshair-moved notification.
#[derive(Debug, Clone, Default)]
pub struct CrosshairMoveEvent {
    pub logical: Option<TimePointIndex>,
    pub time: Option<TimePoint>,
    pub point: Option<(f64, f64)>,
    pub pane: Option<PaneId>,
    /// Close of every series that has a row at `logical`.
    pub series_prices: IndexMap<SeriesId, f64>,
}

/// Owner of every chart entity.
///
/// Panes and series live in arenas addressed by id; all mutators queue an
/// [`InvalidateMask`] that the frame loop consumes.
#[derive(Debug)]
pub struct ChartModel {
    options: ChartOptions,
    behavior: Box<dyn HorzScaleBehavior>,
    time_scale: TimeScale,
    panes: Vec<Pane>,
    series: SeriesArena,
    data_layer: DataLayer,
    crosshair: Crosshair,
    next_pane_id: u32,
    next_series_id: u32,
    pending_invalidation: Option<InvalidateMask>,
    crosshair_moved: Subscribers<CrosshairMoveEvent>,
}

impl ChartModel {
    pub fn new(options: ChartOptions) -> ChartResult<Self> {
        Self::with_behavior(options, Box::new(TimeBehavior::default()))
    }

    /// Builds a model over a custom horizontal scale.
    pub fn with_behavior(
        options: ChartOptions,
        mut behavior: Box<dyn HorzScaleBehavior>,
    ) -> ChartResult<Self> {
        options.validate()?;
        behavior.apply_options(&options.time_scale);
        let mut time_scale = TimeScale::new(options.time_scale.clone());
        time_scale.set_width(f64::from(options.width));
        let mut model = Self {
            crosshair: Crosshair::new(options.crosshair.clone()),
            behavior,
            time_scale,
            panes: Vec::new(),
            series: SeriesArena::new(),
            data_layer: DataLayer::default(),
            next_pane_id: 0,
            next_series_id: 0,
            pending_invalidation: None,
            crosshair_moved: Subscribers::default(),
            options,
        };
        model.create_pane(None);
        model.pending_invalidation = Some(InvalidateMask::full());
        Ok(model)
    }

    #[must_use]
    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// Validates and applies chart-wide options.
    pub fn apply_options(&mut self, options: ChartOptions) -> ChartResult<()> {
        options.validate()?;
        self.time_scale.apply_options(options.time_scale.clone())?;
        let mut mask = InvalidateMask::full();
        if options.time_scale.bar_spacing != self.options.time_scale.bar_spacing {
            mask.set_bar_spacing(options.time_scale.bar_spacing);
        }
        if options.time_scale.right_offset != self.options.time_scale.right_offset {
            mask.set_right_offset(options.time_scale.right_offset);
        }
        self.behavior.apply_options(&options.time_scale);
        self.crosshair.apply_options(options.crosshair.clone());

        let visible = self.time_scale.visible_strict_range();
        let empty = self.time_scale.is_empty();
        for pane in &mut self.panes {
            pane.set_font_size(options.layout.font_size);
            pane.set_price_scale_visibility(
                options.left_price_scale.visible,
                options.right_price_scale.visible,
            );
            for id in [PriceScaleId::left(), PriceScaleId::right()] {
                let scale_options = options.price_scale_options(&id).clone();
                pane.apply_price_scale_options(&id, scale_options, visible, empty, &self.series)?;
            }
        }
        if options.width != self.options.width {
            self.time_scale.set_width(f64::from(options.width));
        }
        self.options = options;
        self.recalculate_all_panes();
        self.invalidate(mask);
        Ok(())
    }

    #[must_use]
    pub fn behavior(&self) -> &dyn HorzScaleBehavior {
        self.behavior.as_ref()
    }

    #[must_use]
    pub fn time_scale(&self) -> &TimeScale {
        &self.time_scale
    }

    pub fn time_scale_mut(&mut self) -> &mut TimeScale {
        &mut self.time_scale
    }

    /// Time axis marks for the visible bars; `None` until points exist.
    pub fn time_marks(&mut self) -> Option<&[TimeMark]> {
        let interaction_disabled = !self.options.handle_scroll && !self.options.handle_scale;
        self.time_scale.marks(
            self.behavior.as_ref(),
            self.options.layout.font_size,
            interaction_disabled,
        )
    }

    #[must_use]
    pub fn data_layer(&self) -> &DataLayer {
        &self.data_layer
    }

    #[must_use]
    pub fn crosshair(&self) -> &Crosshair {
        &self.crosshair
    }

    #[must_use]
    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    #[must_use]
    pub fn pane(&self, id: PaneId) -> Option<&Pane> {
        self.panes.iter().find(|pane| pane.id() == id)
    }

    pub fn pane_mut(&mut self, id: PaneId) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|pane| pane.id() == id)
    }

    /// Series of a pane in drawing order.
    pub fn ordered_sources(&mut self, pane: PaneId) -> ChartResult<Vec<SeriesId>> {
        let index = self.pane_index(pane).ok_or(ChartError::UnknownPane(pane))?;
        Ok(self.panes[index].ordered_sources(&self.series).to_vec())
    }

    #[must_use]
    pub fn pane_index(&self, id: PaneId) -> Option<usize> {
        self.panes.iter().position(|pane| pane.id() == id)
    }

    /// Inserts a pane at `index` (appended when `None`); the first pane is
    /// twice as tall as the others by default.
    pub fn create_pane(&mut self, index: Option<usize>) -> PaneId {
        let id = PaneId::new(self.next_pane_id);
        self.next_pane_id += 1;
        let mut pane = Pane::new(id, &self.options);
        if self.panes.is_empty() {
            pane.set_stretch_factor(DEFAULT_STRETCH_FACTOR * 2.0);
        }
        pane.set_width(self.time_scale.width());
        let index = index.map_or(self.panes.len(), |index| index.min(self.panes.len()));
        self.panes.insert(index, pane);
        debug!(pane = id.raw(), index, "pane created");
        self.full_update();
        id
    }

    /// Removes a pane with all of its series; the last pane cannot be removed.
    pub fn remove_pane(&mut self, id: PaneId) -> ChartResult<()> {
        let index = self.pane_index(id).ok_or(ChartError::UnknownPane(id))?;
        if self.panes.len() == 1 {
            return Err(ChartError::InvalidOptions(
                "chart must keep at least one pane".to_owned(),
            ));
        }
        let sources = self.panes[index].data_sources().to_vec();
        for series in sources {
            self.remove_series(series)?;
        }
        self.panes.remove(index);
        if self.crosshair.pane() == Some(id) {
            self.clear_current_position();
        }
        self.full_update();
        Ok(())
    }

    pub fn set_width(&mut self, width: f64) {
        self.time_scale.set_width(width);
        for pane in &mut self.panes {
            pane.set_width(width);
        }
        self.recalculate_all_panes();
    }

    pub fn set_pane_height(&mut self, index: usize, height: f64) -> ChartResult<()> {
        let pane = self
            .panes
            .get_mut(index)
            .ok_or_else(|| ChartError::InvalidData(format!("pane index {index} out of range")))?;
        pane.set_height(height);
        Ok(())
    }

    #[must_use]
    pub fn series(&self, id: SeriesId) -> Option<&Series> {
        self.series.get(&id)
    }

    pub fn series_iter(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    #[must_use]
    pub fn series_arena(&self) -> &SeriesArena {
        &self.series
    }

    /// Creates a series on the pane at `pane_index`, adding panes as needed.
    pub fn create_series(
        &mut self,
        options: SeriesOptions,
        pane_index: Option<usize>,
    ) -> ChartResult<SeriesId> {
        let pane_index = pane_index.unwrap_or(0);
        while self.panes.len() <= pane_index {
            self.create_pane(None);
        }
        let pane_id = self.panes[pane_index].id();
        let id = SeriesId::new(self.next_series_id);
        let series = Series::new(id, pane_id, options)?;
        self.next_series_id += 1;
        self.panes[pane_index].add_data_source(&series);
        debug!(series = id.raw(), pane = pane_id.raw(), kind = ?series.series_type(), "series created");
        self.series.insert(id, series);
        self.full_update();
        Ok(id)
    }

    pub fn remove_series(&mut self, id: SeriesId) -> ChartResult<()> {
        let series = self.series.get(&id).ok_or(ChartError::UnknownSeries(id))?;
        let series_type = series.series_type();
        let pane_id = series.pane_id();
        let pane_index = self.pane_index(pane_id).ok_or(ChartError::UnknownPane(pane_id))?;
        self.panes[pane_index].remove_data_source(id, &self.series)?;
        let response =
            self.data_layer
                .set_series_data(self.behavior.as_ref(), id, series_type, &[])?;
        self.series.shift_remove(&id);
        self.apply_update(response)?;
        self.full_update();
        Ok(())
    }

    /// Applies options to a series, moving it when its price scale changed.
    pub fn apply_series_options(&mut self, id: SeriesId, options: SeriesOptions) -> ChartResult<()> {
        let series = self.series.get_mut(&id).ok_or(ChartError::UnknownSeries(id))?;
        let old_scale = series.price_scale_id().clone();
        series.apply_options(options)?;
        let pane_id = series.pane_id();
        let scale_changed = *series.price_scale_id() != old_scale;
        let pane_index = self.pane_index(pane_id).ok_or(ChartError::UnknownPane(pane_id))?;
        if scale_changed {
            self.panes[pane_index].remove_data_source(id, &self.series)?;
            if let Some(series) = self.series.get(&id) {
                self.panes[pane_index].add_data_source(series);
            }
        }
        self.panes[pane_index].update_formatters(&self.series);
        self.panes[pane_index].invalidate_source_order();
        self.recalculate_all_panes();
        self.full_update();
        Ok(())
    }

    pub fn set_series_autoscale_info_provider(
        &mut self,
        id: SeriesId,
        provider: Option<AutoscaleInfoProvider>,
    ) -> ChartResult<()> {
        self.series
            .get_mut(&id)
            .ok_or(ChartError::UnknownSeries(id))?
            .set_autoscale_info_provider(provider);
        self.recalculate_all_panes();
        self.light_update();
        Ok(())
    }

    /// Replaces the rows of a series.
    ///
    /// Returns the first timeline index that changed, `None` when the shared
    /// timeline is untouched.
    pub fn apply_new_data(
        &mut self,
        id: SeriesId,
        data: &[SeriesDataItem],
    ) -> ChartResult<Option<usize>> {
        let series_type = self
            .series
            .get(&id)
            .ok_or(ChartError::UnknownSeries(id))?
            .series_type();
        let response =
            self.data_layer
                .set_series_data(self.behavior.as_ref(), id, series_type, data)?;
        let first_changed = response.time_scale.first_changed_point_index;
        self.apply_update(response)?;
        Ok(first_changed)
    }

    /// Last-value label data of a series for the visible window.
    pub fn series_last_value(&mut self, id: SeriesId) -> Option<LastValueData> {
        let visible = self.time_scale.visible_strict_range();
        let empty = self.time_scale.is_empty();
        let series = self.series.get_mut(&id)?;
        let pane_id = series.pane_id();
        let scale_id = series.price_scale_id().clone();
        let scale = self
            .panes
            .iter()
            .find(|pane| pane.id() == pane_id)?
            .price_scale(&scale_id)?;
        series.cached_last_value(visible, scale, empty).cloned()
    }

    pub fn apply_price_scale_options(
        &mut self,
        pane: PaneId,
        scale: &PriceScaleId,
        options: PriceScaleOptions,
    ) -> ChartResult<()> {
        let visible = self.time_scale.visible_strict_range();
        let empty = self.time_scale.is_empty();
        let index = self.pane_index(pane).ok_or(ChartError::UnknownPane(pane))?;
        self.panes[index].apply_price_scale_options(scale, options, visible, empty, &self.series)?;
        self.update_crosshair();
        self.full_update();
        Ok(())
    }

    pub fn price_scale(&self, pane: PaneId, scale: &PriceScaleId) -> ChartResult<&PriceScale> {
        self.pane(pane)
            .ok_or(ChartError::UnknownPane(pane))?
            .price_scale(scale)
            .ok_or_else(|| ChartError::UnknownPriceScale(scale.to_string()))
    }

    /// Price axis marks of one scale, rebuilt when stale.
    pub fn price_marks(&mut self, pane: PaneId, scale: &PriceScaleId) -> ChartResult<&[PriceMark]> {
        Ok(self.price_scale_mut(pane, scale)?.marks())
    }

    pub fn start_scale_price(&mut self, pane: PaneId, scale: &PriceScaleId, x: f64) -> ChartResult<()> {
        self.price_scale_mut(pane, scale)?.start_scale(x);
        Ok(())
    }

    pub fn scale_price_to(&mut self, pane: PaneId, scale: &PriceScaleId, x: f64) -> ChartResult<()> {
        self.price_scale_mut(pane, scale)?.scale_to(x);
        self.after_price_scale_change(pane);
        Ok(())
    }

    pub fn end_scale_price(&mut self, pane: PaneId, scale: &PriceScaleId) -> ChartResult<()> {
        self.price_scale_mut(pane, scale)?.end_scale();
        self.after_price_scale_change(pane);
        Ok(())
    }

    pub fn start_scroll_price(&mut self, pane: PaneId, scale: &PriceScaleId, x: f64) -> ChartResult<()> {
        self.price_scale_mut(pane, scale)?.start_scroll(x);
        Ok(())
    }

    pub fn scroll_price_to(&mut self, pane: PaneId, scale: &PriceScaleId, x: f64) -> ChartResult<()> {
        self.price_scale_mut(pane, scale)?.scroll_to(x);
        self.after_price_scale_change(pane);
        Ok(())
    }

    pub fn end_scroll_price(&mut self, pane: PaneId, scale: &PriceScaleId) -> ChartResult<()> {
        self.price_scale_mut(pane, scale)?.end_scroll();
        self.after_price_scale_change(pane);
        Ok(())
    }

    /// Turns autoscale back on for one scale and fits it.
    pub fn reset_price_scale(&mut self, pane: PaneId, scale: &PriceScaleId) -> ChartResult<()> {
        let visible = self.time_scale.visible_strict_range();
        let empty = self.time_scale.is_empty();
        let index = self.pane_index(pane).ok_or(ChartError::UnknownPane(pane))?;
        self.panes[index].reset_price_scale(scale, visible, empty, &self.series)?;
        self.after_price_scale_change(pane);
        Ok(())
    }

    /// Queues a one-shot fit of the pane's default scales for the next frame.
    pub fn fit_price_scales(&mut self, pane: PaneId) -> ChartResult<()> {
        let index = self.pane_index(pane).ok_or(ChartError::UnknownPane(pane))?;
        let mut mask = InvalidateMask::light();
        mask.invalidate_pane(index, PaneInvalidation::new(InvalidationLevel::Light, true));
        self.invalidate(mask);
        Ok(())
    }

    /// Fits both default scales of a pane regardless of their autoscale flag.
    pub fn momentary_auto_scale(&mut self, pane_index: usize) {
        let visible = self.time_scale.visible_strict_range();
        let empty = self.time_scale.is_empty();
        if let Some(pane) = self.panes.get_mut(pane_index) {
            pane.momentary_auto_scale(visible, empty, &self.series);
        }
    }

    pub fn start_scale_time(&mut self, x: f64) {
        self.time_scale.start_scale(x);
    }

    pub fn scale_time_to(&mut self, x: f64) -> ChartResult<()> {
        self.time_scale.scale_to(x)?;
        self.after_time_scale_change();
        Ok(())
    }

    pub fn end_scale_time(&mut self) {
        self.time_scale.end_scale();
        self.light_update();
    }

    pub fn start_scroll_time(&mut self, x: f64) {
        self.time_scale.start_scroll(x);
    }

    pub fn scroll_time_to(&mut self, x: f64) {
        self.time_scale.scroll_to(x);
        self.after_time_scale_change();
    }

    pub fn end_scroll_time(&mut self) {
        self.time_scale.end_scroll();
        self.light_update();
    }

    /// Zooms by `scale` tenths of the bar spacing around `point_x`.
    pub fn zoom_time(&mut self, point_x: f64, scale: f64) -> ChartResult<()> {
        self.time_scale.zoom(point_x, scale)?;
        self.after_time_scale_change();
        Ok(())
    }

    /// Shifts the chart by `pixels` as one scroll gesture.
    pub fn scroll_chart(&mut self, pixels: f64) {
        self.time_scale.start_scroll(0.0);
        self.time_scale.scroll_to(pixels);
        self.time_scale.end_scroll();
        self.after_time_scale_change();
    }

    pub fn fit_content(&mut self) {
        let mut mask = InvalidateMask::light();
        mask.set_fit_content();
        self.invalidate(mask);
    }

    pub fn set_target_logical_range(&mut self, range: LogicalRange) {
        let mut mask = InvalidateMask::light();
        mask.apply_range(range);
        self.invalidate(mask);
    }

    pub fn set_bar_spacing(&mut self, bar_spacing: f64) {
        let mut mask = InvalidateMask::light();
        mask.set_bar_spacing(bar_spacing);
        self.invalidate(mask);
    }

    pub fn set_right_offset(&mut self, right_offset: f64) {
        let mut mask = InvalidateMask::light();
        mask.set_right_offset(right_offset);
        self.invalidate(mask);
    }

    pub fn reset_time_scale(&mut self) {
        let mut mask = InvalidateMask::light();
        mask.reset_time_scale();
        self.invalidate(mask);
    }

    pub fn set_time_scale_animation(&mut self, animation: TimeScaleAnimation) {
        let mut mask = InvalidateMask::light();
        mask.set_time_scale_animation(animation);
        self.invalidate(mask);
    }

    pub fn stop_time_scale_animation(&mut self) {
        let mut mask = InvalidateMask::light();
        mask.stop_time_scale_animation();
        self.invalidate(mask);
    }

    /// Animates back to the configured right offset.
    pub fn scroll_to_real_time(&mut self, now: f64) -> ChartResult<()> {
        let animation = self.time_scale.scroll_to_real_time(now)?;
        self.set_time_scale_animation(animation);
        Ok(())
    }

    /// Applies one queued time-scale change during a frame.
    pub fn apply_time_scale_invalidation(
        &mut self,
        invalidation: &TimeScaleInvalidation,
        now: f64,
    ) -> ChartResult<()> {
        match invalidation {
            TimeScaleInvalidation::FitContent => self.time_scale.fit_content()?,
            TimeScaleInvalidation::ApplyRange(range) => self.time_scale.set_logical_range(*range)?,
            TimeScaleInvalidation::ApplyBarSpacing(spacing) => {
                self.time_scale.set_bar_spacing(*spacing)?;
            }
            TimeScaleInvalidation::ApplyRightOffset(offset) => {
                self.time_scale.set_right_offset(*offset)?;
            }
            TimeScaleInvalidation::Reset => self.time_scale.restore_default()?,
            TimeScaleInvalidation::Animation(animation) => {
                self.time_scale.set_right_offset(animation.position(now))?;
            }
            TimeScaleInvalidation::StopAnimation => {}
        }
        self.recalculate_all_panes();
        self.update_crosshair();
        Ok(())
    }

    /// Moves the crosshair to `(x, y)` inside `pane`.
    ///
    /// The index is clamped into the visible bars and the price is read from
    /// the pane's default scale.
    pub fn set_and_save_current_position(&mut self, x: f64, y: f64, pane: PaneId) -> ChartResult<()> {
        let index = self.pane_index(pane).ok_or(ChartError::UnknownPane(pane))?;
        self.crosshair.save_origin_coord(x, y);
        let mut logical = self.time_scale.coordinate_to_index(x);
        if let Some(visible) = self.time_scale.visible_strict_range() {
            logical = logical.clamp(visible.left(), visible.right());
        }
        let scale = self.panes[index].default_price_scale();
        let price = scale
            .first_value()
            .map_or(f64::NAN, |first| scale.coordinate_to_price(y, first));
        self.crosshair.set_position(logical, price, pane);
        self.crosshair.update_all_views(&self.time_scale, Some(scale));
        self.cursor_update();

        let event = CrosshairMoveEvent {
            logical: Some(logical),
            time: usize::try_from(logical)
                .ok()
                .and_then(|index| self.time_scale.index_to_time(index)),
            point: Some((x, y)),
            pane: Some(pane),
            series_prices: self
                .series
                .values()
                .filter_map(|series| {
                    series
                        .bars()
                        .value_at(logical)
                        .map(|row| (series.id(), row.close()))
                })
                .collect(),
        };
        self.crosshair_moved.notify(&event);
        Ok(())
    }

    /// Hides the crosshair, leaving its index on the newest bar.
    pub fn clear_current_position(&mut self) {
        let fallback = self
            .series
            .values()
            .filter_map(|series| series.bars().last_index())
            .max();
        self.crosshair.clear_position(fallback);
        self.cursor_update();
        self.crosshair_moved.notify(&CrosshairMoveEvent::default());
    }

    /// Re-applies the saved pointer position after a scale change.
    pub fn update_crosshair(&mut self) {
        if let (Some(pane), Some((x, y))) = (self.crosshair.pane(), self.crosshair.origin_coord())
            && self.set_and_save_current_position(x, y, pane).is_ok()
        {
            return;
        }
        let scale = self
            .crosshair
            .pane()
            .and_then(|id| self.panes.iter().find(|pane| pane.id() == id))
            .map(Pane::default_price_scale);
        self.crosshair.update_all_views(&self.time_scale, scale);
    }

    pub fn subscribe_crosshair_moved(
        &mut self,
        handler: impl FnMut(&CrosshairMoveEvent) + 'static,
    ) -> SubscriptionToken {
        self.crosshair_moved.subscribe(handler)
    }

    pub fn unsubscribe_crosshair_moved(&mut self, token: SubscriptionToken) -> bool {
        self.crosshair_moved.unsubscribe(token)
    }

    /// Autoscales every pane against the current visible bars.
    pub fn recalculate_all_panes(&mut self) {
        let visible = self.time_scale.visible_strict_range();
        let empty = self.time_scale.is_empty();
        for pane in &mut self.panes {
            pane.recalculate(visible, empty, &mut self.series);
        }
        trace!(panes = self.panes.len(), visible = ?visible, "panes recalculated");
    }

    pub fn invalidate(&mut self, mask: InvalidateMask) {
        if let Some(pending) = &mut self.pending_invalidation {
            pending.merge(&mask);
        } else {
            self.pending_invalidation = Some(mask);
        }
    }

    pub fn invalidate_pane(&mut self, pane_index: usize, level: InvalidationLevel, auto_scale: bool) {
        let mut mask = InvalidateMask::new(level);
        mask.invalidate_pane(pane_index, PaneInvalidation { level, auto_scale });
        self.invalidate(mask);
    }

    #[must_use]
    pub fn pending_invalidation(&self) -> Option<&InvalidateMask> {
        self.pending_invalidation.as_ref()
    }

    pub fn take_pending_invalidation(&mut self) -> Option<InvalidateMask> {
        self.pending_invalidation.take()
    }

    pub fn full_update(&mut self) {
        self.invalidate(InvalidateMask::full());
    }

    pub fn light_update(&mut self) {
        self.invalidate(InvalidateMask::light());
    }

    pub fn cursor_update(&mut self) {
        self.invalidate(InvalidateMask::cursor());
    }

    fn apply_update(&mut self, response: DataUpdateResponse) -> ChartResult<()> {
        let time_scale = response.time_scale;
        self.update_time_scale(
            time_scale.base_index,
            time_scale.points,
            time_scale.first_changed_point_index,
        )?;
        let mut touched_panes = Vec::new();
        for (id, changes) in response.series {
            if let Some(series) = self.series.get_mut(&id) {
                series.set_data(changes.data);
                touched_panes.push(series.pane_id());
            }
        }
        self.recalculate_all_panes();
        self.update_crosshair();
        for pane in touched_panes {
            if let Some(index) = self.pane_index(pane) {
                self.invalidate_pane(index, InvalidationLevel::Light, false);
            }
        }
        self.light_update();
        Ok(())
    }

    /// Installs a new timeline and base index.
    ///
    /// When bars arrive on the right while the newest bar is off screen, or
    /// shifting is disabled, the right offset absorbs the growth so the
    /// visible bars stay put.
    fn update_time_scale(
        &mut self,
        new_base_index: Option<TimePointIndex>,
        points: Option<Vec<TimeScalePoint>>,
        first_changed: Option<usize>,
    ) -> ChartResult<()> {
        let old_first_time = self.time_scale.index_to_time(0);
        if let Some(points) = points {
            self.time_scale.update(points, first_changed.unwrap_or(0));
        }
        let new_first_time = self.time_scale.index_to_time(0);
        let current_base_index = self.time_scale.base_index();
        let visible = self.time_scale.visible_strict_range();

        if let (Some(visible), Some(old_first), Some(new_first)) =
            (visible, old_first_time, new_first_time)
        {
            let options = self.time_scale.options();
            let last_bar_visible = visible.contains(current_base_index);
            let left_bar_shifted_left = self.behavior.key(&old_first) > self.behavior.key(&new_first);
            let added_to_right = new_base_index.is_some_and(|base| base > current_base_index)
                && !left_bar_shifted_left;
            let replaced_whitespace = first_changed.is_none();
            let shift_visible_range = last_bar_visible
                && (!replaced_whitespace
                    || options.allow_shift_visible_range_on_whitespace_replacement)
                && options.shift_visible_range_on_new_bar;
            if added_to_right
                && !shift_visible_range
                && let Some(new_base_index) = new_base_index
            {
                let compensation = (new_base_index - current_base_index) as f64;
                let offset = self.time_scale.right_offset() - compensation;
                self.time_scale.set_right_offset(offset)?;
            }
        }
        self.time_scale.set_base_index(new_base_index);
        Ok(())
    }

    fn price_scale_mut(&mut self, pane: PaneId, scale: &PriceScaleId) -> ChartResult<&mut PriceScale> {
        self.pane_mut(pane)
            .ok_or(ChartError::UnknownPane(pane))?
            .price_scale_mut(scale)
            .ok_or_else(|| ChartError::UnknownPriceScale(scale.to_string()))
    }

    fn after_price_scale_change(&mut self, pane: PaneId) {
        if let Some(index) = self.pane_index(pane) {
            self.panes[index].update_all_sources(&mut self.series);
            self.update_crosshair();
            self.invalidate_pane(index, InvalidationLevel::Light, false);
        }
    }

    fn after_time_scale_change(&mut self) {
        self.recalculate_all_panes();
        self.update_crosshair();
        self.light_update();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::ChartModel;
    use crate::core::{PaneId, PriceScaleId, SeriesId};
    use crate::error::ChartError;
    use crate::model::data_layer::SeriesDataItem;
    use crate::model::invalidate_mask::{InvalidationLevel, TimeScaleInvalidation};
    use crate::model::options::{ChartOptions, PriceScaleOptions, SeriesOptions};
    use crate::model::series::SeriesType;

    fn model() -> ChartModel {
        let mut model = ChartModel::new(ChartOptions {
            width: 600,
            height: 400,
            ..ChartOptions::default()
        })
        .expect("valid options");
        model.set_pane_height(0, 400.0).expect("pane 0");
        model
    }

    fn line(model: &mut ChartModel) -> SeriesId {
        model
            .create_series(SeriesOptions::for_type(SeriesType::Line), None)
            .expect("series")
    }

    fn values(range: std::ops::Range<i64>) -> Vec<SeriesDataItem> {
        range
            .map(|time| SeriesDataItem::value(time, 10.0 + time as f64))
            .collect()
    }

    #[test]
    fn default_chart_model_starts_with_full_invalidation() {
        let model = model();
        let pending = model.pending_invalidation().expect("pending");
        assert_eq!(pending.global_level(), InvalidationLevel::Full);
        assert_eq!(model.panes().len(), 1);
        assert_eq!(model.panes()[0].stretch_factor(), 2000.0);
    }

    #[test]
    fn invalidate_merges_masks() {
        let mut model = model();
        model.take_pending_invalidation();
        model.light_update();
        model.cursor_update();
        let pending = model.pending_invalidation().expect("pending");
        assert_eq!(pending.global_level(), InvalidationLevel::Light);
    }

    #[test]
    fn incremental_append_moves_base_index() {
        let mut model = model();
        let series = line(&mut model);
        model.apply_new_data(series, &values(1..4)).expect("data");
        let first_changed = model.apply_new_data(series, &values(1..5)).expect("data");

        assert_eq!(first_changed, Some(3));
        assert_eq!(model.time_scale().base_index(), 3);
        assert_eq!(model.series(series).expect("series").bars().last_index(), Some(3));
        assert_eq!(model.apply_new_data(series, &values(1..5)).expect("data"), None);
    }

    #[test]
    fn right_offset_compensates_when_last_bar_is_hidden() {
        let mut model = model();
        let series = line(&mut model);
        model.apply_new_data(series, &values(0..200)).expect("data");
        model.time_scale_mut().set_right_offset(-150.0).expect("offset");

        model.apply_new_data(series, &values(0..201)).expect("data");
        assert_eq!(model.time_scale().right_offset(), -151.0);

        model.time_scale_mut().set_right_offset(0.0).expect("offset");
        model.apply_new_data(series, &values(0..202)).expect("data");
        assert_eq!(model.time_scale().right_offset(), 0.0);
    }

    #[test]
    fn unknown_price_scale_is_rejected() {
        let mut model = model();
        let pane = model.panes()[0].id();
        let missing = PriceScaleId::new("missing");
        assert!(matches!(
            model.start_scale_price(pane, &missing, 10.0),
            Err(ChartError::UnknownPriceScale(_))
        ));
        assert!(matches!(
            model.apply_price_scale_options(PaneId::new(99), &PriceScaleId::right(), PriceScaleOptions::default()),
            Err(ChartError::UnknownPane(_))
        ));
    }

    #[test]
    fn crosshair_index_is_clamped_and_reported() {
        let mut model = model();
        let series = line(&mut model);
        model.apply_new_data(series, &values(0..50)).expect("data");
        let pane = model.panes()[0].id();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        model.subscribe_crosshair_moved(move |event| sink.borrow_mut().push(event.clone()));

        model
            .set_and_save_current_position(5_000.0, 200.0, pane)
            .expect("pane exists");
        let crosshair = model.crosshair();
        assert!(crosshair.visible());
        let visible_right = model.time_scale_mut().visible_strict_range().expect("visible").right();
        assert_eq!(model.crosshair().index(), Some(visible_right));
        assert!(model.crosshair().price().is_finite());

        model.clear_current_position();
        assert!(!model.crosshair().visible());
        assert_eq!(model.crosshair().index(), Some(49));

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].logical, Some(49));
        assert_eq!(events[0].series_prices.get(&series), Some(&59.0));
        assert!(events[1].logical.is_none());
    }

    #[test]
    fn removing_series_clears_timeline() {
        let mut model = model();
        let series = line(&mut model);
        model.apply_new_data(series, &values(0..10)).expect("data");
        model.remove_series(series).expect("series exists");
        assert!(model.series(series).is_none());
        assert!(model.time_scale().points().is_empty());
        assert!(model.remove_series(series).is_err());
    }

    #[test]
    fn time_scale_changes_wait_for_the_frame() {
        let mut model = model();
        let series = line(&mut model);
        model.apply_new_data(series, &values(0..100)).expect("data");
        model.take_pending_invalidation();

        model.set_bar_spacing(12.0);
        assert_eq!(model.time_scale().bar_spacing(), 6.0);
        let mask = model.take_pending_invalidation().expect("queued");
        for invalidation in mask.time_scale_invalidations() {
            model
                .apply_time_scale_invalidation(invalidation, 0.0)
                .expect("valid change");
        }
        assert!(matches!(
            mask.time_scale_invalidations(),
            [TimeScaleInvalidation::StopAnimation, TimeScaleInvalidation::ApplyBarSpacing(_)]
        ));
        assert_eq!(model.time_scale().bar_spacing(), 12.0);
    }
}
