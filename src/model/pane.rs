use indexmap::IndexMap;
use tracing::debug;

use crate::core::{PaneId, PriceScaleId, SeriesId};
use crate::error::{ChartError, ChartResult};

use super::data_source::PriceDataSource;
use super::invalidated::Invalidated;
use super::options::{ChartOptions, PriceScaleOptions};
use super::price_scale::{PriceScale, PriceScaleStateChange};
use super::series::Series;
use super::time_scale::StrictRange;

pub const DEFAULT_STRETCH_FACTOR: f64 = 1000.0;

/// Series attached to a pane, keyed by id.
pub type SeriesArena = IndexMap<SeriesId, Series>;

/// One horizontal band of the chart with its own price scales.
///
/// Panes keep only the ids of their series; every method that needs series
/// data borrows the model's arena.
#[derive(Debug)]
pub struct Pane {
    id: PaneId,
    stretch_factor: f64,
    width: f64,
    height: f64,
    left_price_scale: PriceScale,
    right_price_scale: PriceScale,
    overlay_price_scales: IndexMap<PriceScaleId, PriceScale>,
    overlay_options: PriceScaleOptions,
    right_visible: bool,
    left_visible: bool,
    font_size: f64,
    data_sources: Vec<SeriesId>,
    ordered_sources: Invalidated<Vec<SeriesId>>,
}

impl Pane {
    #[must_use]
    pub fn new(id: PaneId, options: &ChartOptions) -> Self {
        let font_size = options.layout.font_size;
        Self {
            id,
            stretch_factor: DEFAULT_STRETCH_FACTOR,
            width: 0.0,
            height: 0.0,
            left_price_scale: PriceScale::new(
                PriceScaleId::left(),
                options.left_price_scale.clone(),
                font_size,
            ),
            right_price_scale: PriceScale::new(
                PriceScaleId::right(),
                options.right_price_scale.clone(),
                font_size,
            ),
            overlay_price_scales: IndexMap::new(),
            overlay_options: options.overlay_price_scales.clone(),
            right_visible: options.right_price_scale.visible,
            left_visible: options.left_price_scale.visible,
            font_size,
            data_sources: Vec::new(),
            ordered_sources: Invalidated::stale(),
        }
    }

    #[must_use]
    pub fn id(&self) -> PaneId {
        self.id
    }

    #[must_use]
    pub fn stretch_factor(&self) -> f64 {
        self.stretch_factor
    }

    pub fn set_stretch_factor(&mut self, stretch_factor: f64) {
        self.stretch_factor = stretch_factor;
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_height(&mut self, height: f64) {
        self.height = height;
        self.left_price_scale.set_height(height);
        self.right_price_scale.set_height(height);
        for scale in self.overlay_price_scales.values_mut() {
            scale.set_height(height);
        }
    }

    pub fn set_font_size(&mut self, font_size: f64) {
        self.font_size = font_size;
        for scale in self.price_scales_mut() {
            scale.set_font_size(font_size);
        }
    }

    #[must_use]
    pub fn left_price_scale(&self) -> &PriceScale {
        &self.left_price_scale
    }

    #[must_use]
    pub fn right_price_scale(&self) -> &PriceScale {
        &self.right_price_scale
    }

    #[must_use]
    pub fn overlay_price_scales(&self) -> impl Iterator<Item = &PriceScale> {
        self.overlay_price_scales.values()
    }

    #[must_use]
    pub fn price_scale(&self, id: &PriceScaleId) -> Option<&PriceScale> {
        match id.as_str() {
            PriceScaleId::LEFT => Some(&self.left_price_scale),
            PriceScaleId::RIGHT => Some(&self.right_price_scale),
            _ => self.overlay_price_scales.get(id),
        }
    }

    pub fn price_scale_mut(&mut self, id: &PriceScaleId) -> Option<&mut PriceScale> {
        match id.as_str() {
            PriceScaleId::LEFT => Some(&mut self.left_price_scale),
            PriceScaleId::RIGHT => Some(&mut self.right_price_scale),
            _ => self.overlay_price_scales.get_mut(id),
        }
    }

    /// Left, right, then overlays in creation order.
    pub fn price_scales(&self) -> impl Iterator<Item = &PriceScale> {
        [&self.left_price_scale, &self.right_price_scale]
            .into_iter()
            .chain(self.overlay_price_scales.values())
    }

    pub fn price_scales_mut(&mut self) -> impl Iterator<Item = &mut PriceScale> {
        [&mut self.left_price_scale, &mut self.right_price_scale]
            .into_iter()
            .chain(self.overlay_price_scales.values_mut())
    }

    /// Records which default scales are shown; used to pick the default scale.
    pub fn set_price_scale_visibility(&mut self, left_visible: bool, right_visible: bool) {
        self.left_visible = left_visible;
        self.right_visible = right_visible;
    }

    #[must_use]
    pub fn data_sources(&self) -> &[SeriesId] {
        &self.data_sources
    }

    #[must_use]
    pub fn has_source(&self, id: SeriesId) -> bool {
        self.data_sources.contains(&id)
    }

    /// Attaches `series` to its price scale, creating an overlay scale on demand.
    pub fn add_data_source(&mut self, series: &Series) {
        let id = series.source_id();
        if self.data_sources.contains(&id) {
            return;
        }
        let scale_id = series.price_scale_id().clone();
        if !scale_id.is_default() && !self.overlay_price_scales.contains_key(&scale_id) {
            let mut scale =
                PriceScale::new(scale_id.clone(), self.overlay_options.clone(), self.font_size);
            scale.set_height(self.height);
            self.overlay_price_scales.insert(scale_id.clone(), scale);
            debug!(pane = self.id.raw(), scale = %scale_id, "overlay price scale created");
        }
        if let Some(scale) = self.price_scale_mut(&scale_id) {
            scale.add_data_source(series);
        }
        self.data_sources.push(id);
        self.ordered_sources.invalidate();
    }

    /// Detaches a series; an emptied overlay scale is dropped.
    pub fn remove_data_source(&mut self, id: SeriesId, series: &SeriesArena) -> ChartResult<()> {
        let index = self
            .data_sources
            .iter()
            .position(|source| *source == id)
            .ok_or(ChartError::UnknownSeries(id))?;
        let scale_id = self
            .scale_id_of(id)
            .ok_or(ChartError::UnknownSeries(id))?;
        self.data_sources.remove(index);
        self.ordered_sources.invalidate();

        let Some(scale) = self.price_scale_mut(&scale_id) else {
            return Err(ChartError::UnknownPriceScale(scale_id.to_string()));
        };
        let next = scale
            .data_sources()
            .iter()
            .copied()
            .find(|other| *other != id)
            .and_then(|other| series.get(&other))
            .map(|next| next as &dyn PriceDataSource);
        scale.remove_data_source(id, next)?;
        if !scale_id.is_default()
            && self
                .overlay_price_scales
                .get(&scale_id)
                .is_some_and(|scale| scale.data_sources().is_empty())
        {
            self.overlay_price_scales.shift_remove(&scale_id);
        }
        Ok(())
    }

    /// Sources sorted by z-order; ties keep attachment order.
    pub fn ordered_sources(&mut self, series: &SeriesArena) -> &[SeriesId] {
        let data_sources = &self.data_sources;
        self.ordered_sources.get_or_update(|| {
            let mut ordered = data_sources.clone();
            ordered.sort_by_key(|id| series.get(id).map_or(0, |source| source.z_order()));
            ordered
        })
    }

    /// Invalidates the z-order cache after a series option change.
    pub fn invalidate_source_order(&mut self) {
        self.ordered_sources.invalidate();
    }

    /// Right when shown and populated, then left, then the first source's scale.
    #[must_use]
    pub fn default_price_scale(&self) -> &PriceScale {
        if self.right_visible && !self.right_price_scale.data_sources().is_empty() {
            return &self.right_price_scale;
        }
        if self.left_visible && !self.left_price_scale.data_sources().is_empty() {
            return &self.left_price_scale;
        }
        self.data_sources
            .first()
            .and_then(|first| self.scale_id_of(*first))
            .and_then(|id| self.price_scale(&id))
            .unwrap_or(&self.right_price_scale)
    }

    /// Recalculates the scale only when it is in autoscale mode.
    pub fn recalculate_price_scale(
        &mut self,
        id: &PriceScaleId,
        visible_bars: Option<StrictRange>,
        time_scale_empty: bool,
        series: &SeriesArena,
    ) -> ChartResult<()> {
        let scale = self
            .price_scale(id)
            .ok_or_else(|| ChartError::UnknownPriceScale(id.to_string()))?;
        if scale.is_auto_scale() {
            self.recalculate_price_scale_impl(id, visible_bars, time_scale_empty, series);
        }
        Ok(())
    }

    /// Forces autoscale on and recalculates the scale.
    pub fn reset_price_scale(
        &mut self,
        id: &PriceScaleId,
        visible_bars: Option<StrictRange>,
        time_scale_empty: bool,
        series: &SeriesArena,
    ) -> ChartResult<()> {
        self.price_scale_mut(id)
            .ok_or_else(|| ChartError::UnknownPriceScale(id.to_string()))?
            .set_mode(PriceScaleStateChange {
                auto_scale: Some(true),
                ..PriceScaleStateChange::default()
            });
        self.recalculate_price_scale_impl(id, visible_bars, time_scale_empty, series);
        Ok(())
    }

    /// One-shot fit of both default scales regardless of their autoscale flag.
    pub fn momentary_auto_scale(
        &mut self,
        visible_bars: Option<StrictRange>,
        time_scale_empty: bool,
        series: &SeriesArena,
    ) {
        for id in [PriceScaleId::left(), PriceScaleId::right()] {
            self.recalculate_price_scale_impl(&id, visible_bars, time_scale_empty, series);
        }
    }

    /// Recalculates every autoscaled scale and refreshes the attached series.
    pub fn recalculate(
        &mut self,
        visible_bars: Option<StrictRange>,
        time_scale_empty: bool,
        series: &mut SeriesArena,
    ) {
        let ids: Vec<PriceScaleId> = self.price_scales().map(|scale| scale.id().clone()).collect();
        for id in &ids {
            let auto_scale = self.price_scale(id).is_some_and(PriceScale::is_auto_scale);
            if auto_scale {
                self.recalculate_price_scale_impl(id, visible_bars, time_scale_empty, series);
            } else if let Some(scale) = self.price_scale_mut(id) {
                let sources = collect_sources(scale.data_sources(), series);
                scale.update_first_value(&sources, visible_bars);
            }
        }
        self.update_all_sources(series);
    }

    pub fn update_all_sources(&self, series: &mut SeriesArena) {
        for id in &self.data_sources {
            if let Some(source) = series.get_mut(id) {
                source.update_all_views();
            }
        }
    }

    /// Applies options to one scale and re-fits it when its mode changed.
    pub fn apply_price_scale_options(
        &mut self,
        id: &PriceScaleId,
        options: PriceScaleOptions,
        visible_bars: Option<StrictRange>,
        time_scale_empty: bool,
        series: &SeriesArena,
    ) -> ChartResult<()> {
        match id.as_str() {
            PriceScaleId::LEFT => self.left_visible = options.visible,
            PriceScaleId::RIGHT => self.right_visible = options.visible,
            _ => {}
        }
        let scale = self
            .price_scale_mut(id)
            .ok_or_else(|| ChartError::UnknownPriceScale(id.to_string()))?;
        let old_mode = scale.mode().mode;
        scale.apply_options(options)?;
        if scale.mode().mode != old_mode {
            self.recalculate_price_scale_impl(id, visible_bars, time_scale_empty, series);
        }
        Ok(())
    }

    /// Re-reads the formatter of each scale's first source.
    pub fn update_formatters(&mut self, series: &SeriesArena) {
        for scale in self.price_scales_mut() {
            let first = scale
                .data_sources()
                .first()
                .and_then(|first| series.get(first))
                .map(|first| first as &dyn PriceDataSource);
            scale.update_formatter(first);
        }
    }

    fn scale_id_of(&self, source: SeriesId) -> Option<PriceScaleId> {
        self.price_scales()
            .find(|scale| scale.has_source(source))
            .map(|scale| scale.id().clone())
    }

    fn recalculate_price_scale_impl(
        &mut self,
        id: &PriceScaleId,
        visible_bars: Option<StrictRange>,
        time_scale_empty: bool,
        series: &SeriesArena,
    ) {
        let Some(scale) = self.price_scale_mut(id) else {
            return;
        };
        let sources = collect_sources(scale.data_sources(), series);
        if !sources.is_empty()
            && !time_scale_empty
            && let Some(visible) = visible_bars
        {
            scale.recalculate_price_range(visible, &sources);
        }
        scale.update_first_value(&sources, visible_bars);
    }
}

fn collect_sources<'a>(ids: &[SeriesId], series: &'a SeriesArena) -> Vec<&'a dyn PriceDataSource> {
    ids.iter()
        .filter_map(|id| series.get(id))
        .map(|source| source as &dyn PriceDataSource)
        .collect()
}
