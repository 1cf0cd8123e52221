use tracing::{debug, trace, warn};

use crate::core::{PaneId, PriceScaleId, Size};
use crate::error::{ChartError, ChartResult};
use crate::model::{
    ChartModel, ChartOptions, DAMPING_COEFF, InvalidateMask, InvalidationLevel, KineticAnimation,
    MAX_SCROLL_SPEED, MIN_SCROLL_SPEED, SCROLL_MIN_MOVE, TimeScaleInvalidation,
};

use super::axis_view::{
    PriceAxisView, TimeAxisView, price_axis_optimal_width, suggest_even, time_axis_optimal_height,
};
use super::crosshair_view::CrosshairView;
use super::grid_view::GridView;
use super::pane_view::{HitTestData, PaneView};
use super::scheduler::{FrameRequestId, FrameScheduler};
use super::series_view::SeriesView;
use super::target::{RenderingTarget, TargetRegion};
use super::{CanvasLayerKind, Color, LayeredRenderFrame, PaneLayerStack, Renderer};

pub const MIN_PANE_HEIGHT: f64 = 2.0;

/// Result of the last relayout, in media pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub left_axis_width: f64,
    pub right_axis_width: f64,
    pub time_axis_height: f64,
    pub pane_width: f64,
    /// `(pane, top, height)` from top to bottom.
    pub panes: Vec<(PaneId, f64, f64)>,
}

impl ChartLayout {
    /// Pane under a chart-relative `y`, with its top edge.
    #[must_use]
    pub fn pane_at(&self, y: f64) -> Option<(PaneId, f64)> {
        self.panes
            .iter()
            .find(|(_, top, height)| y >= *top && y < top + height)
            .map(|(id, top, _)| (*id, *top))
    }

    fn region(&self, index: usize) -> Option<(PaneId, f64, f64)> {
        self.panes.get(index).copied()
    }
}

struct PaneViews {
    pane: PaneId,
    grid: GridView,
    series: Vec<SeriesView>,
    crosshair: CrosshairView,
    left_axis: PriceAxisView,
    right_axis: PriceAxisView,
}

impl PaneViews {
    fn new(pane: PaneId) -> Self {
        Self {
            pane,
            grid: GridView::new(),
            series: Vec::new(),
            crosshair: CrosshairView::new(),
            left_axis: PriceAxisView::new(PriceScaleId::left()),
            right_axis: PriceAxisView::new(PriceScaleId::right()),
        }
    }
}

/// Drives a [`ChartModel`] through frames: relayout, autoscale, time-scale
/// adjustments and painting into a retained layered frame.
///
/// Every model mutation goes through the widget so that a frame is requested
/// from the host at most once per pending mask.
pub struct ChartWidget<S: FrameScheduler, R: Renderer> {
    model: ChartModel,
    scheduler: S,
    renderer: R,
    pixel_ratio: f64,
    layout: ChartLayout,
    frame: LayeredRenderFrame,
    views: Vec<PaneViews>,
    time_axis: TimeAxisView,
    frame_request: Option<FrameRequestId>,
    kinetic: Option<KineticAnimation>,
    pointer_pressed: bool,
    hovered: Option<HitTestData>,
}

impl<S: FrameScheduler, R: Renderer> ChartWidget<S, R> {
    pub fn new(options: ChartOptions, scheduler: S, renderer: R) -> ChartResult<Self> {
        let model = ChartModel::new(options)?;
        let mut widget = Self {
            model,
            scheduler,
            renderer,
            pixel_ratio: 1.0,
            layout: ChartLayout::default(),
            frame: LayeredRenderFrame::from_stacks(Size::default().to_viewport(1.0, 1.0), Vec::new()),
            views: Vec::new(),
            time_axis: TimeAxisView::new(),
            frame_request: None,
            kinetic: None,
            pointer_pressed: false,
            hovered: None,
        };
        widget.request_frame_if_needed();
        Ok(widget)
    }

    #[must_use]
    pub fn model(&self) -> &ChartModel {
        &self.model
    }

    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[must_use]
    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    #[must_use]
    pub fn frame(&self) -> &LayeredRenderFrame {
        &self.frame
    }

    #[must_use]
    pub fn hovered(&self) -> Option<HitTestData> {
        self.hovered
    }

    #[must_use]
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Runs `mutate` against the model and requests a frame if it queued an
    /// invalidation.
    pub fn update_model<T>(&mut self, mutate: impl FnOnce(&mut ChartModel) -> T) -> T {
        let output = mutate(&mut self.model);
        self.request_frame_if_needed();
        output
    }

    pub fn resize(&mut self, width: u32, height: u32) -> ChartResult<()> {
        let mut options = self.model.options().clone();
        options.width = width;
        options.height = height;
        self.model.apply_options(options)?;
        self.model.full_update();
        self.request_frame_if_needed();
        Ok(())
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) -> ChartResult<()> {
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(ChartError::InvalidOptions(format!(
                "pixel ratio must be finite and > 0, given={pixel_ratio}"
            )));
        }
        self.pixel_ratio = pixel_ratio;
        self.model.full_update();
        self.request_frame_if_needed();
        Ok(())
    }

    pub fn pointer_down(&mut self, x: f64, _y: f64, now: f64) {
        self.pointer_pressed = true;
        if !self.model.options().handle_scroll {
            return;
        }
        self.kinetic = None;
        let x = x - self.layout.left_axis_width;
        self.model.stop_time_scale_animation();
        self.model.start_scroll_time(x);
        let mut kinetic =
            KineticAnimation::new(MIN_SCROLL_SPEED, MAX_SCROLL_SPEED, DAMPING_COEFF, SCROLL_MIN_MOVE);
        kinetic.add_position(x, now);
        self.kinetic = Some(kinetic);
        self.request_frame_if_needed();
    }

    /// Pointer moved to chart-relative `(x, y)`.
    pub fn pointer_move(&mut self, x: f64, y: f64, now: f64) -> ChartResult<()> {
        let pane_x = x - self.layout.left_axis_width;
        if self.pointer_pressed && self.model.options().handle_scroll {
            self.model.scroll_time_to(pane_x);
            if let Some(kinetic) = &mut self.kinetic {
                kinetic.add_position(pane_x, now);
            }
        }

        match self.layout.pane_at(y) {
            Some((pane, top)) if pane_x >= 0.0 && pane_x < self.layout.pane_width => {
                self.model.set_and_save_current_position(pane_x, y - top, pane)?;
                self.update_hovered(pane, pane_x, y - top);
            }
            _ => self.clear_pointer(),
        }
        self.request_frame_if_needed();
        Ok(())
    }

    pub fn pointer_up(&mut self, x: f64, now: f64) {
        if !self.pointer_pressed {
            return;
        }
        self.pointer_pressed = false;
        let x = x - self.layout.left_axis_width;
        let started = self.kinetic.as_mut().is_some_and(|kinetic| {
            kinetic.start(x, now);
            kinetic.is_started()
        });
        if !started {
            self.kinetic = None;
            self.model.end_scroll_time();
        }
        self.request_frame_if_needed();
    }

    pub fn pointer_leave(&mut self) {
        self.clear_pointer();
        self.request_frame_if_needed();
    }

    /// Wheel input in pixel deltas: vertical zooms, horizontal scrolls.
    pub fn wheel(&mut self, x: f64, delta_x: f64, delta_y: f64) -> ChartResult<()> {
        let delta_x = delta_x / 100.0;
        let delta_y = -delta_y / 100.0;
        if delta_y != 0.0 && self.model.options().handle_scale {
            let scale = delta_y.signum() * delta_y.abs().min(1.0);
            self.model.zoom_time(x - self.layout.left_axis_width, scale)?;
        }
        if delta_x != 0.0 && self.model.options().handle_scroll {
            self.model.scroll_chart(delta_x * -80.0);
        }
        self.request_frame_if_needed();
        Ok(())
    }

    /// Animation-frame callback.
    ///
    /// Consumes the pending mask, relays out on `Full`, applies autoscale
    /// and time-scale changes on `Light` and paints every pane at its level.
    /// A relayout request raised by the pass itself is merged and the pass
    /// re-runs once before painting.
    pub fn on_animation_frame(&mut self, now: f64) -> ChartResult<()> {
        self.frame_request = None;
        self.drive_kinetic(now);
        let Some(mut mask) = self.model.take_pending_invalidation() else {
            return Ok(());
        };
        trace!(level = ?mask.global_level(), panes = self.model.panes().len(), "frame");

        self.apply_mask(&mask, now);
        if mask.global_level() >= InvalidationLevel::Light
            && self
                .model
                .pending_invalidation()
                .is_some_and(|pending| pending.global_level() == InvalidationLevel::Full)
            && let Some(mut pending) = self.model.take_pending_invalidation()
        {
            pending.merge(&mask);
            self.apply_mask(&pending, now);
            mask = pending;
        }
        if self
            .model
            .pending_invalidation()
            .is_some_and(|pending| is_subsumed_by(pending, &mask))
        {
            self.model.take_pending_invalidation();
        }

        self.paint(&mask);
        let viewport = self.frame.viewport;
        if viewport.is_valid() {
            self.renderer.render(&self.frame.flatten())?;
        }

        if let Some(animation) = mask.first_running_animation(now) {
            self.model.set_time_scale_animation(animation);
        }
        if self.kinetic.is_some_and(|kinetic| kinetic.is_started()) {
            self.model.light_update();
        }
        self.request_frame_if_needed();
        Ok(())
    }

    fn request_frame_if_needed(&mut self) {
        if self.frame_request.is_none() && self.model.pending_invalidation().is_some() {
            self.frame_request = Some(self.scheduler.request_frame());
        }
    }

    /// Cancels a requested frame; the pending mask stays queued.
    pub fn cancel_frame(&mut self) {
        if let Some(id) = self.frame_request.take() {
            self.scheduler.cancel_frame(id);
        }
    }

    fn clear_pointer(&mut self) {
        if self.model.crosshair().visible() {
            self.model.clear_current_position();
        }
        self.hovered = None;
    }

    fn drive_kinetic(&mut self, now: f64) {
        let Some(kinetic) = self.kinetic else {
            return;
        };
        if self.pointer_pressed || !kinetic.is_started() {
            return;
        }
        if kinetic.finished(now) {
            self.kinetic = None;
            self.model.end_scroll_time();
        } else {
            self.model.scroll_time_to(kinetic.position(now));
        }
    }

    fn update_hovered(&mut self, pane: PaneId, x: f64, y: f64) {
        let hovered = self
            .views
            .iter()
            .find(|views| views.pane == pane)
            .and_then(|views| {
                views
                    .series
                    .iter()
                    .rev()
                    .filter_map(|view| view.renderer())
                    .find_map(|renderer| renderer.hit_test(x, y))
            })
            .map(|hit| hit.hit_test_data);
        if hovered.map(|hit| hit.series) != self.hovered.map(|hit| hit.series) {
            self.model.light_update();
        }
        self.hovered = hovered;
    }

    fn apply_mask(&mut self, mask: &InvalidateMask, now: f64) {
        let level = mask.global_level();
        if level == InvalidationLevel::Full
            && let Err(err) = self.relayout()
        {
            warn!(error = %err, "relayout failed; keeping previous layout");
        }
        if level < InvalidationLevel::Light {
            return;
        }
        for (index, invalidation) in mask.explicit_panes() {
            if invalidation.auto_scale {
                self.model.momentary_auto_scale(index);
            }
        }
        for invalidation in mask.time_scale_invalidations() {
            if let TimeScaleInvalidation::Animation(animation) = invalidation
                && animation.finished(now)
            {
                continue;
            }
            if let Err(err) = self.model.apply_time_scale_invalidation(invalidation, now) {
                warn!(error = %err, ?invalidation, "time scale invalidation skipped");
            }
        }
        if level < InvalidationLevel::Full && self.axis_widths_changed() {
            self.model.full_update();
        }
    }

    fn axis_widths(&mut self) -> ChartResult<(f64, f64)> {
        let options = self.model.options().clone();
        let pane_ids: Vec<PaneId> = self.model.panes().iter().map(|pane| pane.id()).collect();
        let mut left = 0.0_f64;
        let mut right = 0.0_f64;
        for pane in pane_ids {
            if options.left_price_scale.visible {
                let width = price_axis_optimal_width(&mut self.model, pane, &PriceScaleId::left())?;
                left = left.max(width).max(options.left_price_scale.minimum_width);
            }
            if options.right_price_scale.visible {
                let width = price_axis_optimal_width(&mut self.model, pane, &PriceScaleId::right())?;
                right = right.max(width).max(options.right_price_scale.minimum_width);
            }
        }
        Ok((suggest_even(left), suggest_even(right)))
    }

    fn axis_widths_changed(&mut self) -> bool {
        match self.axis_widths() {
            Ok((left, right)) => {
                left != self.layout.left_axis_width || right != self.layout.right_axis_width
            }
            Err(err) => {
                warn!(error = %err, "price axis measurement failed");
                false
            }
        }
    }

    fn relayout(&mut self) -> ChartResult<()> {
        let (left_axis_width, right_axis_width) = self.axis_widths()?;
        let options = self.model.options().clone();
        let width = f64::from(options.width);
        let height = f64::from(options.height);
        let pane_width = (width - left_axis_width - right_axis_width).max(0.0);

        let time_axis_height = if options.time_scale.visible {
            suggest_even(
                time_axis_optimal_height(options.layout.font_size)
                    .max(options.time_scale.minimum_height),
            )
        } else {
            0.0
        };
        let total_pane_height = if height < time_axis_height {
            0.0
        } else {
            height - time_axis_height
        };
        let total_stretch: f64 = self.model.panes().iter().map(|pane| pane.stretch_factor()).sum();
        let stretch_pixels = if total_stretch > 0.0 {
            total_pane_height / total_stretch
        } else {
            0.0
        };

        let pane_count = self.model.panes().len();
        let mut panes = Vec::with_capacity(pane_count);
        let mut accumulated = 0.0;
        for index in 0..pane_count {
            let pane = &self.model.panes()[index];
            let (id, stretch) = (pane.id(), pane.stretch_factor());
            let computed = if index + 1 == pane_count {
                total_pane_height - accumulated
            } else {
                (stretch * stretch_pixels).round()
            };
            let pane_height = computed.max(MIN_PANE_HEIGHT);
            panes.push((id, accumulated, pane_height));
            accumulated += pane_height;
            self.model.set_pane_height(index, pane_height)?;
        }
        self.model.set_width(pane_width);

        debug!(
            left_axis_width,
            right_axis_width,
            time_axis_height,
            pane_width,
            pane_heights = ?panes.iter().map(|(_, _, h)| *h).collect::<Vec<_>>(),
            "layout updated"
        );

        self.layout = ChartLayout {
            width,
            height,
            left_axis_width,
            right_axis_width,
            time_axis_height,
            pane_width,
            panes,
        };
        self.rebuild_frame();
        Ok(())
    }

    fn rebuild_frame(&mut self) {
        let ratio = self.pixel_ratio;
        let viewport = Size::new(self.layout.width, self.layout.height).to_viewport(ratio, ratio);
        let stacks = self
            .layout
            .panes
            .iter()
            .map(|(id, _, _)| PaneLayerStack::canonical_for_pane(*id))
            .collect();
        let regions: Vec<(PaneId, f64, f64)> = self
            .layout
            .panes
            .iter()
            .map(|(id, top, height)| (*id, (top * ratio).round(), ((top + height) * ratio).round()))
            .collect();
        self.frame = LayeredRenderFrame::from_stacks(viewport, stacks).with_pane_regions(&regions);

        let mut previous = std::mem::take(&mut self.views);
        self.views = self
            .layout
            .panes
            .iter()
            .map(|(id, _, _)| match previous.iter().position(|views| views.pane == *id) {
                Some(position) => previous.swap_remove(position),
                None => PaneViews::new(*id),
            })
            .collect();
    }

    fn paint(&mut self, mask: &InvalidateMask) {
        let background = match Color::parse(&self.model.options().layout.background_color) {
            Ok(color) => color,
            Err(err) => {
                warn!(error = %err, "background color ignored");
                Color::rgb(1.0, 1.0, 1.0)
            }
        };
        let last_index = self.views.len().saturating_sub(1);
        for index in 0..self.views.len() {
            let level = mask.pane_invalidation(index).level;
            if level == InvalidationLevel::None {
                continue;
            }
            let Some((pane, top, height)) = self.layout.region(index) else {
                continue;
            };
            let stack = PaneLayerStack::canonical_for_pane(pane);
            for kind in stack.layers_for_level(level) {
                self.frame.clear_layer(pane, kind);
            }
            if level >= InvalidationLevel::Light {
                self.paint_light(index, pane, top, height, background);
                if index == last_index {
                    self.paint_time_axis(pane, top + height);
                }
            }
            self.paint_crosshair(index, pane, top, height);
        }
    }

    fn plot_region(&self, pane: PaneId, layer: CanvasLayerKind, top: f64, height: f64) -> TargetRegion {
        TargetRegion {
            pane_id: pane,
            layer,
            left: self.layout.left_axis_width,
            top,
            size: Size::new(self.layout.pane_width, height),
        }
    }

    fn paint_light(&mut self, index: usize, pane: PaneId, top: f64, height: f64, background: Color) {
        let ratio = self.pixel_ratio;
        let region = self.plot_region(pane, CanvasLayerKind::Background, top, height);
        RenderingTarget::new(&mut self.frame, region, ratio, ratio).use_media_coordinate_space(
            |scope| {
                let size = scope.media_size;
                scope.canvas.fill_rect(0.0, 0.0, size.width, size.height, background);
            },
        );

        let views = &mut self.views[index];
        if let Err(err) = views.grid.update(&mut self.model, pane) {
            warn!(error = %err, pane = pane.raw(), "grid view skipped");
        }
        let region = self.plot_region(pane, CanvasLayerKind::Grid, top, height);
        if let Some(renderer) = self.views[index].grid.renderer() {
            renderer.draw(&mut RenderingTarget::new(&mut self.frame, region, ratio, ratio), false, None);
        }

        match self.model.ordered_sources(pane) {
            Ok(order) => {
                self.views[index].series = order.into_iter().map(SeriesView::new).collect();
            }
            Err(err) => warn!(error = %err, pane = pane.raw(), "series order unavailable"),
        }
        let region = self.plot_region(pane, CanvasLayerKind::Series, top, height);
        let hovered = self.hovered;
        for view in &mut self.views[index].series {
            if let Err(err) = view.update(&mut self.model, pane) {
                warn!(error = %err, series = view.series().raw(), "series view skipped");
                continue;
            }
            let Some(renderer) = view.renderer() else {
                continue;
            };
            let is_hovered = hovered.is_some_and(|hit| hit.series == view.series());
            let hit = hovered.filter(|_| is_hovered);
            let mut target = RenderingTarget::new(&mut self.frame, region, ratio, ratio);
            renderer.draw_background(&mut target, is_hovered, hit.as_ref());
            renderer.draw(&mut target, is_hovered, hit.as_ref());
        }

        let axes = [
            (self.model.options().left_price_scale.visible, true),
            (self.model.options().right_price_scale.visible, false),
        ];
        for (visible, is_left) in axes {
            if !visible {
                continue;
            }
            let (left, width) = if is_left {
                (0.0, self.layout.left_axis_width)
            } else {
                (
                    self.layout.left_axis_width + self.layout.pane_width,
                    self.layout.right_axis_width,
                )
            };
            let region = TargetRegion {
                pane_id: pane,
                layer: CanvasLayerKind::Axis,
                left,
                top,
                size: Size::new(width, height),
            };
            let view = if is_left {
                &mut self.views[index].left_axis
            } else {
                &mut self.views[index].right_axis
            };
            if let Err(err) = view.update(&mut self.model, pane) {
                warn!(error = %err, scale = %view.scale_id(), "price axis skipped");
                continue;
            }
            if let Some(renderer) = view.renderer() {
                renderer.draw(&mut RenderingTarget::new(&mut self.frame, region, ratio, ratio), false, None);
            }
        }
    }

    fn paint_time_axis(&mut self, pane: PaneId, top: f64) {
        if self.layout.time_axis_height <= 0.0 {
            return;
        }
        if let Err(err) = self.time_axis.update(&mut self.model, pane) {
            warn!(error = %err, "time axis skipped");
            return;
        }
        let region = TargetRegion {
            pane_id: pane,
            layer: CanvasLayerKind::Axis,
            left: self.layout.left_axis_width,
            top,
            size: Size::new(self.layout.pane_width, self.layout.time_axis_height),
        };
        if let Some(renderer) = self.time_axis.renderer() {
            let ratio = self.pixel_ratio;
            renderer.draw(&mut RenderingTarget::new(&mut self.frame, region, ratio, ratio), false, None);
        }
    }

    fn paint_crosshair(&mut self, index: usize, pane: PaneId, top: f64, height: f64) {
        let view = &mut self.views[index].crosshair;
        if let Err(err) = view.update(&mut self.model, pane) {
            warn!(error = %err, pane = pane.raw(), "crosshair view skipped");
            return;
        }
        let region = self.plot_region(pane, CanvasLayerKind::Crosshair, top, height);
        if let Some(renderer) = self.views[index].crosshair.renderer() {
            let ratio = self.pixel_ratio;
            renderer.draw(&mut RenderingTarget::new(&mut self.frame, region, ratio, ratio), false, None);
        }
    }
}

/// Whether painting at `mask` already covers everything `pending` asks for.
fn is_subsumed_by(pending: &InvalidateMask, mask: &InvalidateMask) -> bool {
    pending.global_level() <= mask.global_level()
        && pending.time_scale_invalidations().is_empty()
        && pending.explicit_panes().all(|(index, invalidation)| {
            !invalidation.auto_scale && invalidation.level <= mask.pane_invalidation(index).level
        })
}

#[cfg(test)]
mod tests {
    use super::{ChartWidget, MIN_PANE_HEIGHT};
    use crate::core::HorzTime;
    use crate::model::{ChartOptions, InvalidationLevel, SeriesDataItem, SeriesOptions, SeriesType};
    use crate::render::{ManualFrameScheduler, NullRenderer};

    fn widget() -> ChartWidget<ManualFrameScheduler, NullRenderer> {
        let options = ChartOptions {
            width: 800,
            height: 600,
            ..ChartOptions::default()
        };
        ChartWidget::new(options, ManualFrameScheduler::new(), NullRenderer::default())
            .expect("widget")
    }

    fn closes(values: &[f64]) -> Vec<SeriesDataItem> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| SeriesDataItem::value(HorzTime::Timestamp(86_400 * (i as i64 + 1)), *value))
            .collect()
    }

    #[test]
    fn invalidations_between_frames_request_one_frame() {
        let mut widget = widget();
        assert_eq!(widget.scheduler().requested(), 1);
        widget.update_model(|model| model.light_update());
        widget.update_model(|model| model.cursor_update());
        assert_eq!(widget.scheduler().requested(), 1);

        widget.scheduler_mut().take_pending();
        widget.on_animation_frame(16.0).expect("frame");
        assert!(widget.model().pending_invalidation().is_none());
        assert_eq!(widget.renderer().frames_rendered, 1);
        assert_eq!(widget.scheduler().requested(), 1);
    }

    #[test]
    fn relayout_splits_height_by_stretch_factor() {
        let mut widget = widget();
        widget.update_model(|model| model.create_pane(None));
        widget.on_animation_frame(0.0).expect("frame");

        let layout = widget.layout().clone();
        assert_eq!(layout.panes.len(), 2);
        let total: f64 = layout.panes.iter().map(|(_, _, h)| h).sum();
        assert_eq!(total + layout.time_axis_height, 600.0);
        let (_, _, first) = layout.panes[0];
        let (_, second_top, second) = layout.panes[1];
        assert_eq!(first, ((600.0 - layout.time_axis_height) * 2.0 / 3.0).round());
        assert_eq!(second_top, first);
        assert!(second >= MIN_PANE_HEIGHT);
        assert_eq!(layout.pane_width, 800.0 - layout.right_axis_width);
        assert_eq!(widget.model().time_scale().width(), layout.pane_width);
    }

    #[test]
    fn data_paints_series_and_axis_layers() {
        let mut widget = widget();
        let series = widget
            .update_model(|model| model.create_series(SeriesOptions::for_type(SeriesType::Candlestick), None))
            .expect("series");
        let rows: Vec<_> = (0..50)
            .map(|i| {
                SeriesDataItem::ohlc(
                    HorzTime::Timestamp(86_400 * (i + 1)),
                    100.0 + i as f64,
                    105.0 + i as f64,
                    95.0 + i as f64,
                    101.0 + i as f64,
                )
            })
            .collect();
        widget
            .update_model(|model| model.apply_new_data(series, &rows))
            .expect("data");
        widget.on_animation_frame(0.0).expect("frame");

        let frame = widget.renderer().last_frame.clone().expect("rendered");
        // Background plus one body per visible candle.
        assert!(frame.rects.len() > 50);
        assert!(!frame.texts.is_empty());
        assert!(widget.layout().right_axis_width > 0.0);
    }

    #[test]
    fn cursor_pass_keeps_series_layers() {
        let mut widget = widget();
        let series = widget
            .update_model(|model| model.create_series(SeriesOptions::for_type(SeriesType::Line), None))
            .expect("series");
        widget
            .update_model(|model| model.apply_new_data(series, &closes(&[1.0, 2.0, 3.0, 2.5])))
            .expect("data");
        widget.on_animation_frame(0.0).expect("frame");
        let lines_before = widget.renderer().last_line_count;

        widget.pointer_move(400.0, 200.0, 10.0).expect("move");
        let pending = widget.model().pending_invalidation().expect("cursor mask");
        assert_eq!(pending.global_level(), InvalidationLevel::Cursor);
        widget.on_animation_frame(16.0).expect("frame");

        // Same series lines plus the two crosshair lines.
        assert_eq!(widget.renderer().last_line_count, lines_before + 2);
    }

    #[test]
    fn kinetic_scroll_keeps_requesting_frames_until_finished() {
        let mut widget = widget();
        let series = widget
            .update_model(|model| model.create_series(SeriesOptions::for_type(SeriesType::Line), None))
            .expect("series");
        let values: Vec<f64> = (0..500).map(f64::from).collect();
        widget
            .update_model(|model| model.apply_new_data(series, &closes(&values)))
            .expect("data");
        widget.on_animation_frame(0.0).expect("frame");

        widget.pointer_down(400.0, 100.0, 100.0);
        widget.pointer_move(380.0, 100.0, 110.0).expect("move");
        widget.pointer_move(340.0, 100.0, 120.0).expect("move");
        widget.pointer_move(300.0, 100.0, 130.0).expect("move");
        widget.pointer_up(260.0, 140.0);
        let offset_at_release = widget.model().time_scale().right_offset();

        widget.on_animation_frame(160.0).expect("frame");
        assert!(widget.model().pending_invalidation().is_some());
        assert!(widget.model().time_scale().right_offset() > offset_at_release);

        let mut now = 160.0;
        while widget.model().pending_invalidation().is_some() && now < 60_000.0 {
            now += 16.0;
            widget.on_animation_frame(now).expect("frame");
        }
        assert!(widget.model().pending_invalidation().is_none());
    }
}
