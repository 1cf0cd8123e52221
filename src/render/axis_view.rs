use crate::core::{PaneId, PriceScaleId};
use crate::error::{ChartError, ChartResult};
use crate::model::{ChartModel, PriceDataSource};

use super::pane_view::{HitTestData, PaneRenderer, PaneView};
use super::primitives::estimate_text_width;
use super::{CanvasLayerKind, Color, RenderingTarget, TextHAlign};

pub const AXIS_BORDER_SIZE: f64 = 1.0;
pub const AXIS_TICK_LENGTH: f64 = 5.0;
const PRICE_LABEL_OFFSET: f64 = 5.0;
const DEFAULT_OPTIMAL_WIDTH: f64 = 34.0;
/// Probe offset that yields the longest fractional label of a range end.
const WIDEST_FRACTION: f64 = 0.111_111_111_111_11;

/// Rounds odd sizes up to the next even pixel.
#[must_use]
pub fn suggest_even(size: f64) -> f64 {
    size + size % 2.0
}

fn padding_inner(font_size: f64) -> f64 {
    (font_size / 2.0 - AXIS_TICK_LENGTH / 2.0).ceil().max(0.0)
}

fn padding_outer(font_size: f64) -> f64 {
    (font_size / 2.0 + AXIS_TICK_LENGTH / 2.0).ceil()
}

/// Width a price axis needs to fit the labels of `scale_id` in `pane`.
pub fn price_axis_optimal_width(
    model: &mut ChartModel,
    pane: PaneId,
    scale_id: &PriceScaleId,
) -> ChartResult<f64> {
    let font_size = model.options().layout.font_size;
    let mut widest = model
        .price_marks(pane, scale_id)?
        .iter()
        .map(|mark| estimate_text_width(&mark.label, font_size))
        .fold(0.0, f64::max);

    let scale = model.price_scale(pane, scale_id)?;
    if let Some(first_value) = scale.first_value()
        && !scale.is_empty()
    {
        let top = scale.coordinate_to_price(1.0, first_value);
        let bottom = scale.coordinate_to_price(scale.height() - 2.0, first_value);
        for probe in [
            top.min(bottom).floor() + WIDEST_FRACTION,
            top.max(bottom).ceil() - WIDEST_FRACTION,
        ] {
            widest = widest.max(estimate_text_width(&scale.format_price(probe, first_value), font_size));
        }
    }

    let label = if widest > 0.0 { widest } else { DEFAULT_OPTIMAL_WIDTH };
    let width = (AXIS_BORDER_SIZE
        + AXIS_TICK_LENGTH
        + padding_inner(font_size)
        + padding_outer(font_size)
        + PRICE_LABEL_OFFSET
        + label)
        .ceil();
    Ok(suggest_even(width))
}

/// Height of the time axis for a font size.
#[must_use]
pub fn time_axis_optimal_height(font_size: f64) -> f64 {
    let padding_top = 3.0 * font_size / 12.0;
    let padding_bottom = 3.0 * font_size / 12.0;
    let label_bottom_offset = 4.0 * font_size / 12.0;
    (AXIS_BORDER_SIZE + AXIS_TICK_LENGTH + font_size + padding_top + padding_bottom + label_bottom_offset)
        .ceil()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabel {
    pub coord: f64,
    pub text: String,
    pub color: Color,
    /// Filled label box, used by last-value labels.
    pub background: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceAxisRenderer {
    pub labels: Vec<AxisLabel>,
    pub is_left: bool,
    pub ticks_visible: bool,
    pub font_size: f64,
    pub border_color: Color,
}

impl PaneRenderer for PriceAxisRenderer {
    fn draw(&self, target: &mut RenderingTarget<'_>, _is_hovered: bool, _hit: Option<&HitTestData>) {
        target.use_media_coordinate_space(|scope| {
            let width = scope.media_size.width;
            let height = scope.media_size.height;
            let (edge, tick_from, tick_to, text_x, align) = if self.is_left {
                let edge = width - AXIS_BORDER_SIZE;
                let text_x = edge - AXIS_TICK_LENGTH - padding_inner(self.font_size);
                (edge, edge - AXIS_TICK_LENGTH, edge, text_x, TextHAlign::Right)
            } else {
                let text_x = AXIS_BORDER_SIZE + AXIS_TICK_LENGTH + padding_inner(self.font_size);
                (0.0, AXIS_BORDER_SIZE, AXIS_BORDER_SIZE + AXIS_TICK_LENGTH, text_x, TextHAlign::Left)
            };
            scope
                .canvas
                .fill_rect(edge, 0.0, AXIS_BORDER_SIZE, height, self.border_color);
            for label in &self.labels {
                if let Some(background) = label.background {
                    let box_height = self.font_size + 4.0;
                    scope.canvas.fill_rect(
                        0.0,
                        label.coord - box_height / 2.0,
                        width,
                        box_height,
                        background,
                    );
                }
                if self.ticks_visible || label.background.is_some() {
                    scope.canvas.line(
                        (tick_from, label.coord),
                        (tick_to, label.coord),
                        1.0,
                        label.color,
                    );
                }
                scope.canvas.text(
                    label.text.clone(),
                    (text_x, label.coord - self.font_size / 2.0),
                    self.font_size,
                    label.color,
                    align,
                );
            }
        });
    }
}

/// Labels of one side's price scale plus the last values of series on it.
#[derive(Debug)]
pub struct PriceAxisView {
    scale_id: PriceScaleId,
    renderer: Option<PriceAxisRenderer>,
}

impl PriceAxisView {
    #[must_use]
    pub fn new(scale_id: PriceScaleId) -> Self {
        Self {
            scale_id,
            renderer: None,
        }
    }

    #[must_use]
    pub fn scale_id(&self) -> &PriceScaleId {
        &self.scale_id
    }
}

impl PaneView for PriceAxisView {
    fn layer(&self) -> CanvasLayerKind {
        CanvasLayerKind::Axis
    }

    fn update(&mut self, model: &mut ChartModel, pane: PaneId) -> ChartResult<()> {
        self.renderer = None;
        let layout = model.options().layout.clone();
        let text_color = Color::parse(&layout.text_color)?;
        let background_color = Color::parse(&layout.background_color)?;

        let scale = model.price_scale(pane, &self.scale_id)?;
        if scale.is_empty() {
            return Ok(());
        }
        let ticks_visible = scale.options().ticks_visible;
        let mut labels: Vec<AxisLabel> = model
            .price_marks(pane, &self.scale_id)?
            .iter()
            .map(|mark| AxisLabel {
                coord: mark.coord,
                text: mark.label.clone(),
                color: text_color,
                background: None,
            })
            .collect();

        let sources = model
            .pane(pane)
            .ok_or(ChartError::UnknownPane(pane))?
            .data_sources()
            .to_vec();
        for id in sources {
            let on_this_scale = model.series(id).is_some_and(|series| {
                series.visible()
                    && series.options().last_value_visible
                    && *series.price_scale_id() == self.scale_id
            });
            if !on_this_scale {
                continue;
            }
            if let Some(last) = model.series_last_value(id) {
                labels.push(AxisLabel {
                    coord: last.coordinate,
                    text: last.text,
                    color: background_color,
                    background: Some(Color::parse(&last.color)?),
                });
            }
        }

        self.renderer = Some(PriceAxisRenderer {
            labels,
            is_left: self.scale_id == PriceScaleId::left(),
            ticks_visible,
            font_size: layout.font_size,
            border_color: text_color.with_alpha(0.2),
        });
        Ok(())
    }

    fn renderer(&self) -> Option<&dyn PaneRenderer> {
        self.renderer.as_ref().map(|renderer| renderer as &dyn PaneRenderer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxisRenderer {
    pub labels: Vec<AxisLabel>,
    pub font_size: f64,
    pub border_color: Color,
}

impl PaneRenderer for TimeAxisRenderer {
    fn draw(&self, target: &mut RenderingTarget<'_>, _is_hovered: bool, _hit: Option<&HitTestData>) {
        target.use_media_coordinate_space(|scope| {
            let width = scope.media_size.width;
            scope
                .canvas
                .fill_rect(0.0, 0.0, width, AXIS_BORDER_SIZE, self.border_color);
            let text_y = AXIS_BORDER_SIZE + AXIS_TICK_LENGTH + 3.0 * self.font_size / 12.0;
            for label in &self.labels {
                scope.canvas.line(
                    (label.coord, AXIS_BORDER_SIZE),
                    (label.coord, AXIS_BORDER_SIZE + AXIS_TICK_LENGTH),
                    1.0,
                    label.color,
                );
                scope.canvas.text(
                    label.text.clone(),
                    (label.coord, text_y),
                    self.font_size,
                    label.color,
                    TextHAlign::Center,
                );
            }
        });
    }
}

/// Time mark labels under the bottom pane.
#[derive(Debug, Default)]
pub struct TimeAxisView {
    renderer: Option<TimeAxisRenderer>,
}

impl TimeAxisView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaneView for TimeAxisView {
    fn layer(&self) -> CanvasLayerKind {
        CanvasLayerKind::Axis
    }

    fn update(&mut self, model: &mut ChartModel, _pane: PaneId) -> ChartResult<()> {
        self.renderer = None;
        if !model.options().time_scale.visible {
            return Ok(());
        }
        let layout = model.options().layout.clone();
        let color = Color::parse(&layout.text_color)?;
        let Some(marks) = model.time_marks() else {
            return Ok(());
        };
        let labels = marks
            .iter()
            .map(|mark| AxisLabel {
                coord: mark.coord,
                text: mark.label.clone(),
                color,
                background: None,
            })
            .collect();
        self.renderer = Some(TimeAxisRenderer {
            labels,
            font_size: layout.font_size,
            border_color: color.with_alpha(0.2),
        });
        Ok(())
    }

    fn renderer(&self) -> Option<&dyn PaneRenderer> {
        self.renderer.as_ref().map(|renderer| renderer as &dyn PaneRenderer)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{suggest_even, time_axis_optimal_height};

    #[test]
    fn axis_sizes_round_to_even_pixels() {
        assert_relative_eq!(suggest_even(69.0), 70.0);
        assert_relative_eq!(suggest_even(70.0), 70.0);
        assert_relative_eq!(time_axis_optimal_height(12.0), 28.0);
    }
}
