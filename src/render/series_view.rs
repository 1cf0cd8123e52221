use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use crate::core::{PaneId, SeriesId};
use crate::error::{ChartError, ChartResult};
use crate::model::{
    BarCoordinate, BarPrices, ChartModel, PlotRow, PriceDataSource, PriceScale, Series,
    SeriesStyle, TimePointIndex,
};

use super::pane_view::{HitTestData, HitTestResult, PaneRenderer, PaneView};
use super::{CanvasLayerKind, Color, RenderingTarget};

const HIT_TOLERANCE: f64 = 3.0;

/// One visible bar, in pane media coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesItem {
    pub index: TimePointIndex,
    pub x: f64,
    pub open_y: f64,
    pub high_y: f64,
    pub low_y: f64,
    pub close_y: f64,
    pub color: Color,
    pub border_color: Color,
    pub wick_color: Color,
}

impl BarCoordinate for SeriesItem {
    fn bar_index(&self) -> TimePointIndex {
        self.index
    }

    fn set_x(&mut self, x: f64) {
        self.x = x;
    }
}

/// Geometry family of a series together with its style-level parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesShape {
    Bars { open_visible: bool, thin: bool },
    Candles { wick_visible: bool, border_visible: bool },
    Line { line_width: f64 },
    Area { line_width: f64, fill: Color, base_y: f64 },
    Baseline { line_width: f64, base_y: f64 },
    Histogram { base_y: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRenderer {
    pub series: SeriesId,
    pub shape: SeriesShape,
    pub items: Vec<SeriesItem>,
    pub bar_spacing: f64,
}

/// Candle body width in bitmap pixels for a bar spacing.
#[must_use]
pub fn optimal_candlestick_width(bar_spacing: f64, pixel_ratio: f64) -> f64 {
    if (2.5..=4.0).contains(&bar_spacing) {
        return (3.0 * pixel_ratio).floor();
    }
    let coeff = 1.0 - 0.2 * (bar_spacing.max(4.0) - 4.0).atan() / FRAC_PI_2;
    let width = (bar_spacing * coeff * pixel_ratio).floor();
    let scaled_spacing = (bar_spacing * pixel_ratio).floor();
    width.min(scaled_spacing).max(pixel_ratio.floor())
}

/// OHLC bar stem width in bitmap pixels.
#[must_use]
pub fn optimal_bar_width(bar_spacing: f64, pixel_ratio: f64) -> f64 {
    (bar_spacing * 0.3 * pixel_ratio).floor().max(1.0)
}

impl SeriesRenderer {
    fn nearest_item(&self, x: f64) -> Option<&SeriesItem> {
        let half = (self.bar_spacing / 2.0).max(HIT_TOLERANCE);
        self.items
            .iter()
            .filter(|item| (item.x - x).abs() <= half)
            .min_by(|a, b| (a.x - x).abs().total_cmp(&(b.x - x).abs()))
    }

    fn draw_bars(&self, target: &mut RenderingTarget<'_>, open_visible: bool, thin: bool) {
        target.use_bitmap_coordinate_space(|scope| {
            let ratio = scope.horizontal_pixel_ratio;
            let vertical = scope.vertical_pixel_ratio;
            let stem = if thin {
                ratio.floor().max(1.0)
            } else {
                optimal_bar_width(self.bar_spacing, ratio)
            };
            let tick = (self.bar_spacing * 0.3 * ratio).round().max(stem);
            for item in &self.items {
                let x = (item.x * ratio).round();
                let high = (item.high_y * vertical).round();
                let low = (item.low_y * vertical).round();
                scope.canvas.line((x, high), (x, low), stem, item.color);
                if open_visible {
                    let open = (item.open_y * vertical).round();
                    scope.canvas.line((x - tick, open), (x, open), stem, item.color);
                }
                let close = (item.close_y * vertical).round();
                scope.canvas.line((x, close), (x + tick, close), stem, item.color);
            }
        });
    }

    fn draw_candles(&self, target: &mut RenderingTarget<'_>, wick_visible: bool, border_visible: bool) {
        target.use_bitmap_coordinate_space(|scope| {
            let ratio = scope.horizontal_pixel_ratio;
            let vertical = scope.vertical_pixel_ratio;
            let body_width = optimal_candlestick_width(self.bar_spacing, ratio);
            let wick_width = ratio.floor().max(1.0).min(body_width);
            let border_width = if border_visible && body_width > 2.0 * ratio.floor() {
                ratio.floor().max(1.0)
            } else {
                0.0
            };
            for item in &self.items {
                let x = (item.x * ratio).round();
                if wick_visible {
                    let high = (item.high_y * vertical).round();
                    let low = (item.low_y * vertical).round();
                    scope.canvas.line((x, high), (x, low), wick_width, item.wick_color);
                }
                let top = (item.open_y.min(item.close_y) * vertical).round();
                let bottom = (item.open_y.max(item.close_y) * vertical).round();
                let left = x - (body_width / 2.0).floor();
                let rect = (left, top, body_width, (bottom - top).max(1.0));
                if border_width > 0.0 {
                    scope.canvas.stroke_rect(rect, item.color, border_width, item.border_color);
                } else {
                    scope.canvas.fill_rect(rect.0, rect.1, rect.2, rect.3, item.color);
                }
            }
        });
    }

    fn draw_line(&self, target: &mut RenderingTarget<'_>, line_width: f64) {
        target.use_media_coordinate_space(|scope| {
            for pair in self.items.windows(2) {
                scope.canvas.line(
                    (pair[0].x, pair[0].close_y),
                    (pair[1].x, pair[1].close_y),
                    line_width,
                    pair[0].color,
                );
            }
        });
    }

    fn draw_area_fill(&self, target: &mut RenderingTarget<'_>, fill: Color, base_y: f64) {
        let (Some(first), Some(last)) = (self.items.first(), self.items.last()) else {
            return;
        };
        let mut outline: Vec<(f64, f64)> = Vec::with_capacity(self.items.len() + 2);
        outline.extend(self.items.iter().map(|item| (item.x, item.close_y)));
        outline.push((last.x, base_y));
        outline.push((first.x, base_y));
        target.use_media_coordinate_space(|scope| scope.canvas.fill_polygon(&outline, fill));
    }

    fn draw_histogram(&self, target: &mut RenderingTarget<'_>, base_y: f64) {
        target.use_bitmap_coordinate_space(|scope| {
            let ratio = scope.horizontal_pixel_ratio;
            let vertical = scope.vertical_pixel_ratio;
            let width = optimal_candlestick_width(self.bar_spacing, ratio);
            let base = (base_y * vertical).round();
            for item in &self.items {
                let x = (item.x * ratio).round() - (width / 2.0).floor();
                let value = (item.close_y * vertical).round();
                let top = value.min(base);
                scope
                    .canvas
                    .fill_rect(x, top, width, (value - base).abs().max(1.0), item.color);
            }
        });
    }
}

impl PaneRenderer for SeriesRenderer {
    fn draw(&self, target: &mut RenderingTarget<'_>, _is_hovered: bool, _hit: Option<&HitTestData>) {
        match self.shape {
            SeriesShape::Bars { open_visible, thin } => self.draw_bars(target, open_visible, thin),
            SeriesShape::Candles {
                wick_visible,
                border_visible,
            } => self.draw_candles(target, wick_visible, border_visible),
            SeriesShape::Line { line_width }
            | SeriesShape::Area { line_width, .. }
            | SeriesShape::Baseline { line_width, .. } => self.draw_line(target, line_width),
            SeriesShape::Histogram { base_y } => self.draw_histogram(target, base_y),
        }
    }

    fn draw_background(
        &self,
        target: &mut RenderingTarget<'_>,
        _is_hovered: bool,
        _hit: Option<&HitTestData>,
    ) {
        if let SeriesShape::Area { fill, base_y, .. } = self.shape {
            self.draw_area_fill(target, fill, base_y);
        }
    }

    fn hit_test(&self, x: f64, y: f64) -> Option<HitTestResult> {
        let item = self.nearest_item(x)?;
        let hit = match self.shape {
            SeriesShape::Bars { .. } | SeriesShape::Candles { .. } => {
                y >= item.high_y - HIT_TOLERANCE && y <= item.low_y + HIT_TOLERANCE
            }
            SeriesShape::Line { line_width }
            | SeriesShape::Area { line_width, .. }
            | SeriesShape::Baseline { line_width, .. } => {
                (y - item.close_y).abs() <= line_width / 2.0 + HIT_TOLERANCE
            }
            SeriesShape::Histogram { base_y } => {
                y >= item.close_y.min(base_y) - HIT_TOLERANCE
                    && y <= item.close_y.max(base_y) + HIT_TOLERANCE
            }
        };
        hit.then(|| HitTestResult {
            hit_test_data: HitTestData {
                series: self.series,
                index: item.index,
            },
            external_id: None,
        })
    }
}

/// Body of one series: one item per visible bar.
#[derive(Debug)]
pub struct SeriesView {
    series: SeriesId,
    renderer: Option<SeriesRenderer>,
}

impl SeriesView {
    #[must_use]
    pub fn new(series: SeriesId) -> Self {
        Self {
            series,
            renderer: None,
        }
    }

    #[must_use]
    pub fn series(&self) -> SeriesId {
        self.series
    }

    #[must_use]
    pub fn items(&self) -> &[SeriesItem] {
        self.renderer.as_ref().map_or(&[], |renderer| &renderer.items)
    }
}

impl PaneView for SeriesView {
    fn layer(&self) -> CanvasLayerKind {
        CanvasLayerKind::Series
    }

    fn update(&mut self, model: &mut ChartModel, pane: PaneId) -> ChartResult<()> {
        self.renderer = None;
        let Some(visible) = model.time_scale_mut().visible_strict_range() else {
            return Ok(());
        };
        let series = model
            .series(self.series)
            .ok_or(ChartError::UnknownSeries(self.series))?;
        if !series.visible() {
            return Ok(());
        }
        let scale = model.price_scale(pane, series.price_scale_id())?;
        let Some(first_value) = scale.first_value() else {
            return Ok(());
        };
        if scale.is_empty() {
            return Ok(());
        }

        let shape = shape_for(series, scale, first_value)?;
        // Lines extend one bar past each edge so segments reach the border.
        let extend = i64::from(!series.series_type().is_ohlc() && !matches!(shape, SeriesShape::Histogram { .. }));
        let rows = visible_rows(series.bars().rows(), visible.left() - extend, visible.right() + extend);

        let mut prices: Vec<BarPrices> = rows
            .iter()
            .map(|row| BarPrices {
                open: row.open(),
                high: row.high(),
                low: row.low(),
                close: row.close(),
                ..BarPrices::default()
            })
            .collect();
        scale.bar_prices_to_coordinates(&mut prices, first_value, None);

        let colorer = series.bar_colorer();
        let mut palette = HashMap::new();
        let mut items = Vec::with_capacity(rows.len());
        for (row, price) in rows.iter().zip(&prices) {
            let index = row.index as TimePointIndex;
            let Some(colors) = colorer.bar_style(index, Some(row)) else {
                continue;
            };
            let color = resolve(&mut palette, &colors.bar_color)?;
            let border_color = match &colors.border_color {
                Some(css) => resolve(&mut palette, css)?,
                None => color,
            };
            let wick_color = match &colors.wick_color {
                Some(css) => resolve(&mut palette, css)?,
                None => color,
            };
            items.push(SeriesItem {
                index,
                x: 0.0,
                open_y: price.open_y,
                high_y: price.high_y,
                low_y: price.low_y,
                close_y: price.close_y,
                color,
                border_color,
                wick_color,
            });
        }
        model.time_scale().indexes_to_coordinates(&mut items, None);

        self.renderer = Some(SeriesRenderer {
            series: self.series,
            shape,
            items,
            bar_spacing: model.time_scale().bar_spacing(),
        });
        Ok(())
    }

    fn renderer(&self) -> Option<&dyn PaneRenderer> {
        self.renderer.as_ref().map(|renderer| renderer as &dyn PaneRenderer)
    }
}

fn shape_for(series: &Series, scale: &PriceScale, first_value: f64) -> ChartResult<SeriesShape> {
    let bottom = scale.height();
    Ok(match &series.options().style {
        SeriesStyle::Bar(style) => SeriesShape::Bars {
            open_visible: style.open_visible,
            thin: style.thin_bars,
        },
        SeriesStyle::Candlestick(style) => SeriesShape::Candles {
            wick_visible: style.wick_visible,
            border_visible: style.border_visible,
        },
        SeriesStyle::Line(style) | SeriesStyle::Custom(style) => SeriesShape::Line {
            line_width: style.line_width,
        },
        SeriesStyle::Area(style) => SeriesShape::Area {
            line_width: style.line_width,
            fill: Color::parse(&style.top_color)?,
            base_y: bottom,
        },
        SeriesStyle::Baseline(style) => SeriesShape::Baseline {
            line_width: style.line_width,
            base_y: scale.price_to_coordinate(style.base_value, first_value),
        },
        SeriesStyle::Histogram(style) => SeriesShape::Histogram {
            base_y: scale.price_to_coordinate(style.base, first_value),
        },
    })
}

fn visible_rows(rows: &[PlotRow], left: TimePointIndex, right: TimePointIndex) -> &[PlotRow] {
    let from = rows.partition_point(|row| (row.index as TimePointIndex) < left);
    let to = rows.partition_point(|row| (row.index as TimePointIndex) <= right);
    &rows[from..to.max(from)]
}

fn resolve(palette: &mut HashMap<String, Color>, css: &str) -> ChartResult<Color> {
    if let Some(color) = palette.get(css) {
        return Ok(*color);
    }
    let color = Color::parse(css)?;
    palette.insert(css.to_owned(), color);
    Ok(color)
}
