use crate::core::{PaneId, Size, Viewport};

use super::{
    CanvasLayerKind, Color, LayeredRenderFrame, LinePrimitive, LineStrokeStyle, PolygonPrimitive,
    RectPrimitive, TextHAlign, TextPrimitive,
};

/// Placement of a drawing region inside the chart, in media pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRegion {
    pub pane_id: PaneId,
    pub layer: CanvasLayerKind,
    pub left: f64,
    pub top: f64,
    pub size: Size,
}

/// Drawing surface handed to pane renderers.
///
/// Renderers pick a coordinate space per call; both record into the same
/// retained layer.
#[derive(Debug)]
pub struct RenderingTarget<'a> {
    frame: &'a mut LayeredRenderFrame,
    region: TargetRegion,
    horizontal_pixel_ratio: f64,
    vertical_pixel_ratio: f64,
}

impl<'a> RenderingTarget<'a> {
    #[must_use]
    pub fn new(
        frame: &'a mut LayeredRenderFrame,
        region: TargetRegion,
        horizontal_pixel_ratio: f64,
        vertical_pixel_ratio: f64,
    ) -> Self {
        Self {
            frame,
            region,
            horizontal_pixel_ratio,
            vertical_pixel_ratio,
        }
    }

    #[must_use]
    pub fn media_size(&self) -> Size {
        self.region.size
    }

    #[must_use]
    pub fn bitmap_size(&self) -> Viewport {
        self.region
            .size
            .to_viewport(self.horizontal_pixel_ratio, self.vertical_pixel_ratio)
    }

    #[must_use]
    pub fn layer(&self) -> CanvasLayerKind {
        self.region.layer
    }

    /// Runs `draw` with coordinates in media (CSS) pixels relative to the
    /// region's top-left corner.
    pub fn use_media_coordinate_space<R>(
        &mut self,
        draw: impl FnOnce(&mut MediaCoordinatesScope<'_>) -> R,
    ) -> R {
        let media_size = self.region.size;
        let canvas = self.canvas(self.horizontal_pixel_ratio, self.vertical_pixel_ratio);
        let mut scope = MediaCoordinatesScope { media_size, canvas };
        draw(&mut scope)
    }

    /// Runs `draw` with coordinates in physical pixels relative to the
    /// region's top-left corner.
    pub fn use_bitmap_coordinate_space<R>(
        &mut self,
        draw: impl FnOnce(&mut BitmapCoordinatesScope<'_>) -> R,
    ) -> R {
        let bitmap_size = self.bitmap_size();
        let horizontal_pixel_ratio = self.horizontal_pixel_ratio;
        let vertical_pixel_ratio = self.vertical_pixel_ratio;
        let canvas = self.canvas(1.0, 1.0);
        let mut scope = BitmapCoordinatesScope {
            bitmap_size,
            horizontal_pixel_ratio,
            vertical_pixel_ratio,
            canvas,
        };
        draw(&mut scope)
    }

    fn canvas(&mut self, scale_x: f64, scale_y: f64) -> Canvas<'_> {
        Canvas {
            offset_x: (self.region.left * self.horizontal_pixel_ratio).round(),
            offset_y: (self.region.top * self.vertical_pixel_ratio).round(),
            scale_x,
            scale_y,
            pane_id: self.region.pane_id,
            layer: self.region.layer,
            frame: &mut *self.frame,
        }
    }
}

pub struct MediaCoordinatesScope<'s> {
    pub media_size: Size,
    pub canvas: Canvas<'s>,
}

pub struct BitmapCoordinatesScope<'s> {
    pub bitmap_size: Viewport,
    pub horizontal_pixel_ratio: f64,
    pub vertical_pixel_ratio: f64,
    pub canvas: Canvas<'s>,
}

/// Records primitives, mapping scope coordinates onto the frame.
pub struct Canvas<'s> {
    frame: &'s mut LayeredRenderFrame,
    pane_id: PaneId,
    layer: CanvasLayerKind,
    offset_x: f64,
    offset_y: f64,
    scale_x: f64,
    scale_y: f64,
}

impl Canvas<'_> {
    fn x(&self, x: f64) -> f64 {
        self.offset_x + x * self.scale_x
    }

    fn y(&self, y: f64) -> f64 {
        self.offset_y + y * self.scale_y
    }

    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color) {
        self.styled_line(from, to, width, color, LineStrokeStyle::Solid);
    }

    pub fn styled_line(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        width: f64,
        color: Color,
        style: LineStrokeStyle,
    ) {
        let line = LinePrimitive::new(
            self.x(from.0),
            self.y(from.1),
            self.x(to.0),
            self.y(to.1),
            width * self.scale_x,
            color,
        )
        .with_stroke_style(style);
        self.frame.push_line(self.pane_id, self.layer, line);
    }

    /// Draws a connected line through `points`.
    pub fn polyline(&mut self, points: &[(f64, f64)], width: f64, color: Color) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], width, color);
        }
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        let rect = RectPrimitive::new(
            self.x(x),
            self.y(y),
            width * self.scale_x,
            height * self.scale_y,
            color,
        );
        self.frame.push_rect(self.pane_id, self.layer, rect);
    }

    pub fn stroke_rect(
        &mut self,
        (x, y, width, height): (f64, f64, f64, f64),
        fill: Color,
        border_width: f64,
        border_color: Color,
    ) {
        let rect = RectPrimitive::new(
            self.x(x),
            self.y(y),
            width * self.scale_x,
            height * self.scale_y,
            fill,
        )
        .with_border(border_width * self.scale_x, border_color);
        self.frame.push_rect(self.pane_id, self.layer, rect);
    }

    pub fn fill_polygon(&mut self, points: &[(f64, f64)], color: Color) {
        if points.len() < 3 {
            return;
        }
        let mapped = points.iter().map(|(x, y)| (self.x(*x), self.y(*y))).collect();
        self.frame
            .push_polygon(self.pane_id, self.layer, PolygonPrimitive::new(mapped, color));
    }

    pub fn text(
        &mut self,
        text: impl Into<String>,
        (x, y): (f64, f64),
        font_size: f64,
        color: Color,
        h_align: TextHAlign,
    ) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        let primitive = TextPrimitive::new(
            text,
            self.x(x),
            self.y(y),
            font_size * self.scale_y,
            color,
            h_align,
        );
        self.frame.push_text(self.pane_id, self.layer, primitive);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{RenderingTarget, TargetRegion};
    use crate::core::{PaneId, Size, Viewport};
    use crate::render::{CanvasLayerKind, Color, LayeredRenderFrame, PaneLayerStack};

    fn frame(pane_id: PaneId) -> LayeredRenderFrame {
        LayeredRenderFrame::from_stacks(
            Viewport::new(400, 200),
            vec![PaneLayerStack::canonical_for_pane(pane_id)],
        )
    }

    #[test]
    fn media_and_bitmap_scopes_land_on_the_same_pixels() {
        let pane_id = PaneId::new(0);
        let mut layered = frame(pane_id);
        let region = TargetRegion {
            pane_id,
            layer: CanvasLayerKind::Series,
            left: 10.0,
            top: 20.0,
            size: Size::new(100.0, 50.0),
        };
        let mut target = RenderingTarget::new(&mut layered, region, 2.0, 2.0);
        assert_eq!(target.bitmap_size(), Viewport::new(200, 100));

        target.use_media_coordinate_space(|scope| {
            assert_eq!(scope.media_size, Size::new(100.0, 50.0));
            scope.canvas.line((5.0, 5.0), (15.0, 5.0), 1.0, Color::rgb(0.0, 0.0, 0.0));
        });
        target.use_bitmap_coordinate_space(|scope| {
            assert_relative_eq!(scope.horizontal_pixel_ratio, 2.0);
            scope.canvas.line((10.0, 10.0), (30.0, 10.0), 2.0, Color::rgb(0.0, 0.0, 0.0));
        });

        let flattened = layered.flatten();
        assert_eq!(flattened.lines.len(), 2);
        assert_eq!(flattened.lines[0], flattened.lines[1]);
        assert_relative_eq!(flattened.lines[0].x1, 30.0);
        assert_relative_eq!(flattened.lines[0].y1, 50.0);
        assert_relative_eq!(flattened.lines[0].stroke_width, 2.0);
    }

    #[test]
    fn degenerate_shapes_are_skipped() {
        let pane_id = PaneId::new(0);
        let mut layered = frame(pane_id);
        let region = TargetRegion {
            pane_id,
            layer: CanvasLayerKind::Axis,
            left: 0.0,
            top: 0.0,
            size: Size::new(100.0, 50.0),
        };
        let mut target = RenderingTarget::new(&mut layered, region, 1.0, 1.0);
        target.use_media_coordinate_space(|scope| {
            scope.canvas.fill_polygon(&[(0.0, 0.0), (1.0, 1.0)], Color::rgb(0.0, 0.0, 0.0));
            scope.canvas.text(
                "",
                (0.0, 0.0),
                12.0,
                Color::rgb(0.0, 0.0, 0.0),
                crate::render::TextHAlign::Left,
            );
        });
        assert!(layered.flatten().is_empty());
    }
}
