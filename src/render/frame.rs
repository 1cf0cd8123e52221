use crate::core::Viewport;
use crate::error::{ChartError, ChartResult};
use crate::render::{LinePrimitive, PolygonPrimitive, RectPrimitive, TextPrimitive};

/// Flattened scene handed to a [`Renderer`](crate::render::Renderer), in
/// bitmap pixels and painter's order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub viewport: Viewport,
    pub polygons: Vec<PolygonPrimitive>,
    pub rects: Vec<RectPrimitive>,
    pub lines: Vec<LinePrimitive>,
    pub texts: Vec<TextPrimitive>,
}

impl RenderFrame {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            polygons: Vec::new(),
            rects: Vec::new(),
            lines: Vec::new(),
            texts: Vec::new(),
        }
    }

    /// Rejects an empty viewport and any primitive with non-finite geometry
    /// or an out-of-range color.
    pub fn validate(&self) -> ChartResult<()> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        self.polygons.iter().try_for_each(PolygonPrimitive::validate)?;
        self.rects.iter().try_for_each(|rect| rect.validate())?;
        self.lines.iter().try_for_each(|line| line.validate())?;
        self.texts.iter().try_for_each(TextPrimitive::validate)
    }

    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.polygons.len() + self.rects.len() + self.lines.len() + self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitive_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::RenderFrame;
    use crate::core::Viewport;
    use crate::error::ChartError;
    use crate::render::{Color, LinePrimitive, RectPrimitive};

    #[test]
    fn validation_reports_viewport_before_primitives() {
        let mut frame = RenderFrame::new(Viewport::new(0, 10));
        frame
            .lines
            .push(LinePrimitive::new(0.0, f64::NAN, 1.0, 1.0, 1.0, Color::rgb(0.0, 0.0, 0.0)));
        assert!(matches!(frame.validate(), Err(ChartError::InvalidViewport { .. })));

        frame.viewport = Viewport::new(10, 10);
        assert!(frame.validate().is_err());
        frame.lines.clear();
        frame
            .rects
            .push(RectPrimitive::new(1.0, 1.0, 4.0, 4.0, Color::rgb(1.0, 0.0, 0.0)));
        assert!(frame.validate().is_ok());
        assert_eq!(frame.primitive_count(), 1);
        assert!(!frame.is_empty());
    }
}
