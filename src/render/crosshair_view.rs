use crate::core::PaneId;
use crate::error::{ChartError, ChartResult};
use crate::model::ChartModel;

use super::pane_view::{HitTestData, PaneRenderer, PaneView};
use super::{CanvasLayerKind, Color, LineStrokeStyle, RenderingTarget};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrosshairRenderer {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: f64,
    pub color: Color,
}

impl PaneRenderer for CrosshairRenderer {
    fn draw(&self, target: &mut RenderingTarget<'_>, _is_hovered: bool, _hit: Option<&HitTestData>) {
        target.use_bitmap_coordinate_space(|scope| {
            let width = f64::from(scope.bitmap_size.width);
            let height = f64::from(scope.bitmap_size.height);
            let line_width = (self.width * scope.horizontal_pixel_ratio).floor().max(1.0);
            if let Some(x) = self.x {
                let x = (x * scope.horizontal_pixel_ratio).round();
                scope.canvas.styled_line(
                    (x, 0.0),
                    (x, height),
                    line_width,
                    self.color,
                    LineStrokeStyle::Dashed,
                );
            }
            if let Some(y) = self.y {
                let y = (y * scope.vertical_pixel_ratio).round();
                scope.canvas.styled_line(
                    (0.0, y),
                    (width, y),
                    line_width,
                    self.color,
                    LineStrokeStyle::Dashed,
                );
            }
        });
    }
}

/// Crosshair lines; the vertical line spans every pane, the horizontal one
/// only the pane under the pointer.
#[derive(Debug, Default)]
pub struct CrosshairView {
    renderer: Option<CrosshairRenderer>,
}

impl CrosshairView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaneView for CrosshairView {
    fn layer(&self) -> CanvasLayerKind {
        CanvasLayerKind::Crosshair
    }

    fn update(&mut self, model: &mut ChartModel, pane: PaneId) -> ChartResult<()> {
        self.renderer = None;
        if model.pane(pane).is_none() {
            return Err(ChartError::UnknownPane(pane));
        }
        let crosshair = model.crosshair();
        if !crosshair.visible() {
            return Ok(());
        }
        let options = crosshair.options();
        let x = (options.vert_line_visible && crosshair.index().is_some()).then(|| crosshair.x());
        let y = (options.horz_line_visible && crosshair.pane() == Some(pane)).then(|| crosshair.y());
        if x.is_none() && y.is_none() {
            return Ok(());
        }
        self.renderer = Some(CrosshairRenderer {
            x,
            y,
            width: options.width,
            color: Color::parse(&options.color)?,
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

    use super::{CrosshairRenderer, CrosshairView};
    use crate::core::{PaneId, Size, Viewport};
    use crate::error::ChartError;
    use crate::model::{ChartModel, ChartOptions};
    use crate::render::pane_view::{PaneRenderer, PaneView};
    use crate::render::{
        CanvasLayerKind, Color, LayeredRenderFrame, LineStrokeStyle, PaneLayerStack,
        RenderingTarget, TargetRegion,
    };

    #[test]
    fn vertical_line_is_dashed_and_offset_by_the_pane_top() {
        let pane_id = PaneId::new(0);
        let mut layered = LayeredRenderFrame::from_stacks(
            Viewport::new(300, 200),
            vec![PaneLayerStack::canonical_for_pane(pane_id)],
        );
        let region = TargetRegion {
            pane_id,
            layer: CanvasLayerKind::Crosshair,
            left: 0.0,
            top: 20.0,
            size: Size::new(300.0, 50.0),
        };
        let renderer = CrosshairRenderer {
            x: Some(10.4),
            y: None,
            width: 1.0,
            color: Color::rgb(0.0, 0.0, 0.0),
        };
        renderer.draw(&mut RenderingTarget::new(&mut layered, region, 1.0, 1.0), false, None);

        let lines = layered
            .flatten_pane_layers(pane_id, &[CanvasLayerKind::Crosshair])
            .expect("pane")
            .lines;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].stroke_style, LineStrokeStyle::Dashed);
        assert_relative_eq!(lines[0].x1, 10.0);
        assert_relative_eq!(lines[0].y1, 20.0);
        assert_relative_eq!(lines[0].y2, 70.0);
    }

    #[test]
    fn hidden_crosshair_has_no_renderer() {
        let mut model = ChartModel::new(ChartOptions::default()).expect("valid options");
        let pane = model.panes()[0].id();
        let mut view = CrosshairView::new();
        view.update(&mut model, pane).expect("known pane");
        assert!(view.renderer().is_none());

        assert!(matches!(
            view.update(&mut model, PaneId::new(99)),
            Err(ChartError::UnknownPane(_))
        ));
    }
}
