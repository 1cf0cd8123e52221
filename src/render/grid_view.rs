use crate::core::PaneId;
use crate::error::{ChartError, ChartResult};
use crate::model::ChartModel;

use super::pane_view::{HitTestData, PaneRenderer, PaneView};
use super::{CanvasLayerKind, Color, RenderingTarget};

#[derive(Debug, Clone, PartialEq)]
pub struct GridRenderer {
    pub vertical: Vec<f64>,
    pub horizontal: Vec<f64>,
    pub color: Color,
}

impl PaneRenderer for GridRenderer {
    fn draw(&self, target: &mut RenderingTarget<'_>, _is_hovered: bool, _hit: Option<&HitTestData>) {
        target.use_bitmap_coordinate_space(|scope| {
            let width = f64::from(scope.bitmap_size.width);
            let height = f64::from(scope.bitmap_size.height);
            let line_width = scope.horizontal_pixel_ratio.floor().max(1.0);
            for x in &self.vertical {
                let x = (x * scope.horizontal_pixel_ratio).round();
                scope.canvas.line((x, 0.0), (x, height), line_width, self.color);
            }
            let line_width = scope.vertical_pixel_ratio.floor().max(1.0);
            for y in &self.horizontal {
                let y = (y * scope.vertical_pixel_ratio).round();
                scope.canvas.line((0.0, y), (width, y), line_width, self.color);
            }
        });
    }
}

/// Grid lines at the time marks and at the default price scale's marks.
#[derive(Debug, Default)]
pub struct GridView {
    renderer: Option<GridRenderer>,
}

impl GridView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaneView for GridView {
    fn layer(&self) -> CanvasLayerKind {
        CanvasLayerKind::Grid
    }

    fn update(&mut self, model: &mut ChartModel, pane: PaneId) -> ChartResult<()> {
        self.renderer = None;
        let grid = model.options().grid.clone();
        let color = Color::parse(&grid.color)?;

        let vertical = if grid.vert_lines_visible {
            model
                .time_marks()
                .map(|marks| marks.iter().map(|mark| mark.coord).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let horizontal = if grid.horz_lines_visible {
            let scale = model
                .pane(pane)
                .ok_or(ChartError::UnknownPane(pane))?
                .default_price_scale();
            if scale.is_empty() {
                Vec::new()
            } else {
                let id = scale.id().clone();
                model
                    .price_marks(pane, &id)?
                    .iter()
                    .map(|mark| mark.coord)
                    .collect()
            }
        } else {
            Vec::new()
        };

        if !vertical.is_empty() || !horizontal.is_empty() {
            self.renderer = Some(GridRenderer {
                vertical,
                horizontal,
                color,
            });
        }
        Ok(())
    }

    fn renderer(&self) -> Option<&dyn PaneRenderer> {
        self.renderer.as_ref().map(|renderer| renderer as &dyn PaneRenderer)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{GridRenderer, GridView};
    use crate::core::{PaneId, Size, Viewport};
    use crate::model::{ChartModel, ChartOptions};
    use crate::render::pane_view::{PaneRenderer, PaneView};
    use crate::render::{
        CanvasLayerKind, Color, LayeredRenderFrame, PaneLayerStack, RenderingTarget, TargetRegion,
    };

    #[test]
    fn grid_lines_snap_to_bitmap_pixels_and_span_the_pane() {
        let pane_id = PaneId::new(0);
        let mut layered = LayeredRenderFrame::from_stacks(
            Viewport::new(200, 100),
            vec![PaneLayerStack::canonical_for_pane(pane_id)],
        );
        let region = TargetRegion {
            pane_id,
            layer: CanvasLayerKind::Grid,
            left: 0.0,
            top: 0.0,
            size: Size::new(100.0, 50.0),
        };
        let renderer = GridRenderer {
            vertical: vec![10.3, 40.0],
            horizontal: vec![25.0],
            color: Color::rgb(0.5, 0.5, 0.5),
        };
        renderer.draw(&mut RenderingTarget::new(&mut layered, region, 2.0, 2.0), false, None);

        let lines = layered
            .flatten_pane_layers(pane_id, &[CanvasLayerKind::Grid])
            .expect("pane")
            .lines;
        assert_eq!(lines.len(), 3);
        assert_relative_eq!(lines[0].x1, 21.0);
        assert_relative_eq!(lines[0].y2, 100.0);
        assert_relative_eq!(lines[1].x1, 80.0);
        assert_relative_eq!(lines[2].y1, 50.0);
        assert_relative_eq!(lines[2].x2, 200.0);
        assert!(lines.iter().all(|line| line.stroke_width == 2.0));
    }

    #[test]
    fn empty_chart_has_no_grid_renderer() {
        let mut model = ChartModel::new(ChartOptions::default()).expect("valid options");
        let pane = model.panes()[0].id();
        let mut view = GridView::new();
        view.update(&mut model, pane).expect("known pane");
        assert!(view.renderer().is_none());
    }
}
