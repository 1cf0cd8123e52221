use crate::core::{PaneId, SeriesId};
use crate::error::ChartResult;
use crate::model::{ChartModel, TimePointIndex};

use super::{CanvasLayerKind, RenderingTarget};

/// Item found under the pointer by a renderer hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTestData {
    pub series: SeriesId,
    pub index: TimePointIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitTestResult {
    pub hit_test_data: HitTestData,
    pub external_id: Option<String>,
}

/// Draws a snapshot of view state onto a target.
pub trait PaneRenderer {
    fn draw(
        &self,
        target: &mut RenderingTarget<'_>,
        is_hovered: bool,
        hit_test_data: Option<&HitTestData>,
    );

    fn draw_background(
        &self,
        _target: &mut RenderingTarget<'_>,
        _is_hovered: bool,
        _hit_test_data: Option<&HitTestData>,
    ) {
    }

    /// Coordinates are media pixels relative to the pane.
    fn hit_test(&self, _x: f64, _y: f64) -> Option<HitTestResult> {
        None
    }
}

/// A drawable bound to one pane.
///
/// `update` pulls whatever the view needs from the model; `renderer` is
/// `None` while there is nothing to draw.
pub trait PaneView {
    fn layer(&self) -> CanvasLayerKind;

    fn update(&mut self, model: &mut ChartModel, pane: PaneId) -> ChartResult<()>;

    fn renderer(&self) -> Option<&dyn PaneRenderer>;
}

#[cfg(test)]
mod tests {
    use super::{HitTestData, PaneRenderer};
    use crate::core::{PaneId, Size, Viewport};
    use crate::render::{
        CanvasLayerKind, Color, LayeredRenderFrame, PaneLayerStack, RenderingTarget, TargetRegion,
    };

    struct Block;

    impl PaneRenderer for Block {
        fn draw(&self, target: &mut RenderingTarget<'_>, _is_hovered: bool, _hit: Option<&HitTestData>) {
            target.use_media_coordinate_space(|scope| {
                scope.canvas.fill_rect(2.0, 3.0, 4.0, 5.0, Color::rgb(1.0, 0.0, 0.0));
            });
        }
    }

    #[test]
    fn default_background_and_hit_test_do_nothing() {
        let pane_id = PaneId::new(3);
        let mut layered = LayeredRenderFrame::from_stacks(
            Viewport::new(100, 100),
            vec![PaneLayerStack::canonical_for_pane(pane_id)],
        );
        let region = TargetRegion {
            pane_id,
            layer: CanvasLayerKind::Series,
            left: 0.0,
            top: 0.0,
            size: Size::new(50.0, 50.0),
        };
        let mut target = RenderingTarget::new(&mut layered, region, 2.0, 2.0);
        let renderer: &dyn PaneRenderer = &Block;
        renderer.draw_background(&mut target, true, None);
        renderer.draw(&mut target, true, None);
        assert!(renderer.hit_test(4.0, 5.0).is_none());

        let rects = layered.flatten().rects;
        assert_eq!(rects.len(), 1);
        assert_eq!((rects[0].x, rects[0].y), (4.0, 6.0));
        assert_eq!((rects[0].width, rects[0].height), (8.0, 10.0));
    }
}
