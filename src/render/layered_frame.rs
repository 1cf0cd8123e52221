use crate::core::{PaneId, Viewport};

use super::{
    CanvasLayerKind, LinePrimitive, PaneLayerStack, PolygonPrimitive, RectPrimitive, RenderFrame,
    TextPrimitive,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LayerPrimitives {
    pub kind: CanvasLayerKind,
    pub polygons: Vec<PolygonPrimitive>,
    pub rects: Vec<RectPrimitive>,
    pub lines: Vec<LinePrimitive>,
    pub texts: Vec<TextPrimitive>,
}

impl LayerPrimitives {
    fn empty(kind: CanvasLayerKind) -> Self {
        Self {
            kind,
            polygons: Vec::new(),
            rects: Vec::new(),
            lines: Vec::new(),
            texts: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.polygons.clear();
        self.rects.clear();
        self.lines.clear();
        self.texts.clear();
    }

    fn append_to(&self, frame: &mut RenderFrame) {
        frame.polygons.extend(self.polygons.iter().cloned());
        frame.rects.extend(self.rects.iter().copied());
        frame.lines.extend(self.lines.iter().copied());
        frame.texts.extend(self.texts.iter().cloned());
    }
}

/// Retained primitives of one pane; the plot region is in bitmap pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneLayerFrame {
    pub pane_id: PaneId,
    pub plot_top: f64,
    pub plot_bottom: f64,
    pub layers: Vec<LayerPrimitives>,
}

/// Retained scene keyed by pane and layer.
///
/// Layers are cleared and redrawn independently so a cursor-only pass
/// keeps the series layers of the previous frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredRenderFrame {
    pub viewport: Viewport,
    pub panes: Vec<PaneLayerFrame>,
}

impl LayeredRenderFrame {
    #[must_use]
    pub fn from_stacks(viewport: Viewport, stacks: Vec<PaneLayerStack>) -> Self {
        let default_bottom = f64::from(viewport.height);
        let panes = stacks
            .into_iter()
            .map(|stack| PaneLayerFrame {
                pane_id: stack.pane_id,
                plot_top: 0.0,
                plot_bottom: default_bottom,
                layers: stack.layers.into_iter().map(LayerPrimitives::empty).collect(),
            })
            .collect();
        Self { viewport, panes }
    }

    #[must_use]
    pub fn with_pane_regions(mut self, regions: &[(PaneId, f64, f64)]) -> Self {
        for pane in &mut self.panes {
            if let Some((_, top, bottom)) = regions.iter().find(|(id, _, _)| *id == pane.pane_id) {
                pane.plot_top = *top;
                pane.plot_bottom = *bottom;
            }
        }
        self
    }

    #[must_use]
    pub fn pane_region(&self, pane_id: PaneId) -> Option<(f64, f64)> {
        self.panes
            .iter()
            .find(|pane| pane.pane_id == pane_id)
            .map(|pane| (pane.plot_top, pane.plot_bottom))
    }

    pub fn clear_layer(&mut self, pane_id: PaneId, kind: CanvasLayerKind) {
        if let Some(layer) = self.layer_mut(pane_id, kind) {
            layer.clear();
        }
    }

    pub fn push_line(&mut self, pane_id: PaneId, kind: CanvasLayerKind, line: LinePrimitive) {
        if let Some(layer) = self.layer_mut(pane_id, kind) {
            layer.lines.push(line);
        }
    }

    pub fn push_rect(&mut self, pane_id: PaneId, kind: CanvasLayerKind, rect: RectPrimitive) {
        if let Some(layer) = self.layer_mut(pane_id, kind) {
            layer.rects.push(rect);
        }
    }

    pub fn push_polygon(&mut self, pane_id: PaneId, kind: CanvasLayerKind, polygon: PolygonPrimitive) {
        if let Some(layer) = self.layer_mut(pane_id, kind) {
            layer.polygons.push(polygon);
        }
    }

    pub fn push_text(&mut self, pane_id: PaneId, kind: CanvasLayerKind, text: TextPrimitive) {
        if let Some(layer) = self.layer_mut(pane_id, kind) {
            layer.texts.push(text);
        }
    }

    #[must_use]
    pub fn flatten(&self) -> RenderFrame {
        let mut frame = RenderFrame::new(self.viewport);
        for pane in &self.panes {
            for layer in &pane.layers {
                layer.append_to(&mut frame);
            }
        }
        frame
    }

    #[must_use]
    pub fn flatten_pane(&self, pane_id: PaneId) -> Option<RenderFrame> {
        let pane = self.panes.iter().find(|pane| pane.pane_id == pane_id)?;
        let mut frame = RenderFrame::new(self.viewport);
        for layer in &pane.layers {
            layer.append_to(&mut frame);
        }
        Some(frame)
    }

    #[must_use]
    pub fn flatten_pane_layers(
        &self,
        pane_id: PaneId,
        include_layers: &[CanvasLayerKind],
    ) -> Option<RenderFrame> {
        let pane = self.panes.iter().find(|pane| pane.pane_id == pane_id)?;
        let mut frame = RenderFrame::new(self.viewport);
        for layer in pane.layers.iter().filter(|layer| include_layers.contains(&layer.kind)) {
            layer.append_to(&mut frame);
        }
        Some(frame)
    }

    fn layer_mut(
        &mut self,
        pane_id: PaneId,
        kind: CanvasLayerKind,
    ) -> Option<&mut LayerPrimitives> {
        let pane = self.panes.iter_mut().find(|pane| pane.pane_id == pane_id)?;
        pane.layers.iter_mut().find(|layer| layer.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::LayeredRenderFrame;
    use crate::core::{PaneId, Viewport};
    use crate::render::{
        CanvasLayerKind, Color, LinePrimitive, PaneLayerStack, TextHAlign, TextPrimitive,
    };

    fn frame_with_lines(pane_id: PaneId) -> LayeredRenderFrame {
        let mut layered = LayeredRenderFrame::from_stacks(
            Viewport::new(100, 50),
            vec![PaneLayerStack::canonical_for_pane(pane_id)],
        );
        // Pushed out of order on purpose.
        layered.push_line(
            pane_id,
            CanvasLayerKind::Series,
            LinePrimitive::new(0.0, 2.0, 5.0, 3.0, 1.0, Color::rgb(0.8, 0.2, 0.2)),
        );
        layered.push_line(
            pane_id,
            CanvasLayerKind::Grid,
            LinePrimitive::new(0.0, 1.0, 5.0, 1.0, 1.0, Color::rgb(0.2, 0.2, 0.2)),
        );
        layered.push_text(
            pane_id,
            CanvasLayerKind::Axis,
            TextPrimitive::new("x", 2.0, 4.0, 10.0, Color::rgb(1.0, 1.0, 1.0), TextHAlign::Right),
        );
        layered
    }

    #[test]
    fn flattens_in_pane_layer_order() {
        let pane_id = PaneId::new(0);
        let flattened = frame_with_lines(pane_id).flatten();
        assert_eq!(flattened.lines.len(), 2);
        assert_eq!(flattened.texts.len(), 1);
        assert_eq!(flattened.lines[0].y1, 1.0);
        assert_eq!(flattened.lines[1].y1, 2.0);
    }

    #[test]
    fn clearing_a_layer_keeps_the_others() {
        let pane_id = PaneId::new(0);
        let mut layered = frame_with_lines(pane_id);
        layered.clear_layer(pane_id, CanvasLayerKind::Series);

        let flattened = layered.flatten();
        assert_eq!(flattened.lines.len(), 1);
        assert_eq!(flattened.lines[0].y1, 1.0);

        let grid_only = layered
            .flatten_pane_layers(pane_id, &[CanvasLayerKind::Axis])
            .expect("pane exists");
        assert!(grid_only.lines.is_empty());
        assert_eq!(grid_only.texts.len(), 1);
        assert!(layered.flatten_pane(PaneId::new(9)).is_none());
    }
}
