use serde::{Deserialize, Serialize};

use crate::core::PaneId;
use crate::model::InvalidationLevel;

/// Canvas layers of one pane, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanvasLayerKind {
    Background,
    Grid,
    Series,
    Crosshair,
    Axis,
}

impl CanvasLayerKind {
    /// Lowest invalidation level that repaints this layer.
    #[must_use]
    pub fn repaint_level(self) -> InvalidationLevel {
        match self {
            Self::Crosshair => InvalidationLevel::Cursor,
            Self::Background | Self::Grid | Self::Series | Self::Axis => InvalidationLevel::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneLayerStack {
    pub pane_id: PaneId,
    pub layers: Vec<CanvasLayerKind>,
}

impl PaneLayerStack {
    #[must_use]
    pub fn canonical_for_pane(pane_id: PaneId) -> Self {
        Self {
            pane_id,
            layers: vec![
                CanvasLayerKind::Background,
                CanvasLayerKind::Grid,
                CanvasLayerKind::Series,
                CanvasLayerKind::Crosshair,
                CanvasLayerKind::Axis,
            ],
        }
    }

    /// Layers repainted by a pass at `level`.
    pub fn layers_for_level(&self, level: InvalidationLevel) -> impl Iterator<Item = CanvasLayerKind> + '_ {
        self.layers
            .iter()
            .copied()
            .filter(move |kind| level != InvalidationLevel::None && level >= kind.repaint_level())
    }
}

#[cfg(test)]
mod tests {
    use super::{CanvasLayerKind, PaneLayerStack};
    use crate::core::PaneId;
    use crate::model::InvalidationLevel;

    #[test]
    fn pane_layer_stack_uses_canonical_order() {
        let stack = PaneLayerStack::canonical_for_pane(PaneId::new(7));
        assert_eq!(
            stack.layers,
            vec![
                CanvasLayerKind::Background,
                CanvasLayerKind::Grid,
                CanvasLayerKind::Series,
                CanvasLayerKind::Crosshair,
                CanvasLayerKind::Axis,
            ]
        );
    }

    #[test]
    fn cursor_level_only_repaints_crosshair() {
        let stack = PaneLayerStack::canonical_for_pane(PaneId::new(0));
        let cursor: Vec<_> = stack.layers_for_level(InvalidationLevel::Cursor).collect();
        assert_eq!(cursor, vec![CanvasLayerKind::Crosshair]);
        assert_eq!(stack.layers_for_level(InvalidationLevel::Light).count(), 5);
        assert_eq!(stack.layers_for_level(InvalidationLevel::None).count(), 0);
    }
}
