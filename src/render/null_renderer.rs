use tracing::trace;

use crate::error::ChartResult;
use crate::render::{RenderFrame, Renderer};

/// Headless [`Renderer`] that validates each flattened chart frame and keeps
/// the last one around for inspection.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames_rendered: usize,
    /// Frames that arrived with a valid viewport but nothing to draw.
    pub empty_frames: usize,
    pub last_line_count: usize,
    pub last_primitive_count: usize,
    pub last_frame: Option<RenderFrame>,
}

impl Renderer for NullRenderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        self.frames_rendered += 1;
        if frame.is_empty() {
            self.empty_frames += 1;
        }
        self.last_line_count = frame.lines.len();
        self.last_primitive_count = frame.primitive_count();
        trace!(
            frame = self.frames_rendered,
            primitives = self.last_primitive_count,
            "null renderer accepted frame"
        );
        self.last_frame = Some(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::NullRenderer;
    use crate::core::Viewport;
    use crate::render::{RenderFrame, Renderer};

    #[test]
    fn counts_empty_frames_and_rejects_zero_viewports() {
        let mut renderer = NullRenderer::default();
        renderer
            .render(&RenderFrame::new(Viewport::new(320, 200)))
            .expect("valid viewport");
        assert_eq!(renderer.frames_rendered, 1);
        assert_eq!(renderer.empty_frames, 1);

        assert!(renderer.render(&RenderFrame::new(Viewport::new(320, 0))).is_err());
        assert_eq!(renderer.frames_rendered, 1);
    }
}
