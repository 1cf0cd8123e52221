//! Drawing layer: pane views, retained layered frames and the frame loop.
//!
//! Views pull state from a [`ChartModel`](crate::model::ChartModel) and
//! hand renderers a snapshot; renderers record backend-neutral primitives
//! into a [`LayeredRenderFrame`]; backends only ever see a flattened
//! [`RenderFrame`].

mod axis_view;
mod crosshair_view;
mod frame;
mod grid_view;
mod layer_stack;
mod layered_frame;
mod null_renderer;
mod pane_view;
mod primitives;
mod scheduler;
mod series_view;
mod target;
mod widget;

pub use axis_view::{
    AXIS_BORDER_SIZE, AXIS_TICK_LENGTH, AxisLabel, PriceAxisRenderer, PriceAxisView,
    TimeAxisRenderer, TimeAxisView, price_axis_optimal_width, suggest_even,
    time_axis_optimal_height,
};
pub use crosshair_view::{CrosshairRenderer, CrosshairView};
pub use frame::RenderFrame;
pub use grid_view::{GridRenderer, GridView};
pub use layer_stack::{CanvasLayerKind, PaneLayerStack};
pub use layered_frame::{LayerPrimitives, LayeredRenderFrame, PaneLayerFrame};
pub use null_renderer::NullRenderer;
pub use pane_view::{HitTestData, HitTestResult, PaneRenderer, PaneView};
pub use primitives::{
    Color, LinePrimitive, LineStrokeStyle, PolygonPrimitive, RectPrimitive, TextHAlign,
    TextPrimitive, estimate_text_width,
};
pub use scheduler::{FrameRequestId, FrameScheduler, ManualFrameScheduler};
pub use series_view::{
    SeriesItem, SeriesRenderer, SeriesShape, SeriesView, optimal_bar_width,
    optimal_candlestick_width,
};
pub use target::{
    BitmapCoordinatesScope, Canvas, MediaCoordinatesScope, RenderingTarget, TargetRegion,
};
pub use widget::{ChartLayout, ChartWidget, MIN_PANE_HEIGHT};

use crate::error::ChartResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized, deterministic `RenderFrame` so
/// drawing code remains isolated from chart state and input handling.
pub trait Renderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()>;
}
