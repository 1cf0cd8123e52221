//! pricechart: the coordinate and scale engine of a financial time-series
//! chart, with an invalidation-driven frame loop on top.
//!
//! [`model`] merges series data onto a shared timeline and owns the time
//! scale, the price scales and the panes. [`render`] turns model state into
//! retained, backend-neutral primitives once per animation frame.

pub mod core;
pub mod error;
pub mod model;
pub mod render;
pub mod telemetry;

pub use error::{ChartError, ChartResult};
pub use model::{ChartModel, ChartOptions, SeriesDataItem, SeriesOptions, SeriesType};
pub use render::{ChartWidget, FrameScheduler, ManualFrameScheduler, NullRenderer, Renderer};
