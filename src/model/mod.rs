//! Chart state: data merge, scales, panes and the invalidation protocol.

mod chart_model;
mod crosshair;
mod data_layer;
mod data_source;
mod horz_scale_behavior;
mod invalidate_mask;
mod invalidated;
mod kinetic_animation;
mod observer;
mod options;
mod pane;
mod plot_list;
mod price_range;
mod price_scale;
mod price_tick_marks;
mod series;
mod tick_marks;
mod time_scale;

pub use chart_model::{ChartModel, CrosshairMoveEvent};
pub use crosshair::Crosshair;
pub use data_layer::{
    DataLayer, DataUpdateResponse, SeriesChanges, SeriesDataItem, SeriesUpdateInfo,
    TimeScaleChanges, check_items_are_ordered, create_plot_row,
};
pub use data_source::{FirstValue, PriceDataSource};
pub use horz_scale_behavior::{
    HorzScaleBehavior, TickMarkType, TickMarkWeight, TimeBehavior, fill_weights_for_points,
    weight_by_time, weight_to_tick_mark_type,
};
pub use invalidate_mask::{
    InvalidateMask, InvalidationLevel, PaneInvalidation, TimeScaleInvalidation,
};
pub use invalidated::Invalidated;
pub use kinetic_animation::{
    DAMPING_COEFF, KineticAnimation, LinearAnimation, MAX_SCROLL_SPEED, MIN_SCROLL_SPEED,
    SCROLL_MIN_MOVE, TimeScaleAnimation,
};
pub use observer::{SubscriptionToken, Subscribers};
pub use options::{
    AreaStyle, BarStyle, BaselineStyle, CandlestickStyle, ChartOptions, CrosshairMode,
    CrosshairOptions, GridOptions, HistogramStyle, LayoutOptions, LineStyle, PriceScaleMargins,
    PriceScaleOptions, SeriesOptions, SeriesStyle, TimeScaleOptions,
};
pub use pane::{DEFAULT_STRETCH_FACTOR, Pane, SeriesArena};
pub use plot_list::{MinMax, MismatchDirection, PlotList, PlotRow, PlotRowValueIndex, RowColors};
pub use price_range::{AutoscaleInfo, AutoscaleMargins, PriceRange};
pub use price_scale::{
    BarPrices, PriceScale, PriceScaleMode, PriceScaleModeChange, PriceScaleState,
    PriceScaleStateChange, PricedValue,
};
pub use price_tick_marks::{PriceMark, PriceMarkScale, PriceTickMarkBuilder};
pub use series::{
    AutoscaleInfoProvider, BarColors, LastValueData, Series, SeriesBarColorer, SeriesType,
};
pub use tick_marks::{TickMark, TickMarks};
pub use time_scale::{
    BarCoordinate, DEFAULT_ANIMATION_DURATION_MS, LogicalRange, StrictRange, TimeMark,
    TimePointIndex, TimeScale, TimeScalePoint,
};
