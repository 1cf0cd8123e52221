use crate::core::{PriceFormatter, PriceScaleId, SeriesId, TimePoint};

use super::price_range::AutoscaleInfo;
use super::time_scale::{StrictRange, TimePointIndex};

/// Close of the first visible bar; base of percentage modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstValue {
    pub value: f64,
    pub time_point: TimePoint,
}

/// Capabilities a price scale needs from the sources attached to it.
pub trait PriceDataSource {
    fn source_id(&self) -> SeriesId;

    fn price_scale_id(&self) -> &PriceScaleId;

    fn z_order(&self) -> i32;

    fn visible(&self) -> bool;

    fn first_value(&self, visible_bars: Option<StrictRange>) -> Option<FirstValue>;

    /// Autoscale hint over the inclusive bar window.
    fn autoscale_info(&self, from: TimePointIndex, to: TimePointIndex) -> Option<AutoscaleInfo>;

    fn min_move(&self) -> f64;

    fn formatter(&self) -> &PriceFormatter;

    fn update_all_views(&mut self) {}
}
