use crate::core::PaneId;

use super::options::{CrosshairMode, CrosshairOptions};
use super::price_scale::PriceScale;
use super::time_scale::{TimePointIndex, TimeScale};

/// Pointer-tracking state of the chart.
///
/// Coordinates are derived from `index` and `price` by
/// [`Crosshair::update_all_views`], so they stay correct after scrolling.
#[derive(Debug, Clone)]
pub struct Crosshair {
    options: CrosshairOptions,
    pane: Option<PaneId>,
    index: Option<TimePointIndex>,
    price: f64,
    x: f64,
    y: f64,
    visible: bool,
    origin_x: f64,
    origin_y: f64,
}

impl Crosshair {
    #[must_use]
    pub fn new(options: CrosshairOptions) -> Self {
        Self {
            options,
            pane: None,
            index: None,
            price: f64::NAN,
            x: f64::NAN,
            y: f64::NAN,
            visible: false,
            origin_x: f64::NAN,
            origin_y: f64::NAN,
        }
    }

    #[must_use]
    pub fn options(&self) -> &CrosshairOptions {
        &self.options
    }

    pub fn apply_options(&mut self, options: CrosshairOptions) {
        self.options = options;
    }

    #[must_use]
    pub fn pane(&self) -> Option<PaneId> {
        self.pane
    }

    #[must_use]
    pub fn index(&self) -> Option<TimePointIndex> {
        self.index
    }

    #[must_use]
    pub fn price(&self) -> f64 {
        self.price
    }

    #[must_use]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Shown only with a pane and a non-hidden mode.
    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible && self.pane.is_some() && self.options.mode != CrosshairMode::Hidden
    }

    #[must_use]
    pub fn origin_coord(&self) -> Option<(f64, f64)> {
        (self.origin_x.is_finite() && self.origin_y.is_finite())
            .then_some((self.origin_x, self.origin_y))
    }

    pub fn save_origin_coord(&mut self, x: f64, y: f64) {
        self.origin_x = x;
        self.origin_y = y;
    }

    pub fn clear_origin_coord(&mut self) {
        self.origin_x = f64::NAN;
        self.origin_y = f64::NAN;
    }

    pub fn set_position(&mut self, index: TimePointIndex, price: f64, pane: PaneId) {
        self.index = Some(index);
        self.price = price;
        self.pane = Some(pane);
        self.visible = true;
    }

    /// Hides the crosshair; `fallback_index` keeps last-value lookups working.
    pub fn clear_position(&mut self, fallback_index: Option<TimePointIndex>) {
        self.visible = false;
        self.index = fallback_index;
        self.price = f64::NAN;
        self.x = f64::NAN;
        self.y = f64::NAN;
        self.pane = None;
        self.clear_origin_coord();
    }

    /// Recomputes pixel coordinates from the stored index and price.
    pub fn update_all_views(
        &mut self,
        time_scale: &TimeScale,
        price_scale: Option<&PriceScale>,
    ) {
        if !self.visible {
            return;
        }
        self.x = match self.index {
            Some(index) if !time_scale.is_empty() => time_scale.index_to_coordinate(index),
            _ => f64::NAN,
        };
        self.y = match price_scale {
            Some(scale) if !scale.is_empty() => {
                let base = scale.first_value().unwrap_or(self.price);
                scale.price_to_coordinate(self.price, base)
            }
            _ => f64::NAN,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::Crosshair;
    use crate::core::PaneId;
    use crate::model::options::{CrosshairMode, CrosshairOptions};

    #[test]
    fn clear_position_keeps_fallback_index() {
        let mut crosshair = Crosshair::new(CrosshairOptions::default());
        crosshair.set_position(4, 12.5, PaneId::new(0));
        crosshair.save_origin_coord(10.0, 20.0);
        assert!(crosshair.visible());
        assert_eq!(crosshair.origin_coord(), Some((10.0, 20.0)));

        crosshair.clear_position(Some(9));
        assert!(!crosshair.visible());
        assert_eq!(crosshair.index(), Some(9));
        assert!(crosshair.price().is_nan());
        assert!(crosshair.origin_coord().is_none());
    }

    #[test]
    fn hidden_mode_suppresses_visibility() {
        let mut crosshair = Crosshair::new(CrosshairOptions {
            mode: CrosshairMode::Hidden,
            ..CrosshairOptions::default()
        });
        crosshair.set_position(1, 1.0, PaneId::new(0));
        assert!(!crosshair.visible());
    }
}
