use serde::{Deserialize, Serialize};

/// Closed price interval; equal or NaN bounds make it empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_value: f64,
    pub max_value: f64,
}

impl PriceRange {
    #[must_use]
    pub const fn new(min_value: f64, max_value: f64) -> Self {
        Self {
            min_value,
            max_value,
        }
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.max_value - self.min_value
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.max_value == self.min_value || self.max_value.is_nan() || self.min_value.is_nan()
    }

    /// Bounding interval of both ranges; a non-finite bound loses to a finite one.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            min_value: finite_or(f64::min, self.min_value, other.min_value, f64::NEG_INFINITY),
            max_value: finite_or(f64::max, self.max_value, other.max_value, f64::INFINITY),
        }
    }

    #[must_use]
    pub fn merge_optional(first: Option<Self>, second: Option<Self>) -> Option<Self> {
        match (first, second) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn scale_around_center(&mut self, coeff: f64) {
        if !coeff.is_finite() {
            return;
        }
        if self.max_value - self.min_value == 0.0 {
            return;
        }
        let center = (self.max_value + self.min_value) * 0.5;
        self.max_value = center + (self.max_value - center) * coeff;
        self.min_value = center + (self.min_value - center) * coeff;
    }

    pub fn shift(&mut self, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        self.max_value += delta;
        self.min_value += delta;
    }
}

fn finite_or(method: fn(f64, f64) -> f64, first: f64, second: f64, fallback: f64) -> f64 {
    match (first.is_finite(), second.is_finite()) {
        (true, true) => method(first, second),
        (false, false) => fallback,
        (true, false) => first,
        (false, true) => second,
    }
}

/// Extra pixels a source wants kept free above and below its data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoscaleMargins {
    pub above: f64,
    pub below: f64,
}

/// Autoscale hint reported by a data source for a bar window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleInfo {
    pub price_range: Option<PriceRange>,
    pub margins: Option<AutoscaleMargins>,
}

impl AutoscaleInfo {
    #[must_use]
    pub const fn new(price_range: Option<PriceRange>, margins: Option<AutoscaleMargins>) -> Self {
        Self {
            price_range,
            margins,
        }
    }
}
