//! Price axis tick generation.

const TICK_SPAN_EPSILON: f64 = 1e-14;
const TICK_DENSITY: f64 = 2.5;

const INTEGRAL_DIVIDER_SETS: [[f64; 3]; 3] = [[2.0, 2.5, 2.0], [2.0, 2.0, 2.5], [2.5, 2.0, 2.0]];

/// Labelled horizontal line on a price scale.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMark {
    pub coord: f64,
    pub label: String,
}

/// What the mark builder reads from the scale it builds marks for.
pub trait PriceMarkScale {
    fn height(&self) -> f64;

    fn font_size(&self) -> f64;

    fn first_value(&self) -> Option<f64>;

    fn entire_text_only(&self) -> bool;

    fn is_log(&self) -> bool;

    /// Inverse of [`PriceMarkScale::logical_to_coordinate`].
    fn coordinate_to_logical(&self, coordinate: f64, base_value: f64) -> f64;

    fn logical_to_coordinate(&self, logical: f64, base_value: f64) -> f64;

    fn format_logical(&self, logical: f64) -> String;
}

#[derive(Debug, Clone, PartialEq)]
struct PriceTickSpanCalculator {
    base: f64,
    integral_dividers: [f64; 3],
    fractional_dividers: Vec<f64>,
}

impl PriceTickSpanCalculator {
    fn new(base: f64, integral_dividers: [f64; 3]) -> Self {
        Self {
            base,
            integral_dividers,
            fractional_dividers: fractional_dividers(base),
        }
    }

    fn tick_span(&self, high: f64, low: f64, max_tick_span: f64) -> f64 {
        let min_movement = if self.base == 0.0 { 0.0 } else { 1.0 / self.base };
        let mut result = 10f64.powf((high - low).log10().ceil().max(0.0));
        let mut index = 0;
        let mut c = self.integral_dividers[0];

        loop {
            let larger_min_movement = greater_or_equal(result, min_movement)
                && result > min_movement + TICK_SPAN_EPSILON;
            let larger_max_tick_span = greater_or_equal(result, max_tick_span * c);
            let larger_one = greater_or_equal(result, 1.0);
            if !(larger_min_movement && larger_max_tick_span && larger_one) {
                break;
            }
            result /= c;
            index += 1;
            c = self.integral_dividers[index % self.integral_dividers.len()];
        }

        if result <= min_movement + TICK_SPAN_EPSILON {
            result = min_movement;
        }
        result = result.max(1.0);

        if !self.fractional_dividers.is_empty() && (result - 1.0).abs() < TICK_SPAN_EPSILON {
            let mut index = 0;
            let mut c = self.fractional_dividers[0];
            while greater_or_equal(result, max_tick_span * c)
                && result > min_movement + TICK_SPAN_EPSILON
            {
                result /= c;
                index += 1;
                c = self.fractional_dividers[index % self.fractional_dividers.len()];
            }
        }
        result
    }
}

fn greater_or_equal(x1: f64, x2: f64) -> bool {
    x2 - x1 <= TICK_SPAN_EPSILON
}

fn is_base_decimal(value: f64) -> bool {
    if value < 0.0 {
        return false;
    }
    let mut current = value;
    while current > 1.0 {
        if current % 10.0 != 0.0 {
            return false;
        }
        current /= 10.0;
    }
    true
}

/// Dividers stepping below one unit; empty for bases with a factor other than 2 or 5.
fn fractional_dividers(base: f64) -> Vec<f64> {
    if is_base_decimal(base) {
        return vec![2.0, 2.5, 2.0];
    }
    let mut dividers = Vec::new();
    let mut rest = base;
    while rest != 1.0 {
        if rest % 2.0 == 0.0 {
            dividers.push(2.0);
            rest /= 2.0;
        } else if rest % 5.0 == 0.0 {
            dividers.extend([2.0, 2.5]);
            rest /= 5.0;
        } else {
            return Vec::new();
        }
        if dividers.len() > 100 {
            return Vec::new();
        }
    }
    dividers
}

/// Picks the tick span and walks marks from the top of the scale downwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTickMarkBuilder {
    calculators: [PriceTickSpanCalculator; 3],
}

impl Default for PriceTickMarkBuilder {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl PriceTickMarkBuilder {
    /// `base` is the number of minimal price steps per unit (`1 / min_move`).
    #[must_use]
    pub fn new(base: f64) -> Self {
        Self {
            calculators: INTEGRAL_DIVIDER_SETS
                .map(|dividers| PriceTickSpanCalculator::new(base, dividers)),
        }
    }

    /// Smallest span keeping marks at least `ceil(font_size * 2.5)` px apart.
    #[must_use]
    pub fn tick_span(&self, high: f64, low: f64, scale_height: f64, font_size: f64) -> Option<f64> {
        if high < low || scale_height <= 0.0 {
            return None;
        }
        let max_tick_span = (high - low) * tick_mark_height(font_size) / scale_height;
        self.calculators
            .iter()
            .map(|calculator| calculator.tick_span(high, low, max_tick_span))
            .min_by(f64::total_cmp)
    }

    #[must_use]
    pub fn build(&self, scale: &impl PriceMarkScale) -> Vec<PriceMark> {
        let Some(first_value) = scale.first_value() else {
            return Vec::new();
        };
        let scale_height = scale.height();
        let font_size = scale.font_size();
        let bottom = scale.coordinate_to_logical(scale_height - 1.0, first_value);
        let top = scale.coordinate_to_logical(0.0, first_value);
        let extra_margin = if scale.entire_text_only() {
            font_size / 2.0
        } else {
            0.0
        };
        let min_coord = extra_margin;
        let max_coord = scale_height - 1.0 - extra_margin;
        let high = bottom.max(top);
        let low = bottom.min(top);
        if high == low {
            return Vec::new();
        }

        let Some(mut span) = self.tick_span(high, low, scale_height, font_size) else {
            return Vec::new();
        };
        let mark_height = tick_mark_height(font_size);
        let mut modulo = high % span;
        if modulo < 0.0 {
            modulo += span;
        }

        let mut marks = Vec::new();
        let mut prev_coord: Option<f64> = None;
        let mut logical = high - modulo;
        while logical > low && span > 0.0 && span.is_finite() {
            let coord = scale.logical_to_coordinate(logical, first_value);
            let collides = prev_coord.is_some_and(|prev| (coord - prev).abs() < mark_height);
            if !collides && (min_coord..=max_coord).contains(&coord) {
                marks.push(PriceMark {
                    coord,
                    label: scale.format_logical(logical),
                });
                prev_coord = Some(coord);
                if scale.is_log() {
                    span = self
                        .tick_span(logical, low, scale_height, font_size)
                        .unwrap_or(span);
                }
            }
            let next = logical - span;
            if next >= logical {
                break;
            }
            logical = next;
        }
        marks
    }
}

fn tick_mark_height(font_size: f64) -> f64 {
    (font_size * TICK_DENSITY).ceil()
}
