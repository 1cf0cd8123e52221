use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Price precision and minimal price increment of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PriceFormat {
    pub precision: u32,
    pub min_move: f64,
}

impl Default for PriceFormat {
    fn default() -> Self {
        Self {
            precision: 2,
            min_move: 0.01,
        }
    }
}

impl PriceFormat {
    pub fn validate(self) -> ChartResult<()> {
        if !self.min_move.is_finite() || self.min_move <= 0.0 {
            return Err(ChartError::InvalidOptions(format!(
                "price format min move must be finite and > 0, given={}",
                self.min_move
            )));
        }
        if self.precision > 16 {
            return Err(ChartError::InvalidOptions(format!(
                "price format precision must be <= 16, given={}",
                self.precision
            )));
        }
        Ok(())
    }
}

/// Number of fractional digits needed to print multiples of `min_move`.
#[must_use]
pub fn precision_by_min_move(min_move: f64) -> u32 {
    if min_move >= 1.0 {
        return 0;
    }
    let mut value = min_move;
    for digits in 0..8 {
        if (value.round() - value).abs() < 1e-8 {
            return digits;
        }
        value *= 10.0;
    }
    8
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceFormatter {
    precision: u32,
    min_move: f64,
    percent_suffix: bool,
}

impl Default for PriceFormatter {
    fn default() -> Self {
        Self::new(PriceFormat::default())
    }
}

impl PriceFormatter {
    #[must_use]
    pub fn new(format: PriceFormat) -> Self {
        Self {
            precision: format.precision,
            min_move: format.min_move,
            percent_suffix: false,
        }
    }

    #[must_use]
    pub fn percentage() -> Self {
        Self {
            percent_suffix: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn precision(&self) -> u32 {
        self.precision
    }

    #[must_use]
    pub fn min_move(&self) -> f64 {
        self.min_move
    }

    /// Formats `price` rounded to the closest multiple of the minimal move.
    ///
    /// Negative values use U+2212 so that signed and unsigned labels share
    /// the same glyph width.
    #[must_use]
    pub fn format(&self, price: f64) -> String {
        let Some(abs) = Decimal::from_f64(price.abs()) else {
            return "n/a".to_owned();
        };
        let rounded = match Decimal::from_f64(self.min_move) {
            Some(step) if !step.is_zero() => {
                (abs / step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step
            }
            _ => abs,
        }
        .round_dp_with_strategy(self.precision, RoundingStrategy::MidpointAwayFromZero);
        let sign = if price < 0.0 && !rounded.is_zero() {
            "\u{2212}"
        } else {
            ""
        };
        let precision = self.precision as usize;
        let suffix = if self.percent_suffix { "%" } else { "" };
        format!("{sign}{rounded:.precision$}{suffix}")
    }

    /// Parses a label produced by [`PriceFormatter::format`] back to a number.
    #[must_use]
    pub fn parse(&self, label: &str) -> Option<f64> {
        let trimmed = label.trim_end_matches('%').replace('\u{2212}', "-");
        trimmed.parse::<Decimal>().ok()?.to_f64()
    }
}
