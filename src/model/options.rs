//! Serializable chart configuration.
//!
//! Every struct deserializes partially: missing fields keep their defaults,
//! so hosts can persist only what they override.

use serde::{Deserialize, Serialize};

use crate::core::{PriceFormat, PriceScaleId};
use crate::error::{ChartError, ChartResult};

use super::price_scale::PriceScaleMode;
use super::series::SeriesType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub layout: LayoutOptions,
    pub time_scale: TimeScaleOptions,
    pub left_price_scale: PriceScaleOptions,
    pub right_price_scale: PriceScaleOptions,
    pub overlay_price_scales: PriceScaleOptions,
    pub crosshair: CrosshairOptions,
    pub grid: GridOptions,
    pub handle_scroll: bool,
    pub handle_scale: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            layout: LayoutOptions::default(),
            time_scale: TimeScaleOptions::default(),
            left_price_scale: PriceScaleOptions {
                visible: false,
                ..PriceScaleOptions::default()
            },
            right_price_scale: PriceScaleOptions::default(),
            overlay_price_scales: PriceScaleOptions {
                scale_margins: PriceScaleMargins {
                    top: 0.2,
                    bottom: 0.1,
                },
                ..PriceScaleOptions::default()
            },
            crosshair: CrosshairOptions::default(),
            grid: GridOptions::default(),
            handle_scroll: true,
            handle_scale: true,
        }
    }
}

impl ChartOptions {
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let options: Self = serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidOptions(format!("failed to parse chart options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ChartError::InvalidOptions(format!("failed to serialize chart options: {e}"))
        })
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.layout.font_size.is_finite() || self.layout.font_size <= 0.0 {
            return Err(ChartError::InvalidOptions(
                "layout font size must be finite and > 0".to_owned(),
            ));
        }
        self.time_scale.validate()?;
        self.left_price_scale.scale_margins.validate()?;
        self.right_price_scale.scale_margins.validate()?;
        self.overlay_price_scales.scale_margins.validate()
    }

    /// Options applied to a price scale with the given id.
    #[must_use]
    pub fn price_scale_options(&self, id: &PriceScaleId) -> &PriceScaleOptions {
        match id.as_str() {
            PriceScaleId::LEFT => &self.left_price_scale,
            PriceScaleId::RIGHT => &self.right_price_scale,
            _ => &self.overlay_price_scales,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    pub font_size: f64,
    pub text_color: String,
    pub background_color: String,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            text_color: "#191919".to_owned(),
            background_color: "#ffffff".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeScaleOptions {
    pub right_offset: f64,
    pub bar_spacing: f64,
    pub min_bar_spacing: f64,
    pub fix_left_edge: bool,
    pub fix_right_edge: bool,
    pub lock_visible_time_range_on_resize: bool,
    pub right_bar_stays_on_scroll: bool,
    pub visible: bool,
    pub time_visible: bool,
    pub seconds_visible: bool,
    pub shift_visible_range_on_new_bar: bool,
    pub allow_shift_visible_range_on_whitespace_replacement: bool,
    pub uniform_distribution: bool,
    pub minimum_height: f64,
    pub tick_mark_max_character_length: Option<usize>,
}

impl Default for TimeScaleOptions {
    fn default() -> Self {
        Self {
            right_offset: 0.0,
            bar_spacing: 6.0,
            min_bar_spacing: 0.5,
            fix_left_edge: false,
            fix_right_edge: false,
            lock_visible_time_range_on_resize: false,
            right_bar_stays_on_scroll: false,
            visible: true,
            time_visible: false,
            seconds_visible: true,
            shift_visible_range_on_new_bar: true,
            allow_shift_visible_range_on_whitespace_replacement: false,
            uniform_distribution: false,
            minimum_height: 0.0,
            tick_mark_max_character_length: None,
        }
    }
}

impl TimeScaleOptions {
    pub fn validate(&self) -> ChartResult<()> {
        if !self.bar_spacing.is_finite() || self.bar_spacing <= 0.0 {
            return Err(ChartError::InvalidOptions(format!(
                "bar spacing must be finite and > 0, given={}",
                self.bar_spacing
            )));
        }
        if !self.min_bar_spacing.is_finite() || self.min_bar_spacing <= 0.0 {
            return Err(ChartError::InvalidOptions(format!(
                "min bar spacing must be finite and > 0, given={}",
                self.min_bar_spacing
            )));
        }
        if !self.right_offset.is_finite() {
            return Err(ChartError::InvalidOptions(
                "right offset must be finite".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Fractions of the scale height kept free above and below the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceScaleMargins {
    pub top: f64,
    pub bottom: f64,
}

impl Default for PriceScaleMargins {
    fn default() -> Self {
        Self {
            top: 0.2,
            bottom: 0.1,
        }
    }
}

impl PriceScaleMargins {
    pub fn validate(self) -> ChartResult<()> {
        let in_unit = |value: f64| value.is_finite() && (0.0..=1.0).contains(&value);
        if !in_unit(self.top) || !in_unit(self.bottom) {
            return Err(ChartError::InvalidOptions(format!(
                "invalid scale margins top={} bottom={}, each must be in [0, 1]",
                self.top, self.bottom
            )));
        }
        if self.top + self.bottom > 1.0 {
            return Err(ChartError::InvalidOptions(format!(
                "invalid scale margins top={} bottom={}, sum must be <= 1",
                self.top, self.bottom
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PriceScaleOptions {
    pub auto_scale: bool,
    pub mode: PriceScaleMode,
    pub invert_scale: bool,
    pub align_labels: bool,
    pub scale_margins: PriceScaleMargins,
    pub visible: bool,
    pub ticks_visible: bool,
    pub entire_text_only: bool,
    pub minimum_width: f64,
    pub ensure_edge_tick_marks_visible: bool,
}

impl Default for PriceScaleOptions {
    fn default() -> Self {
        Self {
            auto_scale: true,
            mode: PriceScaleMode::Normal,
            invert_scale: false,
            align_labels: true,
            scale_margins: PriceScaleMargins::default(),
            visible: true,
            ticks_visible: false,
            entire_text_only: false,
            minimum_width: 0.0,
            ensure_edge_tick_marks_visible: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrosshairMode {
    #[default]
    Normal,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrosshairOptions {
    pub mode: CrosshairMode,
    pub vert_line_visible: bool,
    pub horz_line_visible: bool,
    pub color: String,
    pub width: f64,
}

impl Default for CrosshairOptions {
    fn default() -> Self {
        Self {
            mode: CrosshairMode::Normal,
            vert_line_visible: true,
            horz_line_visible: true,
            color: "#9598a1".to_owned(),
            width: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridOptions {
    pub vert_lines_visible: bool,
    pub horz_lines_visible: bool,
    pub color: String,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            vert_lines_visible: true,
            horz_lines_visible: true,
            color: "#d6dcde".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeriesOptions {
    pub title: String,
    pub visible: bool,
    pub price_scale_id: PriceScaleId,
    pub z_order: Option<i32>,
    pub price_format: PriceFormat,
    pub last_value_visible: bool,
    pub style: SeriesStyle,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self::for_type(SeriesType::Line)
    }
}

impl SeriesOptions {
    #[must_use]
    pub fn for_type(series_type: SeriesType) -> Self {
        Self {
            title: String::new(),
            visible: true,
            price_scale_id: PriceScaleId::right(),
            z_order: None,
            price_format: PriceFormat::default(),
            last_value_visible: true,
            style: SeriesStyle::default_for(series_type),
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        self.price_format.validate()
    }
}

const UP_COLOR: &str = "#26a69a";
const DOWN_COLOR: &str = "#ef5350";
const LINE_COLOR: &str = "#2196f3";

/// Per-type visual options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SeriesStyle {
    Bar(BarStyle),
    Candlestick(CandlestickStyle),
    Line(LineStyle),
    Area(AreaStyle),
    Baseline(BaselineStyle),
    Histogram(HistogramStyle),
    Custom(LineStyle),
}

impl Default for SeriesStyle {
    fn default() -> Self {
        Self::Line(LineStyle::default())
    }
}

impl SeriesStyle {
    #[must_use]
    pub fn default_for(series_type: SeriesType) -> Self {
        match series_type {
            SeriesType::Bar => Self::Bar(BarStyle::default()),
            SeriesType::Candlestick => Self::Candlestick(CandlestickStyle::default()),
            SeriesType::Line => Self::Line(LineStyle::default()),
            SeriesType::Area => Self::Area(AreaStyle::default()),
            SeriesType::Baseline => Self::Baseline(BaselineStyle::default()),
            SeriesType::Histogram => Self::Histogram(HistogramStyle::default()),
            SeriesType::Custom => Self::Custom(LineStyle::default()),
        }
    }

    #[must_use]
    pub fn series_type(&self) -> SeriesType {
        match self {
            Self::Bar(_) => SeriesType::Bar,
            Self::Candlestick(_) => SeriesType::Candlestick,
            Self::Line(_) => SeriesType::Line,
            Self::Area(_) => SeriesType::Area,
            Self::Baseline(_) => SeriesType::Baseline,
            Self::Histogram(_) => SeriesType::Histogram,
            Self::Custom(_) => SeriesType::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BarStyle {
    pub up_color: String,
    pub down_color: String,
    pub open_visible: bool,
    pub thin_bars: bool,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            up_color: UP_COLOR.to_owned(),
            down_color: DOWN_COLOR.to_owned(),
            open_visible: true,
            thin_bars: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CandlestickStyle {
    pub up_color: String,
    pub down_color: String,
    pub wick_visible: bool,
    pub border_visible: bool,
    pub border_up_color: String,
    pub border_down_color: String,
    pub wick_up_color: String,
    pub wick_down_color: String,
}

impl Default for CandlestickStyle {
    fn default() -> Self {
        Self {
            up_color: UP_COLOR.to_owned(),
            down_color: DOWN_COLOR.to_owned(),
            wick_visible: true,
            border_visible: true,
            border_up_color: UP_COLOR.to_owned(),
            border_down_color: DOWN_COLOR.to_owned(),
            wick_up_color: UP_COLOR.to_owned(),
            wick_down_color: DOWN_COLOR.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineStyle {
    pub color: String,
    pub line_width: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: LINE_COLOR.to_owned(),
            line_width: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AreaStyle {
    pub line_color: String,
    pub top_color: String,
    pub bottom_color: String,
    pub line_width: f64,
}

impl Default for AreaStyle {
    fn default() -> Self {
        Self {
            line_color: "#33d778".to_owned(),
            top_color: "rgba(46, 220, 135, 0.4)".to_owned(),
            bottom_color: "rgba(40, 221, 100, 0)".to_owned(),
            line_width: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BaselineStyle {
    pub base_value: f64,
    pub top_line_color: String,
    pub bottom_line_color: String,
    pub line_width: f64,
}

impl Default for BaselineStyle {
    fn default() -> Self {
        Self {
            base_value: 0.0,
            top_line_color: "rgba(38, 166, 154, 1)".to_owned(),
            bottom_line_color: "rgba(239, 83, 80, 1)".to_owned(),
            line_width: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistogramStyle {
    pub color: String,
    pub base: f64,
}

impl Default for HistogramStyle {
    fn default() -> Self {
        Self {
            color: "#26a69a".to_owned(),
            base: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChartOptions, PriceScaleMargins, SeriesOptions, SeriesStyle};
    use crate::model::series::SeriesType;

    #[test]
    fn partial_json_keeps_defaults() {
        let options = ChartOptions::from_json_str(
            r#"{"timeScale": {"barSpacing": 10, "fixRightEdge": true}, "layout": {"fontSize": 14}}"#,
        )
        .expect("valid options");
        assert_eq!(options.time_scale.bar_spacing, 10.0);
        assert!(options.time_scale.fix_right_edge);
        assert_eq!(options.time_scale.min_bar_spacing, 0.5);
        assert_eq!(options.layout.font_size, 14.0);
        assert!(options.right_price_scale.visible);
        assert!(!options.left_price_scale.visible);
    }

    #[test]
    fn invalid_margins_are_rejected() {
        let margins = PriceScaleMargins {
            top: 0.6,
            bottom: 0.6,
        };
        assert!(margins.validate().is_err());
        assert!(
            ChartOptions::from_json_str(r#"{"rightPriceScale": {"scaleMargins": {"top": 1.5}}}"#)
                .is_err()
        );
    }

    #[test]
    fn options_round_trip_through_json() {
        let options = ChartOptions::default();
        let json = options.to_json_pretty().expect("serialize");
        let parsed = ChartOptions::from_json_str(&json).expect("parse");
        assert_eq!(parsed, options);
    }

    #[test]
    fn series_style_is_tagged_by_type() {
        let options: SeriesOptions = serde_json::from_str(
            r##"{"style": {"type": "candlestick", "upColor": "#000000"}, "priceScaleId": "left"}"##,
        )
        .expect("series options");
        assert_eq!(options.style.series_type(), SeriesType::Candlestick);
        assert_eq!(options.price_scale_id.as_str(), "left");
        let SeriesStyle::Candlestick(style) = options.style else {
            panic!("expected candlestick style");
        };
        assert_eq!(style.up_color, "#000000");
        assert_eq!(style.down_color, "#ef5350");
    }
}
