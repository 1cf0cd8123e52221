use std::str::FromStr;

use crate::error::{ChartError, ChartResult};

/// RGBA color in normalized 0..=1 channel values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    #[must_use]
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    #[must_use]
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    /// Parses the CSS color forms used by chart options: `#rgb`, `#rrggbb`,
    /// `#rrggbbaa`, `rgb(r, g, b)`, `rgba(r, g, b, a)` and `transparent`.
    pub fn parse(input: &str) -> ChartResult<Self> {
        let value = input.trim();
        if value.eq_ignore_ascii_case("transparent") {
            return Ok(Self::TRANSPARENT);
        }
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| invalid_color(input));
        }
        let lowered = value.to_ascii_lowercase();
        let body = lowered
            .strip_prefix("rgba(")
            .or_else(|| lowered.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| invalid_color(input))?;
        let parts = body
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid_color(input))?;
        let color = match parts.as_slice() {
            [r, g, b] => Self::rgb(r / 255.0, g / 255.0, b / 255.0),
            [r, g, b, a] => Self::rgba(r / 255.0, g / 255.0, b / 255.0, *a),
            _ => return Err(invalid_color(input)),
        };
        color.validate()?;
        Ok(color)
    }

    #[must_use]
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    pub fn validate(self) -> ChartResult<()> {
        for (channel, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ChartError::InvalidData(format!(
                    "color channel `{channel}` must be finite and in [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for Color {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok().map(|v| f64::from(v) / 255.0);
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let mut channels = hex.chars().map(|c| channel(&format!("{c}{c}")));
            Some(Color::rgb(channels.next()??, channels.next()??, channels.next()??))
        }
        6 | 8 => {
            let alpha = if hex.len() == 8 { channel(&hex[6..8])? } else { 1.0 };
            Some(Color::rgba(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                alpha,
            ))
        }
        _ => None,
    }
}

fn invalid_color(input: &str) -> ChartError {
    ChartError::InvalidOptions(format!("unsupported color `{input}`"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStrokeStyle {
    #[default]
    Solid,
    Dotted,
    Dashed,
}

/// Draw command for one line segment in bitmap space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePrimitive {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke_width: f64,
    pub color: Color,
    pub stroke_style: LineStrokeStyle,
}

impl LinePrimitive {
    #[must_use]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64, stroke_width: f64, color: Color) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            stroke_width,
            color,
            stroke_style: LineStrokeStyle::Solid,
        }
    }

    #[must_use]
    pub const fn with_stroke_style(mut self, stroke_style: LineStrokeStyle) -> Self {
        self.stroke_style = stroke_style;
        self
    }

    pub fn validate(self) -> ChartResult<()> {
        if !self.x1.is_finite()
            || !self.y1.is_finite()
            || !self.x2.is_finite()
            || !self.y2.is_finite()
        {
            return Err(ChartError::InvalidData(
                "line coordinates must be finite".to_owned(),
            ));
        }
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(ChartError::InvalidData(
                "line stroke width must be finite and > 0".to_owned(),
            ));
        }
        self.color.validate()
    }
}

/// Filled rectangle with an optional border, in bitmap space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPrimitive {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill_color: Color,
    pub border_width: f64,
    pub border_color: Color,
    pub corner_radius: f64,
}

impl RectPrimitive {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64, fill_color: Color) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fill_color,
            border_width: 0.0,
            border_color: Color::TRANSPARENT,
            corner_radius: 0.0,
        }
    }

    #[must_use]
    pub const fn with_border(mut self, border_width: f64, border_color: Color) -> Self {
        self.border_width = border_width;
        self.border_color = border_color;
        self
    }

    pub fn validate(self) -> ChartResult<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ChartError::InvalidData(
                "rect origin must be finite".to_owned(),
            ));
        }
        if !self.width.is_finite() || !self.height.is_finite() || self.width < 0.0 || self.height < 0.0 {
            return Err(ChartError::InvalidData(
                "rect size must be finite and >= 0".to_owned(),
            ));
        }
        if !self.border_width.is_finite() || self.border_width < 0.0 {
            return Err(ChartError::InvalidData(
                "rect border width must be finite and >= 0".to_owned(),
            ));
        }
        self.fill_color.validate()?;
        self.border_color.validate()
    }
}

/// Closed filled polygon in bitmap space, used for area fills.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonPrimitive {
    pub points: Vec<(f64, f64)>,
    pub fill_color: Color,
}

impl PolygonPrimitive {
    #[must_use]
    pub fn new(points: Vec<(f64, f64)>, fill_color: Color) -> Self {
        Self { points, fill_color }
    }

    pub fn validate(&self) -> ChartResult<()> {
        if self.points.len() < 3 {
            return Err(ChartError::InvalidData(
                "polygon needs at least three points".to_owned(),
            ));
        }
        if self
            .points
            .iter()
            .any(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(ChartError::InvalidData(
                "polygon coordinates must be finite".to_owned(),
            ));
        }
        self.fill_color.validate()
    }
}

/// Horizontal text alignment relative to `TextPrimitive::x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextHAlign {
    Left,
    Center,
    Right,
}

/// Draw command for one label in bitmap space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrimitive {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size_px: f64,
    pub color: Color,
    pub h_align: TextHAlign,
}

impl TextPrimitive {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        x: f64,
        y: f64,
        font_size_px: f64,
        color: Color,
        h_align: TextHAlign,
    ) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size_px,
            color,
            h_align,
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        if self.text.is_empty() {
            return Err(ChartError::InvalidData(
                "text primitive must not be empty".to_owned(),
            ));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ChartError::InvalidData(
                "text coordinates must be finite".to_owned(),
            ));
        }
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(ChartError::InvalidData(
                "font size must be finite and > 0".to_owned(),
            ));
        }
        self.color.validate()
    }
}

/// Approximate advance width of `text` in media pixels.
///
/// Backends measure real glyphs; layout only needs a stable estimate.
#[must_use]
pub fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    (text.chars().count() as f64 * font_size * 5.0 / 8.0).ceil()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{Color, LinePrimitive, RectPrimitive, estimate_text_width};
    use crate::error::ChartError;

    #[test]
    fn parses_hex_and_rgba_colors() {
        let teal = Color::parse("#26a69a").expect("hex");
        assert_relative_eq!(teal.red, 38.0 / 255.0);
        assert_relative_eq!(teal.alpha, 1.0);

        let short = Color::parse("#fff").expect("short hex");
        assert_eq!(short, Color::rgb(1.0, 1.0, 1.0));

        let fill = Color::parse("rgba(46, 220, 135, 0.4)").expect("rgba");
        assert_relative_eq!(fill.green, 220.0 / 255.0);
        assert_relative_eq!(fill.alpha, 0.4);

        assert_eq!(Color::parse("transparent").expect("keyword").alpha, 0.0);
    }

    #[test]
    fn rejects_malformed_colors() {
        for input in ["#12345", "rgb(1, 2)", "hsl(0, 0%, 0%)", "rgba(300, 0, 0, 1)"] {
            assert!(
                matches!(
                    Color::parse(input),
                    Err(ChartError::InvalidOptions(_) | ChartError::InvalidData(_))
                ),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn primitives_validate_geometry() {
        let black = Color::rgb(0.0, 0.0, 0.0);
        assert!(LinePrimitive::new(0.0, 0.0, 1.0, f64::NAN, 1.0, black).validate().is_err());
        assert!(RectPrimitive::new(0.0, 0.0, -1.0, 2.0, black).validate().is_err());
        assert!(RectPrimitive::new(0.0, 0.0, 0.0, 2.0, black).validate().is_ok());
    }

    #[test]
    fn text_width_scales_with_font_size() {
        assert_relative_eq!(estimate_text_width("100.00", 12.0), 45.0);
        assert_relative_eq!(estimate_text_width("", 12.0), 0.0);
    }
}
