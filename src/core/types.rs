use serde::{Deserialize, Serialize};

/// Physical output surface in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Size in media (CSS) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Bitmap size for the given pixel ratios, rounded the way canvas
    /// backing stores are.
    #[must_use]
    pub fn to_viewport(self, horizontal_pixel_ratio: f64, vertical_pixel_ratio: f64) -> Viewport {
        Viewport::new(
            (self.width * horizontal_pixel_ratio).round().max(0.0) as u32,
            (self.height * vertical_pixel_ratio).round().max(0.0) as u32,
        )
    }
}
