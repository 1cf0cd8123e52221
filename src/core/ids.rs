use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaneId(u32);

impl PaneId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId(u32);

impl SeriesId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Identifier of a price scale inside a pane.
///
/// `left` and `right` are reserved for the two default scales every pane
/// owns; any other id names an overlay scale created on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceScaleId(String);

impl PriceScaleId {
    pub const LEFT: &'static str = "left";
    pub const RIGHT: &'static str = "right";

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn left() -> Self {
        Self(Self::LEFT.to_owned())
    }

    #[must_use]
    pub fn right() -> Self {
        Self(Self::RIGHT.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == Self::LEFT || self.0 == Self::RIGHT
    }
}

impl Default for PriceScaleId {
    fn default() -> Self {
        Self::right()
    }
}

impl fmt::Display for PriceScaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PriceScaleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::PriceScaleId;

    #[test]
    fn only_left_and_right_are_default_scales() {
        assert!(PriceScaleId::left().is_default());
        assert!(PriceScaleId::right().is_default());
        assert!(!PriceScaleId::new("volume").is_default());
        assert_eq!(PriceScaleId::default().as_str(), "right");
    }
}
