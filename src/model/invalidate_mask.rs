use std::collections::BTreeMap;

use smallvec::SmallVec;

use super::kinetic_animation::TimeScaleAnimation;
use super::time_scale::LogicalRange;

/// Repaint level, ordered from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum InvalidationLevel {
    #[default]
    None = 0,
    /// Crosshair layer only.
    Cursor = 1,
    /// Autoscale and redraw without relayout.
    Light = 2,
    /// Relayout of axis widths and pane heights, then redraw.
    Full = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaneInvalidation {
    pub level: InvalidationLevel,
    pub auto_scale: bool,
}

impl PaneInvalidation {
    #[must_use]
    pub const fn new(level: InvalidationLevel, auto_scale: bool) -> Self {
        Self { level, auto_scale }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeScaleInvalidation {
    FitContent,
    ApplyRange(LogicalRange),
    ApplyBarSpacing(f64),
    ApplyRightOffset(f64),
    Reset,
    Animation(TimeScaleAnimation),
    StopAnimation,
}

/// Accumulated description of what must be repainted on the next frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvalidateMask {
    panes: BTreeMap<usize, PaneInvalidation>,
    global_level: InvalidationLevel,
    time_scale: SmallVec<[TimeScaleInvalidation; 2]>,
}

impl InvalidateMask {
    #[must_use]
    pub fn new(global_level: InvalidationLevel) -> Self {
        Self {
            global_level,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn cursor() -> Self {
        Self::new(InvalidationLevel::Cursor)
    }

    #[must_use]
    pub fn light() -> Self {
        Self::new(InvalidationLevel::Light)
    }

    #[must_use]
    pub fn full() -> Self {
        Self::new(InvalidationLevel::Full)
    }

    #[must_use]
    pub fn global_level(&self) -> InvalidationLevel {
        self.global_level
    }

    pub fn invalidate_pane(&mut self, pane_index: usize, invalidation: PaneInvalidation) {
        self.panes
            .entry(pane_index)
            .and_modify(|existing| {
                existing.level = existing.level.max(invalidation.level);
                existing.auto_scale |= invalidation.auto_scale;
            })
            .or_insert(invalidation);
    }

    /// Effective invalidation of a pane, including the global level.
    #[must_use]
    pub fn pane_invalidation(&self, pane_index: usize) -> PaneInvalidation {
        let explicit = self.panes.get(&pane_index).copied().unwrap_or_default();
        PaneInvalidation {
            level: self.global_level.max(explicit.level),
            auto_scale: explicit.auto_scale,
        }
    }

    pub fn explicit_panes(&self) -> impl Iterator<Item = (usize, PaneInvalidation)> + '_ {
        self.panes.iter().map(|(index, inv)| (*index, *inv))
    }

    #[must_use]
    pub fn time_scale_invalidations(&self) -> &[TimeScaleInvalidation] {
        &self.time_scale
    }

    #[must_use]
    pub fn first_running_animation(&self, now: f64) -> Option<TimeScaleAnimation> {
        self.time_scale.iter().find_map(|inv| match inv {
            TimeScaleInvalidation::Animation(animation) if !animation.finished(now) => {
                Some(*animation)
            }
            _ => None,
        })
    }

    pub fn set_fit_content(&mut self) {
        self.replace_time_scale(TimeScaleInvalidation::FitContent);
    }

    pub fn apply_range(&mut self, range: LogicalRange) {
        self.replace_time_scale(TimeScaleInvalidation::ApplyRange(range));
    }

    pub fn reset_time_scale(&mut self) {
        self.replace_time_scale(TimeScaleInvalidation::Reset);
    }

    pub fn set_bar_spacing(&mut self, spacing: f64) {
        self.stop_time_scale_animation();
        self.time_scale
            .push(TimeScaleInvalidation::ApplyBarSpacing(spacing));
    }

    pub fn set_right_offset(&mut self, offset: f64) {
        self.stop_time_scale_animation();
        self.time_scale
            .push(TimeScaleInvalidation::ApplyRightOffset(offset));
    }

    pub fn set_time_scale_animation(&mut self, animation: TimeScaleAnimation) {
        self.remove_time_scale_animation();
        self.time_scale
            .push(TimeScaleInvalidation::Animation(animation));
    }

    pub fn stop_time_scale_animation(&mut self) {
        self.remove_time_scale_animation();
        self.time_scale.push(TimeScaleInvalidation::StopAnimation);
    }

    pub fn merge(&mut self, other: &InvalidateMask) {
        for invalidation in &other.time_scale {
            match *invalidation {
                TimeScaleInvalidation::FitContent => self.set_fit_content(),
                TimeScaleInvalidation::ApplyRange(range) => self.apply_range(range),
                TimeScaleInvalidation::ApplyBarSpacing(spacing) => self.set_bar_spacing(spacing),
                TimeScaleInvalidation::ApplyRightOffset(offset) => self.set_right_offset(offset),
                TimeScaleInvalidation::Reset => self.reset_time_scale(),
                TimeScaleInvalidation::Animation(animation) => {
                    self.set_time_scale_animation(animation);
                }
                TimeScaleInvalidation::StopAnimation => self.remove_time_scale_animation(),
            }
        }
        self.global_level = self.global_level.max(other.global_level);
        for (index, invalidation) in &other.panes {
            self.invalidate_pane(*index, *invalidation);
        }
    }

    fn replace_time_scale(&mut self, invalidation: TimeScaleInvalidation) {
        self.stop_time_scale_animation();
        self.time_scale.clear();
        self.time_scale.push(invalidation);
    }

    fn remove_time_scale_animation(&mut self) {
        if let Some(position) = self
            .time_scale
            .iter()
            .position(|inv| matches!(inv, TimeScaleInvalidation::Animation(_)))
        {
            self.time_scale.remove(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InvalidateMask, InvalidationLevel, PaneInvalidation, TimeScaleInvalidation};
    use crate::model::kinetic_animation::{LinearAnimation, TimeScaleAnimation};
    use crate::model::time_scale::LogicalRange;

    fn linear(to: f64) -> TimeScaleAnimation {
        TimeScaleAnimation::Linear(LinearAnimation {
            from: 0.0,
            to,
            start_time: 0.0,
            duration: 100.0,
        })
    }

    #[test]
    fn pane_levels_take_max_and_autoscale_is_sticky() {
        let mut mask = InvalidateMask::new(InvalidationLevel::None);
        mask.invalidate_pane(2, PaneInvalidation::new(InvalidationLevel::Light, true));
        mask.invalidate_pane(2, PaneInvalidation::new(InvalidationLevel::Cursor, false));

        let pane = mask.pane_invalidation(2);
        assert_eq!(pane.level, InvalidationLevel::Light);
        assert!(pane.auto_scale);
        assert_eq!(mask.pane_invalidation(0), PaneInvalidation::default());
    }

    #[test]
    fn global_level_lifts_every_pane() {
        let mut mask = InvalidateMask::light();
        mask.invalidate_pane(0, PaneInvalidation::new(InvalidationLevel::Cursor, false));
        assert_eq!(mask.pane_invalidation(0).level, InvalidationLevel::Light);
        assert_eq!(mask.pane_invalidation(5).level, InvalidationLevel::Light);
    }

    #[test]
    fn apply_range_and_fit_content_replace_queue() {
        let mut mask = InvalidateMask::light();
        mask.set_bar_spacing(8.0);
        mask.set_right_offset(2.0);
        assert_eq!(mask.time_scale_invalidations().len(), 4);

        let range = LogicalRange::new(3.0, 30.0);
        mask.apply_range(range);
        assert_eq!(
            mask.time_scale_invalidations(),
            &[TimeScaleInvalidation::ApplyRange(range)]
        );
        mask.set_fit_content();
        assert_eq!(
            mask.time_scale_invalidations(),
            &[TimeScaleInvalidation::FitContent]
        );
    }

    #[test]
    fn only_one_animation_is_kept() {
        let mut mask = InvalidateMask::light();
        mask.set_time_scale_animation(linear(5.0));
        mask.set_time_scale_animation(linear(9.0));
        assert_eq!(
            mask.time_scale_invalidations(),
            &[TimeScaleInvalidation::Animation(linear(9.0))]
        );

        mask.stop_time_scale_animation();
        assert_eq!(
            mask.time_scale_invalidations(),
            &[TimeScaleInvalidation::StopAnimation]
        );
    }

    #[test]
    fn merging_stop_removes_pending_animation() {
        let mut pending = InvalidateMask::light();
        pending.set_time_scale_animation(linear(4.0));
        let mut stop = InvalidateMask::light();
        stop.stop_time_scale_animation();

        pending.merge(&stop);
        assert!(pending.time_scale_invalidations().is_empty());
        assert!(pending.first_running_animation(10.0).is_none());
    }

    #[test]
    fn merge_combines_levels_and_panes() {
        let mut a = InvalidateMask::cursor();
        a.invalidate_pane(0, PaneInvalidation::new(InvalidationLevel::Cursor, false));
        let mut b = InvalidateMask::light();
        b.invalidate_pane(0, PaneInvalidation::new(InvalidationLevel::Full, true));
        b.invalidate_pane(1, PaneInvalidation::new(InvalidationLevel::Cursor, false));

        a.merge(&b);
        assert_eq!(a.global_level(), InvalidationLevel::Light);
        assert_eq!(a.pane_invalidation(0).level, InvalidationLevel::Full);
        assert!(a.pane_invalidation(0).auto_scale);
        assert_eq!(a.pane_invalidation(1).level, InvalidationLevel::Light);
    }
}
