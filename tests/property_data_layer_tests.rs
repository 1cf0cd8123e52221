use std::collections::BTreeSet;

use pricechart::core::SeriesId;
use pricechart::model::{
    DataLayer, InvalidateMask, InvalidationLevel, PaneInvalidation, SeriesDataItem, SeriesType,
    TimeBehavior,
};
use proptest::prelude::*;

fn rows(times: &BTreeSet<i64>) -> Vec<SeriesDataItem> {
    times
        .iter()
        .map(|time| SeriesDataItem::value(*time, (*time % 97) as f64))
        .collect()
}

fn level(raw: u8) -> InvalidationLevel {
    match raw % 4 {
        0 => InvalidationLevel::None,
        1 => InvalidationLevel::Cursor,
        2 => InvalidationLevel::Light,
        _ => InvalidationLevel::Full,
    }
}

fn mask(global: u8, panes: &[(usize, u8, bool)]) -> InvalidateMask {
    let mut mask = InvalidateMask::new(level(global));
    for (index, raw, auto_scale) in panes {
        mask.invalidate_pane(*index, PaneInvalidation::new(level(*raw), *auto_scale));
    }
    mask
}

proptest! {
    #[test]
    fn setting_identical_rows_twice_changes_nothing_property(
        times in prop::collection::btree_set(1i64..1_000_000, 1..150),
        other in prop::collection::btree_set(1i64..1_000_000, 0..50)
    ) {
        let behavior = TimeBehavior::default();
        let mut layer = DataLayer::default();
        let a = SeriesId::new(0);
        let b = SeriesId::new(1);
        layer
            .set_series_data(&behavior, b, SeriesType::Line, &rows(&other))
            .expect("valid data");
        layer
            .set_series_data(&behavior, a, SeriesType::Line, &rows(&times))
            .expect("valid data");
        let points = layer.sorted_time_points().len();

        let again = layer
            .set_series_data(&behavior, a, SeriesType::Line, &rows(&times))
            .expect("valid data");
        prop_assert_eq!(again.time_scale.first_changed_point_index, None);
        prop_assert_eq!(layer.sorted_time_points().len(), points);
        prop_assert_eq!(points, times.union(&other).count());
    }

    #[test]
    fn mask_merge_keeps_the_strongest_request_property(
        first_global in 0u8..4,
        second_global in 0u8..4,
        first_panes in prop::collection::vec((0usize..4, 0u8..4, any::<bool>()), 0..6),
        second_panes in prop::collection::vec((0usize..4, 0u8..4, any::<bool>()), 0..6)
    ) {
        let first = mask(first_global, &first_panes);
        let second = mask(second_global, &second_panes);

        let mut forward = first.clone();
        forward.merge(&second);
        let mut backward = second.clone();
        backward.merge(&first);
        let mut twice = forward.clone();
        twice.merge(&second);

        prop_assert_eq!(forward.global_level(), level(first_global).max(level(second_global)));
        for index in 0..4 {
            let merged = forward.pane_invalidation(index);
            prop_assert_eq!(merged, backward.pane_invalidation(index));
            prop_assert_eq!(merged, twice.pane_invalidation(index));
            prop_assert!(merged.level >= first.pane_invalidation(index).level);
            prop_assert!(merged.level >= second.pane_invalidation(index).level);
            let requested = first.pane_invalidation(index).auto_scale
                || second.pane_invalidation(index).auto_scale;
            prop_assert_eq!(merged.auto_scale, requested);
        }
    }
}
