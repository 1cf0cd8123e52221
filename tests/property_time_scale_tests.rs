use pricechart::model::{ChartModel, ChartOptions, SeriesDataItem, SeriesOptions, SeriesType};
use proptest::prelude::*;

fn model_with_points(count: i64, width: u32) -> ChartModel {
    let mut model = ChartModel::new(ChartOptions {
        width,
        height: 400,
        ..ChartOptions::default()
    })
    .expect("valid options");
    model.set_width(f64::from(width));
    let series = model
        .create_series(SeriesOptions::for_type(SeriesType::Line), None)
        .expect("series");
    let rows: Vec<_> = (0..count)
        .map(|i| SeriesDataItem::value(86_400 * (i + 1), 100.0 + (i % 17) as f64))
        .collect();
    model.apply_new_data(series, &rows).expect("data");
    model
}

proptest! {
    #[test]
    fn index_coordinate_round_trip_property(
        count in 2i64..1_500,
        width in 100u32..2_000,
        spacing in 0.5f64..50.0,
        offset in -40.0f64..40.0
    ) {
        let mut model = model_with_points(count, width);
        let time_scale = model.time_scale_mut();
        time_scale.set_bar_spacing(spacing).expect("spacing");
        time_scale.set_right_offset(offset).expect("offset");

        let visible = time_scale.visible_strict_range().expect("non-empty scale");
        for index in visible.left()..=visible.right() {
            let x = time_scale.index_to_coordinate(index);
            prop_assert_eq!(time_scale.coordinate_to_index(x), index);
        }
    }

    #[test]
    fn newer_bars_sit_further_right_property(
        count in 2i64..1_500,
        width in 100u32..2_000,
        spacing in 0.5f64..50.0,
        offset in -40.0f64..40.0
    ) {
        let mut model = model_with_points(count, width);
        let time_scale = model.time_scale_mut();
        time_scale.set_bar_spacing(spacing).expect("spacing");
        time_scale.set_right_offset(offset).expect("offset");

        let visible = time_scale.visible_strict_range().expect("non-empty scale");
        let coords: Vec<f64> = (visible.left()..=visible.right())
            .map(|index| time_scale.index_to_coordinate(index))
            .collect();
        for pair in coords.windows(2) {
            prop_assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn fixed_right_edge_clamps_any_offset_property(offset in 0.0f64..1.0e9) {
        let mut model = model_with_points(300, 800);
        let mut options = model.time_scale().options().clone();
        options.fix_right_edge = true;
        model.time_scale_mut().apply_options(options).expect("options");

        model.time_scale_mut().set_right_offset(offset).expect("offset");
        prop_assert_eq!(model.time_scale().right_offset(), 0.0);
    }
}
