use approx::assert_relative_eq;
use pricechart::core::{PaneId, PriceScaleId, SeriesId};
use pricechart::model::{
    ChartModel, ChartOptions, PriceScaleMargins, PriceScaleMode, PriceScaleOptions,
    SeriesDataItem, SeriesOptions, SeriesType,
};
use pricechart::ChartError;

fn build_model(width: u32) -> ChartModel {
    let mut model = ChartModel::new(ChartOptions {
        width,
        height: 400,
        ..ChartOptions::default()
    })
    .expect("valid options");
    model.set_width(f64::from(width));
    model.set_pane_height(0, 400.0).expect("first pane");
    model
}

fn line_series(model: &mut ChartModel, closes: &[f64]) -> SeriesId {
    let series = model
        .create_series(SeriesOptions::for_type(SeriesType::Line), None)
        .expect("series");
    let rows: Vec<_> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| SeriesDataItem::value(i as i64 + 1, *close))
        .collect();
    model.apply_new_data(series, &rows).expect("data");
    series
}

fn first_pane(model: &ChartModel) -> PaneId {
    model.panes()[0].id()
}

fn apply_queued_time_scale_changes(model: &mut ChartModel) {
    if let Some(mask) = model.take_pending_invalidation() {
        for invalidation in mask.time_scale_invalidations() {
            model
                .apply_time_scale_invalidation(invalidation, 0.0)
                .expect("valid change");
        }
    }
}

#[test]
fn appending_one_bar_only_touches_the_tail() {
    let mut model = build_model(800);
    let series = line_series(&mut model, &[10.0, 11.0, 12.0]);

    let rows: Vec<_> = [10.0, 11.0, 12.0, 13.0]
        .iter()
        .enumerate()
        .map(|(i, close)| SeriesDataItem::value(i as i64 + 1, *close))
        .collect();
    let first_changed = model.apply_new_data(series, &rows).expect("data");

    assert_eq!(first_changed, Some(3));
    assert_eq!(model.time_scale().base_index(), 3);
    assert_eq!(model.series(series).expect("series").bars().last_index(), Some(3));
}

#[test]
fn percentage_mode_round_trip_restores_the_range() {
    let mut model = build_model(800);
    line_series(&mut model, &[100.0, 90.0, 110.0, 105.0]);
    let pane = first_pane(&model);
    let right = PriceScaleId::right();
    model.recalculate_all_panes();
    let original = model
        .price_scale(pane, &right)
        .expect("scale")
        .price_range()
        .expect("range");
    assert_relative_eq!(original.min_value, 90.0, epsilon = 1e-9);
    assert_relative_eq!(original.max_value, 110.0, epsilon = 1e-9);

    for (mode, min, max) in [
        (PriceScaleMode::Percentage, -10.0, 10.0),
        (PriceScaleMode::Normal, 90.0, 110.0),
    ] {
        let options = PriceScaleOptions {
            mode,
            ..model.price_scale(pane, &right).expect("scale").options().clone()
        };
        model
            .apply_price_scale_options(pane, &right, options)
            .expect("valid options");
        model.recalculate_all_panes();
        let scale = model.price_scale(pane, &right).expect("scale");
        assert_eq!(scale.mode().mode, mode);
        let range = scale.price_range().expect("range");
        assert_relative_eq!(range.min_value, min, epsilon = 1e-9);
        assert_relative_eq!(range.max_value, max, epsilon = 1e-9);
    }
}

#[test]
fn constant_series_range_is_widened_by_min_moves() {
    let mut model = build_model(800);
    line_series(&mut model, &[42.0; 20]);
    model.recalculate_all_panes();

    let pane = first_pane(&model);
    let range = model
        .price_scale(pane, &PriceScaleId::right())
        .expect("scale")
        .price_range()
        .expect("range");
    assert_relative_eq!(range.min_value, 41.95, epsilon = 1e-9);
    assert_relative_eq!(range.max_value, 42.05, epsilon = 1e-9);
}

#[test]
fn overlapping_margins_are_rejected_without_side_effects() {
    let mut model = build_model(800);
    let pane = first_pane(&model);
    let right = PriceScaleId::right();
    let before = model.price_scale(pane, &right).expect("scale").options().clone();

    let options = PriceScaleOptions {
        scale_margins: PriceScaleMargins {
            top: 0.6,
            bottom: 0.6,
        },
        ..before.clone()
    };
    let result = model.apply_price_scale_options(pane, &right, options);

    assert!(matches!(result, Err(ChartError::InvalidOptions(_))));
    assert_eq!(model.price_scale(pane, &right).expect("scale").options(), &before);
}

#[test]
fn fixed_right_edge_pins_queued_offsets_to_zero() {
    let mut model = build_model(800);
    line_series(&mut model, &(0..500).map(f64::from).collect::<Vec<_>>());
    let mut options = model.options().clone();
    options.time_scale.fix_right_edge = true;
    model.apply_options(options).expect("valid options");
    apply_queued_time_scale_changes(&mut model);

    model.set_right_offset(1.0e12);
    apply_queued_time_scale_changes(&mut model);
    assert_eq!(model.time_scale().right_offset(), 0.0);

    model.scroll_chart(-5_000.0);
    apply_queued_time_scale_changes(&mut model);
    assert_eq!(model.time_scale().right_offset(), 0.0);
}

#[test]
fn time_marks_keep_their_minimum_distance() {
    let mut model = build_model(600);
    let series = model
        .create_series(SeriesOptions::for_type(SeriesType::Line), None)
        .expect("series");
    let day = 86_400;
    let start = 1_577_836_800; // 2020-01-01
    let rows: Vec<_> = (0..1_000)
        .map(|i| SeriesDataItem::value(start + i * day, 100.0 + (i % 30) as f64))
        .collect();
    model.apply_new_data(series, &rows).expect("data");
    assert_eq!(model.time_scale().bar_spacing(), 6.0);

    let font_size = model.options().layout.font_size;
    let max_label_width = (font_size + 4.0) * 5.0;
    let max_indexes_per_mark = (max_label_width / 6.0).ceil();

    let marks = model.time_marks().expect("non-empty timeline");
    assert!(marks.len() > 2);
    for pair in marks.windows(2) {
        let distance = pair[1].coord - pair[0].coord;
        assert!(
            distance >= max_indexes_per_mark * 6.0 - 1e-9,
            "{} and {} are {distance}px apart",
            pair[0].label,
            pair[1].label
        );
    }
}

#[test]
fn removing_the_last_pane_is_refused() {
    let mut model = build_model(800);
    let pane = first_pane(&model);
    assert!(model.remove_pane(pane).is_err());

    let second = model.create_pane(None);
    let series = model
        .create_series(SeriesOptions::for_type(SeriesType::Histogram), Some(1))
        .expect("series");
    model.remove_pane(second).expect("two panes");
    assert!(model.series(series).is_none());
    assert_eq!(model.panes().len(), 1);
}
