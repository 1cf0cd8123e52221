use pricechart::model::{
    ChartModel, ChartOptions, MinMax, PlotRow, PlotRowValueIndex, SeriesDataItem, SeriesOptions,
    SeriesType,
};
use proptest::prelude::*;

fn brute_force(rows: &[PlotRow], from: i64, to: i64, column: PlotRowValueIndex) -> Option<MinMax> {
    rows.iter()
        .filter(|row| (from..=to).contains(&(row.index as i64)))
        .map(|row| row.value[column as usize])
        .fold(None, |acc: Option<MinMax>, value| {
            Some(match acc {
                Some(acc) => MinMax {
                    min: acc.min.min(value),
                    max: acc.max.max(value),
                },
                None => MinMax { min: value, max: value },
            })
        })
}

fn bars(values: &[(f64, f64)]) -> Vec<SeriesDataItem> {
    values
        .iter()
        .enumerate()
        .map(|(i, (open, close))| {
            let high = open.max(*close) + 1.0;
            let low = open.min(*close) - 1.0;
            SeriesDataItem::ohlc(86_400 * (i as i64 + 1), *open, high, low, *close)
        })
        .collect()
}

proptest! {
    #[test]
    fn cached_min_max_matches_full_scan_property(
        values in prop::collection::vec((-1_000.0f64..1_000.0, -1_000.0f64..1_000.0), 31..200),
        appended in prop::collection::vec((-1_000.0f64..1_000.0, -1_000.0f64..1_000.0), 1..70),
        queries in prop::collection::vec((0i64..280, 0i64..280), 1..12)
    ) {
        let mut model = ChartModel::new(ChartOptions {
            width: 800,
            height: 400,
            ..ChartOptions::default()
        })
        .expect("valid options");
        let series = model
            .create_series(SeriesOptions::for_type(SeriesType::Bar), None)
            .expect("series");

        let mut all = values.clone();
        model.apply_new_data(series, &bars(&all)).expect("data");
        for pass in 0..2 {
            let list = model.series(series).expect("series").bars();
            for (a, b) in &queries {
                let (from, to) = (*a.min(b), *a.max(b));
                for column in [PlotRowValueIndex::Low, PlotRowValueIndex::High, PlotRowValueIndex::Close] {
                    // First call fills chunks, second one reads them back.
                    let cold = list.min_max_on_range_cached(from, to, &[column]);
                    let warm = list.min_max_on_range_cached(from, to, &[column]);
                    let expected = brute_force(list.rows(), from, to, column);
                    prop_assert_eq!(cold, expected, "pass {} range {}..={}", pass, from, to);
                    prop_assert_eq!(warm, expected);
                }
            }
            all.extend(appended.iter().copied());
            model.apply_new_data(series, &bars(&all)).expect("data");
        }
    }
}
