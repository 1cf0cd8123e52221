use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{PaneId, PriceFormatter, PriceScaleId, SeriesId};
use crate::error::{ChartError, ChartResult};

use super::data_source::{FirstValue, PriceDataSource};
use super::invalidated::Invalidated;
use super::options::{SeriesOptions, SeriesStyle};
use super::plot_list::{MismatchDirection, PlotList, PlotRow, PlotRowValueIndex};
use super::price_range::{AutoscaleInfo, PriceRange};
use super::price_scale::PriceScale;
use super::time_scale::{StrictRange, TimePointIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesType {
    Bar,
    Candlestick,
    Line,
    Area,
    Baseline,
    Histogram,
    Custom,
}

impl SeriesType {
    /// Columns scanned when autoscaling.
    #[must_use]
    pub fn autoscale_plots(self) -> &'static [PlotRowValueIndex] {
        match self {
            Self::Bar | Self::Candlestick | Self::Custom => {
                &[PlotRowValueIndex::Low, PlotRowValueIndex::High]
            }
            Self::Line | Self::Area | Self::Baseline | Self::Histogram => {
                &[PlotRowValueIndex::Close]
            }
        }
    }

    #[must_use]
    pub fn is_ohlc(self) -> bool {
        matches!(self, Self::Bar | Self::Candlestick)
    }
}

/// Colors resolved for one bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarColors {
    pub bar_color: String,
    pub border_color: Option<String>,
    pub wick_color: Option<String>,
    pub line_color: Option<String>,
}

impl BarColors {
    fn body(bar_color: String) -> Self {
        Self {
            bar_color,
            border_color: None,
            wick_color: None,
            line_color: None,
        }
    }
}

/// Resolves bar colors: a per-row override wins, then the up/down style color.
#[derive(Debug, Clone, Copy)]
pub struct SeriesBarColorer<'a> {
    series: &'a Series,
}

impl SeriesBarColorer<'_> {
    /// Colors of the bar at `index`, or of `precomputed` when given.
    #[must_use]
    pub fn bar_style(&self, index: TimePointIndex, precomputed: Option<&PlotRow>) -> Option<BarColors> {
        let row = match precomputed {
            Some(row) => row,
            None => self.series.bars().value_at(index)?,
        };
        Some(bar_colors(&self.series.options.style, row))
    }
}

fn bar_colors(style: &SeriesStyle, row: &PlotRow) -> BarColors {
    let is_up = row.open() <= row.close();
    let pick = |up: &str, down: &str| if is_up { up.to_owned() } else { down.to_owned() };
    let own = row.colors.color.clone();
    match style {
        SeriesStyle::Bar(bar) => BarColors::body(own.unwrap_or_else(|| pick(&bar.up_color, &bar.down_color))),
        SeriesStyle::Candlestick(candle) => BarColors {
            bar_color: own.unwrap_or_else(|| pick(&candle.up_color, &candle.down_color)),
            border_color: Some(
                row.colors
                    .border_color
                    .clone()
                    .unwrap_or_else(|| pick(&candle.border_up_color, &candle.border_down_color)),
            ),
            wick_color: Some(
                row.colors
                    .wick_color
                    .clone()
                    .unwrap_or_else(|| pick(&candle.wick_up_color, &candle.wick_down_color)),
            ),
            line_color: None,
        },
        SeriesStyle::Line(line) | SeriesStyle::Custom(line) => {
            let color = own.unwrap_or_else(|| line.color.clone());
            BarColors {
                line_color: Some(color.clone()),
                ..BarColors::body(color)
            }
        }
        SeriesStyle::Area(area) => {
            let color = own.unwrap_or_else(|| area.line_color.clone());
            BarColors {
                line_color: Some(color.clone()),
                ..BarColors::body(color)
            }
        }
        SeriesStyle::Baseline(baseline) => {
            let color = if row.close() >= baseline.base_value {
                baseline.top_line_color.clone()
            } else {
                baseline.bottom_line_color.clone()
            };
            let color = own.unwrap_or(color);
            BarColors {
                line_color: Some(color.clone()),
                ..BarColors::body(color)
            }
        }
        SeriesStyle::Histogram(histogram) => {
            BarColors::body(own.unwrap_or_else(|| histogram.color.clone()))
        }
    }
}

/// Last value shown on the price axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LastValueData {
    pub price: f64,
    pub text: String,
    pub formatted_price_absolute: String,
    pub formatted_price_percentage: String,
    pub color: String,
    pub coordinate: f64,
    pub index: TimePointIndex,
}

/// Replaces the computed autoscale hint of a series.
pub type AutoscaleInfoProvider = Box<dyn Fn(Option<AutoscaleInfo>) -> Option<AutoscaleInfo>>;

pub struct Series {
    id: SeriesId,
    pane_id: PaneId,
    series_type: SeriesType,
    options: SeriesOptions,
    data: PlotList,
    formatter: PriceFormatter,
    last_value: Invalidated<Option<LastValueData>>,
    autoscale_info_provider: Option<AutoscaleInfoProvider>,
}

impl fmt::Debug for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Series")
            .field("id", &self.id)
            .field("pane_id", &self.pane_id)
            .field("series_type", &self.series_type)
            .field("rows", &self.data.size())
            .field("custom_autoscale", &self.autoscale_info_provider.is_some())
            .finish()
    }
}

impl Series {
    pub fn new(id: SeriesId, pane_id: PaneId, options: SeriesOptions) -> ChartResult<Self> {
        options.validate()?;
        Ok(Self {
            id,
            pane_id,
            series_type: options.style.series_type(),
            formatter: PriceFormatter::new(options.price_format),
            options,
            data: PlotList::default(),
            last_value: Invalidated::stale(),
            autoscale_info_provider: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SeriesId {
        self.id
    }

    #[must_use]
    pub fn series_type(&self) -> SeriesType {
        self.series_type
    }

    #[must_use]
    pub fn pane_id(&self) -> PaneId {
        self.pane_id
    }

    pub(crate) fn set_pane_id(&mut self, pane_id: PaneId) {
        self.pane_id = pane_id;
    }

    #[must_use]
    pub fn options(&self) -> &SeriesOptions {
        &self.options
    }

    /// Replaces the options; the series type is fixed at creation.
    pub fn apply_options(&mut self, options: SeriesOptions) -> ChartResult<()> {
        options.validate()?;
        if options.style.series_type() != self.series_type {
            return Err(ChartError::InvalidOptions(format!(
                "series {} is {:?}, style is {:?}",
                self.id.raw(),
                self.series_type,
                options.style.series_type()
            )));
        }
        if options.price_format != self.options.price_format {
            self.formatter = PriceFormatter::new(options.price_format);
        }
        self.options = options;
        self.last_value.invalidate();
        Ok(())
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.options.title
    }

    #[must_use]
    pub fn bars(&self) -> &PlotList {
        &self.data
    }

    pub(crate) fn bars_mut(&mut self) -> &mut PlotList {
        &mut self.data
    }

    pub fn set_data(&mut self, rows: Vec<PlotRow>) {
        self.data.set_data(rows);
        self.last_value.invalidate();
    }

    pub fn set_autoscale_info_provider(&mut self, provider: Option<AutoscaleInfoProvider>) {
        self.autoscale_info_provider = provider;
    }

    #[must_use]
    pub fn bar_colorer(&self) -> SeriesBarColorer<'_> {
        SeriesBarColorer { series: self }
    }

    /// First stored bar at or right of the visible window's left edge.
    #[must_use]
    pub fn first_bar(&self, visible_bars: Option<StrictRange>) -> Option<&PlotRow> {
        let visible_bars = visible_bars?;
        self.data
            .search(visible_bars.left(), MismatchDirection::NearestRight)
    }

    /// Last bar data for the price axis label, or `None` when nothing is ready.
    ///
    /// With `global_last` the very last row is used, otherwise the row at or
    /// before the right edge of the visible window.
    #[must_use]
    pub fn last_value_data(
        &self,
        global_last: bool,
        visible_bars: Option<StrictRange>,
        price_scale: &PriceScale,
        time_scale_empty: bool,
    ) -> Option<LastValueData> {
        if time_scale_empty || price_scale.is_empty() || self.data.is_empty() {
            return None;
        }
        let visible = visible_bars?;
        let first_value = self.first_value(Some(visible))?;
        let bar = if global_last {
            self.data.last()?
        } else {
            let end = self
                .data
                .search(visible.right(), MismatchDirection::NearestLeft)?;
            self.data.value_at(end.index as TimePointIndex)?
        };
        let index = bar.index as TimePointIndex;
        let price = bar.close();
        let colors = self.bar_colorer().bar_style(index, Some(bar))?;
        Some(LastValueData {
            price,
            text: price_scale.format_price(price, first_value.value),
            formatted_price_absolute: self.formatter.format(price),
            formatted_price_percentage: price_scale.format_price_percentage(price, first_value.value),
            color: colors.bar_color,
            coordinate: price_scale.price_to_coordinate(price, first_value.value),
            index,
        })
    }

    /// Cached variant of [`Series::last_value_data`] for the visible window.
    pub fn cached_last_value(
        &mut self,
        visible_bars: Option<StrictRange>,
        price_scale: &PriceScale,
        time_scale_empty: bool,
    ) -> Option<&LastValueData> {
        if !self.last_value.is_fresh() {
            let value = self.last_value_data(false, visible_bars, price_scale, time_scale_empty);
            self.last_value.set(value);
        }
        self.last_value.get().and_then(Option::as_ref)
    }

    fn autoscale_info_impl(&self, from: TimePointIndex, to: TimePointIndex) -> Option<AutoscaleInfo> {
        if self.data.is_empty() {
            return None;
        }
        let mut range = self
            .data
            .min_max_on_range_cached(from, to, self.series_type.autoscale_plots())
            .map(|min_max| PriceRange::new(min_max.min, min_max.max));
        if let SeriesStyle::Histogram(histogram) = &self.options.style {
            range = PriceRange::merge_optional(range, Some(PriceRange::new(histogram.base, histogram.base)));
        }
        Some(AutoscaleInfo::new(range, None))
    }
}

impl PriceDataSource for Series {
    fn source_id(&self) -> SeriesId {
        self.id
    }

    fn price_scale_id(&self) -> &PriceScaleId {
        &self.options.price_scale_id
    }

    fn z_order(&self) -> i32 {
        self.options.z_order.unwrap_or(0)
    }

    fn visible(&self) -> bool {
        self.options.visible
    }

    fn first_value(&self, visible_bars: Option<StrictRange>) -> Option<FirstValue> {
        self.first_bar(visible_bars).map(|bar| FirstValue {
            value: bar.close(),
            time_point: bar.time,
        })
    }

    fn autoscale_info(&self, from: TimePointIndex, to: TimePointIndex) -> Option<AutoscaleInfo> {
        let info = self.autoscale_info_impl(from, to);
        match &self.autoscale_info_provider {
            Some(provider) => provider(info),
            None => info,
        }
    }

    fn min_move(&self) -> f64 {
        self.options.price_format.min_move
    }

    fn formatter(&self) -> &PriceFormatter {
        &self.formatter
    }

    fn update_all_views(&mut self) {
        self.last_value.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::{Series, SeriesType};
    use crate::core::{HorzTime, PaneId, SeriesId, TimePoint};
    use crate::model::data_source::PriceDataSource;
    use crate::model::options::{SeriesOptions, SeriesStyle};
    use crate::model::plot_list::{PlotRow, RowColors};
    use crate::model::price_range::{AutoscaleInfo, PriceRange};
    use crate::model::time_scale::StrictRange;

    fn row(index: usize, open: f64, high: f64, low: f64, close: f64) -> PlotRow {
        PlotRow {
            index,
            time: TimePoint::from_timestamp(index as i64 * 60),
            value: [open, high, low, close],
            original_time: HorzTime::Timestamp(index as i64 * 60),
            colors: RowColors::default(),
            custom_values: None,
        }
    }

    fn series(series_type: SeriesType) -> Series {
        Series::new(SeriesId::new(1), PaneId::new(0), SeriesOptions::for_type(series_type))
            .expect("valid options")
    }

    #[test]
    fn candle_colors_follow_direction_and_overrides() {
        let mut candles = series(SeriesType::Candlestick);
        let mut down = row(1, 12.0, 13.0, 9.0, 10.0);
        down.colors.wick_color = Some("#000000".to_owned());
        candles.set_data(vec![row(0, 10.0, 12.0, 9.0, 11.0), down]);

        let up = candles.bar_colorer().bar_style(0, None).expect("bar 0");
        assert_eq!(up.bar_color, "#26a69a");
        let down = candles.bar_colorer().bar_style(1, None).expect("bar 1");
        assert_eq!(down.bar_color, "#ef5350");
        assert_eq!(down.wick_color.as_deref(), Some("#000000"));
        assert!(candles.bar_colorer().bar_style(7, None).is_none());
    }

    #[test]
    fn autoscale_uses_type_specific_columns() {
        let mut candles = series(SeriesType::Candlestick);
        candles.set_data(vec![row(0, 10.0, 15.0, 5.0, 11.0)]);
        let info = candles.autoscale_info(0, 0).expect("info");
        assert_eq!(info.price_range, Some(PriceRange::new(5.0, 15.0)));

        let mut line = series(SeriesType::Line);
        line.set_data(vec![row(0, 10.0, 15.0, 5.0, 11.0)]);
        let info = line.autoscale_info(0, 0).expect("info");
        assert_eq!(info.price_range, Some(PriceRange::new(11.0, 11.0)));
    }

    #[test]
    fn histogram_autoscale_includes_base() {
        let mut histogram = series(SeriesType::Histogram);
        histogram.set_data(vec![row(0, 4.0, 4.0, 4.0, 4.0), row(1, 6.0, 6.0, 6.0, 6.0)]);
        let info = histogram.autoscale_info(0, 1).expect("info");
        assert_eq!(info.price_range, Some(PriceRange::new(0.0, 6.0)));
    }

    #[test]
    fn provider_overrides_autoscale() {
        let mut line = series(SeriesType::Line);
        line.set_data(vec![row(0, 1.0, 1.0, 1.0, 1.0)]);
        line.set_autoscale_info_provider(Some(Box::new(|base: Option<AutoscaleInfo>| {
            base.map(|info| AutoscaleInfo {
                price_range: info.price_range.map(|range| PriceRange::new(range.min_value - 1.0, 10.0)),
                margins: None,
            })
        })));
        let info = line.autoscale_info(0, 0).expect("info");
        assert_eq!(info.price_range, Some(PriceRange::new(0.0, 10.0)));
    }

    #[test]
    fn first_value_searches_right_of_visible_edge() {
        let mut line = series(SeriesType::Line);
        line.set_data(vec![row(2, 5.0, 5.0, 5.0, 5.0), row(4, 7.0, 7.0, 7.0, 7.0)]);
        let first = line
            .first_value(Some(StrictRange::new(3, 10)))
            .expect("first value");
        assert_eq!(first.value, 7.0);
        assert!(line.first_value(None).is_none());
    }

    #[test]
    fn apply_options_rejects_type_change() {
        let mut line = series(SeriesType::Line);
        let mut options = line.options().clone();
        options.style = SeriesStyle::default_for(SeriesType::Bar);
        assert!(line.apply_options(options).is_err());
    }
}
