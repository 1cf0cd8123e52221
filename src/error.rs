use thiserror::Error;

use crate::core::{PaneId, SeriesId};

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error("unknown price scale id: {0}")]
    UnknownPriceScale(String),

    #[error("unknown series: {0:?}")]
    UnknownSeries(SeriesId),

    #[error("unknown pane: {0:?}")]
    UnknownPane(PaneId),

    #[error("data must be asc ordered by time, index={index}, time={time}, prev time={previous}")]
    UnorderedData {
        index: usize,
        time: f64,
        previous: f64,
    },

    #[error("invalid animation: {0}")]
    InvalidAnimation(String),
}
