pub mod ids;
pub mod price_format;
pub mod time;
pub mod types;

pub use ids::{PaneId, PriceScaleId, SeriesId};
pub use price_format::{PriceFormat, PriceFormatter, precision_by_min_move};
pub use time::{BusinessDay, HorzTime, TimeConverter, TimePoint, convert_time};
pub use types::{Size, Viewport};
