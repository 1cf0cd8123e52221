use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Calendar day without intraday time, interpreted as UTC midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessDay {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl BusinessDay {
    #[must_use]
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Parses the strict `yyyy-mm-dd` form.
    pub fn parse(value: &str) -> ChartResult<Self> {
        if !is_valid_date_string(value) {
            return Err(ChartError::InvalidTime(format!(
                "invalid date string={value}, expected format=yyyy-mm-dd"
            )));
        }
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            ChartError::InvalidTime(format!(
                "invalid date string={value}, expected format=yyyy-mm-dd"
            ))
        })?;
        Ok(Self::new(date.year(), date.month(), date.day()))
    }

    /// UTC midnight of this day in seconds.
    pub fn to_timestamp(self) -> ChartResult<i64> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or_else(|| {
            ChartError::InvalidTime(format!(
                "business day {}-{}-{} does not exist",
                self.year, self.month, self.day
            ))
        })?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ChartError::InvalidTime("cannot build midnight".to_owned()))?;
        Ok(midnight.and_utc().timestamp())
    }
}

fn is_valid_date_string(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Horizontal value as supplied by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HorzTime {
    /// UTC timestamp in seconds.
    Timestamp(i64),
    BusinessDay(BusinessDay),
    /// `yyyy-mm-dd` business day string.
    Date(String),
}

impl Default for HorzTime {
    fn default() -> Self {
        Self::Timestamp(0)
    }
}

impl From<i64> for HorzTime {
    fn from(value: i64) -> Self {
        Self::Timestamp(value)
    }
}

impl From<BusinessDay> for HorzTime {
    fn from(value: BusinessDay) -> Self {
        Self::BusinessDay(value)
    }
}

impl From<&str> for HorzTime {
    fn from(value: &str) -> Self {
        Self::Date(value.to_owned())
    }
}

/// Internal horizontal item.
///
/// Time points are ordered by their key only; two points built from a
/// business day and from the matching timestamp share a key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: i64,
    pub business_day: Option<BusinessDay>,
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl TimePoint {
    #[must_use]
    pub const fn from_timestamp(timestamp: i64) -> Self {
        Self {
            timestamp,
            business_day: None,
        }
    }

    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0)
    }
}

/// Converter chosen once per data batch from its first row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeConverter {
    Timestamp,
    BusinessDay,
}

impl TimeConverter {
    #[must_use]
    pub fn select<'a>(mut times: impl Iterator<Item = &'a HorzTime>) -> Option<Self> {
        match times.next()? {
            HorzTime::Timestamp(_) => Some(Self::Timestamp),
            HorzTime::BusinessDay(_) | HorzTime::Date(_) => Some(Self::BusinessDay),
        }
    }

    pub fn convert(self, time: &HorzTime) -> ChartResult<TimePoint> {
        match (self, time) {
            (Self::Timestamp, HorzTime::Timestamp(timestamp)) => {
                Ok(TimePoint::from_timestamp(*timestamp))
            }
            (Self::Timestamp, _) => Err(ChartError::InvalidTime(
                "time must be of type UTCTimestamp".to_owned(),
            )),
            (Self::BusinessDay, HorzTime::BusinessDay(day)) => business_day_point(*day),
            (Self::BusinessDay, HorzTime::Date(value)) => {
                business_day_point(BusinessDay::parse(value)?)
            }
            (Self::BusinessDay, HorzTime::Timestamp(_)) => Err(ChartError::InvalidTime(
                "time must be of type BusinessDay".to_owned(),
            )),
        }
    }
}

/// Converts a single value without a batch-level converter.
pub fn convert_time(time: &HorzTime) -> ChartResult<TimePoint> {
    match time {
        HorzTime::Timestamp(timestamp) => Ok(TimePoint::from_timestamp(*timestamp)),
        HorzTime::BusinessDay(day) => business_day_point(*day),
        HorzTime::Date(value) => business_day_point(BusinessDay::parse(value)?),
    }
}

fn business_day_point(day: BusinessDay) -> ChartResult<TimePoint> {
    Ok(TimePoint {
        timestamp: day.to_timestamp()?,
        business_day: Some(day),
    })
}

#[cfg(test)]
mod tests {
    use super::{BusinessDay, HorzTime, TimeConverter, convert_time};

    #[test]
    fn business_day_string_converts_to_utc_midnight() {
        let point = convert_time(&HorzTime::from("2019-04-11")).expect("valid date");
        assert_eq!(point.timestamp, 1_554_940_800);
        assert_eq!(point.business_day, Some(BusinessDay::new(2019, 4, 11)));
    }

    #[test]
    fn malformed_date_strings_are_rejected() {
        assert!(BusinessDay::parse("2019-4-11").is_err());
        assert!(BusinessDay::parse("2019/04/11").is_err());
        assert!(BusinessDay::parse("2019-02-30").is_err());
    }

    #[test]
    fn converter_is_selected_from_first_row_and_enforced() {
        let times = [HorzTime::Timestamp(10), HorzTime::from("2020-01-01")];
        let converter = TimeConverter::select(times.iter()).expect("converter");
        assert_eq!(converter, TimeConverter::Timestamp);
        assert!(converter.convert(&times[0]).is_ok());
        assert!(converter.convert(&times[1]).is_err());
    }

    #[test]
    fn untagged_json_accepts_every_time_shape() {
        let parsed: Vec<HorzTime> =
            serde_json::from_str(r#"[1700000000, "2020-01-02", {"year":2020,"month":1,"day":3}]"#)
                .expect("parse");
        assert_eq!(parsed[0], HorzTime::Timestamp(1_700_000_000));
        assert_eq!(parsed[1], HorzTime::from("2020-01-02"));
        assert_eq!(parsed[2], HorzTime::BusinessDay(BusinessDay::new(2020, 1, 3)));
    }
}
