//! Day and month keys, and the date range requested for a month.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// `YYYY-MM-DD` of an instant, taken in UTC.
pub fn to_day_key(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM-DD` of a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Month containing `date`, from its own calendar fields.
pub fn to_month_key(date: &impl Datelike) -> MonthKey {
    MonthKey::from_date(date)
}

/// A calendar month. Orders chronologically and displays as `YYYY-MM`.
///
/// Stored as the first day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn from_date(date: &impl Datelike) -> Self {
        // Day 1 exists for every representable year/month.
        Self(NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or_default())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.0
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(self.0)
    }

    pub fn num_days(&self) -> u32 {
        self.last_day().day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    /// Shift by `delta` months; saturates at the edges of the calendar.
    pub fn add_months(&self, delta: i32) -> Self {
        let months = Months::new(delta.unsigned_abs());
        let shifted = if delta >= 0 {
            self.0.checked_add_months(months)
        } else {
            self.0.checked_sub_months(months)
        };
        shifted.map(Self).unwrap_or(*self)
    }

    /// Inclusive day range to request for this month as seen on `today`.
    ///
    /// `None` for months after today's month. For the current month the
    /// range stops at `today`, so unpublished days are never requested.
    pub fn fetch_range(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let current = MonthKey::from_date(&today);
        if *self > current {
            return None;
        }

        let end = if *self == current {
            today.min(self.last_day())
        } else {
            self.last_day()
        };
        Some((self.first_day(), end))
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// Error parsing a `YYYY-MM` month key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month key '{0}', expected YYYY-MM")]
pub struct ParseMonthKeyError(String);

impl FromStr for MonthKey {
    type Err = ParseMonthKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMonthKeyError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        if month.len() != 2 {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        MonthKey::new(year, month).ok_or_else(err)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_key_is_utc() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap();
        assert_eq!(to_day_key(instant), "2024-03-05");
        assert_eq!(date_key(date(2024, 3, 5)), "2024-03-05");
    }

    #[test]
    fn test_month_key_format_and_parse() {
        let key = to_month_key(&date(2024, 3, 17));
        assert_eq!(key.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<MonthKey>().unwrap(), key);
        assert!("2024-3".parse::<MonthKey>().is_err());
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("march".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_key_orders_chronologically() {
        let dec = MonthKey::new(2023, 12).unwrap();
        let jan = MonthKey::new(2024, 1).unwrap();
        assert!(dec < jan);
        assert_eq!(dec.add_months(1), jan);
        assert_eq!(jan.add_months(-1), dec);
        assert_eq!(jan.add_months(-13), MonthKey::new(2022, 12).unwrap());
    }

    #[test]
    fn test_last_day_handles_leap_years() {
        assert_eq!(MonthKey::new(2024, 2).unwrap().last_day(), date(2024, 2, 29));
        assert_eq!(MonthKey::new(2023, 2).unwrap().num_days(), 28);
        assert_eq!(MonthKey::new(2024, 12).unwrap().last_day(), date(2024, 12, 31));
    }

    #[test]
    fn test_fetch_range_past_month_is_whole_month() {
        let march = MonthKey::new(2024, 3).unwrap();
        assert_eq!(
            march.fetch_range(date(2024, 6, 10)),
            Some((date(2024, 3, 1), date(2024, 3, 31)))
        );
    }

    #[test]
    fn test_fetch_range_current_month_stops_at_today() {
        let june = MonthKey::new(2024, 6).unwrap();
        assert_eq!(
            june.fetch_range(date(2024, 6, 15)),
            Some((date(2024, 6, 1), date(2024, 6, 15)))
        );
    }

    #[test]
    fn test_fetch_range_future_month_is_none() {
        let july = MonthKey::new(2024, 7).unwrap();
        assert_eq!(july.fetch_range(date(2024, 6, 30)), None);
        let next_year = MonthKey::new(2025, 1).unwrap();
        assert_eq!(next_year.fetch_range(date(2024, 12, 31)), None);
    }

    #[test]
    fn test_month_key_serde_as_string() {
        let key = MonthKey::new(2024, 3).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2024-03\"");
        let back: MonthKey = serde_json::from_str("\"2024-03\"").unwrap();
        assert_eq!(back, key);
    }
}
