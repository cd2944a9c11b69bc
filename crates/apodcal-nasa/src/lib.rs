//! NASA Astronomy Picture of the Day integration.
//!
//! Provides the APOD API client, record types and the day/month keys
//! used to index them.

pub mod client;
pub mod dates;
pub mod error;
pub mod source;
pub mod types;

pub use client::ApodClient;
pub use dates::{date_key, to_day_key, to_month_key, MonthKey, ParseMonthKeyError};
pub use error::ApodError;
pub use source::ApodSource;
pub use types::{DayRecord, MediaKind, MonthPayload};
