//! The month data collaborator consumed by the calendar loader.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::client::ApodClient;
use crate::error::ApodError;
use crate::types::DayRecord;

/// Anything that can return the APOD entries for an inclusive date range.
#[async_trait]
pub trait ApodSource: Send + Sync {
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DayRecord>, ApodError>;
}

#[async_trait]
impl ApodSource for ApodClient {
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DayRecord>, ApodError> {
        ApodClient::fetch_range(self, start, end).await
    }
}
