//! NASA APOD API client.

use std::time::Duration;

use apodcal_core::ReqwestErrorExt;
use chrono::NaiveDate;
use tracing::instrument;

use crate::dates::date_key;
use crate::error::ApodError;
use crate::types::DayRecord;

const APOD_API_BASE: &str = "https://api.nasa.gov/planetary";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum length for error response bodies kept in errors
const MAX_ERROR_BODY_LENGTH: usize = 500;

pub struct ApodClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApodClient {
    /// Client for the public NASA endpoint.
    pub fn new(api_key: Option<&str>) -> Result<Self, ApodError> {
        Self::with_base_url(APOD_API_BASE, api_key, DEFAULT_TIMEOUT)
    }

    /// Client for any APOD-compatible base URL (NASA, a proxy, a mock server).
    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ApodError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.into_network_error())?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/apod", self.base_url)
    }

    fn request(&self, params: &[(&str, String)]) -> reqwest::RequestBuilder {
        let mut request = self.client.get(self.endpoint()).query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }
        request
    }

    /// Fetch every published entry between `start` and `end`, inclusive.
    ///
    /// Entries come back in whatever order the service returns them.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DayRecord>, ApodError> {
        if end < start {
            return Err(ApodError::InvalidRange(format!(
                "{} is before {}",
                date_key(end),
                date_key(start)
            )));
        }

        let response = self
            .request(&[
                ("start_date", date_key(start)),
                ("end_date", date_key(end)),
            ])
            .send()
            .await
            .map_err(|e| e.into_network_error())?;

        let records: Vec<DayRecord> = self.handle_response(response).await?;
        tracing::debug!(count = records.len(), "Fetched APOD range");
        Ok(records)
    }

    /// Fetch the entry for a single day.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_day(&self, day: NaiveDate) -> Result<DayRecord, ApodError> {
        let response = self
            .request(&[("date", date_key(day))])
            .send()
            .await
            .map_err(|e| e.into_network_error())?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApodError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await.map_err(|e| e.into_network_error())?;
            return serde_json::from_str(&body)
                .map_err(|e| ApodError::InvalidResponse(e.to_string()));
        }

        match status.as_u16() {
            401 | 403 => Err(ApodError::InvalidApiKey(status.as_u16())),
            404 => {
                let text = response.text().await.unwrap_or_default();
                Err(ApodError::NotFound(truncate_body(&text)))
            }
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                Err(ApodError::RateLimited(retry_after))
            }
            code => {
                let text = response.text().await.unwrap_or_default();
                Err(ApodError::Api {
                    status: code,
                    message: truncate_body(&text),
                })
            }
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}
