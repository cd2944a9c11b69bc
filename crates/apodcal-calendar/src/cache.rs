//! Month cache: APOD payloads keyed by month, persisted as a single blob.
//!
//! The in-memory map is authoritative for a session. Reads and writes of
//! the durable copy are best effort: a missing or corrupt blob loads as an
//! empty cache, and a failed write only logs.

use std::collections::BTreeMap;

use anyhow::Result;
use apodcal_nasa::{MonthKey, MonthPayload};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::DurableStore;

/// A fetched month and when it was accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedMonth {
    #[serde(rename = "data")]
    pub payload: MonthPayload,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
}

impl CachedMonth {
    pub fn new(payload: MonthPayload, fetched_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            fetched_at,
        }
    }

    /// Past months never change upstream, so only the current month expires.
    pub fn is_valid(&self, is_current_month: bool, now: DateTime<Utc>, ttl: Duration) -> bool {
        !is_current_month || now - self.fetched_at < ttl
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MonthCache {
    months: BTreeMap<MonthKey, CachedMonth>,
}

impl MonthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cache stored under `key`. Never fails.
    pub fn load(store: &dyn DurableStore, key: &str) -> Self {
        let raw = match store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!(key, error = %e, "Failed to read APOD cache; starting empty");
                return Self::default();
            }
        };

        match serde_json::from_str::<MonthCache>(&raw) {
            Ok(cache) => {
                debug!(key, months = cache.len(), "Loaded APOD cache");
                cache
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to parse APOD cache; starting empty");
                Self::default()
            }
        }
    }

    /// Write the whole cache under `key`. Failures are logged and swallowed.
    pub fn save(&self, store: &dyn DurableStore, key: &str) {
        let result = self.to_json().and_then(|json| store.set(key, &json));
        match result {
            Ok(()) => debug!(key, months = self.len(), "Saved APOD cache"),
            Err(e) => warn!(key, error = %e, "Failed to save APOD cache"),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn get(&self, month: &MonthKey) -> Option<&CachedMonth> {
        self.months.get(month)
    }

    /// The cached month if it may be served without refetching.
    pub fn fresh(
        &self,
        month: &MonthKey,
        is_current_month: bool,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<&CachedMonth> {
        self.get(month)
            .filter(|cached| cached.is_valid(is_current_month, now, ttl))
    }

    /// Store a freshly fetched payload, stamped with `now`.
    pub fn insert(
        &mut self,
        month: MonthKey,
        payload: MonthPayload,
        now: DateTime<Utc>,
    ) -> &CachedMonth {
        self.months.insert(month, CachedMonth::new(payload, now));
        &self.months[&month]
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn months(&self) -> impl Iterator<Item = &MonthKey> {
        self.months.keys()
    }
}
