//! Shared fixtures for the calendar integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use apodcal_calendar::{
    CalendarDataLoader, CalendarState, LoaderSettings, ManualClock, MemoryStore, MonthCache,
};
use apodcal_core::NetworkError;
use apodcal_nasa::{ApodError, ApodSource, DayRecord, MediaKind, MonthKey, MonthPayload};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::Barrier;

pub const KEY: &str = "apodCache";

/// Upstream stand-in: serves canned records and counts requests.
#[derive(Default)]
pub struct FakeSource {
    records: Mutex<Vec<DayRecord>>,
    calls: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    fail: AtomicBool,
    latency: Mutex<Duration>,
    barrier: Mutex<Option<Arc<Barrier>>>,
}

impl FakeSource {
    pub fn with_records(records: Vec<DayRecord>) -> Self {
        let source = Self::default();
        *source.records.lock() = records;
        source
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Hold every response until `n` requests are in flight.
    pub fn set_barrier(&self, n: usize) {
        *self.barrier.lock() = Some(Arc::new(Barrier::new(n)));
    }

    pub fn calls(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ApodSource for FakeSource {
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DayRecord>, ApodError> {
        self.calls.lock().push((start, end));

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let barrier = self.barrier.lock().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(NetworkError::ConnectionFailed("connection reset".into()).into());
        }

        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.day >= start && r.day <= end)
            .cloned()
            .collect())
    }
}

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Today is 20 March 2024.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            source: Arc::new(FakeSource::default()),
            store: Arc::new(store),
            clock: Arc::new(ManualClock::new(at(2024, 3, 20, 12))),
        }
    }

    pub fn loader(&self) -> CalendarDataLoader {
        self.loader_with(LoaderSettings::default())
    }

    pub fn loader_with(&self, settings: LoaderSettings) -> CalendarDataLoader {
        CalendarDataLoader::new(
            self.source.clone(),
            self.store.clone(),
            self.clock.clone(),
            settings,
        )
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn month(y: i32, m: u32) -> MonthKey {
    MonthKey::new(y, m).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, hour, 0, 0).unwrap()
}

pub fn record(date: NaiveDate, title: &str) -> DayRecord {
    DayRecord {
        day: date,
        title: title.to_string(),
        explanation: "E".to_string(),
        media_url: "U".to_string(),
        media_kind: MediaKind::Image,
        hdurl: None,
        copyright: None,
    }
}

/// Store seeded with a cache blob holding `entries`.
pub fn seeded_store(entries: Vec<(MonthKey, Vec<DayRecord>, DateTime<Utc>)>) -> MemoryStore {
    let mut cache = MonthCache::new();
    for (key, records, fetched_at) in entries {
        cache.insert(key, MonthPayload::from_records(records), fetched_at);
    }
    MemoryStore::with_entry(KEY, &cache.to_json().unwrap())
}

/// Wait until `month` is no longer loading and return the state.
pub async fn settle(loader: &CalendarDataLoader, month: MonthKey) -> CalendarState {
    let mut rx = loader.subscribe();
    let state = rx.wait_for(|s| s.is_settled_for(month)).await.unwrap().clone();
    state
}
