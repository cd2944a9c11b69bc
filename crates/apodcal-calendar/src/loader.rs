//! Month data loader for the APOD calendar.
//!
//! Given the month being viewed, the loader either serves it from the
//! month cache, skips it (future months have nothing published), or
//! fetches it after a debounce delay. Every change is published as a
//! [`CalendarState`] on a watch channel.
//!
//! Each call to [`CalendarDataLoader::set_active_month`] starts a new
//! generation with its own cancellation token, a child of the loader's
//! liveness token. Superseded generations never publish; once the loader
//! is dropped nothing is published or cached.

use std::sync::Arc;
use std::time::Duration;

use apodcal_core::CacheConfig;
use apodcal_nasa::{ApodSource, MonthKey, MonthPayload};
use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CachedMonth, MonthCache};
use crate::clock::Clock;
use crate::debounce::Debouncer;
use crate::store::DurableStore;

/// Where the currently published state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// No month requested yet.
    Idle,
    /// Month is after the current month; nothing to fetch.
    SkippedFuture,
    /// Served from the month cache.
    CacheHit,
    /// Waiting for the debounce delay or the response.
    Fetching,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct CalendarState {
    pub month: Option<MonthKey>,
    pub phase: LoadPhase,
    pub payload: Arc<MonthPayload>,
    pub error: Option<String>,
    pub is_loading: bool,
}

impl CalendarState {
    fn idle() -> Self {
        Self {
            month: None,
            phase: LoadPhase::Idle,
            payload: Arc::default(),
            error: None,
            is_loading: false,
        }
    }

    fn settled(month: MonthKey, phase: LoadPhase, payload: MonthPayload) -> Self {
        Self {
            month: Some(month),
            phase,
            payload: Arc::new(payload),
            error: None,
            is_loading: false,
        }
    }

    /// Whether `month` has finished loading, successfully or not.
    pub fn is_settled_for(&self, month: MonthKey) -> bool {
        self.month == Some(month) && !self.is_loading
    }
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    /// Quiet period after the last month change before fetching
    pub debounce: Duration,
    /// Validity window of the current month's cache entry
    pub current_month_ttl: chrono::Duration,
    /// Durable store key holding the month cache
    pub storage_key: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl LoaderSettings {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            debounce: config.debounce(),
            current_month_ttl: config.current_month_ttl(),
            storage_key: config.storage_key.clone(),
        }
    }
}

struct Shared {
    source: Arc<dyn ApodSource>,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    settings: LoaderSettings,
    cache: Mutex<MonthCache>,
    state_tx: watch::Sender<CalendarState>,
    pending_write: Mutex<Option<JoinHandle<()>>>,
    alive: CancellationToken,
}

pub struct CalendarDataLoader {
    shared: Arc<Shared>,
    debouncer: Debouncer,
}

impl CalendarDataLoader {
    /// Build a loader, reading the month cache from `store`.
    pub fn new(
        source: Arc<dyn ApodSource>,
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        settings: LoaderSettings,
    ) -> Self {
        let cache = MonthCache::load(store.as_ref(), &settings.storage_key);
        info!(months = cache.len(), "APOD month cache ready");

        let alive = CancellationToken::new();
        let debouncer = Debouncer::new(settings.debounce, alive.clone());
        let (state_tx, _) = watch::channel(CalendarState::idle());

        Self {
            shared: Arc::new(Shared {
                source,
                store,
                clock,
                settings,
                cache: Mutex::new(cache),
                state_tx,
                pending_write: Mutex::new(None),
                alive,
            }),
            debouncer,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CalendarState> {
        self.shared.state_tx.subscribe()
    }

    /// Latest published state.
    pub fn state(&self) -> CalendarState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn today(&self) -> NaiveDate {
        self.shared.clock.today()
    }

    pub fn cached_month(&self, month: MonthKey) -> Option<CachedMonth> {
        self.shared.cache.lock().get(&month).cloned()
    }

    /// Switch to the month containing `date`.
    ///
    /// Publishes synchronously for future months and cache hits; otherwise
    /// publishes a loading state and fetches once the debounce delay passes.
    /// Must be called from within a Tokio runtime.
    pub fn set_active_month(&mut self, date: &impl Datelike) -> LoadPhase {
        let month = MonthKey::from_date(date);
        self.debouncer.cancel_pending();

        let shared = &self.shared;
        let current = MonthKey::from_date(&shared.clock.today());

        if month > current {
            debug!(month = %month, "Skipping future month");
            shared.publish(CalendarState::settled(
                month,
                LoadPhase::SkippedFuture,
                MonthPayload::new(),
            ));
            return LoadPhase::SkippedFuture;
        }

        let is_current_month = month == current;
        let now = shared.clock.now();
        let (fresh, last_known) = {
            let cache = shared.cache.lock();
            let fresh = cache
                .fresh(&month, is_current_month, now, shared.settings.current_month_ttl)
                .map(|cached| cached.payload.clone());
            let last_known = match fresh {
                Some(_) => None,
                None => cache.get(&month).map(|cached| cached.payload.clone()),
            };
            (fresh, last_known)
        };

        if let Some(payload) = fresh {
            debug!(month = %month, "Using cached data");
            shared.publish(CalendarState::settled(month, LoadPhase::CacheHit, payload));
            return LoadPhase::CacheHit;
        }

        shared.publish(CalendarState {
            month: Some(month),
            phase: LoadPhase::Fetching,
            payload: Arc::new(last_known.unwrap_or_default()),
            error: None,
            is_loading: true,
        });

        let shared = Arc::clone(&self.shared);
        self.debouncer
            .schedule(move |token| async move { shared.fetch_month(month, token).await });
        LoadPhase::Fetching
    }

    /// Wait for outstanding durable writes to finish.
    pub async fn flush(&self) {
        let pending = self.shared.pending_write.lock().take();
        if let Some(handle) = pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "APOD cache write task failed");
            }
        }
    }
}

impl Drop for CalendarDataLoader {
    fn drop(&mut self) {
        self.shared.alive.cancel();
    }
}

impl Shared {
    fn publish(&self, state: CalendarState) {
        self.state_tx.send_replace(state);
    }

    /// Publish unless `token`'s generation has been superseded.
    ///
    /// The check runs under the channel's write lock, so a stale result
    /// can never overwrite the state of a newer generation.
    fn publish_current(&self, token: &CancellationToken, state: CalendarState) -> bool {
        self.state_tx.send_if_modified(|slot| {
            if token.is_cancelled() {
                return false;
            }
            *slot = state;
            true
        })
    }

    async fn fetch_month(self: Arc<Self>, month: MonthKey, token: CancellationToken) {
        let today = self.clock.today();
        let Some((start, end)) = month.fetch_range(today) else {
            // Only reachable if the clock moved backwards during the delay.
            self.publish_current(
                &token,
                CalendarState::settled(month, LoadPhase::SkippedFuture, MonthPayload::new()),
            );
            return;
        };

        info!(month = %month, %start, %end, "Fetching APOD month");
        let result = self.source.fetch_range(start, end).await;

        if self.alive.is_cancelled() {
            debug!(month = %month, "Loader dropped; discarding response");
            return;
        }

        match result {
            Ok(records) => {
                let payload = MonthPayload::from_records(records);
                let now = self.clock.now();
                self.cache.lock().insert(month, payload.clone(), now);
                self.persist();

                let state = CalendarState::settled(month, LoadPhase::Succeeded, payload);
                if !self.publish_current(&token, state) {
                    debug!(month = %month, "Superseded; month cached without publishing");
                }
            }
            Err(e) => {
                if token.is_cancelled() {
                    debug!(month = %month, error = %e, "Superseded request failed");
                    return;
                }
                warn!(month = %month, error = %e, "Failed to fetch APOD month");

                let last_known = self
                    .cache
                    .lock()
                    .get(&month)
                    .map(|cached| cached.payload.clone())
                    .unwrap_or_default();
                self.publish_current(
                    &token,
                    CalendarState {
                        month: Some(month),
                        phase: LoadPhase::Failed,
                        payload: Arc::new(last_known),
                        error: Some(e.user_message()),
                        is_loading: false,
                    },
                );
            }
        }
    }

    /// Write a snapshot of the cache in the background.
    ///
    /// Writes are chained so snapshots reach the store in order. The
    /// snapshot is taken under the chain lock, so a write queued later
    /// never carries an older cache.
    fn persist(&self) {
        let mut pending = self.pending_write.lock();
        let snapshot = self.cache.lock().clone();
        let store = Arc::clone(&self.store);
        let key = self.settings.storage_key.clone();

        let previous = pending.take();
        *pending = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let write = tokio::task::spawn_blocking(move || snapshot.save(store.as_ref(), &key));
            if let Err(e) = write.await {
                warn!(error = %e, "APOD cache write task failed");
            }
        }));
    }
}
