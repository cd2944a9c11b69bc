//! Loader wired to the real APOD client, a wiremock server and SQLite.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use apodcal_calendar::{
    CalendarDataLoader, DurableStore, LoadPhase, LoaderSettings, ManualClock, SqliteStore,
};
use apodcal_nasa::ApodClient;
use common::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn loader(server: &MockServer, store: Arc<SqliteStore>) -> CalendarDataLoader {
    let client = ApodClient::with_base_url(&server.uri(), None, Duration::from_secs(5)).unwrap();
    let settings = LoaderSettings {
        debounce: Duration::from_millis(10),
        ..LoaderSettings::default()
    };
    CalendarDataLoader::new(
        Arc::new(client),
        store,
        Arc::new(ManualClock::new(at(2024, 3, 20, 12))),
        settings,
    )
}

#[tokio::test]
async fn test_month_fetched_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apod"))
        .and(query_param("start_date", "2024-03-01"))
        .and(query_param("end_date", "2024-03-20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "date": "2024-03-05",
            "title": "T",
            "explanation": "E",
            "url": "U",
            "media_type": "image"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("apod_cache.db");
    let store = Arc::new(SqliteStore::new(&db_path).unwrap());

    let mut loader = loader(&server, store.clone());
    assert_eq!(loader.set_active_month(&day(2024, 3, 20)), LoadPhase::Fetching);
    let state = settle(&loader, month(2024, 3)).await;
    loader.flush().await;

    assert_eq!(state.phase, LoadPhase::Succeeded);
    assert_eq!(state.payload.keys().collect::<Vec<_>>(), vec!["2024-03-05"]);

    let raw = store.get(KEY).unwrap().unwrap();
    assert!(raw.starts_with(r#"{"2024-03":{"data":{"2024-03-05":{"date":"2024-03-05""#));

    // A new session over the same database serves the month from cache.
    drop(loader);
    let reopened = Arc::new(SqliteStore::new(&db_path).unwrap());
    let mut loader = self::loader(&server, reopened);
    assert_eq!(loader.set_active_month(&day(2024, 3, 20)), LoadPhase::CacheHit);
    assert_eq!(loader.state().payload, state.payload);
}

#[tokio::test]
async fn test_server_error_published_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apod"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut loader = loader(&server, store.clone());
    loader.set_active_month(&day(2024, 2, 1));
    let state = settle(&loader, month(2024, 2)).await;

    assert_eq!(state.phase, LoadPhase::Failed);
    assert!(!state.is_loading);
    assert!(state.error.unwrap().starts_with("Failed to load APOD data"));
    assert!(loader.cached_month(month(2024, 2)).is_none());
    assert!(store.get(KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_body_published_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apod"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut loader = loader(&server, store);
    loader.set_active_month(&day(2024, 2, 1));
    let state = settle(&loader, month(2024, 2)).await;

    assert_eq!(state.phase, LoadPhase::Failed);
    assert!(state.payload.is_empty());
    assert!(state.error.is_some());
}
