pub mod config;
pub mod error;

pub use config::{ApodConfig, CacheConfig, CalendarConfig, Config, ValidationResult};
pub use error::{ConfigError, NetworkError, ReqwestErrorExt, RusqliteErrorExt, StorageError};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Honors `RUST_LOG`; falls back to `info`. Safe to call more than once.
pub fn init() -> Result<()> {
    let initialized = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!("APOD calendar core initialized");
    }
    Ok(())
}
