//! APOD month calendar: month cache, fetch orchestration and view model.
//!
//! [`CalendarDataLoader`] decides per month whether to serve the cache,
//! skip a future month or fetch from an [`ApodSource`](apodcal_nasa::ApodSource)
//! after a debounce delay. [`CalendarView`] turns the published state into
//! a navigable month grid.

pub mod cache;
pub mod clock;
pub mod debounce;
pub mod loader;
pub mod store;
pub mod view;

pub use cache::{CachedMonth, MonthCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::Debouncer;
pub use loader::{CalendarDataLoader, CalendarState, LoadPhase, LoaderSettings};
pub use store::{DurableStore, MemoryStore, SqliteStore};
pub use view::{CalendarView, DayCell, MonthGrid};
