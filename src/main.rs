use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use apodcal_calendar::{
    CalendarDataLoader, CalendarView, LoaderSettings, MonthGrid, SqliteStore, SystemClock,
};
use apodcal_core::{Config, ConfigError};
use apodcal_nasa::{ApodClient, ApodError, DayRecord, MediaKind, MonthKey, MonthPayload};
use chrono::{Datelike, NaiveDate};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "apodcal")]
#[command(about = "Astronomy Picture of the Day, one month at a time")]
#[command(version)]
struct Args {
    /// Month to show as YYYY-MM (default: current month)
    #[arg(short, long)]
    month: Option<MonthKey>,

    /// Show the full entry for this day (YYYY-MM-DD)
    #[arg(short, long)]
    day: Option<NaiveDate>,

    /// Path to config file (default: $XDG_CONFIG_HOME/apodcal/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    apodcal_core::init()?;

    let args = Args::parse();
    let (config, _) = match Config::load_validated(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            if let Some(config_err) = e.downcast_ref::<ConfigError>() {
                eprintln!("{}", config_err.user_message());
            }
            return Err(e);
        }
    };

    let store = SqliteStore::new(config.cache_db_path()).context("Failed to open APOD cache")?;
    let client = Arc::new(ApodClient::with_base_url(
        &config.apod.base_url,
        config.apod.api_key.as_deref(),
        config.apod.timeout(),
    )?);

    let mut loader = CalendarDataLoader::new(
        client.clone(),
        Arc::new(store),
        Arc::new(SystemClock),
        LoaderSettings::from_config(&config.cache),
    );
    tracing::info!(cache = %config.cache_db_path().display(), "APOD calendar started");

    let mut view = CalendarView::new(loader.today(), config.calendar.earliest_date);
    match args.month.or_else(|| args.day.map(|d| MonthKey::from_date(&d))) {
        Some(month) => view.show_month(&mut loader, month),
        None => view.open(&mut loader),
    };

    let month = view.displayed_month();
    let state = {
        let mut rx = loader.subscribe();
        let state = rx.wait_for(|s| s.is_settled_for(month)).await?.clone();
        state
    };
    view.sync(&state);

    print_grid(&view.grid(&state.payload));
    println!();

    if let Some(day) = args.day {
        match lookup_day(&client, &mut view, &state.payload, day).await {
            Ok(Some(record)) => print_detail(&record),
            Ok(None) => println!("No entry for {}", day),
            Err(e) => eprintln!("{}", e.user_message()),
        }
    } else {
        for record in state.payload.records() {
            println!("{}  {:<5}  {}", record.day, kind_label(record.media_kind), record.title);
        }
    }

    loader.flush().await;

    if let Some(error) = state.error {
        anyhow::bail!(error);
    }
    Ok(())
}

/// Entry for `day`, from the loaded month when it covers the day and
/// fetched on its own otherwise.
async fn lookup_day(
    client: &ApodClient,
    view: &mut CalendarView,
    payload: &MonthPayload,
    day: NaiveDate,
) -> Result<Option<DayRecord>, ApodError> {
    if view.displayed_month().contains(day) {
        return Ok(view.select_day(day, payload).cloned());
    }

    tracing::debug!(%day, month = %view.displayed_month(), "Day outside loaded month");
    match client.fetch_day(day).await {
        Ok(record) => Ok(Some(record)),
        Err(ApodError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn kind_label(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "image",
        MediaKind::Video => "video",
        MediaKind::Other => "other",
    }
}

fn print_grid(grid: &MonthGrid) {
    println!("{:^28}", grid.month.first_day().format("%B %Y").to_string());
    println!(" Mo  Tu  We  Th  Fr  Sa  Su");
    for week in &grid.weeks {
        let line: String = week
            .iter()
            .map(|cell| match cell {
                Some(cell) => {
                    let mark = match cell.media_kind {
                        Some(MediaKind::Image) => '*',
                        Some(MediaKind::Video) => '>',
                        Some(MediaKind::Other) => '+',
                        None => ' ',
                    };
                    format!("{:>3}{}", cell.date.day(), mark)
                }
                None => "    ".to_string(),
            })
            .collect();
        println!("{}", line.trim_end());
    }
}

fn print_detail(record: &DayRecord) {
    println!("{}  {}", record.day, record.title);
    if let Some(copyright) = &record.copyright {
        println!("(c) {}", copyright.trim());
    }
    println!("{}", record.hdurl.as_deref().unwrap_or(&record.media_url));
    println!();
    println!("{}", record.explanation);
}
