//! Calendar view model: month grid, bounded navigation and day detail.
//!
//! The view never talks to the network. It asks the loader for a month and
//! renders whatever payload the loader publishes.

use apodcal_nasa::{DayRecord, MediaKind, MonthKey, MonthPayload};
use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::loader::{CalendarDataLoader, CalendarState, LoadPhase};

/// One day tile of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    /// Kind of the day's entry, `None` when nothing was published.
    pub media_kind: Option<MediaKind>,
}

impl DayCell {
    pub fn has_record(&self) -> bool {
        self.media_kind.is_some()
    }
}

/// A month laid out in Monday-first weeks. Cells outside the month are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub month: MonthKey,
    pub weeks: Vec<[Option<DayCell>; 7]>,
}

impl MonthGrid {
    pub fn build(month: MonthKey, payload: &MonthPayload) -> Self {
        let offset = month.first_day().weekday().num_days_from_monday() as usize;
        let mut weeks = Vec::new();
        let mut week: [Option<DayCell>; 7] = [None; 7];

        let days = month.first_day().iter_days().take(month.num_days() as usize);
        for (i, date) in days.enumerate() {
            let slot = (offset + i) % 7;
            week[slot] = Some(DayCell {
                date,
                media_kind: payload.get(date).map(|record| record.media_kind),
            });
            if slot == 6 {
                weeks.push(week);
                week = [None; 7];
            }
        }
        if week.iter().any(Option::is_some) {
            weeks.push(week);
        }

        Self { month, weeks }
    }

    pub fn cells(&self) -> impl Iterator<Item = &DayCell> {
        self.weeks.iter().flatten().flatten()
    }
}

#[derive(Debug, Clone)]
pub struct CalendarView {
    active_month: MonthKey,
    /// Month navigated to whose data is still loading.
    pending_month: Option<MonthKey>,
    selected_day: Option<NaiveDate>,
    detail: Option<DayRecord>,
    earliest: MonthKey,
}

impl CalendarView {
    pub fn new(today: NaiveDate, earliest_date: NaiveDate) -> Self {
        Self {
            active_month: MonthKey::from_date(&today),
            pending_month: None,
            selected_day: None,
            detail: None,
            earliest: MonthKey::from_date(&earliest_date),
        }
    }

    /// Month the user is looking at, including one still loading.
    pub fn displayed_month(&self) -> MonthKey {
        self.pending_month.unwrap_or(self.active_month)
    }

    /// Month whose data has settled.
    pub fn active_month(&self) -> MonthKey {
        self.active_month
    }

    pub fn pending_month(&self) -> Option<MonthKey> {
        self.pending_month
    }

    pub fn selected_day(&self) -> Option<NaiveDate> {
        self.selected_day
    }

    pub fn detail(&self) -> Option<&DayRecord> {
        self.detail.as_ref()
    }

    pub fn earliest_month(&self) -> MonthKey {
        self.earliest
    }

    /// Request the displayed month from the loader.
    pub fn open(&mut self, loader: &mut CalendarDataLoader) -> LoadPhase {
        self.show_month(loader, self.displayed_month())
    }

    /// Move by `delta` months from the displayed month.
    pub fn navigate(&mut self, loader: &mut CalendarDataLoader, delta: i32) -> LoadPhase {
        let target = self.displayed_month().add_months(delta);
        self.show_month(loader, target)
    }

    /// Show `month`, clamped to the navigable range.
    pub fn show_month(&mut self, loader: &mut CalendarDataLoader, month: MonthKey) -> LoadPhase {
        let latest = MonthKey::from_date(&loader.today());
        let target = month.max(self.earliest).min(latest);
        if target != month {
            debug!(requested = %month, shown = %target, "Month outside navigable range");
        }

        if target != self.displayed_month() {
            self.close_detail();
        }

        let phase = loader.set_active_month(&target.first_day());
        if phase == LoadPhase::Fetching {
            self.pending_month = Some(target);
        } else {
            self.active_month = target;
            self.pending_month = None;
        }
        phase
    }

    /// Apply a state published by the loader.
    pub fn sync(&mut self, state: &CalendarState) {
        if let Some(pending) = self.pending_month {
            if state.is_settled_for(pending) {
                self.active_month = pending;
                self.pending_month = None;
            }
        }
    }

    /// Open the detail for `day`. Days without a record open nothing.
    pub fn select_day(&mut self, day: NaiveDate, payload: &MonthPayload) -> Option<&DayRecord> {
        let record = payload.get(day)?;
        self.selected_day = Some(day);
        self.detail = Some(record.clone());
        self.detail.as_ref()
    }

    pub fn close_detail(&mut self) {
        self.selected_day = None;
        self.detail = None;
    }

    pub fn is_day_disabled(&self, day: NaiveDate, payload: &MonthPayload) -> bool {
        !payload.contains(day)
    }

    pub fn grid(&self, payload: &MonthPayload) -> MonthGrid {
        MonthGrid::build(self.displayed_month(), payload)
    }
}
