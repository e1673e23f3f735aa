//! Incremental load window planning.

use chrono::NaiveDate;

use crate::domain::DateRange;

/// What the next load should do, given the destination checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadWindow {
    /// Fetch this (non-empty) range.
    Fetch(DateRange),
    /// Everything through `today` is already loaded.
    UpToDate { last_loaded: NaiveDate, today: NaiveDate },
}

impl LoadWindow {
    /// `(start, end)` as recorded in the audit log. For `UpToDate` the start
    /// is the day after the checkpoint, so `start > end`.
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            LoadWindow::Fetch(range) => (range.start, range.end),
            LoadWindow::UpToDate { last_loaded, today } => {
                (last_loaded.succ_opt().unwrap_or(last_loaded), today)
            }
        }
    }
}

/// Plan the window: from `epoch` on a first run, else from the day after
/// `last_loaded`, through `today`.
pub fn plan_window(last_loaded: Option<NaiveDate>, today: NaiveDate, epoch: NaiveDate) -> LoadWindow {
    let start = match last_loaded {
        None => epoch,
        Some(last) => match last.succ_opt() {
            Some(next) => next,
            None => return LoadWindow::UpToDate { last_loaded: last, today },
        },
    };

    match DateRange::new(start, today) {
        Some(range) => LoadWindow::Fetch(range),
        // No checkpoint but the epoch is in the future: nothing to load either.
        None => LoadWindow::UpToDate {
            last_loaded: last_loaded.unwrap_or_else(|| start.pred_opt().unwrap_or(start)),
            today,
        },
    }
}
