//! Weekday, day of month, and rotation week for a calendar date.
//!
//! The rotation week counts Sunday-started weeks from January 1st:
//! `week = ceil((days_since_jan1 + jan1_weekday_from_sunday + 1) / 7)` and
//! `cycle = ((week - 1) mod 4) + 1`. The count restarts every January, so a
//! store's real four-week rhythm can slip at the year boundary.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use shiftlist_core::error::{Result, ShiftlistError};
use shiftlist_core::recurrence::ROTATION_WEEKS;

/// Calendar facts the recurrence rules are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub day_of_month: u32,
    /// Week of the year, Sunday-started, 1-based.
    pub week_number: u32,
    /// Position in the rotation, 1..=ROTATION_WEEKS.
    pub cycle_position: u8,
}

pub fn resolve(date: NaiveDate) -> ResolvedDate {
    let jan1 = NaiveDate::from_yo_opt(date.year(), 1).unwrap_or(date);
    let days_since_jan1 = date.ordinal0();
    let offset = jan1.weekday().num_days_from_sunday();
    let week_number = (days_since_jan1 + offset + 1).div_ceil(7);
    let cycle_position = ((week_number - 1) % u32::from(ROTATION_WEEKS) + 1) as u8;
    ResolvedDate {
        date,
        weekday: date.weekday(),
        day_of_month: date.day(),
        week_number,
        cycle_position,
    }
}

/// Parse `YYYY-MM-DD`, failing with `InvalidArgument`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| ShiftlistError::invalid(format!("invalid date '{s}': {e}")))
}
