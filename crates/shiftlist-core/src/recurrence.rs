//! When a template is due.
//!
//! Stored as three columns: `recurrence` (kind), `recurrence_day` (weekday name or
//! day-of-month) and `recurrence_cycle` (rotation week). Older rows pack the
//! rotation week into the day column as `"<weekday>_w<N>"`; both load into the
//! same `Weekly` variant.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShiftlistError};

/// Length of the deep-clean rotation in weeks.
pub const ROTATION_WEEKS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecurrenceRule {
    Daily,
    /// Due on `weekday`; with `cycle`, only in that week of the rotation.
    Weekly { weekday: Weekday, cycle: Option<u8> },
    Monthly { day_of_month: u32 },
    /// Never generated; created directly as an instance.
    Once,
}

impl RecurrenceRule {
    pub fn weekly(weekday: Weekday, cycle: Option<u8>) -> Result<Self> {
        if let Some(c) = cycle
            && !(1..=ROTATION_WEEKS).contains(&c)
        {
            return Err(ShiftlistError::invalid(format!(
                "rotation week {c} outside 1..={ROTATION_WEEKS}"
            )));
        }
        Ok(Self::Weekly { weekday, cycle })
    }

    pub fn monthly(day_of_month: u32) -> Result<Self> {
        if !(1..=31).contains(&day_of_month) {
            return Err(ShiftlistError::invalid(format!(
                "day of month {day_of_month} outside 1..=31"
            )));
        }
        Ok(Self::Monthly { day_of_month })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly { .. } => "weekly",
            Self::Monthly { .. } => "monthly",
            Self::Once => "once",
        }
    }

    /// Split into `(recurrence, recurrence_day, recurrence_cycle)` columns.
    pub fn to_columns(&self) -> (&'static str, Option<String>, Option<u8>) {
        match self {
            Self::Daily | Self::Once => (self.kind(), None, None),
            Self::Weekly { weekday, cycle } => {
                (self.kind(), Some(weekday_name(*weekday).to_string()), *cycle)
            }
            Self::Monthly { day_of_month } => (self.kind(), Some(day_of_month.to_string()), None),
        }
    }

    /// Rebuild from stored columns, accepting the legacy composite day encoding.
    pub fn from_columns(kind: &str, day: Option<&str>, cycle: Option<u8>) -> Result<Self> {
        match kind {
            "daily" => Ok(Self::Daily),
            "once" => Ok(Self::Once),
            "weekly" => {
                let day = day
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| ShiftlistError::invalid("weekly rule without weekday"))?;
                let (weekday, legacy_cycle) = parse_weekly_day(day)?;
                let cycle = match (legacy_cycle, cycle) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(ShiftlistError::invalid(format!(
                            "weekly rule '{day}' disagrees with rotation week {b}"
                        )));
                    }
                    (a, b) => a.or(b),
                };
                Self::weekly(weekday, cycle)
            }
            "monthly" => {
                let day = day.ok_or_else(|| ShiftlistError::invalid("monthly rule without day"))?;
                let n: u32 = day.trim().parse().map_err(|_| {
                    ShiftlistError::invalid(format!("monthly day '{day}' is not a number"))
                })?;
                Self::monthly(n)
            }
            other => Err(ShiftlistError::invalid(format!("unknown recurrence '{other}'"))),
        }
    }
}

/// Compact form used on the command line: `daily`, `once`, `weekly:monday`,
/// `weekly:monday:2` (or `weekly:monday_w2`) and `monthly:15`.
impl std::str::FromStr for RecurrenceRule {
    type Err = ShiftlistError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split(':');
        let kind = parts.next().unwrap_or_default().to_ascii_lowercase();
        let day = parts.next();
        let cycle = parts
            .next()
            .map(|c| {
                c.trim()
                    .parse::<u8>()
                    .map_err(|_| ShiftlistError::invalid(format!("bad rotation week in '{s}'")))
            })
            .transpose()?;
        if parts.next().is_some() {
            return Err(ShiftlistError::invalid(format!("too many parts in rule '{s}'")));
        }
        Self::from_columns(&kind, day, cycle)
    }
}

/// Parse `"monday"` or legacy `"monday_w2"`.
fn parse_weekly_day(day: &str) -> Result<(Weekday, Option<u8>)> {
    let (name, cycle) = match day.split_once("_w") {
        Some((name, n)) => {
            let n: u8 = n
                .parse()
                .map_err(|_| ShiftlistError::invalid(format!("bad rotation suffix in '{day}'")))?;
            (name, Some(n))
        }
        None => (day, None),
    };
    let weekday = name
        .parse::<Weekday>()
        .map_err(|_| ShiftlistError::invalid(format!("unknown weekday '{name}'")))?;
    Ok((weekday, cycle))
}

/// Lower-case English weekday name as stored in the database.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}
