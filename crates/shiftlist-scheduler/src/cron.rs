//! Daily trigger schedule.
//! Format: "MIN HOUR DOM MON DOW" (5-field, no seconds), evaluated in the
//! caller's timezone. MIN and HOUR take `*`, `*/N`, `N` or `a,b`; the day,
//! month and weekday fields only accept `*`.
//! Example: "0 1 * * *" = every day at 01:00

use chrono::{DateTime, Duration, TimeZone, Timelike};
use shiftlist_core::error::{Result, ShiftlistError};

/// Look-ahead window when searching for the next fire time.
const SEARCH_MINUTES: i64 = 48 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    minutes: Vec<u32>,
    hours: Vec<u32>,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(ShiftlistError::invalid(format!(
                "cron '{expression}' needs 5 fields: MIN HOUR DOM MON DOW"
            )));
        }
        let field = |spec: &str, name: &str, max: u32| {
            parse_field(spec, 0, max).ok_or_else(|| {
                ShiftlistError::invalid(format!("cron '{expression}': bad {name} field '{spec}'"))
            })
        };
        let minutes = field(parts[0], "minute", 59)?;
        let hours = field(parts[1], "hour", 23)?;
        if let Some(spec) = parts[2..].iter().find(|p| **p != "*") {
            return Err(ShiftlistError::invalid(format!(
                "cron '{expression}': only '*' is supported for day, month and weekday, got '{spec}'"
            )));
        }
        Ok(Self {
            expression: expression.to_string(),
            minutes,
            hours,
        })
    }

    /// First matching minute strictly after `after`, in `after`'s timezone.
    /// Local times skipped by a DST jump never match.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = after.timezone();
        let start = after.naive_local() + Duration::minutes(1);
        let mut candidate = start.with_second(0)?.with_nanosecond(0)?;

        for _ in 0..SEARCH_MINUTES {
            if self.minutes.contains(&candidate.minute())
                && self.hours.contains(&candidate.hour())
                && let Some(at) = tz.from_local_datetime(&candidate).earliest()
                && at > *after
            {
                return Some(at);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

impl std::fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Parse a cron field into its matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n as usize).collect());
    }

    let values = field
        .split(',')
        .map(|s| s.trim().parse::<u32>().ok().filter(|v| (min..=max).contains(v)))
        .collect::<Option<Vec<u32>>>()?;
    if values.is_empty() { None } else { Some(values) }
}
