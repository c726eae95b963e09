//! Refresh schedules — `@every` intervals, descriptors and cron expressions.
//!
//! A [`Schedule`] only answers "when is the next run after `t`"; the
//! poller owns the clock. Cron expressions are evaluated in UTC.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use croner::Cron;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Shortest `@every` interval; anything below is raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub enum Schedule {
    /// Fixed interval, measured from the previous run.
    Every(Duration),
    /// Calendar-based cron expression, kept with its source text.
    Cron { source: String, cron: Arc<Cron> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("empty schedule expression")]
    Empty,
    #[error("unknown descriptor {0:?}")]
    UnknownDescriptor(String),
    #[error("invalid duration {0:?}")]
    InvalidDuration(String),
    #[error("interval must be greater than zero")]
    ZeroInterval,
    #[error("invalid cron expression {expr:?}: {reason}")]
    InvalidCron { expr: String, reason: String },
}

impl Schedule {
    /// The first run strictly after `after`, or `None` if there is none.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Every(interval) => {
                let step = ChronoDuration::from_std(*interval).ok()?;
                after.checked_add_signed(step)
            }
            Schedule::Cron { cron, .. } => cron.find_next_occurrence(&after, false).ok(),
        }
    }

    fn cron(expr: &str) -> Result<Self, ScheduleError> {
        match Cron::new(expr).with_seconds_optional().parse() {
            Ok(cron) => Ok(Schedule::Cron { source: expr.to_string(), cron: Arc::new(cron) }),
            Err(e) => Err(ScheduleError::InvalidCron { expr: expr.to_string(), reason: e.to_string() }),
        }
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(ScheduleError::Empty);
        }

        if let Some(descriptor) = expr.strip_prefix('@') {
            if let Some(interval) = descriptor.strip_prefix("every ") {
                return parse_duration(interval).map(|d| Schedule::Every(whole_seconds(d)));
            }
            let cron = match descriptor {
                "yearly" | "annually" => "0 0 1 1 *",
                "monthly" => "0 0 1 * *",
                "weekly" => "0 0 * * 0",
                "daily" | "midnight" => "0 0 * * *",
                "hourly" => "0 * * * *",
                _ => return Err(ScheduleError::UnknownDescriptor(expr.to_string())),
            };
            return Schedule::cron(cron);
        }

        Schedule::cron(expr)
    }
}

impl PartialEq for Schedule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Schedule::Every(a), Schedule::Every(b)) => a == b,
            (Schedule::Cron { source: a, .. }, Schedule::Cron { source: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Schedule {}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Every(interval) => f.debug_tuple("Every").field(interval).finish(),
            Schedule::Cron { source, .. } => f.debug_tuple("Cron").field(source).finish(),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Every(interval) => write!(f, "@every {:?}", interval),
            Schedule::Cron { source, .. } => f.write_str(source),
        }
    }
}

/// Interval schedules tick on whole seconds, at least once per second.
fn whole_seconds(interval: Duration) -> Duration {
    Duration::from_secs(interval.as_secs()).max(MIN_INTERVAL)
}

/// Parse a Go-style duration: `90s`, `1m`, `1h30m`, `1.5h`, `500ms`.
pub fn parse_duration(raw: &str) -> Result<Duration, ScheduleError> {
    let invalid = || ScheduleError::InvalidDuration(raw.to_string());
    let mut rest = raw.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_secs = 0f64;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..num_len].parse().map_err(|_| invalid())?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total_secs += value * scale;
    }

    if total_secs <= 0.0 {
        return Err(ScheduleError::ZeroInterval);
    }
    Duration::try_from_secs_f64(total_secs).map_err(|_| invalid())
}
