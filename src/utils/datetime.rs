use anyhow::{anyhow, Result};
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Timelike, Utc,
};
use std::sync::Mutex;

/// Source of "now", injectable so day boundaries can be tested
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// A calendar day in the reference timezone and its UTC bounds `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceDay {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReferenceDay {
    pub fn containing(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        let date = instant.with_timezone(&offset).date_naive();
        let local_midnight = date.and_time(NaiveTime::default());
        let utc_midnight = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
        let start = Utc.from_utc_datetime(&utc_midnight);

        Self {
            date,
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn start_timestamp(&self) -> String {
        format_timestamp(&self.start)
    }

    pub fn end_timestamp(&self) -> String {
        format_timestamp(&self.end)
    }
}

/// Hour of day of `instant` in the reference timezone
pub fn local_hour(instant: DateTime<Utc>, offset: FixedOffset) -> u32 {
    instant.with_timezone(&offset).hour()
}

/// Fixed-width UTC timestamp; lexical order matches chronological order
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses offsets like `+03:00`, `-05:30`, `+3`, `UTC` or `Z`
pub fn parse_utc_offset(input: &str) -> Result<FixedOffset> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("Invalid UTC offset"));
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => (1, trimmed),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };

    let hours: i32 = hours
        .parse()
        .map_err(|_| anyhow!("Invalid UTC offset '{}'", input))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| anyhow!("Invalid UTC offset '{}'", input))?;

    if hours > 14 || !(0..60).contains(&minutes) {
        return Err(anyhow!("Invalid UTC offset '{}'", input));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("Invalid UTC offset '{}'", input))
}
