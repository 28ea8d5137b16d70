use chrono::{DateTime, Utc};
use serde::*;

use crate::error::{ErrorContext, PipelineError, PipelineResult};

/// Seconds in a day.
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// MJD of the Unix epoch (1970-01-01 00:00:00 UTC).
const MJD_UNIX_EPOCH: f64 = 40587.0;

/// Epoch seconds since 1970-01-01 00:00:00 UTC.
///
/// Series timestamps are stored as bare `f64` for vectorized work; this
/// wrapper is used at the boundaries (perihelion times, window edges).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Epoch(qtty::Seconds);

impl Epoch {
    pub fn new<V: Into<qtty::Seconds>>(v: V) -> Self {
        Self(v.into())
    }

    /// Raw epoch seconds as f64.
    pub fn value(&self) -> f64 {
        self.0.value()
    }

    /// Convert to Modified Julian Date.
    pub fn to_mjd(&self) -> f64 {
        self.value() / SECONDS_PER_DAY + MJD_UNIX_EPOCH
    }

    /// Create from Modified Julian Date.
    pub fn from_mjd(mjd: f64) -> Self {
        Self::new((mjd - MJD_UNIX_EPOCH) * SECONDS_PER_DAY)
    }

    /// Convert to chrono DateTime<Utc>.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let secs = self.value();
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9) as u32;
        DateTime::from_timestamp(whole as i64, nanos).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Create from chrono DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::new(dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1e9)
    }

    /// Shift by a number of seconds.
    pub fn offset(&self, seconds: f64) -> Self {
        Self::new(self.value() + seconds)
    }
}

impl From<f64> for Epoch {
    fn from(v: f64) -> Self {
        Epoch::new(v)
    }
}

impl From<DateTime<Utc>> for Epoch {
    fn from(dt: DateTime<Utc>) -> Self {
        Epoch::from_datetime(dt)
    }
}

/// Parse an ISO-8601 / RFC 3339 timestamp.
///
/// A timestamp without an offset (e.g. `2020-01-29T09:37:00`) is read as UTC.
pub fn parse_iso8601(value: &str) -> PipelineResult<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            PipelineError::invalid(format!("unparseable timestamp '{}': {}", value, e))
                .with_context(ErrorContext::new("parse_iso8601"))
        })
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod time_tests;
