//! Platform timestamps.
//!
//! Both recording formats store microseconds since 1899-12-30 00:00:00.
//! That epoch is a midnight, so minute, hour and day buckets line up with
//! the Unix epoch buckets.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

pub const MICROS_PER_SECOND: i64 = 1_000_000;
pub const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
pub const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
pub const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

/// Days between 1899-12-30 and 1970-01-01.
const EPOCH_GAP_DAYS: i64 = 25_569;

/// Platform epoch expressed in Unix microseconds (negative).
pub const SC_EPOCH_UNIX_MICROS: i64 = -EPOCH_GAP_DAYS * MICROS_PER_DAY;

/// Days between 1899-12-30 and 10000-01-01.
const MAX_VALID_DAYS: i64 = 2_958_466;

/// Microseconds since 1899-12-30 00:00:00.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ScDateTime(pub i64);

impl ScDateTime {
    /// First instant after the last representable calendar day, 9999-12-31.
    pub const MAX_VALID: Self = Self(MAX_VALID_DAYS * MICROS_PER_DAY);

    /// Whether the value falls between the platform epoch and the end of
    /// year 9999. Recorded data never lies outside that range.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0 && self.0 < Self::MAX_VALID.0
    }

    /// Wrap a raw platform value.
    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Raw platform value.
    #[inline]
    pub const fn micros(self) -> i64 {
        self.0
    }

    /// Convert from microseconds since the Unix epoch.
    #[inline]
    pub const fn from_unix_micros(unix_micros: i64) -> Self {
        Self(unix_micros - SC_EPOCH_UNIX_MICROS)
    }

    /// Microseconds since the Unix epoch.
    #[inline]
    pub const fn to_unix_micros(self) -> i64 {
        self.0 + SC_EPOCH_UNIX_MICROS
    }

    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::from_unix_micros(dt.timestamp_micros())
    }

    /// Convert to a UTC datetime, `None` when outside chrono's range.
    pub fn to_utc(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.to_unix_micros())
    }

    /// Floor to a bucket of `interval_micros`.
    #[inline]
    pub fn floor_to(self, interval_micros: i64) -> Self {
        Self(self.0.saturating_sub(self.0.rem_euclid(interval_micros)))
    }

    /// Shift by `micros`, saturating at the ends of the `i64` range.
    #[inline]
    pub fn add_micros(self, micros: i64) -> Self {
        Self(self.0.saturating_add(micros))
    }

    /// Calendar date of this timestamp once shifted by `utc_offset_minutes`.
    ///
    /// Clamps to chrono's date range for values no recording can hold.
    pub fn local_date(self, utc_offset_minutes: i32) -> NaiveDate {
        let local = self.0.saturating_add(utc_offset_minutes as i64 * MICROS_PER_MINUTE);
        let days = local.div_euclid(MICROS_PER_DAY);
        let date = if days >= 0 {
            sc_epoch_date().checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            sc_epoch_date().checked_sub_days(Days::new(days.unsigned_abs()))
        };
        date.unwrap_or(if days >= 0 { NaiveDate::MAX } else { NaiveDate::MIN })
    }

    /// First instant of `date` in a clock shifted by `utc_offset_minutes`.
    pub fn start_of_local_date(date: NaiveDate, utc_offset_minutes: i32) -> Self {
        let days = (date - sc_epoch_date()).num_days();
        Self(
            days.saturating_mul(MICROS_PER_DAY)
                .saturating_sub(utc_offset_minutes as i64 * MICROS_PER_MINUTE),
        )
    }

    /// Parse `YYYY-mm-dd HH:MM:SS[.ffffff]` or a bare `YYYY-mm-dd`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
            return Ok(Self::from_utc(dt.and_utc()));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Self::from_utc(dt.and_utc()));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|d| Self::start_of_local_date(d, 0))
            .map_err(|e| Error::data(format!("invalid timestamp '{s}': {e}")))
    }
}

fn sc_epoch_date() -> NaiveDate {
    // 1899-12-30 is always representable.
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

impl fmt::Display for ScDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_utc() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.6f")),
            None => write!(f, "sc:{}", self.0),
        }
    }
}
