//! Configuration structures for the contango workspace.
//!
//! Policies are closed enums carrying their own parameters and are selected
//! once per run. Loading these structures from files is left to callers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::{MICROS_PER_DAY, MICROS_PER_MINUTE, MICROS_PER_SECOND};

/// Main configuration for one symbol run.
///
/// There is no `Default`: the decoder ordering mode must be chosen by the
/// caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub decoder: DecoderConfig,
    pub bars: BarConfig,
    pub profile: ProfileConfig,
    pub roll: RollConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Defaults everywhere except the ordering mode.
    pub fn new(ordering: OrderingMode) -> Self {
        Self {
            decoder: DecoderConfig::new(ordering),
            bars: BarConfig::default(),
            profile: ProfileConfig::default(),
            roll: RollConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.decoder.validate()?;
        self.bars.validate()?;
        self.profile.validate()?;
        self.roll.validate()?;
        self.pipeline.validate()
    }
}

/// What to do when a record's timestamp precedes an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingMode {
    /// Fail with `OutOfOrder`.
    Strict,
    /// Emit the record with `suspect = true`.
    Lenient,
}

/// Record decoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub ordering: OrderingMode,
    /// Multiplier applied to every decoded price.
    pub price_multiplier: f64,
    /// Records to skip before decoding (resume point).
    pub checkpoint: u64,
}

impl DecoderConfig {
    pub fn new(ordering: OrderingMode) -> Self {
        Self {
            ordering,
            price_multiplier: 1.0,
            checkpoint: 0,
        }
    }

    pub fn with_price_multiplier(mut self, multiplier: f64) -> Self {
        self.price_multiplier = multiplier;
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: u64) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.price_multiplier.is_finite() && self.price_multiplier > 0.0) {
            return Err(Error::config(format!(
                "price_multiplier must be positive, got {}",
                self.price_multiplier
            )));
        }
        Ok(())
    }
}

/// Longest accepted time bar.
pub const MAX_TIME_BAR_MICROS: i64 = 366 * MICROS_PER_DAY;

/// Bar boundary policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarPolicy {
    /// Fixed time buckets.
    Time { interval_micros: i64 },
    /// Every `count` trade records.
    Tick { count: u32 },
    /// Once accumulated volume reaches `volume`.
    Volume { volume: u64 },
}

impl BarPolicy {
    pub fn minutes(n: i64) -> Self {
        BarPolicy::Time {
            interval_micros: n.saturating_mul(MICROS_PER_MINUTE),
        }
    }

    pub fn seconds(n: i64) -> Self {
        BarPolicy::Time {
            interval_micros: n.saturating_mul(MICROS_PER_SECOND),
        }
    }

    /// Short label used in artifact names, e.g. "1min", "trade100", "vol1000".
    pub fn label(&self) -> String {
        match *self {
            BarPolicy::Time { interval_micros } if interval_micros % MICROS_PER_MINUTE == 0 => {
                format!("{}min", interval_micros / MICROS_PER_MINUTE)
            }
            BarPolicy::Time { interval_micros } => format!("{}us", interval_micros),
            BarPolicy::Tick { count } => format!("trade{count}"),
            BarPolicy::Volume { volume } => format!("vol{volume}"),
        }
    }
}

/// Handling of time buckets that receive no trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeGapPolicy {
    /// Emit nothing for empty buckets.
    Skip,
    /// Emit a flat zero-volume bar at the previous close.
    FillFlat,
}

/// Bar aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarConfig {
    pub policy: BarPolicy,
    pub gap_policy: TimeGapPolicy,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            policy: BarPolicy::minutes(1),
            gap_policy: TimeGapPolicy::FillFlat,
        }
    }
}

impl BarConfig {
    pub fn new(policy: BarPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.policy {
            BarPolicy::Time { interval_micros } if interval_micros <= 0 => {
                Err(Error::config("time bar interval must be positive"))
            }
            BarPolicy::Time { interval_micros } if interval_micros > MAX_TIME_BAR_MICROS => {
                Err(Error::config(format!(
                    "time bar interval {interval_micros}us is longer than a year"
                )))
            }
            BarPolicy::Tick { count: 0 } => Err(Error::config("tick bar count must be positive")),
            BarPolicy::Volume { volume: 0 } => {
                Err(Error::config("volume bar threshold must be positive"))
            }
            _ => Ok(()),
        }
    }
}

/// Window of a rolling volume profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowPolicy {
    /// Reset whenever a trade falls into a new session.
    ///
    /// A session starts `start_minute` minutes after local midnight, local
    /// time being UTC shifted by `utc_offset_minutes`.
    Session {
        utc_offset_minutes: i32,
        start_minute: u32,
    },
    /// Keep trades newer than `window_micros` before the latest trade.
    RollingTime { window_micros: i64 },
    /// Keep the latest `trades` trades.
    RollingCount { trades: usize },
}

/// Volume profile configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Price quantization.
    pub tick_size: f64,
    pub window: WindowPolicy,
    /// Target value area coverage (e.g., 0.70 for 70%).
    pub value_area_fraction: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            tick_size: 0.25,
            window: WindowPolicy::Session {
                utc_offset_minutes: 0,
                start_minute: 0,
            },
            value_area_fraction: 0.70,
        }
    }
}

impl ProfileConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tick_size.is_finite() && self.tick_size > 0.0) {
            return Err(Error::config(format!(
                "tick_size must be positive, got {}",
                self.tick_size
            )));
        }
        if !(self.value_area_fraction > 0.0 && self.value_area_fraction <= 1.0) {
            return Err(Error::config("value_area_fraction must be in (0, 1]"));
        }
        match self.window {
            WindowPolicy::RollingTime { window_micros } if window_micros <= 0 => {
                Err(Error::config("rolling time window must be positive"))
            }
            WindowPolicy::RollingCount { trades: 0 } => {
                Err(Error::config("rolling count window must be positive"))
            }
            WindowPolicy::Session { start_minute, .. } if start_minute >= 24 * 60 => {
                Err(Error::config("session start_minute must be below 1440"))
            }
            _ => Ok(()),
        }
    }
}

/// Roll date determination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollPolicy {
    /// Roll a fixed number of calendar days before the front expiration.
    FixedCalendar { days_before_expiry: u32 },
    /// Roll on the first day the back contract trades more than the front.
    VolumeCrossover,
    /// Externally supplied roll dates, one per adjacent contract pair.
    ExplicitDates(Vec<NaiveDate>),
}

/// Roll engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollConfig {
    pub policy: RollPolicy,
    /// Offset of the trading calendar from UTC, used for day bucketing.
    pub utc_offset_minutes: i32,
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            policy: RollPolicy::VolumeCrossover,
            utc_offset_minutes: 0,
        }
    }
}

impl RollConfig {
    pub fn new(policy: RollPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let RollPolicy::ExplicitDates(dates) = &self.policy {
            if dates.windows(2).any(|w| w[1] <= w[0]) {
                return Err(Error::config("explicit roll dates must be strictly increasing"));
            }
        }
        Ok(())
    }
}

/// Per-symbol pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Records in flight between decode and aggregate stages.
    pub channel_capacity: usize,
    /// Store a profile snapshot every time a bar closes.
    pub snapshot_profile_on_bar_close: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 4096,
            snapshot_profile_on_bar_close: true,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::config("channel_capacity must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::new(OrderingMode::Strict);
        assert_eq!(config.decoder.ordering, OrderingMode::Strict);
        assert_eq!(config.profile.value_area_fraction, 0.70);
        assert_eq!(config.bars.policy, BarPolicy::minutes(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_labels() {
        assert_eq!(BarPolicy::minutes(1).label(), "1min");
        assert_eq!(BarPolicy::Tick { count: 100 }.label(), "trade100");
        assert_eq!(BarPolicy::Volume { volume: 1000 }.label(), "vol1000");
    }

    #[test]
    fn test_rejects_zero_thresholds() {
        assert!(BarConfig::new(BarPolicy::Tick { count: 0 }).validate().is_err());
        assert!(BarConfig::new(BarPolicy::Volume { volume: 0 }).validate().is_err());
        assert!(BarConfig::new(BarPolicy::Time { interval_micros: 0 }).validate().is_err());
        assert!(BarConfig::new(BarPolicy::minutes(366 * 24 * 60)).validate().is_ok());
        assert!(BarConfig::new(BarPolicy::minutes(i64::MAX / 2)).validate().is_err());
        assert!(BarConfig::new(BarPolicy::seconds(-5)).validate().is_err());

        let profile = ProfileConfig {
            tick_size: 0.0,
            ..ProfileConfig::default()
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_explicit_dates_must_increase() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        let ok = RollConfig::new(RollPolicy::ExplicitDates(vec![d(1), d(10)]));
        assert!(ok.validate().is_ok());
        let bad = RollConfig::new(RollPolicy::ExplicitDates(vec![d(10), d(1)]));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = Config::new(OrderingMode::Lenient);
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.decoder.ordering, OrderingMode::Lenient);
        assert_eq!(back.profile.window, config.profile.window);
    }
}
