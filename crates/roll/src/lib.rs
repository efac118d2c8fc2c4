//! Contract rolling for the contango workspace.
//!
//! This crate provides:
//! - Roll date selection (fixed calendar, volume crossover, explicit dates)
//! - Additive back-adjustment into continuous series
//! - Spread construction from two back-adjusted legs

pub mod adjust;
pub mod calendar;
pub mod spread;

pub use adjust::RollEngine;
pub use calendar::{daily_volume, roll_boundaries, roll_dates, validate_contracts};
pub use spread::difference;
