//! Volume profiling for the contango workspace.
//!
//! This crate handles:
//! - Rolling volume-at-price with signed delta (session, time, count windows)
//! - Value Area computation (POC, VAH, VAL)

pub mod profile;
pub mod value_area;

pub use profile::VolumeProfileEngine;
pub use value_area::ValueAreaComputer;
