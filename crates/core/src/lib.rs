//! Core types and configuration for the contango workspace.
//!
//! This crate provides shared types used across all other crates:
//! - Decoded records (trades, depth updates)
//! - Bars, contract and continuous series, volume profiles
//! - Platform timestamps and contract codes
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod contract;
pub mod error;
pub mod time;
pub mod types;

pub use config::{
    BarConfig, BarPolicy, Config, DecoderConfig, OrderingMode, PipelineConfig, ProfileConfig,
    RollConfig, RollPolicy, TimeGapPolicy, WindowPolicy,
};
pub use contract::{contract_chain, ContractCode};
pub use error::{Error, Result};
pub use time::ScDateTime;
pub use types::*;
