//! Record decoding and bar building for the contango workspace.
//!
//! This crate handles:
//! - Intraday and market depth file layouts (decode and encode)
//! - Order book reconstruction from depth updates
//! - Trade/depth stream merging
//! - Trade side inference (quote and tick rule)
//! - Bar aggregation (time, tick, volume)

pub mod bar_builder;
pub mod book;
pub mod classifier;
pub mod decoder;
pub mod format;
pub mod merge;

pub use bar_builder::{BarAggregator, BarStream, ClosedBars};
pub use book::{Level, OrderBook, Quote};
pub use classifier::{ClassificationStats, SideClassifier};
pub use decoder::{
    encode_depth, encode_trades, open, Decoder, DepthDecoder, RecordStream, RecordWriter,
    TradeDecoder,
};
pub use format::{Depth, FileHeader, Intraday, RecordLayout};
pub use merge::EventMerger;
