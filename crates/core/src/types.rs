//! Core data types for the contango workspace.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::WindowPolicy;
use crate::error::{Error, Result};
use crate::time::ScDateTime;

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum AggressorSide {
    /// Buyer lifted the offer.
    Buy = 1,
    /// Seller hit the bid.
    Sell = -1,
    /// Not recorded or not classifiable.
    Unknown = 0,
}

impl AggressorSide {
    /// Get the sign as i8.
    #[inline]
    pub fn sign(self) -> i8 {
        self as i8
    }

    /// Signed volume: positive for buys, negative for sells.
    #[inline]
    pub fn signed(self, volume: u32) -> i64 {
        volume as i64 * self.sign() as i64
    }
}

/// A single decoded trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Trade timestamp.
    pub ts: ScDateTime,
    /// Trade price (after the price multiplier).
    pub price: f64,
    /// Traded volume, always >= 1.
    pub volume: u32,
    /// Recorded aggressor side.
    pub side: AggressorSide,
    /// Best bid recorded with the trade (0 when not recorded).
    pub bid_price: f64,
    /// Best ask recorded with the trade (0 when not recorded).
    pub ask_price: f64,
    /// Number of exchange trades folded into this record.
    pub num_trades: u32,
    /// Timestamp went backwards and lenient ordering let it through.
    pub suspect: bool,
}

/// Book side of a depth update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookSide {
    Bid,
    Ask,
}

/// Depth update command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthCommand {
    /// Clear the whole book.
    Reset,
    /// Add a price level.
    Insert,
    /// Modify a price level.
    Update,
    /// Delete a price level.
    Delete,
}

/// Flag bit marking the last record of a batch.
pub const DEPTH_FLAG_END_OF_BATCH: u8 = 0x01;

/// A single decoded market-depth update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthRecord {
    pub ts: ScDateTime,
    pub command: DepthCommand,
    /// Side of the level; `None` for `Reset`.
    pub side: Option<BookSide>,
    /// Raw flag byte.
    pub flags: u8,
    /// Number of orders at the level.
    pub num_orders: u16,
    /// Level price (after the price multiplier).
    pub price: f64,
    /// Level size.
    pub quantity: u32,
    pub suspect: bool,
}

impl DepthRecord {
    /// Whether this record closes a batch of updates.
    #[inline]
    pub fn is_end_of_batch(&self) -> bool {
        self.flags & DEPTH_FLAG_END_OF_BATCH != 0
    }
}

/// Record-kind selector for the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Trade,
    Depth,
}

/// Either kind of decoded record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketRecord {
    Trade(TradeRecord),
    Depth(DepthRecord),
}

impl MarketRecord {
    #[inline]
    pub fn ts(&self) -> ScDateTime {
        match self {
            MarketRecord::Trade(t) => t.ts,
            MarketRecord::Depth(d) => d.ts,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            MarketRecord::Trade(_) => RecordKind::Trade,
            MarketRecord::Depth(_) => RecordKind::Depth,
        }
    }
}

/// Start or end marker of a bar in its boundary dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarBoundary {
    /// Bucket edge in time.
    Time(ScDateTime),
    /// Running trade-record count.
    Ticks(u64),
    /// Running traded volume.
    Volume(u64),
}

/// OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Inclusive start marker.
    pub start: BarBoundary,
    /// Exclusive end marker; equals the next bar's start.
    pub end: BarBoundary,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Total volume.
    pub volume: u64,
    /// Volume recorded as buy-aggressor.
    pub buy_volume: u64,
    /// Volume recorded as sell-aggressor.
    pub sell_volume: u64,
    /// Number of trade records.
    pub trade_count: u32,
    /// VWAP, `None` for zero-volume bars.
    pub vwap: Option<f64>,
    /// Timestamp of the first contributing trade.
    pub first_ts: ScDateTime,
    /// Timestamp of the last contributing trade.
    pub last_ts: ScDateTime,
    /// Final bar of a stream that ended before its boundary was reached.
    pub incomplete: bool,
}

impl Bar {
    /// Time used to align bars across contracts.
    ///
    /// Time bars use their bucket start; event bars use their first trade.
    #[inline]
    pub fn time_key(&self) -> ScDateTime {
        match self.start {
            BarBoundary::Time(ts) => ts,
            BarBoundary::Ticks(_) | BarBoundary::Volume(_) => self.first_ts,
        }
    }

    /// `low <= min(open, close)` and `high >= max(open, close)`.
    pub fn is_valid_ohlc(&self) -> bool {
        self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
            && self.low <= self.high
    }

    /// Copy with every price field shifted by `offset`.
    pub fn shifted(&self, offset: f64) -> Bar {
        Bar {
            open: self.open + offset,
            high: self.high + offset,
            low: self.low + offset,
            close: self.close + offset,
            vwap: self.vwap.map(|v| v + offset),
            ..self.clone()
        }
    }
}

/// Bars of a single futures contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSeries {
    /// Contract symbol (e.g. "ESH25_FUT_CME").
    pub symbol: String,
    /// Last trading day.
    pub expiration: NaiveDate,
    pub bars: Vec<Bar>,
}

impl ContractSeries {
    pub fn new(symbol: impl Into<String>, expiration: NaiveDate, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            expiration,
            bars,
        }
    }

    /// Check that bar time keys are strictly increasing.
    pub fn validate(&self) -> Result<()> {
        if let Some(bar) = self.bars.iter().find(|b| !b.time_key().is_valid()) {
            return Err(Error::data(format!(
                "{}: bar timestamp {} outside the recordable range",
                self.symbol,
                bar.time_key().micros()
            )));
        }
        for pair in self.bars.windows(2) {
            if pair[1].time_key() <= pair[0].time_key() {
                return Err(Error::data(format!(
                    "{}: bar boundaries not strictly increasing at {}",
                    self.symbol,
                    pair[1].time_key()
                )));
            }
        }
        Ok(())
    }

    pub fn first_ts(&self) -> Option<ScDateTime> {
        self.bars.first().map(Bar::time_key)
    }

    pub fn last_ts(&self) -> Option<ScDateTime> {
        self.bars.last().map(Bar::time_key)
    }
}

/// A contract roll applied to a continuous series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollEvent {
    /// First instant that belongs to the incoming contract.
    pub boundary: ScDateTime,
    /// Contract rolled out of.
    pub contract_out: String,
    /// Contract rolled into.
    pub contract_in: String,
    /// `back price - front price` at the boundary.
    pub delta: f64,
    /// Front reference close.
    pub front_price: f64,
    /// Back reference close.
    pub back_price: f64,
}

/// Back-adjusted stitched series.
///
/// Only price *changes* are preserved across history; absolute levels before
/// the last roll differ from the raw contract prices by the cumulative
/// deltas of every later roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
    /// Rolls ordered by boundary.
    pub rolls: Vec<RollEvent>,
}

impl ContinuousSeries {
    /// Index of the segment (0 = oldest) that contains `ts`.
    pub fn segment_of(&self, ts: ScDateTime) -> usize {
        self.rolls.iter().take_while(|r| r.boundary <= ts).count()
    }

    /// Cumulative offset applied to bars at `ts`.
    pub fn offset_at(&self, ts: ScDateTime) -> f64 {
        self.rolls
            .iter()
            .filter(|r| r.boundary > ts)
            .map(|r| r.delta)
            .sum()
    }
}

/// Difference of two continuous legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadSeries {
    /// Leg that is added.
    pub long_leg: String,
    /// Leg that is subtracted.
    pub short_leg: String,
    pub series: ContinuousSeries,
}

/// Volume and signed delta at one price level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileLevel {
    /// Level price (tick multiple).
    pub price: f64,
    /// Level index in ticks.
    pub price_tick: i64,
    pub volume: u64,
    /// Buy volume minus sell volume.
    pub delta: i64,
}

/// Point of control and value area of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueArea {
    /// Point of Control (price with max volume).
    pub poc: f64,
    /// Value Area High.
    pub vah: f64,
    /// Value Area Low.
    pub val: f64,
    /// Actual coverage achieved.
    pub coverage: f64,
    /// Number of levels in the VA.
    pub level_count: u32,
}

/// Point-in-time snapshot of a volume profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub tick_size: f64,
    pub window: WindowPolicy,
    /// Timestamp of the latest record applied.
    pub as_of: Option<ScDateTime>,
    /// Levels ordered by price.
    pub levels: Vec<ProfileLevel>,
    pub total_volume: u64,
    pub total_delta: i64,
    pub value_area: Option<ValueArea>,
    /// Taken from a run that stopped before its end.
    pub incomplete: bool,
}
