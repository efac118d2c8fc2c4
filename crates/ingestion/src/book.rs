//! Price-level order book rebuilt from depth records.
//!
//! The recorder writes a full snapshot as a clear-book command followed by
//! one insert per level, the last one flagged end-of-batch. Incremental
//! updates follow in their own batches.

use contango_core::{BookSide, DepthCommand, DepthRecord, ScDateTime};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use tracing::debug;

/// Size resting at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Level {
    pub quantity: u32,
    pub num_orders: u16,
}

/// Best bid and ask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// Bid/ask price-level book.
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: BTreeMap<OrderedFloat<f64>, Level>,
    asks: BTreeMap<OrderedFloat<f64>, Level>,
    /// A clear-book was seen and its batch has not ended yet.
    snapshot_open: bool,
    /// At least one full snapshot has been applied.
    synced: bool,
    last_ts: Option<ScDateTime>,
    applied: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn side_mut(&mut self, side: BookSide) -> &mut BTreeMap<OrderedFloat<f64>, Level> {
        match side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        }
    }

    /// Apply one depth record. Returns `true` when it closed a batch.
    pub fn apply(&mut self, record: &DepthRecord) -> bool {
        self.applied += 1;
        self.last_ts = Some(record.ts);

        match (record.command, record.side) {
            (DepthCommand::Reset, _) => {
                self.bids.clear();
                self.asks.clear();
                self.snapshot_open = true;
            }
            (DepthCommand::Insert | DepthCommand::Update, Some(side)) => {
                let key = OrderedFloat(record.price);
                if record.quantity == 0 {
                    self.side_mut(side).remove(&key);
                } else {
                    self.side_mut(side).insert(
                        key,
                        Level {
                            quantity: record.quantity,
                            num_orders: record.num_orders,
                        },
                    );
                }
            }
            (DepthCommand::Delete, Some(side)) => {
                if self.side_mut(side).remove(&OrderedFloat(record.price)).is_none() {
                    debug!(price = record.price, ?side, "delete for unknown level");
                }
            }
            (command, None) => {
                debug!(?command, "depth update without side ignored");
            }
        }

        let end_of_batch = record.is_end_of_batch();
        if end_of_batch && self.snapshot_open {
            self.snapshot_open = false;
            self.synced = true;
        }
        end_of_batch
    }

    /// Whether a complete snapshot has been applied and no snapshot is in
    /// progress.
    pub fn is_synced(&self) -> bool {
        self.synced && !self.snapshot_open
    }

    pub fn best_bid(&self) -> Option<(f64, Level)> {
        self.bids.iter().next_back().map(|(p, l)| (p.0, *l))
    }

    pub fn best_ask(&self) -> Option<(f64, Level)> {
        self.asks.iter().next().map(|(p, l)| (p.0, *l))
    }

    /// Best bid and ask when both sides are populated.
    pub fn quote(&self) -> Option<Quote> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(Quote { bid, ask }),
            _ => None,
        }
    }

    /// Best bid at or above best ask.
    pub fn is_crossed(&self) -> bool {
        self.quote().is_some_and(|q| q.bid >= q.ask)
    }

    /// Up to `n` levels from the top of one side, best first.
    pub fn levels(&self, side: BookSide, n: usize) -> Vec<(f64, Level)> {
        match side {
            BookSide::Bid => self.bids.iter().rev().take(n).map(|(p, l)| (p.0, *l)).collect(),
            BookSide::Ask => self.asks.iter().take(n).map(|(p, l)| (p.0, *l)).collect(),
        }
    }

    pub fn depth(&self, side: BookSide) -> usize {
        match side {
            BookSide::Bid => self.bids.len(),
            BookSide::Ask => self.asks.len(),
        }
    }

    pub fn last_update(&self) -> Option<ScDateTime> {
        self.last_ts
    }

    /// Depth records applied so far.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contango_core::DEPTH_FLAG_END_OF_BATCH;

    fn rec(command: DepthCommand, side: Option<BookSide>, price: f64, qty: u32, eob: bool) -> DepthRecord {
        DepthRecord {
            ts: ScDateTime(1),
            command,
            side,
            flags: if eob { DEPTH_FLAG_END_OF_BATCH } else { 0 },
            num_orders: 1,
            price,
            quantity: qty,
            suspect: false,
        }
    }

    fn snapshot(book: &mut OrderBook) {
        book.apply(&rec(DepthCommand::Reset, None, 0.0, 0, false));
        book.apply(&rec(DepthCommand::Insert, Some(BookSide::Bid), 99.75, 10, false));
        book.apply(&rec(DepthCommand::Insert, Some(BookSide::Bid), 99.50, 20, false));
        book.apply(&rec(DepthCommand::Insert, Some(BookSide::Ask), 100.00, 5, false));
        book.apply(&rec(DepthCommand::Insert, Some(BookSide::Ask), 100.25, 8, true));
    }

    #[test]
    fn test_snapshot_sync() {
        let mut book = OrderBook::new();
        assert!(!book.is_synced());
        book.apply(&rec(DepthCommand::Reset, None, 0.0, 0, false));
        assert!(!book.is_synced());
        book.apply(&rec(DepthCommand::Insert, Some(BookSide::Bid), 99.75, 10, true));
        assert!(book.is_synced());
    }

    #[test]
    fn test_best_levels() {
        let mut book = OrderBook::new();
        snapshot(&mut book);

        let quote = book.quote().unwrap();
        assert_eq!(quote.bid, 99.75);
        assert_eq!(quote.ask, 100.00);
        assert!((quote.spread() - 0.25).abs() < 1e-10);
        assert_eq!(book.levels(BookSide::Bid, 5).len(), 2);
        assert_eq!(book.levels(BookSide::Bid, 1)[0].1.quantity, 10);
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_update_and_delete() {
        let mut book = OrderBook::new();
        snapshot(&mut book);

        book.apply(&rec(DepthCommand::Update, Some(BookSide::Ask), 100.00, 3, false));
        assert_eq!(book.best_ask().unwrap().1.quantity, 3);

        book.apply(&rec(DepthCommand::Delete, Some(BookSide::Ask), 100.00, 0, true));
        assert_eq!(book.best_ask().unwrap().0, 100.25);

        // Zero-quantity update removes the level.
        book.apply(&rec(DepthCommand::Update, Some(BookSide::Bid), 99.75, 0, true));
        assert_eq!(book.best_bid().unwrap().0, 99.50);
        assert_eq!(book.depth(BookSide::Bid), 1);
    }

    #[test]
    fn test_reset_clears() {
        let mut book = OrderBook::new();
        snapshot(&mut book);
        book.apply(&rec(DepthCommand::Reset, None, 0.0, 0, false));
        assert!(book.quote().is_none());
        assert!(!book.is_synced());
        assert_eq!(book.applied(), 6);
    }
}
