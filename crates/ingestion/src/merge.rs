//! Merge a trade stream and a depth stream into one time-ordered stream.

use std::iter::{FusedIterator, Peekable};

use contango_core::{DepthRecord, MarketRecord, Result, TradeRecord};

/// Interleaves trades and depth updates of one symbol by timestamp.
///
/// A depth update goes first only when it is strictly earlier than the
/// pending trade, so on equal timestamps the trade is seen against the book
/// as it stood before the batch. The first error from either side ends the
/// merged stream.
pub struct EventMerger<T, D>
where
    T: Iterator<Item = Result<TradeRecord>>,
    D: Iterator<Item = Result<DepthRecord>>,
{
    trades: Peekable<T>,
    depth: Peekable<D>,
    done: bool,
}

impl<T, D> EventMerger<T, D>
where
    T: Iterator<Item = Result<TradeRecord>>,
    D: Iterator<Item = Result<DepthRecord>>,
{
    pub fn new(trades: T, depth: D) -> Self {
        Self {
            trades: trades.peekable(),
            depth: depth.peekable(),
            done: false,
        }
    }
}

impl<T, D> Iterator for EventMerger<T, D>
where
    T: Iterator<Item = Result<TradeRecord>>,
    D: Iterator<Item = Result<DepthRecord>>,
{
    type Item = Result<MarketRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let take_depth = match (self.trades.peek(), self.depth.peek()) {
            (None, None) => {
                self.done = true;
                return None;
            }
            (Some(Err(_)), _) => false,
            (_, Some(Err(_))) => true,
            (Some(Ok(trade)), Some(Ok(depth))) => depth.ts < trade.ts,
            (Some(_), None) => false,
            (None, Some(_)) => true,
        };

        let item = if take_depth {
            self.depth.next().map(|r| r.map(MarketRecord::Depth))
        } else {
            self.trades.next().map(|r| r.map(MarketRecord::Trade))
        };

        if matches!(item, Some(Err(_))) {
            self.done = true;
        }
        item
    }
}

impl<T, D> FusedIterator for EventMerger<T, D>
where
    T: Iterator<Item = Result<TradeRecord>>,
    D: Iterator<Item = Result<DepthRecord>>,
{
}
