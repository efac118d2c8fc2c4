//! Trade side inference for volume delta.
//!
//! Classifies trades as buy-initiated, sell-initiated, or unknown from their
//! price relative to the prevailing best bid/ask, falling back to the tick
//! rule when no quote is available or the trade prints inside the spread.

use contango_core::{AggressorSide, TradeRecord};
use serde::{Deserialize, Serialize};

use crate::book::Quote;

/// Statistics about trade classification quality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationStats {
    /// Total trades classified.
    pub total_trades: u64,
    /// Trades classified as buy.
    pub buy_trades: u64,
    /// Trades classified as sell.
    pub sell_trades: u64,
    /// Trades left unknown.
    pub unknown_trades: u64,
    /// Total volume processed.
    pub total_volume: u64,
    pub buy_volume: u64,
    pub sell_volume: u64,
    pub unknown_volume: u64,
    /// Trades decided against a quote.
    pub quote_trades: u64,
    /// Trades decided by the tick rule.
    pub tick_rule_trades: u64,
}

impl ClassificationStats {
    /// Fraction of volume left unknown.
    pub fn unknown_frac(&self) -> f64 {
        if self.total_volume > 0 {
            self.unknown_volume as f64 / self.total_volume as f64
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Stateful side classifier; one per symbol stream.
#[derive(Debug, Clone)]
pub struct SideClassifier {
    /// Last trade price (for tick rule).
    last_trade_price: Option<f64>,
    /// Last decided side (for zero-tick continuation).
    last_trade_side: AggressorSide,
    stats: ClassificationStats,
}

impl SideClassifier {
    pub fn new() -> Self {
        Self {
            last_trade_price: None,
            last_trade_side: AggressorSide::Unknown,
            stats: ClassificationStats::default(),
        }
    }

    fn tick_rule(&self, price: f64) -> AggressorSide {
        match self.last_trade_price {
            Some(last) if price > last => AggressorSide::Buy,
            Some(last) if price < last => AggressorSide::Sell,
            Some(_) => self.last_trade_side,
            None => AggressorSide::Unknown,
        }
    }

    /// Classify a trade, against `quote` when one is available.
    pub fn classify(&mut self, trade: &TradeRecord, quote: Option<Quote>) -> AggressorSide {
        let by_quote = quote.and_then(|q| {
            if trade.price >= q.ask {
                Some(AggressorSide::Buy)
            } else if trade.price <= q.bid {
                Some(AggressorSide::Sell)
            } else {
                None
            }
        });

        let side = match by_quote {
            Some(side) => {
                self.stats.quote_trades += 1;
                side
            }
            None => {
                self.stats.tick_rule_trades += 1;
                self.tick_rule(trade.price)
            }
        };

        let volume = trade.volume as u64;
        self.stats.total_trades += 1;
        self.stats.total_volume += volume;
        match side {
            AggressorSide::Buy => {
                self.stats.buy_trades += 1;
                self.stats.buy_volume += volume;
            }
            AggressorSide::Sell => {
                self.stats.sell_trades += 1;
                self.stats.sell_volume += volume;
            }
            AggressorSide::Unknown => {
                self.stats.unknown_trades += 1;
                self.stats.unknown_volume += volume;
            }
        }

        self.last_trade_price = Some(trade.price);
        if side != AggressorSide::Unknown {
            self.last_trade_side = side;
        }
        side
    }

    pub fn stats(&self) -> &ClassificationStats {
        &self.stats
    }

    /// Clear price history and statistics.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for SideClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contango_core::ScDateTime;

    fn make_trade(ts: i64, price: f64, volume: u32) -> TradeRecord {
        TradeRecord {
            ts: ScDateTime(ts),
            price,
            volume,
            side: AggressorSide::Unknown,
            bid_price: 0.0,
            ask_price: 0.0,
            num_trades: 1,
            suspect: false,
        }
    }

    fn quote(bid: f64, ask: f64) -> Option<Quote> {
        Some(Quote { bid, ask })
    }

    #[test]
    fn test_classify_at_ask() {
        let mut classifier = SideClassifier::new();
        let side = classifier.classify(&make_trade(1, 100.25, 1), quote(100.0, 100.25));
        assert_eq!(side, AggressorSide::Buy);
    }

    #[test]
    fn test_classify_at_bid() {
        let mut classifier = SideClassifier::new();
        let side = classifier.classify(&make_trade(1, 100.0, 1), quote(100.0, 100.25));
        assert_eq!(side, AggressorSide::Sell);
    }

    #[test]
    fn test_inside_spread_without_history() {
        let mut classifier = SideClassifier::new();
        let side = classifier.classify(&make_trade(1, 100.25, 1), quote(100.0, 100.5));
        assert_eq!(side, AggressorSide::Unknown);
    }

    #[test]
    fn test_tick_rule_without_quotes() {
        let mut classifier = SideClassifier::new();
        assert_eq!(classifier.classify(&make_trade(1, 100.0, 1), None), AggressorSide::Unknown);
        assert_eq!(classifier.classify(&make_trade(2, 100.25, 1), None), AggressorSide::Buy);
        assert_eq!(classifier.classify(&make_trade(3, 100.0, 1), None), AggressorSide::Sell);
    }

    #[test]
    fn test_zero_tick_continuation() {
        let mut classifier = SideClassifier::new();
        assert_eq!(classifier.classify(&make_trade(1, 100.5, 1), quote(100.25, 100.5)), AggressorSide::Buy);
        // Same price, quote moved so the print is now inside the spread.
        assert_eq!(classifier.classify(&make_trade(2, 100.5, 1), quote(100.25, 100.75)), AggressorSide::Buy);
    }

    #[test]
    fn test_stats() {
        let mut classifier = SideClassifier::new();
        classifier.classify(&make_trade(1, 100.25, 1), quote(100.0, 100.25)); // Buy
        classifier.classify(&make_trade(2, 100.0, 2), quote(100.0, 100.25)); // Sell
        classifier.classify(&make_trade(3, 100.0, 3), None); // zero tick -> Sell

        let stats = classifier.stats();
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.buy_volume, 1);
        assert_eq!(stats.sell_volume, 5);
        assert_eq!(stats.quote_trades, 2);
        assert_eq!(stats.tick_rule_trades, 1);
        assert_eq!(stats.unknown_frac(), 0.0);
    }
}
