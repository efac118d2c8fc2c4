//! Synthetic spreads between two continuous legs.

use std::cmp::Ordering;

use contango_core::{Bar, ContinuousSeries, ContractSeries, Error, Result, SpreadSeries};
use tracing::{debug, warn};

use crate::adjust::RollEngine;

/// Difference of two bars sharing a boundary.
///
/// High and low come from the open and close differences only; the legs'
/// intrabar extrema are not synchronised and cannot be differenced.
fn spread_bar(long: &Bar, short: &Bar) -> Bar {
    let open = long.open - short.open;
    let close = long.close - short.close;
    let vwap = match (long.vwap, short.vwap) {
        (Some(l), Some(s)) => Some(l - s),
        _ => None,
    };
    Bar {
        start: long.start,
        end: long.end,
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume: long.volume.min(short.volume),
        buy_volume: 0,
        sell_volume: 0,
        trade_count: long.trade_count.min(short.trade_count),
        vwap,
        first_ts: long.first_ts.max(short.first_ts),
        last_ts: long.last_ts.max(short.last_ts),
        incomplete: long.incomplete || short.incomplete,
    }
}

/// Subtract `short` from `long` on every bar boundary present in both.
pub fn difference(long: &ContinuousSeries, short: &ContinuousSeries) -> Result<SpreadSeries> {
    let mut bars = Vec::with_capacity(long.bars.len().min(short.bars.len()));
    let (mut i, mut j) = (0, 0);
    while i < long.bars.len() && j < short.bars.len() {
        let (l, s) = (&long.bars[i], &short.bars[j]);
        match l.time_key().cmp(&s.time_key()) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                bars.push(spread_bar(l, s));
                i += 1;
                j += 1;
            }
        }
    }

    if bars.is_empty() {
        return Err(Error::insufficient_data(format!(
            "{} and {} share no bar boundaries",
            long.symbol, short.symbol
        )));
    }
    let skipped = long.bars.len() + short.bars.len() - 2 * bars.len();
    if skipped > 0 {
        warn!(long = %long.symbol, short = %short.symbol, skipped, "unmatched leg bars dropped");
    }

    let mut rolls: Vec<_> = long.rolls.iter().chain(&short.rolls).cloned().collect();
    rolls.sort_by_key(|r| r.boundary);

    debug!(long = %long.symbol, short = %short.symbol, bars = bars.len(), "spread built");
    Ok(SpreadSeries {
        long_leg: long.symbol.clone(),
        short_leg: short.symbol.clone(),
        series: ContinuousSeries {
            symbol: format!("{}-{}", long.symbol, short.symbol),
            bars,
            rolls,
        },
    })
}

impl RollEngine {
    /// Back-adjust each leg under this engine's policy, then difference them.
    pub fn spread(
        &self,
        long: (&str, &[ContractSeries]),
        short: (&str, &[ContractSeries]),
    ) -> Result<SpreadSeries> {
        let long_series = self.stitch(long.0, long.1)?;
        let short_series = self.stitch(short.0, short.1)?;
        difference(&long_series, &short_series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contango_core::{BarBoundary, ScDateTime};

    fn bar(ts: i64, open: f64, close: f64, volume: u64) -> Bar {
        Bar {
            start: BarBoundary::Time(ScDateTime(ts)),
            end: BarBoundary::Time(ScDateTime(ts + 60)),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume,
            buy_volume: 0,
            sell_volume: 0,
            trade_count: 1,
            vwap: None,
            first_ts: ScDateTime(ts),
            last_ts: ScDateTime(ts),
            incomplete: false,
        }
    }

    fn series(symbol: &str, bars: Vec<Bar>) -> ContinuousSeries {
        ContinuousSeries {
            symbol: symbol.to_string(),
            bars,
            rolls: Vec::new(),
        }
    }

    #[test]
    fn test_difference_uses_open_close_path() {
        let long = series("CL", vec![bar(0, 80.0, 81.0, 10)]);
        let short = series("BZ", vec![bar(0, 78.0, 78.5, 4)]);
        let spread = difference(&long, &short).unwrap();

        let b = &spread.series.bars[0];
        assert!((b.open - 2.0).abs() < 1e-10);
        assert!((b.close - 2.5).abs() < 1e-10);
        assert!((b.high - 2.5).abs() < 1e-10);
        assert!((b.low - 2.0).abs() < 1e-10);
        assert_eq!(b.volume, 4);
        assert_eq!(spread.series.symbol, "CL-BZ");
    }

    #[test]
    fn test_only_matching_boundaries() {
        let long = series("A", vec![bar(0, 1.0, 1.0, 1), bar(60, 1.0, 1.0, 1), bar(180, 1.0, 1.0, 1)]);
        let short = series("B", vec![bar(60, 0.5, 0.5, 1), bar(120, 0.5, 0.5, 1), bar(180, 0.5, 0.5, 1)]);
        let spread = difference(&long, &short).unwrap();
        let keys: Vec<i64> = spread.series.bars.iter().map(|b| b.time_key().micros()).collect();
        assert_eq!(keys, vec![60, 180]);
    }

    #[test]
    fn test_disjoint_legs() {
        let long = series("A", vec![bar(0, 1.0, 1.0, 1)]);
        let short = series("B", vec![bar(60, 1.0, 1.0, 1)]);
        assert!(matches!(difference(&long, &short), Err(Error::InsufficientData(_))));
    }
}
