//! Bar aggregation from trade records.
//!
//! Builds OHLCV bars under one boundary policy: fixed time buckets, trade
//! counts, or accumulated volume. Exactly one bar is open at a time.

use std::collections::VecDeque;

use contango_core::{
    AggressorSide, Bar, BarBoundary, BarConfig, BarPolicy, Error, Result, ScDateTime,
    TimeGapPolicy, TradeRecord,
};
use tracing::debug;

/// A bar that's currently being built.
#[derive(Debug, Clone)]
struct BarInProgress {
    start: BarBoundary,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    buy_volume: u64,
    sell_volume: u64,
    vwap_numerator: f64,
    trade_count: u32,
    first_ts: ScDateTime,
    last_ts: ScDateTime,
}

impl BarInProgress {
    fn new(start: BarBoundary, trade: &TradeRecord) -> Self {
        let mut bar = Self {
            start,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: 0,
            buy_volume: 0,
            sell_volume: 0,
            vwap_numerator: 0.0,
            trade_count: 0,
            first_ts: trade.ts,
            last_ts: trade.ts,
        };
        bar.add_trade(trade);
        bar
    }

    fn add_trade(&mut self, trade: &TradeRecord) {
        let volume = trade.volume as u64;
        self.high = self.high.max(trade.price);
        self.low = self.low.min(trade.price);
        self.close = trade.price;
        self.volume += volume;
        match trade.side {
            AggressorSide::Buy => self.buy_volume += volume,
            AggressorSide::Sell => self.sell_volume += volume,
            AggressorSide::Unknown => {}
        }
        self.vwap_numerator += trade.price * volume as f64;
        self.trade_count += 1;
        self.last_ts = self.last_ts.max(trade.ts);
    }

    /// Reopen a stored partial bar.
    fn from_bar(bar: &Bar) -> Self {
        Self {
            start: bar.start,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            buy_volume: bar.buy_volume,
            sell_volume: bar.sell_volume,
            vwap_numerator: bar.vwap.unwrap_or(0.0) * bar.volume as f64,
            trade_count: bar.trade_count,
            first_ts: bar.first_ts,
            last_ts: bar.last_ts,
        }
    }

    fn vwap(&self) -> Option<f64> {
        if self.volume > 0 {
            Some(self.vwap_numerator / self.volume as f64)
        } else {
            None
        }
    }

    fn into_bar(self, end: BarBoundary, incomplete: bool) -> Bar {
        let vwap = self.vwap();
        Bar {
            start: self.start,
            end,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            buy_volume: self.buy_volume,
            sell_volume: self.sell_volume,
            trade_count: self.trade_count,
            vwap,
            first_ts: self.first_ts,
            last_ts: self.last_ts,
            incomplete,
        }
    }
}

/// Flat zero-volume bar covering an empty time bucket.
fn flat_bar(start: ScDateTime, interval: i64, price: f64) -> Bar {
    Bar {
        start: BarBoundary::Time(start),
        end: BarBoundary::Time(start.add_micros(interval)),
        open: price,
        high: price,
        low: price,
        close: price,
        volume: 0,
        buy_volume: 0,
        sell_volume: 0,
        trade_count: 0,
        vwap: None,
        first_ts: start,
        last_ts: start,
        incomplete: false,
    }
}

/// Empty buckets `[next, until)` still owed as flat bars.
#[derive(Debug, Clone, Copy)]
struct GapFill {
    next: ScDateTime,
    until: ScDateTime,
    interval: i64,
    price: f64,
}

/// Closed output waiting to be handed out. A gap is expanded one bar at a
/// time, so a push never holds more than two entries however long the gap.
#[derive(Debug)]
enum Pending {
    Bar(Bar),
    Gap(GapFill),
}

/// Streaming bar aggregator.
///
/// Feed trades with [`push`](Self::push); the returned iterator yields the
/// bars that closed. Call [`flush`](Self::flush) at end of input for the
/// partial bar. Bars left undrained are handed out first by the next call.
#[derive(Debug)]
pub struct BarAggregator {
    config: BarConfig,
    current: Option<BarInProgress>,
    pending: VecDeque<Pending>,
    /// Trades seen, for tick boundaries.
    ticks_total: u64,
    /// Volume seen, for volume boundaries.
    volume_total: u64,
    /// Bars emitted so far.
    emitted: u64,
}

impl BarAggregator {
    pub fn new(config: BarConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            current: None,
            pending: VecDeque::new(),
            ticks_total: 0,
            volume_total: 0,
            emitted: 0,
        })
    }

    /// Aggregate a complete in-memory trade sequence.
    pub fn aggregate(config: BarConfig, trades: &[TradeRecord]) -> Result<Vec<Bar>> {
        let mut aggregator = Self::new(config)?;
        let mut bars = Vec::new();
        for trade in trades {
            bars.extend(aggregator.push(trade));
        }
        bars.extend(aggregator.flush());
        Ok(bars)
    }

    pub fn config(&self) -> &BarConfig {
        &self.config
    }

    /// Continue after the last bar stored by an earlier run.
    ///
    /// Event-bar counters pick up at that bar's end boundary, and an
    /// incomplete bar is reopened so the next trades extend it.
    pub fn resume_from(&mut self, last: &Bar) -> Result<()> {
        match (self.config.policy, last.end) {
            (BarPolicy::Time { .. }, BarBoundary::Time(_)) => {}
            (BarPolicy::Tick { .. }, BarBoundary::Ticks(n)) => self.ticks_total = n,
            (BarPolicy::Volume { .. }, BarBoundary::Volume(v)) => self.volume_total = v,
            (policy, end) => {
                return Err(Error::config(format!(
                    "cannot resume {} bars after a bar ending at {end:?}",
                    policy.label()
                )))
            }
        }
        self.current = last.incomplete.then(|| BarInProgress::from_bar(last));
        debug!(end = ?last.end, reopened = last.incomplete, "bars resumed");
        Ok(())
    }

    /// Apply one trade; the returned iterator yields the bars it closed,
    /// oldest first.
    pub fn push(&mut self, trade: &TradeRecord) -> ClosedBars<'_> {
        match self.config.policy {
            BarPolicy::Time { interval_micros } => self.push_time(trade, interval_micros),
            BarPolicy::Tick { count } => {
                let start = BarBoundary::Ticks(self.ticks_total);
                self.ticks_total += 1;
                self.volume_total += trade.volume as u64;
                self.accumulate(start, trade);
                let reached = self.current.as_ref().is_some_and(|b| b.trade_count >= count);
                self.close_if(reached, BarBoundary::Ticks(self.ticks_total));
            }
            BarPolicy::Volume { volume } => {
                let start = BarBoundary::Volume(self.volume_total);
                self.ticks_total += 1;
                self.volume_total += trade.volume as u64;
                self.accumulate(start, trade);
                let reached = self.current.as_ref().is_some_and(|b| b.volume >= volume);
                self.close_if(reached, BarBoundary::Volume(self.volume_total));
            }
        }
        ClosedBars { aggregator: self }
    }

    /// Emit the open bar, flagged incomplete, after anything still pending.
    /// Nothing more when no bar is open.
    pub fn flush(&mut self) -> ClosedBars<'_> {
        if let Some(bar) = self.current.take() {
            let end = match (self.config.policy, bar.start) {
                (BarPolicy::Time { interval_micros }, BarBoundary::Time(start)) => {
                    BarBoundary::Time(start.add_micros(interval_micros))
                }
                (BarPolicy::Volume { .. }, _) => BarBoundary::Volume(self.volume_total),
                _ => BarBoundary::Ticks(self.ticks_total),
            };
            debug!(emitted = self.emitted, "flushed partial bar");
            self.pending.push_back(Pending::Bar(bar.into_bar(end, true)));
        }
        ClosedBars { aggregator: self }
    }

    /// Drop the open bar and anything pending without emitting them.
    pub fn discard(&mut self) {
        self.current = None;
        self.pending.clear();
    }

    /// Whether a bar is open.
    pub fn has_pending(&self) -> bool {
        self.current.is_some()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn next_closed(&mut self) -> Option<Bar> {
        let bar = match self.pending.pop_front()? {
            Pending::Bar(bar) => bar,
            Pending::Gap(mut gap) => {
                let bar = flat_bar(gap.next, gap.interval, gap.price);
                gap.next = gap.next.add_micros(gap.interval);
                if gap.next < gap.until {
                    self.pending.push_front(Pending::Gap(gap));
                }
                bar
            }
        };
        self.emitted += 1;
        Some(bar)
    }

    /// Add `trade` to the open bar, opening one at `start` if needed.
    fn accumulate(&mut self, start: BarBoundary, trade: &TradeRecord) {
        match self.current.as_mut() {
            Some(bar) => bar.add_trade(trade),
            None => self.current = Some(BarInProgress::new(start, trade)),
        }
    }

    fn close_if(&mut self, reached: bool, end: BarBoundary) {
        if !reached {
            return;
        }
        if let Some(bar) = self.current.take() {
            self.pending.push_back(Pending::Bar(bar.into_bar(end, false)));
        }
    }

    fn push_time(&mut self, trade: &TradeRecord, interval: i64) {
        self.ticks_total += 1;
        self.volume_total += trade.volume as u64;
        let bucket = trade.ts.floor_to(interval);

        let current_start = match &self.current {
            Some(BarInProgress {
                start: BarBoundary::Time(start),
                ..
            }) => *start,
            _ => {
                self.current = Some(BarInProgress::new(BarBoundary::Time(bucket), trade));
                return;
            }
        };

        if bucket <= current_start {
            if bucket < current_start {
                debug!(ts = %trade.ts, suspect = trade.suspect, "late trade folded into open bar");
            }
            if let Some(bar) = self.current.as_mut() {
                bar.add_trade(trade);
            }
            return;
        }

        if let Some(bar) = self.current.take() {
            let end = current_start.add_micros(interval);
            let last_close = bar.close;
            self.pending.push_back(Pending::Bar(bar.into_bar(BarBoundary::Time(end), false)));

            if self.config.gap_policy == TimeGapPolicy::FillFlat && end < bucket {
                self.pending.push_back(Pending::Gap(GapFill {
                    next: end,
                    until: bucket,
                    interval,
                    price: last_close,
                }));
            }
        }
        self.current = Some(BarInProgress::new(BarBoundary::Time(bucket), trade));
    }
}

/// Bars closed by one [`BarAggregator::push`] or [`BarAggregator::flush`].
///
/// Gap bars are built as the iterator is advanced.
pub struct ClosedBars<'a> {
    aggregator: &'a mut BarAggregator,
}

impl Iterator for ClosedBars<'_> {
    type Item = Bar;

    fn next(&mut self) -> Option<Bar> {
        self.aggregator.next_closed()
    }
}

/// Bars over a fallible trade stream.
///
/// On an upstream error the partial bar is yielded first, flagged
/// incomplete, then the error; the stream ends after that.
pub struct BarStream<I> {
    records: I,
    aggregator: BarAggregator,
    pending_error: Option<Error>,
    finished: bool,
}

impl<I> BarStream<I>
where
    I: Iterator<Item = Result<TradeRecord>>,
{
    pub fn new(records: I, config: BarConfig) -> Result<Self> {
        Ok(Self {
            records,
            aggregator: BarAggregator::new(config)?,
            pending_error: None,
            finished: false,
        })
    }
}

impl<I> Iterator for BarStream<I>
where
    I: Iterator<Item = Result<TradeRecord>>,
{
    type Item = Result<Bar>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(bar) = self.aggregator.next_closed() {
                return Some(Ok(bar));
            }
            if let Some(err) = self.pending_error.take() {
                self.finished = true;
                return Some(Err(err));
            }
            if self.finished {
                return None;
            }
            // Closed bars stay queued in the aggregator until drained above.
            match self.records.next() {
                Some(Ok(trade)) => {
                    self.aggregator.push(&trade);
                }
                Some(Err(err)) => {
                    self.aggregator.flush();
                    self.pending_error = Some(err);
                }
                None => {
                    self.aggregator.flush();
                    self.finished = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contango_core::time::MICROS_PER_SECOND;

    const MIN: i64 = 60 * MICROS_PER_SECOND;

    fn make_trade(ts: i64, price: f64, volume: u32) -> TradeRecord {
        TradeRecord {
            ts: ScDateTime(ts),
            price,
            volume,
            side: AggressorSide::Buy,
            bid_price: price - 0.25,
            ask_price: price,
            num_trades: 1,
            suspect: false,
        }
    }

    fn time_config(gap_policy: TimeGapPolicy) -> BarConfig {
        BarConfig {
            policy: BarPolicy::minutes(1),
            gap_policy,
        }
    }

    #[test]
    fn test_single_trade() {
        let bars = BarAggregator::aggregate(BarConfig::default(), &[make_trade(MIN + 30 * MICROS_PER_SECOND, 4500.5, 2)]).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].start, BarBoundary::Time(ScDateTime(MIN)));
        assert_eq!(bars[0].end, BarBoundary::Time(ScDateTime(2 * MIN)));
        assert!((bars[0].open - 4500.5).abs() < 1e-10);
        assert_eq!(bars[0].volume, 2);
        assert!(bars[0].incomplete);
    }

    #[test]
    fn test_multiple_trades_same_minute() {
        let mut agg = BarAggregator::new(BarConfig::default()).unwrap();
        assert!(agg.push(&make_trade(MIN + 10, 100.0, 1)).next().is_none()); // Open
        assert!(agg.push(&make_trade(MIN + 20, 100.5, 2)).next().is_none()); // High
        assert!(agg.push(&make_trade(MIN + 30, 99.5, 1)).next().is_none()); // Low
        assert!(agg.push(&make_trade(MIN + 50, 100.25, 1)).next().is_none()); // Close

        let bars: Vec<_> = agg.push(&make_trade(2 * MIN, 100.0, 1)).collect();
        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert!((bar.open - 100.0).abs() < 1e-10);
        assert!((bar.high - 100.5).abs() < 1e-10);
        assert!((bar.low - 99.5).abs() < 1e-10);
        assert!((bar.close - 100.25).abs() < 1e-10);
        assert_eq!(bar.volume, 5);
        assert_eq!(bar.trade_count, 4);
        assert_eq!(bar.first_ts, ScDateTime(MIN + 10));
        assert_eq!(bar.last_ts, ScDateTime(MIN + 50));
        assert!(!bar.incomplete);
    }

    #[test]
    fn test_vwap_calculation() {
        let mut agg = BarAggregator::new(BarConfig::default()).unwrap();
        agg.push(&make_trade(10, 100.0, 100));
        agg.push(&make_trade(20, 110.0, 200));
        let bar = agg.flush().next().unwrap();

        let expected_vwap = (100.0 * 100.0 + 200.0 * 110.0) / 300.0;
        assert!((bar.vwap.unwrap() - expected_vwap).abs() < 1e-6);
    }

    #[test]
    fn test_gap_fill_flat() {
        let trades = [make_trade(10, 100.0, 1), make_trade(3 * MIN + 10, 101.0, 1)];
        let bars = BarAggregator::aggregate(time_config(TimeGapPolicy::FillFlat), &trades).unwrap();

        assert_eq!(bars.len(), 4);
        for (i, bar) in bars.iter().enumerate() {
            assert_eq!(bar.start, BarBoundary::Time(ScDateTime(i as i64 * MIN)));
        }
        assert_eq!(bars[1].volume, 0);
        assert_eq!(bars[2].close, 100.0);
        assert_eq!(bars[2].vwap, None);
        assert_eq!(bars[3].open, 101.0);
    }

    #[test]
    fn test_gap_skip() {
        let trades = [make_trade(10, 100.0, 1), make_trade(3 * MIN + 10, 101.0, 1)];
        let bars = BarAggregator::aggregate(time_config(TimeGapPolicy::Skip), &trades).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].end, BarBoundary::Time(ScDateTime(MIN)));
        assert_eq!(bars[1].start, BarBoundary::Time(ScDateTime(3 * MIN)));
    }

    #[test]
    fn test_late_trade_folds_into_open_bar() {
        let mut late = make_trade(MIN - 5, 98.0, 3);
        late.suspect = true;
        let trades = [make_trade(MIN + 1, 100.0, 1), late, make_trade(MIN + 2, 100.0, 1)];
        let bars = BarAggregator::aggregate(BarConfig::default(), &trades).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 5);
        assert_eq!(bars[0].low, 98.0);
    }

    #[test]
    fn test_tick_bars() {
        let trades: Vec<_> = (0..7).map(|i| make_trade(i, 100.0 + i as f64, 1)).collect();
        let bars = BarAggregator::aggregate(BarConfig::new(BarPolicy::Tick { count: 3 }), &trades).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].start, BarBoundary::Ticks(0));
        assert_eq!(bars[0].end, BarBoundary::Ticks(3));
        assert_eq!(bars[1].start, BarBoundary::Ticks(3));
        assert_eq!(bars[1].close, 105.0);
        assert_eq!(bars[2].trade_count, 1);
        assert!(bars[2].incomplete);
        assert!(!bars[1].incomplete);
    }

    #[test]
    fn test_volume_bars_close_inclusive() {
        let volumes = [4u32, 4, 4, 1, 10];
        let trades: Vec<_> = volumes.iter().enumerate().map(|(i, v)| make_trade(i as i64, 100.0, *v)).collect();
        let bars = BarAggregator::aggregate(BarConfig::new(BarPolicy::Volume { volume: 10 }), &trades).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].volume, 12);
        assert_eq!(bars[0].end, BarBoundary::Volume(12));
        assert_eq!(bars[1].start, BarBoundary::Volume(12));
        assert_eq!(bars[1].volume, 11);
        assert!(!bars[1].incomplete);
    }

    #[test]
    fn test_buy_sell_volume() {
        let mut sell = make_trade(2, 100.0, 4);
        sell.side = AggressorSide::Sell;
        let bars = BarAggregator::aggregate(BarConfig::default(), &[make_trade(1, 100.0, 3), sell]).unwrap();
        assert_eq!(bars[0].buy_volume, 3);
        assert_eq!(bars[0].sell_volume, 4);
    }

    #[test]
    fn test_stream_emits_partial_then_error() {
        let records = vec![
            Ok(make_trade(1, 100.0, 1)),
            Ok(make_trade(2, 100.0, 1)),
            Err(Error::TruncatedRecord {
                records_decoded: 2,
                trailing_bytes: 3,
            }),
        ];
        let mut stream = BarStream::new(records.into_iter(), BarConfig::default()).unwrap();

        let bar = stream.next().unwrap().unwrap();
        assert!(bar.incomplete);
        assert_eq!(bar.volume, 2);
        assert!(matches!(stream.next(), Some(Err(Error::TruncatedRecord { .. }))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_empty_stream_emits_nothing() {
        let mut agg = BarAggregator::new(BarConfig::default()).unwrap();
        assert!(agg.flush().next().is_none());
        assert!(!agg.has_pending());
    }

    #[test]
    fn test_long_gap_is_filled_lazily() {
        let config = BarConfig {
            policy: BarPolicy::seconds(1),
            gap_policy: TimeGapPolicy::FillFlat,
        };
        let mut agg = BarAggregator::new(config).unwrap();
        agg.push(&make_trade(0, 100.0, 1));

        let day = 86_400 * MICROS_PER_SECOND;
        let mut closed = agg.push(&make_trade(day, 101.0, 1));
        let first: Vec<_> = closed.by_ref().take(3).collect();
        assert_eq!(first[0].volume, 1);
        assert_eq!(first[2].start, BarBoundary::Time(ScDateTime(2 * MICROS_PER_SECOND)));
        drop(closed);
        // The rest of the gap is a single cursor, not materialised bars.
        assert_eq!(agg.pending.len(), 1);

        assert_eq!(agg.push(&make_trade(day + 1, 101.0, 1)).count(), 86_400 - 3);
        let last = agg.flush().next().unwrap();
        assert_eq!(last.start, BarBoundary::Time(ScDateTime(day)));
        assert_eq!(last.volume, 2);
        assert_eq!(agg.emitted(), 86_401);
    }

    #[test]
    fn test_undrained_bars_keep_their_order() {
        let mut agg = BarAggregator::new(time_config(TimeGapPolicy::FillFlat)).unwrap();
        agg.push(&make_trade(10, 100.0, 1));
        agg.push(&make_trade(3 * MIN, 101.0, 1));
        let bars: Vec<_> = agg.push(&make_trade(4 * MIN, 102.0, 1)).collect();

        assert_eq!(bars.len(), 4);
        for (i, bar) in bars.iter().enumerate() {
            assert_eq!(bar.start, BarBoundary::Time(ScDateTime(i as i64 * MIN)));
        }
    }

    /// Runs `trades` split at `cut` as two sessions: the first flushes its
    /// partial bar, the second resumes from it.
    fn resumed(config: BarConfig, trades: &[TradeRecord], cut: usize) -> Vec<Bar> {
        let mut first = BarAggregator::aggregate(config.clone(), &trades[..cut]).unwrap();
        let mut agg = BarAggregator::new(config).unwrap();
        agg.resume_from(first.last().unwrap()).unwrap();
        let mut second: Vec<Bar> = Vec::new();
        for trade in &trades[cut..] {
            second.extend(agg.push(trade));
        }
        second.extend(agg.flush());

        // The reissued bar supersedes the stored partial one.
        if first.last().is_some_and(|b| b.incomplete && b.start == second[0].start) {
            first.pop();
        }
        first.extend(second);
        first
    }

    #[test]
    fn test_resume_tick_bars() {
        let trades: Vec<_> = (0..8).map(|i| make_trade(i, 100.0 + i as f64, 1)).collect();
        let config = BarConfig::new(BarPolicy::Tick { count: 3 });
        let bars = resumed(config.clone(), &trades, 5);

        assert_eq!(bars, BarAggregator::aggregate(config, &trades).unwrap());
        let bounds: Vec<_> = bars.iter().map(|b| (b.start, b.end, b.trade_count)).collect();
        assert_eq!(
            bounds,
            vec![
                (BarBoundary::Ticks(0), BarBoundary::Ticks(3), 3),
                (BarBoundary::Ticks(3), BarBoundary::Ticks(6), 3),
                (BarBoundary::Ticks(6), BarBoundary::Ticks(8), 2),
            ]
        );
    }

    #[test]
    fn test_resume_volume_bars() {
        let volumes = [3u32, 3, 2, 3, 1, 4];
        let trades: Vec<_> = volumes.iter().enumerate().map(|(i, v)| make_trade(i as i64, 100.0, *v)).collect();
        let config = BarConfig::new(BarPolicy::Volume { volume: 5 });
        let bars = resumed(config.clone(), &trades, 3);

        assert_eq!(bars, BarAggregator::aggregate(config, &trades).unwrap());
        assert_eq!(bars[0].end, BarBoundary::Volume(6));
        assert_eq!(bars[1].start, BarBoundary::Volume(6));
        assert_eq!(bars[1].end, BarBoundary::Volume(11));
        assert_eq!(bars.len(), 3);
        assert!(bars.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn test_resume_time_bar_reopens_partial() {
        let trades = [
            make_trade(10, 100.0, 1),
            make_trade(20, 102.0, 1),
            make_trade(30, 99.0, 2),
            make_trade(MIN + 5, 101.0, 1),
        ];
        let bars = resumed(BarConfig::default(), &trades, 2);
        assert_eq!(bars, BarAggregator::aggregate(BarConfig::default(), &trades).unwrap());
        assert_eq!(bars[0].volume, 4);
        assert_eq!(bars[0].low, 99.0);
    }

    #[test]
    fn test_resume_rejects_other_policy() {
        let ticks = BarAggregator::aggregate(
            BarConfig::new(BarPolicy::Tick { count: 2 }),
            &[make_trade(1, 100.0, 1)],
        )
        .unwrap();
        let mut agg = BarAggregator::new(BarConfig::new(BarPolicy::Volume { volume: 5 })).unwrap();
        assert!(matches!(agg.resume_from(&ticks[0]), Err(Error::Config(_))));
    }
}
