//! Continuous and spread series built from aggregated contract bars.

use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use contango_core::time::{MICROS_PER_DAY, MICROS_PER_HOUR, MICROS_PER_MINUTE};
use contango_core::{
    AggressorSide, Bar, BarBoundary, BarConfig, BarPolicy, ContractSeries, RollConfig, RollPolicy,
    ScDateTime, TimeGapPolicy, TradeRecord,
};
use contango_ingestion::BarAggregator;
use contango_roll::RollEngine;
use proptest::prelude::*;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

/// Ten one-minute trades from 14:00 on each listed day.
fn day_trades(days: &[(u32, u32)], price: f64) -> Vec<TradeRecord> {
    let mut trades = Vec::new();
    for &(day, volume) in days {
        let open = ScDateTime::start_of_local_date(date(day), 0).add_micros(14 * MICROS_PER_HOUR);
        for minute in 0..10 {
            trades.push(TradeRecord {
                ts: open.add_micros(minute * MICROS_PER_MINUTE),
                price,
                volume,
                side: AggressorSide::Buy,
                bid_price: price - 0.25,
                ask_price: price,
                num_trades: 1,
                suspect: false,
            });
        }
    }
    trades
}

fn minute_bars(trades: &[TradeRecord]) -> Vec<Bar> {
    let config = BarConfig {
        policy: BarPolicy::minutes(1),
        gap_policy: TimeGapPolicy::Skip,
    };
    BarAggregator::aggregate(config, trades).unwrap()
}

#[test]
fn test_volume_crossover_roll_has_no_jump() {
    let front_days = [(10, 50), (11, 40), (12, 10), (13, 5)];
    let back_days = [(10, 5), (11, 20), (12, 30), (13, 60)];
    let front_bars = minute_bars(&day_trades(&front_days, 100.00));
    let back_bars = minute_bars(&day_trades(&back_days, 100.25));

    let front = ContractSeries::new("ESH25", date(21), front_bars.clone());
    let back = ContractSeries::new("ESM25", NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(), back_bars);

    let engine = RollEngine::new(RollConfig::new(RollPolicy::VolumeCrossover)).unwrap();
    let series = engine.stitch("ES", &[front, back]).unwrap();

    assert_eq!(series.rolls.len(), 1);
    let roll = &series.rolls[0];
    assert_eq!(roll.boundary, ScDateTime::start_of_local_date(date(12), 0));
    assert_abs_diff_eq!(roll.delta, 0.25, epsilon = 1e-10);

    // Two front days and two back days of ten bars each.
    assert_eq!(series.bars.len(), 40);
    for bar in &series.bars {
        assert!((bar.close - 100.25).abs() < 1e-10, "jump at {}", bar.time_key());
    }

    // Pre-roll bars are the raw front bars shifted by exactly the delta.
    for (adjusted, raw) in series.bars.iter().zip(&front_bars).take(20) {
        assert_eq!(adjusted.time_key(), raw.time_key());
        assert_abs_diff_eq!(adjusted.close, raw.close + 0.25, epsilon = 1e-10);
        assert_eq!(adjusted.volume, raw.volume);
    }
}

#[test]
fn test_flat_spread_is_constant() {
    let days = [(10, 10), (11, 10), (12, 10), (13, 10)];
    let leg = |price_front: f64, price_back: f64, front: &str, back: &str| {
        vec![
            ContractSeries::new(front, date(21), minute_bars(&day_trades(&days, price_front))),
            ContractSeries::new(back, date(28), minute_bars(&day_trades(&days, price_back))),
        ]
    };
    let long = leg(100.00, 100.00, "AH25", "AM25");
    let short = leg(99.50, 99.50, "BH25", "BM25");

    let engine = RollEngine::new(RollConfig::new(RollPolicy::ExplicitDates(vec![date(12)]))).unwrap();
    let spread = engine.spread(("A", long.as_slice()), ("B", short.as_slice())).unwrap();

    assert_eq!(spread.series.bars.len(), 40);
    for bar in &spread.series.bars {
        assert_abs_diff_eq!(bar.open, 0.50, epsilon = 1e-10);
        assert_abs_diff_eq!(bar.close, 0.50, epsilon = 1e-10);
        assert_eq!(bar.high, bar.low);
        assert_eq!(bar.volume, 10);
    }
    assert_eq!(spread.series.rolls.len(), 2);
}

fn daily_bar(day: i64, close: f64) -> Bar {
    let ts = ScDateTime::start_of_local_date(date(1), 0).add_micros(day * MICROS_PER_DAY + 15 * MICROS_PER_HOUR);
    Bar {
        start: BarBoundary::Time(ts),
        end: BarBoundary::Time(ts.add_micros(MICROS_PER_HOUR)),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1,
        buy_volume: 0,
        sell_volume: 0,
        trade_count: 1,
        vwap: Some(close),
        first_ts: ts,
        last_ts: ts,
        incomplete: false,
    }
}

fn walk(start: f64, steps: &[i32]) -> Vec<Bar> {
    let mut price = start;
    steps
        .iter()
        .enumerate()
        .map(|(day, step)| {
            price += *step as f64 * 0.25;
            daily_bar(day as i64, price)
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_adjustment_preserves_returns_within_segments(
        a in prop::collection::vec(-8i32..8, 12),
        b in prop::collection::vec(-8i32..8, 12),
        c in prop::collection::vec(-8i32..8, 12),
        first_roll in 2u32..6,
        gap in 1u32..5,
    ) {
        let contracts = vec![
            ContractSeries::new("A", date(20), walk(100.0, &a)),
            ContractSeries::new("B", date(25), walk(103.0, &b)),
            ContractSeries::new("C", date(30), walk(95.0, &c)),
        ];
        let dates = vec![date(first_roll), date(first_roll + gap)];
        let engine = RollEngine::new(RollConfig::new(RollPolicy::ExplicitDates(dates))).unwrap();
        let series = engine.stitch("X", &contracts).unwrap();

        prop_assert_eq!(series.bars.len(), 12);
        for pair in series.bars.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let segment = series.segment_of(prev.time_key());
            if segment != series.segment_of(next.time_key()) {
                continue;
            }
            let raw = &contracts[segment].bars;
            let raw_prev = raw.iter().find(|r| r.time_key() == prev.time_key()).unwrap();
            let raw_next = raw.iter().find(|r| r.time_key() == next.time_key()).unwrap();
            prop_assert!(((next.close - prev.close) - (raw_next.close - raw_prev.close)).abs() < 1e-9);
        }

        // The latest segment carries raw prices.
        let last = series.bars.last().unwrap();
        prop_assert!((last.close - contracts[2].bars.last().unwrap().close).abs() < 1e-12);
    }
}
