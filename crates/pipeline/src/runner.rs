//! Multi-symbol runs and the roll stage.
//!
//! Symbols run in parallel on scoped threads and share nothing but the
//! store; one symbol failing leaves the others untouched. Rolling happens
//! after every contract of a root has been persisted.

use std::thread;

use chrono::NaiveDate;
use contango_core::{Bar, Config, ContinuousSeries, ContractSeries, Error, Result, SpreadSeries};
use contango_roll::{difference, RollEngine};
use tracing::{debug, info, warn};

use crate::pipeline::{CancellationToken, PipelineReport, SymbolPipeline, SymbolSource};
use crate::store::{series_records, ArtifactKind, StoreAdapter, TimeRange};

/// Run every source through its own pipeline, all in parallel.
///
/// Reports come back in input order. Only an invalid configuration fails
/// the call as a whole.
pub fn run_symbols<S: StoreAdapter + ?Sized>(
    config: &Config,
    store: &S,
    cancel: &CancellationToken,
    sources: Vec<SymbolSource>,
) -> Result<Vec<PipelineReport>> {
    let pipeline = SymbolPipeline::new(config.clone(), store, cancel.clone())?;
    let checkpoint = config.decoder.checkpoint;
    info!(symbols = sources.len(), "multi-symbol run start");

    let reports: Vec<PipelineReport> = thread::scope(|scope| {
        let handles: Vec<_> = sources
            .into_iter()
            .map(|source| {
                let symbol = source.symbol.clone();
                let pipeline = &pipeline;
                (symbol, scope.spawn(move || pipeline.run(source)))
            })
            .collect();

        handles
            .into_iter()
            .map(|(symbol, handle)| {
                handle.join().unwrap_or_else(|_| {
                    PipelineReport::failed(&symbol, checkpoint, Error::data("symbol pipeline panicked"))
                })
            })
            .collect()
    });

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    info!(symbols = reports.len(), failed, "multi-symbol run finished");
    Ok(reports)
}

/// Load one contract's stored bars.
///
/// A run resumed from a checkpoint reopens the bar its predecessor flushed
/// as incomplete and stores it again once extended; the later copy replaces
/// the earlier one.
pub fn load_contract<S: StoreAdapter + ?Sized>(
    store: &S,
    symbol: &str,
    expiration: NaiveDate,
) -> Result<ContractSeries> {
    let records = store.read_range(symbol, ArtifactKind::Bars, TimeRange::all())?;
    let mut bars: Vec<Bar> = Vec::with_capacity(records.len());
    for bar in records.iter().filter_map(|r| r.as_bar()) {
        match bars.last_mut() {
            Some(last) if last.incomplete && last.start == bar.start => *last = bar.clone(),
            _ => bars.push(bar.clone()),
        }
    }
    if bars.is_empty() {
        return Err(Error::insufficient_data(format!("no stored bars for {symbol}")));
    }
    debug!(symbol, bars = bars.len(), "contract loaded");
    Ok(ContractSeries::new(symbol, expiration, bars))
}

fn load_chain<S: StoreAdapter + ?Sized>(
    store: &S,
    contracts: &[(&str, NaiveDate)],
) -> Result<Vec<ContractSeries>> {
    contracts
        .iter()
        .map(|&(symbol, expiration)| load_contract(store, symbol, expiration))
        .collect()
}

/// Stitch stored contract bars into a continuous series and persist it
/// under `root`.
pub fn stitch_and_store<S: StoreAdapter + ?Sized>(
    store: &S,
    engine: &RollEngine,
    root: &str,
    contracts: &[(&str, NaiveDate)],
) -> Result<ContinuousSeries> {
    let chain = load_chain(store, contracts)?;
    let series = engine.stitch(root, &chain).map_err(|e| {
        warn!(root, error = %e, "roll failed");
        e
    })?;
    store.write(root, ArtifactKind::Continuous, &series_records(&series))?;
    info!(root, bars = series.bars.len(), rolls = series.rolls.len(), "continuous series stored");
    Ok(series)
}

/// Build and persist the spread `long - short` from two stored contract
/// chains, keyed by the spread's own symbol.
pub fn spread_and_store<S: StoreAdapter + ?Sized>(
    store: &S,
    engine: &RollEngine,
    long: (&str, &[(&str, NaiveDate)]),
    short: (&str, &[(&str, NaiveDate)]),
) -> Result<SpreadSeries> {
    let long_series = engine.stitch(long.0, &load_chain(store, long.1)?)?;
    let short_series = engine.stitch(short.0, &load_chain(store, short.1)?)?;
    let spread = difference(&long_series, &short_series)?;
    store.write(
        &spread.series.symbol,
        ArtifactKind::Spread,
        &series_records(&spread.series),
    )?;
    info!(symbol = %spread.series.symbol, bars = spread.series.bars.len(), "spread stored");
    Ok(spread)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ArtifactRecord, MemoryStore};
    use contango_core::{BarBoundary, ScDateTime};

    fn tick_bar(start: u64, end: u64, incomplete: bool) -> ArtifactRecord {
        let ts = ScDateTime(start as i64);
        ArtifactRecord::Bar(Bar {
            start: BarBoundary::Ticks(start),
            end: BarBoundary::Ticks(end),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: end - start,
            buy_volume: 0,
            sell_volume: 0,
            trade_count: (end - start) as u32,
            vwap: Some(100.0),
            first_ts: ts,
            last_ts: ts,
            incomplete,
        })
    }

    #[test]
    fn test_reissued_bar_replaces_partial() {
        let store = MemoryStore::new();
        let expiration = NaiveDate::from_ymd_opt(2025, 3, 21).unwrap();
        store
            .write("ESH25", ArtifactKind::Bars, &[tick_bar(0, 3, false), tick_bar(3, 5, true)])
            .unwrap();
        store
            .write("ESH25", ArtifactKind::Bars, &[tick_bar(3, 6, false), tick_bar(6, 8, true)])
            .unwrap();

        let series = load_contract(&store, "ESH25", expiration).unwrap();
        let bounds: Vec<_> = series.bars.iter().map(|b| (b.start, b.end)).collect();
        assert_eq!(
            bounds,
            vec![
                (BarBoundary::Ticks(0), BarBoundary::Ticks(3)),
                (BarBoundary::Ticks(3), BarBoundary::Ticks(6)),
                (BarBoundary::Ticks(6), BarBoundary::Ticks(8)),
            ]
        );
        assert!(series.bars[2].incomplete);
        assert!(matches!(
            load_contract(&store, "NQH25", expiration),
            Err(Error::InsufficientData(_))
        ));
    }
}
