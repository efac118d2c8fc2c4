//! Per-symbol streaming pipeline: decode → aggregate/profile → persist.
//!
//! Each stage runs on its own scoped thread, joined by bounded channels so a
//! slow store suspends the decoder instead of buffering the file. A run never
//! panics on bad input; everything that went wrong ends up in the
//! [`PipelineReport`] next to whatever was produced before it.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use contango_core::{
    Bar, BarPolicy, Config, DecoderConfig, Error, MarketRecord, Result, TradeRecord,
    VolumeProfile,
};
use contango_features::VolumeProfileEngine;
use contango_ingestion::{BarAggregator, DepthDecoder, EventMerger, TradeDecoder};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::store::{ArtifactKind, ArtifactRecord, StoreAdapter};

/// Bars written to the store per call.
const BAR_BATCH: usize = 256;

/// Shared flag for cooperative cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Raw inputs of one symbol: a trade file and optionally a depth file.
pub struct SymbolSource {
    pub symbol: String,
    trades: Box<dyn Read + Send>,
    depth: Option<Box<dyn Read + Send>>,
}

impl SymbolSource {
    pub fn new(symbol: impl Into<String>, trades: impl Read + Send + 'static) -> Self {
        Self {
            symbol: symbol.into(),
            trades: Box::new(trades),
            depth: None,
        }
    }

    /// Attach a depth stream; its updates drive the book used for trade
    /// classification.
    pub fn with_depth(mut self, depth: impl Read + Send + 'static) -> Self {
        self.depth = Some(Box::new(depth));
        self
    }

    /// Open a symbol's files from disk.
    pub fn open(symbol: impl Into<String>, trades: &Path, depth: Option<&Path>) -> Result<Self> {
        let source = Self::new(symbol, BufReader::new(File::open(trades)?));
        Ok(match depth {
            Some(path) => source.with_depth(BufReader::new(File::open(path)?)),
            None => source,
        })
    }
}

/// Outcome of one symbol run.
#[derive(Debug)]
pub struct PipelineReport {
    pub symbol: String,
    /// Trade records consumed.
    pub trades: u64,
    /// Depth records consumed.
    pub depth_updates: u64,
    pub bars_written: u64,
    pub profiles_written: u64,
    /// Trade-file record index to resume from.
    pub checkpoint: u64,
    /// Last bar handed to the store.
    pub last_bar: Option<Bar>,
    /// Final profile snapshot, when one was taken.
    pub profile: Option<VolumeProfile>,
    /// The run stopped before the end of its input.
    pub incomplete: bool,
    pub error: Option<Error>,
}

impl PipelineReport {
    pub(crate) fn new(symbol: &str, checkpoint: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            trades: 0,
            depth_updates: 0,
            bars_written: 0,
            profiles_written: 0,
            checkpoint,
            last_bar: None,
            profile: None,
            incomplete: false,
            error: None,
        }
    }

    pub(crate) fn failed(symbol: &str, checkpoint: u64, error: Error) -> Self {
        Self {
            incomplete: true,
            error: Some(error),
            ..Self::new(symbol, checkpoint)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn was_cancelled(&self) -> bool {
        matches!(self.error, Some(Error::Cancelled))
    }
}

/// Artifacts travelling from the aggregate stage to the persist stage.
enum Output {
    Bar(Bar),
    Profile(VolumeProfile),
}

#[derive(Debug, Default)]
struct PersistSummary {
    bars_written: u64,
    profiles_written: u64,
    error: Option<Error>,
}

/// Runs the stages for one symbol at a time against a shared store.
pub struct SymbolPipeline<'s, S: StoreAdapter + ?Sized> {
    config: Config,
    store: &'s S,
    cancel: CancellationToken,
}

impl<'s, S: StoreAdapter + ?Sized> SymbolPipeline<'s, S> {
    pub fn new(config: Config, store: &'s S, cancel: CancellationToken) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            cancel,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one symbol to completion, failure or cancellation.
    pub fn run(&self, source: SymbolSource) -> PipelineReport {
        let symbol = source.symbol.clone();
        let mut report = PipelineReport::new(&symbol, self.config.decoder.checkpoint);
        let capacity = self.config.pipeline.channel_capacity;
        let (record_tx, record_rx) = bounded::<Result<MarketRecord>>(capacity);
        let (output_tx, output_rx) = bounded::<Output>(capacity);

        info!(
            symbol = %symbol,
            bars = %self.config.bars.policy.label(),
            checkpoint = self.config.decoder.checkpoint,
            "pipeline start"
        );

        let (stage_error, summary, decode_panicked) = thread::scope(|scope| {
            let decode = scope.spawn(move || self.decode(source, record_tx));
            let persister = scope.spawn(|| persist(self.store, &symbol, output_rx));

            let stage_error = self.aggregate(record_rx, output_tx, &mut report);

            let decode_panicked = decode.join().is_err();
            let summary = persister.join().unwrap_or_else(|_| PersistSummary {
                error: Some(Error::store("persist stage panicked")),
                ..PersistSummary::default()
            });
            (stage_error, summary, decode_panicked)
        });

        report.bars_written = summary.bars_written;
        report.profiles_written = summary.profiles_written;
        report.checkpoint = self.config.decoder.checkpoint + report.trades;

        // A store failure surfaces upstream only as a closed channel.
        report.error = summary.error.or(stage_error);
        if report.error.is_none() && decode_panicked {
            report.error = Some(Error::data("decode stage panicked"));
        }
        if report.error.is_some() {
            report.incomplete = true;
        }

        match &report.error {
            None => info!(
                symbol = %report.symbol,
                trades = report.trades,
                bars = report.bars_written,
                "pipeline finished"
            ),
            Some(Error::Cancelled) => info!(symbol = %report.symbol, trades = report.trades, "pipeline cancelled"),
            Some(e) => warn!(
                symbol = %report.symbol,
                trades = report.trades,
                checkpoint = report.checkpoint,
                error = %e,
                "pipeline failed"
            ),
        }
        report
    }

    /// Decode stage: open the files and forward records until the input ends,
    /// an error is sent, or the consumer goes away.
    fn decode(&self, source: SymbolSource, tx: Sender<Result<MarketRecord>>) {
        let SymbolSource {
            symbol,
            trades,
            depth,
        } = source;

        let records = match self.open_records(trades, depth) {
            Ok(records) => records,
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        };

        for record in records {
            if self.cancel.is_cancelled() {
                let _ = tx.send(Err(Error::Cancelled));
                return;
            }
            if tx.send(record).is_err() {
                debug!(symbol = %symbol, "decode stage stopped by consumer");
                return;
            }
        }
    }

    fn open_records(
        &self,
        trades: Box<dyn Read + Send>,
        depth: Option<Box<dyn Read + Send>>,
    ) -> Result<Box<dyn Iterator<Item = Result<MarketRecord>> + Send>> {
        let trades = TradeDecoder::new(trades, self.config.decoder.clone())?;
        Ok(match depth {
            Some(depth) => {
                // The checkpoint indexes the trade file; the book is always
                // rebuilt from the start of the depth file.
                let depth_config = DecoderConfig {
                    checkpoint: 0,
                    ..self.config.decoder.clone()
                };
                let depth = DepthDecoder::new(depth, depth_config)?;
                Box::new(EventMerger::new(trades, depth))
            }
            None => Box::new(trades.map(|r| r.map(MarketRecord::Trade))),
        })
    }

    /// Aggregate stage. Returns the error that ended the run, if any.
    fn aggregate(
        &self,
        records: Receiver<Result<MarketRecord>>,
        outputs: Sender<Output>,
        report: &mut PipelineReport,
    ) -> Option<Error> {
        let mut bars = match self.open_bars(&report.symbol) {
            Ok(bars) => bars,
            Err(e) => return Some(e),
        };
        let mut profile = match VolumeProfileEngine::new(self.config.profile.clone()) {
            Ok(profile) => profile,
            Err(e) => return Some(e),
        };

        let outcome = self.consume(&records, &outputs, &mut bars, &mut profile, report);
        // Unblock the decoder before flushing.
        drop(records);

        match outcome {
            Ok(()) => {
                flush_bars(&mut bars, &outputs, report);
                self.final_snapshot(&profile, false, &outputs, report);
                None
            }
            Err(Error::Cancelled) => {
                bars.discard();
                profile.reset();
                Some(Error::Cancelled)
            }
            Err(e) => {
                flush_bars(&mut bars, &outputs, report);
                self.final_snapshot(&profile, true, &outputs, report);
                Some(e)
            }
        }
    }

    /// Bar aggregator for this run. A run resumed from a checkpoint picks up
    /// after the last bar already stored for the symbol.
    fn open_bars(&self, symbol: &str) -> Result<BarAggregator> {
        let mut bars = BarAggregator::new(self.config.bars.clone())?;
        if self.config.decoder.checkpoint > 0 {
            if let Some(ArtifactRecord::Bar(last)) = self.store.last(symbol, ArtifactKind::Bars)? {
                bars.resume_from(&last)?;
                debug!(symbol, end = ?last.end, "resuming bars");
            }
        }
        Ok(bars)
    }

    fn consume(
        &self,
        records: &Receiver<Result<MarketRecord>>,
        outputs: &Sender<Output>,
        bars: &mut BarAggregator,
        profile: &mut VolumeProfileEngine,
        report: &mut PipelineReport,
    ) -> Result<()> {
        for record in records.iter() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            match record? {
                MarketRecord::Trade(trade) => {
                    self.on_trade(&trade, outputs, bars, profile, report)?;
                    report.trades += 1;
                }
                record @ MarketRecord::Depth(_) => {
                    profile.apply(&record)?;
                    report.depth_updates += 1;
                }
            }
        }
        Ok(())
    }

    fn on_trade(
        &self,
        trade: &TradeRecord,
        outputs: &Sender<Output>,
        bars: &mut BarAggregator,
        profile: &mut VolumeProfileEngine,
        report: &mut PipelineReport,
    ) -> Result<()> {
        let mut closed = bars.push(trade).peekable();
        let snapshot = self.config.pipeline.snapshot_profile_on_bar_close && closed.peek().is_some();
        // A time bar closes on the first trade of the next bucket, which must
        // not be part of the snapshot.
        let before_trade = matches!(self.config.bars.policy, BarPolicy::Time { .. });

        for bar in closed {
            report.last_bar = Some(bar.clone());
            send(outputs, Output::Bar(bar))?;
        }
        if snapshot && before_trade {
            send(outputs, Output::Profile(profile.snapshot()))?;
        }
        profile.add_trade(trade)?;
        if snapshot && !before_trade {
            send(outputs, Output::Profile(profile.snapshot()))?;
        }
        Ok(())
    }

    fn final_snapshot(
        &self,
        profile: &VolumeProfileEngine,
        incomplete: bool,
        outputs: &Sender<Output>,
        report: &mut PipelineReport,
    ) {
        let mut snapshot = profile.snapshot();
        if snapshot.as_of.is_none() {
            return;
        }
        snapshot.incomplete = incomplete;
        report.profile = Some(snapshot.clone());
        let _ = outputs.send(Output::Profile(snapshot));
    }
}

/// Hand the partial bar to the persist stage at the end of a run.
fn flush_bars(bars: &mut BarAggregator, outputs: &Sender<Output>, report: &mut PipelineReport) {
    for bar in bars.flush() {
        report.last_bar = Some(bar.clone());
        if outputs.send(Output::Bar(bar)).is_err() {
            break;
        }
    }
}

fn send(outputs: &Sender<Output>, output: Output) -> Result<()> {
    outputs
        .send(output)
        .map_err(|_| Error::store("persist stage stopped"))
}

/// Persist stage: batch bars, write snapshots as they come.
fn persist<S: StoreAdapter + ?Sized>(store: &S, symbol: &str, outputs: Receiver<Output>) -> PersistSummary {
    let mut summary = PersistSummary::default();
    let mut batch: Vec<ArtifactRecord> = Vec::with_capacity(BAR_BATCH);

    let write_bars = |batch: &mut Vec<ArtifactRecord>, summary: &mut PersistSummary| -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        store.write(symbol, ArtifactKind::Bars, batch)?;
        summary.bars_written += batch.len() as u64;
        batch.clear();
        Ok(())
    };

    for output in outputs.iter() {
        let written = match output {
            Output::Bar(bar) => {
                batch.push(ArtifactRecord::Bar(bar));
                if batch.len() >= BAR_BATCH {
                    write_bars(&mut batch, &mut summary)
                } else {
                    Ok(())
                }
            }
            Output::Profile(profile) => store
                .write(symbol, ArtifactKind::Profile, &[ArtifactRecord::Profile(profile)])
                .map(|()| summary.profiles_written += 1),
        };
        if let Err(e) = written {
            warn!(symbol, error = %e, "store write failed");
            summary.error = Some(e);
            return summary;
        }
    }

    if let Err(e) = write_bars(&mut batch, &mut summary) {
        warn!(symbol, error = %e, "store write failed");
        summary.error = Some(e);
    }
    debug!(
        symbol,
        bars = summary.bars_written,
        profiles = summary.profiles_written,
        "persist stage drained"
    );
    summary
}
