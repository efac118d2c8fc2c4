//! Store Adapter contract and the two bundled adapters.
//!
//! Artifacts are appended per `(symbol, kind)` and read back by time range.
//! Backends outside this workspace implement [`StoreAdapter`] directly.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use contango_core::{Bar, ContinuousSeries, Error, Result, RollEvent, ScDateTime, VolumeProfile};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Artifact families a store keeps apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Bars,
    Continuous,
    Spread,
    Profile,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Bars => "bars",
            ArtifactKind::Continuous => "continuous",
            ArtifactKind::Spread => "spread",
            ArtifactKind::Profile => "profile",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ArtifactRecord {
    Bar(Bar),
    Roll(RollEvent),
    Profile(VolumeProfile),
}

impl ArtifactRecord {
    /// Time the record is indexed under. Empty profiles have none.
    pub fn ts(&self) -> Option<ScDateTime> {
        match self {
            ArtifactRecord::Bar(bar) => Some(bar.time_key()),
            ArtifactRecord::Roll(roll) => Some(roll.boundary),
            ArtifactRecord::Profile(profile) => profile.as_of,
        }
    }

    pub fn as_bar(&self) -> Option<&Bar> {
        match self {
            ArtifactRecord::Bar(bar) => Some(bar),
            _ => None,
        }
    }

    pub fn as_profile(&self) -> Option<&VolumeProfile> {
        match self {
            ArtifactRecord::Profile(profile) => Some(profile),
            _ => None,
        }
    }
}

/// Records of a continuous series in time order, each roll placed ahead of
/// the first bar at its boundary.
pub fn series_records(series: &ContinuousSeries) -> Vec<ArtifactRecord> {
    let mut records = Vec::with_capacity(series.bars.len() + series.rolls.len());
    let mut rolls = series.rolls.iter().peekable();
    for bar in &series.bars {
        while let Some(roll) = rolls.next_if(|r| r.boundary <= bar.time_key()) {
            records.push(ArtifactRecord::Roll(roll.clone()));
        }
        records.push(ArtifactRecord::Bar(bar.clone()));
    }
    records.extend(rolls.cloned().map(ArtifactRecord::Roll));
    records
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: ScDateTime,
    pub end: ScDateTime,
}

impl TimeRange {
    pub fn new(start: ScDateTime, end: ScDateTime) -> Self {
        Self { start, end }
    }

    /// Every representable timestamp.
    pub fn all() -> Self {
        Self {
            start: ScDateTime(i64::MIN),
            end: ScDateTime(i64::MAX),
        }
    }

    pub fn contains(&self, ts: ScDateTime) -> bool {
        ts >= self.start && ts < self.end
    }

    fn admits(&self, record: &ArtifactRecord) -> bool {
        record.ts().is_some_and(|ts| self.contains(ts))
    }
}

/// Persistence boundary for finished artifacts.
///
/// Writes are append-only and each batch must be ordered by time. Adapters
/// are shared across symbol pipelines running on separate threads.
pub trait StoreAdapter: Send + Sync {
    fn write(&self, symbol: &str, kind: ArtifactKind, records: &[ArtifactRecord]) -> Result<()>;

    fn read_range(&self, symbol: &str, kind: ArtifactKind, range: TimeRange) -> Result<Vec<ArtifactRecord>>;

    /// Most recently appended record, used to resume from a checkpoint.
    fn last(&self, symbol: &str, kind: ArtifactKind) -> Result<Option<ArtifactRecord>> {
        Ok(self.read_range(symbol, kind, TimeRange::all())?.pop())
    }
}

fn check_ordered(symbol: &str, kind: ArtifactKind, records: &[ArtifactRecord]) -> Result<()> {
    let mut last: Option<ScDateTime> = None;
    for (i, ts) in records.iter().enumerate().filter_map(|(i, r)| r.ts().map(|ts| (i, ts))) {
        if last.is_some_and(|prev| ts < prev) {
            return Err(Error::store(format!(
                "{symbol}/{kind}: record {i} at {ts} precedes the one before it"
            )));
        }
        last = Some(ts);
    }
    Ok(())
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: Mutex<HashMap<(String, ArtifactKind), Vec<ArtifactRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held for `(symbol, kind)`.
    pub fn len(&self, symbol: &str, kind: ArtifactKind) -> Result<usize> {
        let artifacts = self
            .artifacts
            .lock()
            .map_err(|_| Error::store("memory store lock poisoned"))?;
        Ok(artifacts
            .get(&(symbol.to_string(), kind))
            .map_or(0, Vec::len))
    }
}

impl StoreAdapter for MemoryStore {
    fn write(&self, symbol: &str, kind: ArtifactKind, records: &[ArtifactRecord]) -> Result<()> {
        check_ordered(symbol, kind, records)?;
        let mut artifacts = self
            .artifacts
            .lock()
            .map_err(|_| Error::store("memory store lock poisoned"))?;
        artifacts
            .entry((symbol.to_string(), kind))
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    fn read_range(&self, symbol: &str, kind: ArtifactKind, range: TimeRange) -> Result<Vec<ArtifactRecord>> {
        let artifacts = self
            .artifacts
            .lock()
            .map_err(|_| Error::store("memory store lock poisoned"))?;
        Ok(artifacts
            .get(&(symbol.to_string(), kind))
            .map(|records| records.iter().filter(|r| range.admits(r)).cloned().collect())
            .unwrap_or_default())
    }

    fn last(&self, symbol: &str, kind: ArtifactKind) -> Result<Option<ArtifactRecord>> {
        let artifacts = self
            .artifacts
            .lock()
            .map_err(|_| Error::store("memory store lock poisoned"))?;
        Ok(artifacts
            .get(&(symbol.to_string(), kind))
            .and_then(|records| records.last().cloned()))
    }
}

/// One append-only `<symbol>.<kind>.jsonl` file per symbol and kind.
#[derive(Debug)]
pub struct JsonLinesStore {
    root: PathBuf,
    /// Serialises appends so concurrent batches never interleave lines.
    append: Mutex<()>,
}

impl JsonLinesStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            append: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `(symbol, kind)`.
    pub fn path_for(&self, symbol: &str, kind: ArtifactKind) -> Result<PathBuf> {
        if symbol.is_empty() || symbol.contains(|c: char| c == '/' || c == '\\') || symbol.starts_with('.') {
            return Err(Error::store(format!("symbol {symbol:?} is not a valid file stem")));
        }
        Ok(self.root.join(format!("{symbol}.{}.jsonl", kind.as_str())))
    }

    /// Backing file, `None` when nothing was written yet.
    fn open(&self, symbol: &str, kind: ArtifactKind) -> Result<Option<File>> {
        match File::open(self.path_for(symbol, kind)?) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl StoreAdapter for JsonLinesStore {
    fn write(&self, symbol: &str, kind: ArtifactKind, records: &[ArtifactRecord]) -> Result<()> {
        check_ordered(symbol, kind, records)?;
        let path = self.path_for(symbol, kind)?;
        let _guard = self
            .append
            .lock()
            .map_err(|_| Error::store("jsonl store lock poisoned"))?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        debug!(path = %path.display(), records = records.len(), "appended");
        Ok(())
    }

    fn read_range(&self, symbol: &str, kind: ArtifactKind, range: TimeRange) -> Result<Vec<ArtifactRecord>> {
        let Some(file) = self.open(symbol, kind)? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ArtifactRecord = serde_json::from_str(&line)?;
            if range.admits(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn last(&self, symbol: &str, kind: ArtifactKind) -> Result<Option<ArtifactRecord>> {
        let Some(file) = self.open(symbol, kind)? else {
            return Ok(None);
        };

        let mut last: Option<String> = None;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                last = Some(line);
            }
        }
        last.map(|line| serde_json::from_str(&line).map_err(Error::from))
            .transpose()
    }
}
