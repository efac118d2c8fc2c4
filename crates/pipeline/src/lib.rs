//! Streaming pipeline and persistence for the contango workspace.
//!
//! This crate handles:
//! - The Store Adapter contract with in-memory and JSON-lines adapters
//! - Per-symbol decode → aggregate/profile → persist pipelines
//! - Parallel multi-symbol runs and the roll/spread stage
//! - Tracing subscriber initialisation

pub mod pipeline;
pub mod runner;
pub mod store;
pub mod telemetry;

pub use pipeline::{CancellationToken, PipelineReport, SymbolPipeline, SymbolSource};
pub use runner::{load_contract, run_symbols, spread_and_store, stitch_and_store};
pub use store::{
    series_records, ArtifactKind, ArtifactRecord, JsonLinesStore, MemoryStore, StoreAdapter,
    TimeRange,
};
