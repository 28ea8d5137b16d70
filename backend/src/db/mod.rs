//! Data access layer.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  services (resample, histogram, aggregation) │
//! └───────────────┬──────────────────────────────┘
//!                 │ reads                ▲ writes once per encounter
//! ┌───────────────▼──────────────┐ ┌─────┴──────────────────────┐
//! │  sources: VariableSource,    │ │  cache: BinCache (JSON)    │
//! │  TrajectorySource,           │ └────────────────────────────┘
//! │  DetectionSource             │
//! └──────────────────────────────┘
//! ```
//!
//! - `sources`: traits implemented by upstream loaders, plus [`LocalSource`]
//! - `cache`: the write-once bin cache and its tolerance comparison
//! - `batch`: per-encounter aggregate, validate, then cache or verify

pub mod batch;
pub mod cache;
pub mod sources;

pub use batch::{
    process_encounter, run_batch, BatchSummary, CacheMode, EncounterInput, EncounterOutcome,
    InputBundle,
};
pub use cache::{
    compare_bins, BinCache, CacheDiscrepancy, CacheError, CacheResult, CachedEncounter,
    DEFAULT_TOLERANCE,
};
pub use sources::{DetectionSource, LocalSource, TrajectorySource, VariableSource};
