//! Service layer: the numerical pipeline.
//!
//! Services take immutable inputs and return new outputs. They never touch
//! the filesystem; reading sources and writing the bin cache is left to
//! [`crate::db`].

pub mod aggregation;
pub mod angular;
pub mod centroid;
pub mod derived;
pub mod histogram;
pub mod resample;
pub mod validation;

pub use aggregation::{aggregate_encounter, AggregationConfig, MAX_ENCOUNTER_BINS};
pub use angular::{
    backward_runs, bar_center, bin_geometry, classify, degrees_from_reference, encounter_geometry,
    wrap_delta, BackwardRuns, BinGeometry, Direction,
};
pub use centroid::{histogram_centroid, weighted_centroid, Centroid};
pub use derived::{
    align_to, field_magnitude, wave_power_products, DerivedProducts, DerivedRun, SkippedProduct,
    WavePowerProduct,
};
pub use histogram::{
    build_log_histogram, build_multi_resolution, HistogramConfig, HistogramStatus, LogHistogram2D,
    Normalization, DEFAULT_TAUS_S, MAX_TIME_BINS,
};
pub use resample::{resample, ResampleMethod};
pub use validation::{validate_encounter, Anomaly, ValidationReport};
