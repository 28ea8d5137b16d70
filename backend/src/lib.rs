//! # Hammerhead Rust Backend
//!
//! Cross-cadence alignment, multi-resolution histogramming and angular
//! occurrence binning for spacecraft plasma and field time series.
//!
//! ## Features
//!
//! - **Resampling**: Align one instrument's series onto another instrument's clock
//! - **Log Histograms**: Time/log-value histograms at several window widths
//! - **Centroids**: Masked weighted means over histogram or pitch-angle axes
//! - **Angular Binning**: Wrap-safe Carrington longitude bins with backward-bin diagnostics
//! - **Bin Cache**: Write-once JSON store of aggregated encounter bins
//!
//! ## Architecture
//!
//! - [`models`]: Series, pitch-angle distributions, axes, angular bins and time conversions
//! - [`services`]: The numerical pipeline
//! - [`db`]: Upstream source traits, the bin cache and the encounter batch
//! - [`config`]: TOML configuration
//! - [`error`]: Error taxonomy
//!
//! Invalid or missing numeric values are represented by NaN throughout.

// PipelineError carries an ErrorContext for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::PipelineConfig;
pub use error::{ErrorContext, PipelineError, PipelineResult};
