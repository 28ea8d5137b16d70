//! Multi-resolution log-histogram engine.
//!
//! Bins a strictly-positive value stream (wave power, energy density) into a
//! 2D (time, log10 value) histogram for each requested window width `tau`.
//!
//! ## Masking
//! - Non-positive or non-finite values are invalid after `log10`; they are
//!   counted per time bin in `masked` instead of being binned
//! - Finite log values outside `[log_min, log_max]` are counted in `clipped`
//! - A histogram with no binned sample at all is flagged
//!   [`HistogramStatus::NoValidSamples`] and every cell is NaN
//!
//! Each `tau` is computed independently of the others. A `tau` so small that
//! the series would span more than [`MAX_TIME_BINS`] time bins is rejected.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::axis::{self, AxisMeta};
use crate::models::series::TimeSeries;

/// Window widths used for wave-power products: 30 s, 2 min, 20 min, 90 min, 4 h, 12 h.
pub const DEFAULT_TAUS_S: [f64; 6] = [30.0, 120.0, 1200.0, 5400.0, 14400.0, 43200.0];

/// Upper bound on time bins per histogram.
pub const MAX_TIME_BINS: usize = 10_000_000;

/// Whether cells hold raw counts or a density.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    #[default]
    Counts,
    /// Each row integrates to 1 over the log-value axis.
    RowDensity,
    /// The whole histogram integrates to 1 over time and log-value.
    TotalDensity,
}

/// Fixed log-value binning shared by every `tau`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    #[serde(default = "default_log_min")]
    pub log_min: f64,
    #[serde(default = "default_log_max")]
    pub log_max: f64,
    #[serde(default = "default_n_value_bins")]
    pub n_value_bins: usize,
    #[serde(default)]
    pub normalization: Normalization,
}

fn default_log_min() -> f64 {
    -3.0
}

fn default_log_max() -> f64 {
    3.0
}

fn default_n_value_bins() -> usize {
    60
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            log_min: default_log_min(),
            log_max: default_log_max(),
            n_value_bins: default_n_value_bins(),
            normalization: Normalization::default(),
        }
    }
}

impl HistogramConfig {
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Width of one log-value bin.
    pub fn value_bin_width(&self) -> f64 {
        (self.log_max - self.log_min) / self.n_value_bins as f64
    }

    fn validate(&self) -> PipelineResult<()> {
        if !(self.log_min.is_finite() && self.log_max.is_finite() && self.log_max > self.log_min) {
            return Err(PipelineError::invalid(format!(
                "log range [{}, {}] is empty",
                self.log_min, self.log_max
            )));
        }
        if self.n_value_bins == 0 {
            return Err(PipelineError::invalid("n_value_bins must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramStatus {
    Ok,
    NoValidSamples,
}

/// Counts or densities indexed by (time bin, log10 value bin).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogHistogram2D {
    pub tau: qtty::Seconds,
    /// `n_time_bins + 1` epoch-second edges, strictly increasing.
    pub time_edges: Vec<f64>,
    /// `n_value_bins + 1` log10 edges, strictly increasing.
    pub value_edges: Vec<f64>,
    pub counts: Array2<f64>,
    pub normalization: Normalization,
    /// Invalid inputs per time bin.
    pub masked: Vec<u64>,
    /// Out-of-range inputs per time bin.
    pub clipped: Vec<u64>,
    pub status: HistogramStatus,
}

impl LogHistogram2D {
    pub fn n_time_bins(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_value_bins(&self) -> usize {
        self.counts.ncols()
    }

    pub fn is_all_invalid(&self) -> bool {
        self.status == HistogramStatus::NoValidSamples
    }

    /// Log10 bin centers.
    pub fn value_centers(&self) -> Vec<f64> {
        self.value_edges
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect()
    }

    /// Physical value at each bin center (`10^center`).
    pub fn value_axis(&self) -> Vec<f64> {
        self.value_centers().iter().map(|c| 10f64.powf(*c)).collect()
    }

    pub fn time_axis_meta(&self) -> AxisMeta {
        axis::time_axis(&self.time_edges)
    }

    pub fn value_axis_meta(&self, quantity: &str, unit: &str) -> AxisMeta {
        axis::log_value_axis(quantity, unit, &self.value_edges)
    }
}

/// Build one log histogram for window width `tau` (seconds).
///
/// # Arguments
/// * `series` - Values to bin; non-positive entries are masked
/// * `tau` - Time bin width in seconds, positive and coarse enough to give at
///   most [`MAX_TIME_BINS`] time bins
/// * `cfg` - Log range, value bin count and normalization
///
/// # Returns
/// A histogram whose time axis starts at the first timestamp. An empty
/// series or a series without any valid in-range value yields an all-invalid
/// histogram rather than an error.
pub fn build_log_histogram(
    series: &TimeSeries,
    tau: f64,
    cfg: &HistogramConfig,
) -> PipelineResult<LogHistogram2D> {
    let ctx = || ErrorContext::new("build_log_histogram");
    cfg.validate().map_err(|e| e.with_context(ctx()))?;
    if !(tau.is_finite() && tau > 0.0) {
        return Err(PipelineError::invalid(format!("tau must be positive, got {}", tau))
            .with_context(ctx()));
    }

    let value_edges = log_value_edges(cfg);
    let dv = cfg.value_bin_width();
    let n_value = cfg.n_value_bins;

    let Some((t0, t_last)) = series.span() else {
        return Ok(LogHistogram2D {
            tau: qtty::Seconds::new(tau),
            time_edges: Vec::new(),
            value_edges,
            counts: Array2::zeros((0, n_value)),
            normalization: cfg.normalization,
            masked: Vec::new(),
            clipped: Vec::new(),
            status: HistogramStatus::NoValidSamples,
        });
    };

    let span_bins = ((t_last - t0) / tau).ceil();
    if span_bins > MAX_TIME_BINS as f64 {
        return Err(PipelineError::invalid(format!(
            "tau={}s gives {:e} time bins over {}s, limit is {}",
            tau,
            span_bins,
            t_last - t0,
            MAX_TIME_BINS
        ))
        .with_context(ctx()));
    }
    let n_time = (span_bins as usize).max(1);
    let time_edges: Vec<f64> = (0..=n_time).map(|k| t0 + k as f64 * tau).collect();

    let mut counts = Array2::<f64>::zeros((n_time, n_value));
    let mut masked = vec![0u64; n_time];
    let mut clipped = vec![0u64; n_time];
    let mut binned = 0u64;

    for (&t, &v) in series.times().iter().zip(series.values()) {
        let row = (((t - t0) / tau).floor() as usize).min(n_time - 1);

        let log_v = if v > 0.0 && v.is_finite() {
            v.log10()
        } else {
            f64::NAN
        };
        if !log_v.is_finite() {
            masked[row] += 1;
            continue;
        }
        if log_v < cfg.log_min || log_v > cfg.log_max {
            clipped[row] += 1;
            continue;
        }

        let col = (((log_v - cfg.log_min) / dv).floor() as usize).min(n_value - 1);
        counts[[row, col]] += 1.0;
        binned += 1;
    }

    let status = if binned == 0 {
        counts.fill(f64::NAN);
        HistogramStatus::NoValidSamples
    } else {
        normalize(&mut counts, cfg.normalization, binned as f64, tau, dv);
        HistogramStatus::Ok
    };

    Ok(LogHistogram2D {
        tau: qtty::Seconds::new(tau),
        time_edges,
        value_edges,
        counts,
        normalization: cfg.normalization,
        masked,
        clipped,
        status,
    })
}

/// Build one histogram per `tau`.
///
/// A `tau` that cannot be used is skipped with a warning; the remaining
/// widths are unaffected. Output order follows `taus`.
pub fn build_multi_resolution(
    series: &TimeSeries,
    taus: &[f64],
    cfg: &HistogramConfig,
) -> Vec<LogHistogram2D> {
    taus.iter()
        .filter_map(|&tau| match build_log_histogram(series, tau, cfg) {
            Ok(h) => Some(h),
            Err(e) => {
                log::warn!("Skipping histogram for tau={}s: {}", tau, e);
                None
            }
        })
        .collect()
}

fn log_value_edges(cfg: &HistogramConfig) -> Vec<f64> {
    let dv = cfg.value_bin_width();
    let mut edges: Vec<f64> = (0..=cfg.n_value_bins)
        .map(|j| cfg.log_min + j as f64 * dv)
        .collect();
    if let Some(last) = edges.last_mut() {
        *last = cfg.log_max;
    }
    edges
}

fn normalize(
    counts: &mut Array2<f64>,
    normalization: Normalization,
    total: f64,
    tau: f64,
    dv: f64,
) {
    match normalization {
        Normalization::Counts => {}
        Normalization::RowDensity => {
            for mut row in counts.axis_iter_mut(Axis(0)) {
                let row_total = row.sum();
                // empty rows stay zero, never NaN
                if row_total > 0.0 {
                    let scale = row_total * dv;
                    row.mapv_inplace(|c| c / scale);
                }
            }
        }
        Normalization::TotalDensity => {
            let scale = total * tau * dv;
            counts.mapv_inplace(|c| c / scale);
        }
    }
}

#[cfg(test)]
#[path = "histogram_tests.rs"]
mod histogram_tests;
