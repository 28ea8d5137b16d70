//! Encounter aggregation service.
//!
//! Builds the ordered [`AngularBin`] sequence of one encounter from the
//! trajectory stream (low cadence Carrington longitudes) and the detection
//! stream (high cadence event timestamps).
//!
//! The window `perihelion ± half_window` is cut into consecutive half-open
//! bins of `bin_width` seconds. For each bin:
//! - `start_lon` / `end_lon` are the trajectory longitudes nearest the bin edges
//! - `ham_count` counts detections inside the bin
//! - `all_count` counts reference samples inside the bin (trajectory
//!   timestamps unless another reference stream is given)
//!
//! Detections and reference samples are generally on different clocks, so
//! `ham_frac` is allowed to exceed 1.
//!
//! A `bin_width_s` that would cut the window into more than
//! [`MAX_ENCOUNTER_BINS`] bins is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::angular::{AngularBin, Encounter, TrajectorySample};
use crate::models::series::{check_ordered, TimeSeries};
use crate::models::time::{Epoch, SECONDS_PER_DAY};
use crate::services::resample::{resample, ResampleMethod};

/// Upper bound on bins per encounter window.
pub const MAX_ENCOUNTER_BINS: usize = 10_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Half width of the analysis window around perihelion, seconds.
    #[serde(default = "default_half_window_s")]
    pub half_window_s: f64,
    #[serde(default = "default_bin_width_s")]
    pub bin_width_s: f64,
}

fn default_half_window_s() -> f64 {
    3.0 * SECONDS_PER_DAY
}

fn default_bin_width_s() -> f64 {
    3600.0
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            half_window_s: default_half_window_s(),
            bin_width_s: default_bin_width_s(),
        }
    }
}

impl AggregationConfig {
    fn validate(&self) -> PipelineResult<()> {
        for (name, v) in [
            ("half_window_s", self.half_window_s),
            ("bin_width_s", self.bin_width_s),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(PipelineError::invalid(format!(
                    "{} must be positive, got {}",
                    name, v
                )));
            }
        }
        let n_bins = (2.0 * self.half_window_s / self.bin_width_s).ceil();
        if n_bins > MAX_ENCOUNTER_BINS as f64 {
            return Err(PipelineError::invalid(format!(
                "bin_width_s={} gives {:e} bins, limit is {}",
                self.bin_width_s, n_bins, MAX_ENCOUNTER_BINS
            )));
        }
        Ok(())
    }
}

/// Count of sorted `times` with `start <= t < end`.
fn count_in(times: &[f64], start: f64, end: f64) -> u64 {
    let lo = times.partition_point(|&t| t < start);
    let hi = times.partition_point(|&t| t < end);
    hi.saturating_sub(lo) as u64
}

/// Aggregate one encounter.
///
/// # Arguments
/// * `id` - Encounter identifier, e.g. `E04`
/// * `perihelion` - Perihelion time
/// * `trajectory` - Trajectory samples ordered by time
/// * `detections` - Detection timestamps ordered by time
/// * `reference_times` - Stream counted into `all_count`; trajectory timestamps when `None`
/// * `cfg` - Window and bin width
///
/// # Returns
/// The encounter with bins in temporal order. Bins whose edges have no
/// trajectory sample within one bin width are dropped with a warning.
pub fn aggregate_encounter(
    id: &str,
    perihelion: DateTime<Utc>,
    trajectory: &[TrajectorySample],
    detections: &[f64],
    reference_times: Option<&[f64]>,
    cfg: &AggregationConfig,
) -> PipelineResult<Encounter> {
    let ctx = || ErrorContext::new("aggregate_encounter").with_details(format!("encounter={}", id));
    cfg.validate().map_err(|e| e.with_context(ctx()))?;

    let traj_times: Vec<f64> = trajectory.iter().map(|s| s.time).collect();
    let traj_lons: Vec<f64> = trajectory.iter().map(|s| s.carrington_lon.value()).collect();
    let traj = TimeSeries::new(traj_times, traj_lons).map_err(|e| e.with_context(ctx()))?;
    check_ordered(detections)
        .map_err(|e| e.with_context(ctx().with_variable("detections")))?;
    let reference = reference_times.unwrap_or(traj.times());
    check_ordered(reference).map_err(|e| e.with_context(ctx().with_variable("reference")))?;

    let peri = Epoch::from_datetime(perihelion).value();
    let start = peri - cfg.half_window_s;
    let end = peri + cfg.half_window_s;

    if traj.slice_time(start, end).is_empty() {
        return Err(PipelineError::missing("trajectory").with_context(
            ctx().with_details(format!("no trajectory sample in [{}, {})", start, end)),
        ));
    }

    let n_bins = ((end - start) / cfg.bin_width_s).ceil() as usize;
    let edges: Vec<f64> = (0..=n_bins)
        .map(|k| (start + k as f64 * cfg.bin_width_s).min(end))
        .collect();

    let edge_lons = resample(
        &traj,
        &edges,
        ResampleMethod::Nearest {
            tolerance: Some(cfg.bin_width_s),
        },
    )?
    .values;
    let perihelion_lon = resample(&traj, &[peri], ResampleMethod::default())?.values[0];

    let mut bins = Vec::with_capacity(n_bins);
    let mut dropped = 0usize;
    for k in 0..n_bins {
        let (lon_a, lon_b) = (edge_lons[k], edge_lons[k + 1]);
        if !(lon_a.is_finite() && lon_b.is_finite()) {
            dropped += 1;
            continue;
        }
        let (t_a, t_b) = (edges[k], edges[k + 1]);
        bins.push(AngularBin::new(
            lon_a,
            lon_b,
            count_in(detections, t_a, t_b),
            count_in(reference, t_a, t_b),
        ));
    }

    if dropped > 0 {
        log::warn!(
            "Encounter {}: dropped {} of {} bins without trajectory coverage",
            id,
            dropped,
            n_bins
        );
    }

    let n_detections = count_in(detections, start, end);
    log::info!(
        "Encounter {}: {} bins, {} detections, perihelion longitude {:.3}",
        id,
        bins.len(),
        n_detections,
        perihelion_lon
    );

    Ok(Encounter {
        id: id.to_string(),
        perihelion,
        perihelion_lon: qtty::Degrees::new(perihelion_lon),
        n_detections,
        bins,
    })
}
