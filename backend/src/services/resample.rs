//! Time-base resampling service.
//!
//! This module aligns one instrument's series onto another instrument's
//! timestamps. The output always has exactly the target's timestamps; a target
//! timestamp with no qualifying source sample gets NaN rather than an
//! extrapolated value.
//!
//! ## Edge cases
//! - Empty target: empty output
//! - Empty source: all-NaN output plus a warning
//! - Unordered target or source timestamps: `InvalidInput`

use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::series::{check_ordered, ResampledSeries, TimeSeries};

/// How source samples are selected for each target timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ResampleMethod {
    /// Nearest source sample in time. Ties pick the earlier sample. With a
    /// tolerance, targets further than `tolerance` seconds from every source
    /// sample map to NaN.
    Nearest { tolerance: Option<f64> },
    /// Mean of finite source values strictly between this target timestamp
    /// and the next one. The last target reuses the previous spacing.
    NextInterval,
    /// Mean of finite source values within `half_width` seconds of the target.
    Window { half_width: f64 },
}

impl Default for ResampleMethod {
    fn default() -> Self {
        ResampleMethod::Nearest { tolerance: None }
    }
}

/// Resample `source` onto `target` timestamps.
///
/// # Arguments
/// * `source` - Series providing the values
/// * `target` - Timestamps of the output, non-decreasing
/// * `method` - Sample selection rule
///
/// # Returns
/// A [`ResampledSeries`] with `len() == target.len()`; inputs are not modified.
pub fn resample(
    source: &TimeSeries,
    target: &[f64],
    method: ResampleMethod,
) -> PipelineResult<ResampledSeries> {
    let ctx = || ErrorContext::new("resample");
    check_ordered(target).map_err(|e| e.with_context(ctx().with_details("target timestamps")))?;
    validate_method(method).map_err(|e| e.with_context(ctx()))?;

    if target.is_empty() {
        return Ok(ResampledSeries {
            times: Vec::new(),
            values: Vec::new(),
            unmatched: 0,
        });
    }

    if source.is_empty() {
        log::warn!(
            "Resampling an empty source onto {} target timestamps; output is all invalid",
            target.len()
        );
        return Ok(ResampledSeries {
            times: target.to_vec(),
            values: vec![f64::NAN; target.len()],
            unmatched: target.len(),
        });
    }

    let values: Vec<f64> = match method {
        ResampleMethod::Nearest { tolerance } => target
            .iter()
            .map(|&t| nearest_value(source, t, tolerance))
            .collect(),
        ResampleMethod::NextInterval => (0..target.len())
            .map(|i| match interval_after(target, i) {
                Some((lo, hi)) => mean_strictly_between(source, lo, hi),
                None => f64::NAN,
            })
            .collect(),
        ResampleMethod::Window { half_width } => target
            .iter()
            .map(|&t| mean_within(source, t - half_width, t + half_width))
            .collect(),
    };

    let unmatched = values.iter().filter(|v| v.is_nan()).count();
    Ok(ResampledSeries {
        times: target.to_vec(),
        values,
        unmatched,
    })
}

fn validate_method(method: ResampleMethod) -> PipelineResult<()> {
    match method {
        ResampleMethod::Nearest {
            tolerance: Some(tol),
        } if !(tol.is_finite() && tol >= 0.0) => Err(PipelineError::invalid(format!(
            "nearest tolerance must be a non-negative number, got {}",
            tol
        ))),
        ResampleMethod::Window { half_width } if !(half_width.is_finite() && half_width >= 0.0) => {
            Err(PipelineError::invalid(format!(
                "window half width must be a non-negative number, got {}",
                half_width
            )))
        }
        _ => Ok(()),
    }
}

fn nearest_value(source: &TimeSeries, t: f64, tolerance: Option<f64>) -> f64 {
    let times = source.times();
    let idx = times.partition_point(|&s| s < t);

    let best = match (idx.checked_sub(1), times.get(idx)) {
        (Some(before), Some(&after_t)) => {
            if t - times[before] <= after_t - t {
                before
            } else {
                idx
            }
        }
        (Some(before), None) => before,
        (None, Some(_)) => idx,
        (None, None) => return f64::NAN,
    };

    match tolerance {
        Some(tol) if (times[best] - t).abs() > tol => f64::NAN,
        _ => source.values()[best],
    }
}

/// Open interval following target `i`.
fn interval_after(target: &[f64], i: usize) -> Option<(f64, f64)> {
    if let Some(&next) = target.get(i + 1) {
        return Some((target[i], next));
    }
    let prev = target.get(i.checked_sub(1)?)?;
    let last = target[i];
    Some((last, last + (last - prev)))
}

fn mean_strictly_between(source: &TimeSeries, lo: f64, hi: f64) -> f64 {
    let times = source.times();
    let start = times.partition_point(|&s| s <= lo);
    let end = times.partition_point(|&s| s < hi).max(start);
    mean_finite(&source.values()[start..end])
}

fn mean_within(source: &TimeSeries, lo: f64, hi: f64) -> f64 {
    let times = source.times();
    let start = times.partition_point(|&s| s < lo);
    let end = times.partition_point(|&s| s <= hi).max(start);
    mean_finite(&source.values()[start..end])
}

fn mean_finite(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}
