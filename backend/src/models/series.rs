//! Time series containers shared by every service.
//!
//! 2D grids (histogram counts, pitch-angle slices) are `ndarray::Array2<f64>`.
//!
//! The invalid sentinel throughout the crate is `f64::NAN`. Containers never
//! mask on their own; each consumer decides which entries it treats as valid.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PipelineError, PipelineResult};

/// An ordered sequence of epoch-second timestamps paired positionally with values.
///
/// Only constructible through [`TimeSeries::new`], so it is `Serialize` but not
/// `Deserialize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series, checking `len(times) == len(values)` and that the
    /// timestamps are non-decreasing.
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> PipelineResult<Self> {
        if times.len() != values.len() {
            return Err(PipelineError::invalid(format!(
                "times has {} samples but values has {}",
                times.len(),
                values.len()
            ))
            .with_context(ErrorContext::new("TimeSeries::new")));
        }
        check_ordered(&times).map_err(|e| e.with_context(ErrorContext::new("TimeSeries::new")))?;
        Ok(Self { times, values })
    }

    pub fn empty() -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// First and last timestamp, if any.
    pub fn span(&self) -> Option<(f64, f64)> {
        match (self.times.first(), self.times.last()) {
            (Some(&a), Some(&b)) => Some((a, b)),
            _ => None,
        }
    }

    /// Number of finite values.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    /// Samples with `start <= t < end`, preserving order.
    pub fn slice_time(&self, start: f64, end: f64) -> TimeSeries {
        let lo = self.times.partition_point(|&t| t < start);
        let hi = self.times.partition_point(|&t| t < end);
        let hi = hi.max(lo);
        TimeSeries {
            times: self.times[lo..hi].to_vec(),
            values: self.values[lo..hi].to_vec(),
        }
    }
}

/// Fails unless `times` is non-finite-free and non-decreasing.
pub fn check_ordered(times: &[f64]) -> PipelineResult<()> {
    if let Some(i) = times.iter().position(|t| !t.is_finite()) {
        return Err(PipelineError::invalid(format!(
            "timestamp at index {} is not finite",
            i
        )));
    }
    if let Some(i) = times.windows(2).position(|w| w[1] < w[0]) {
        return Err(PipelineError::invalid(format!(
            "timestamps decrease at index {} ({} -> {})",
            i + 1,
            times[i],
            times[i + 1]
        )));
    }
    Ok(())
}

/// A series whose timestamps are exactly a target's timestamps, with values
/// looked up from a source series. Entries without a qualifying source sample
/// are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledSeries {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
    /// Target entries that received no source sample.
    pub unmatched: usize,
}

impl ResampledSeries {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
