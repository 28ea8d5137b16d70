//! Masked weighted-centroid calculator.
//!
//! Reduces each row of a weight matrix to the weighted mean of a coordinate
//! axis. Used for wave-power histograms (axis = inverse-log value grid) and
//! electron pitch-angle distributions (axis = pitch-angle grid) alike.
//!
//! A weight is valid when it is finite and non-negative; an axis entry is
//! valid when it is finite. Invalid entries drop out of both the numerator and
//! the denominator. A row with zero total valid weight yields NaN.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::services::histogram::LogHistogram2D;

/// One expected value per row; NaN where the row had no valid weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub values: Vec<f64>,
}

impl Centroid {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }
}

/// Weighted mean of `axis` for every row of `weights`.
pub fn weighted_centroid(weights: &Array2<f64>, axis: &[f64]) -> PipelineResult<Centroid> {
    if weights.ncols() != axis.len() {
        return Err(PipelineError::shape(format!(
            "weight rows have {} columns but the axis has {} entries",
            weights.ncols(),
            axis.len()
        ))
        .with_context(ErrorContext::new("weighted_centroid")));
    }

    let values = weights
        .axis_iter(Axis(0))
        .map(|row| row_centroid(row, axis))
        .collect();
    Ok(Centroid { values })
}

/// Centroid of a histogram over its inverse-log value grid.
///
/// An all-invalid histogram yields an all-NaN centroid of the same length.
pub fn histogram_centroid(histogram: &LogHistogram2D) -> PipelineResult<Centroid> {
    weighted_centroid(&histogram.counts, &histogram.value_axis())
}

fn row_centroid(row: ArrayView1<f64>, axis: &[f64]) -> f64 {
    let (num, den) = row
        .iter()
        .zip(axis)
        .filter(|(w, x)| w.is_finite() && **w >= 0.0 && x.is_finite())
        .fold((0.0, 0.0), |(num, den), (w, x)| (num + w * x, den + w));

    if den > 0.0 {
        num / den
    } else {
        f64::NAN
    }
}
