//! Circular angular binning on Carrington longitude.
//!
//! Converts (start, end) longitude pairs of detection-aggregation bins into
//! wrap-corrected signed travel, forward/backward classification, seam-safe
//! bar centers and signed offsets from the perihelion longitude.
//!
//! ## Preconditions
//! - No single bin spans more than half the circle. The 180° wrap threshold
//!   cannot tell a 190° forward step from a 170° backward one, and no attempt
//!   is made to guard against it.

use serde::{Deserialize, Serialize};

use crate::models::angular::{normalize_degrees, AngularBin};

/// Direction of travel across one bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

/// Display geometry of one bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinGeometry {
    /// Signed travel in (-180, 180].
    pub delta: f64,
    pub direction: Direction,
    /// Bar center in [0, 360).
    pub center: f64,
    /// Start, end and center as signed degrees from perihelion, in [-180, 180).
    pub start_rel: f64,
    pub end_rel: f64,
    pub center_rel: f64,
}

/// Signed angular travel from `start` to `end`, in (-180, 180].
pub fn wrap_delta(start: f64, end: f64) -> f64 {
    let delta = normalize_degrees(end) - normalize_degrees(start);
    if delta > 180.0 {
        delta - 360.0
    } else if delta <= -180.0 {
        delta + 360.0
    } else {
        delta
    }
}

pub fn classify(delta: f64) -> Direction {
    if delta > 0.0 {
        Direction::Forward
    } else {
        Direction::Backward
    }
}

/// Midpoint of a bin that never jumps across the 0°/360° seam.
///
/// When the raw pair is more than 180° apart the midpoint is taken along the
/// wrapped pair, so `bar_center(340, 10)` is 355 rather than 175.
pub fn bar_center(start: f64, end: f64) -> f64 {
    let start = normalize_degrees(start);
    let end = normalize_degrees(end);
    if (end - start).abs() > 180.0 {
        normalize_degrees(start + wrap_delta(start, end) / 2.0)
    } else {
        (start + end) / 2.0
    }
}

/// `((value - reference + 180) mod 360) - 180`, in [-180, 180).
pub fn degrees_from_reference(value: f64, reference: f64) -> f64 {
    (value - reference + 180.0).rem_euclid(360.0) - 180.0
}

pub fn bin_geometry(start: f64, end: f64, perihelion_lon: f64) -> BinGeometry {
    let delta = wrap_delta(start, end);
    let center = bar_center(start, end);
    BinGeometry {
        delta,
        direction: classify(delta),
        center,
        start_rel: degrees_from_reference(start, perihelion_lon),
        end_rel: degrees_from_reference(end, perihelion_lon),
        center_rel: degrees_from_reference(center, perihelion_lon),
    }
}

/// Geometry of every bin of an encounter, in bin order.
pub fn encounter_geometry(bins: &[AngularBin], perihelion_lon: f64) -> Vec<BinGeometry> {
    bins.iter()
        .map(|b| bin_geometry(b.start_lon.value(), b.end_lon.value(), perihelion_lon))
        .collect()
}

/// Where the backward bins of a bin sequence sit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackwardRuns {
    /// Consecutive backward bins starting at index 0.
    pub leading: usize,
    /// Consecutive backward bins ending at the last index, not overlapping `leading`.
    pub trailing: usize,
    /// Backward bins strictly inside the sequence.
    pub interior: Vec<usize>,
}

impl BackwardRuns {
    pub fn total(&self) -> usize {
        self.leading + self.trailing + self.interior.len()
    }

    /// True when every backward bin is part of an edge run.
    pub fn is_edge_concentrated(&self) -> bool {
        self.interior.is_empty()
    }
}

/// Locate backward runs in a sequence of directions.
///
/// Edge runs are expected artifacts of the aggregation window boundary;
/// anything in `interior` needs investigation.
pub fn backward_runs(directions: &[Direction]) -> BackwardRuns {
    let n = directions.len();
    let leading = directions
        .iter()
        .take_while(|d| **d == Direction::Backward)
        .count();
    let trailing = if leading == n {
        0
    } else {
        directions
            .iter()
            .rev()
            .take_while(|d| **d == Direction::Backward)
            .count()
    };

    let interior = (leading..n - trailing)
        .filter(|&i| directions[i] == Direction::Backward)
        .collect();

    BackwardRuns {
        leading,
        trailing,
        interior,
    }
}
