//! Angular occurrence records: bins, encounters and trajectory samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Map any finite angle into [0, 360).
pub fn normalize_degrees(value: f64) -> f64 {
    let wrapped = value.rem_euclid(360.0);
    // rem_euclid of a tiny negative rounds up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Occurrence fraction with one pseudo-count in the denominator.
///
/// Never clamped: when the two counts come from streams with different
/// cadences the result can exceed 1.
pub fn occurrence_fraction(ham_count: u64, all_count: u64) -> f64 {
    ham_count as f64 / (1.0 + all_count as f64)
}

/// One detection-aggregation bin between two Carrington longitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularBin {
    pub start_lon: qtty::Degrees,
    pub end_lon: qtty::Degrees,
    pub ham_count: u64,
    pub all_count: u64,
    pub ham_frac: f64,
}

impl AngularBin {
    /// Build a bin, normalizing longitudes into [0, 360) and computing `ham_frac`.
    pub fn new(start_lon: f64, end_lon: f64, ham_count: u64, all_count: u64) -> Self {
        Self {
            start_lon: qtty::Degrees::new(normalize_degrees(start_lon)),
            end_lon: qtty::Degrees::new(normalize_degrees(end_lon)),
            ham_count,
            all_count,
            ham_frac: occurrence_fraction(ham_count, all_count),
        }
    }
}

/// A trajectory sample: epoch seconds and Carrington longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub time: f64,
    pub carrington_lon: qtty::Degrees,
}

impl TrajectorySample {
    pub fn new(time: f64, carrington_lon: f64) -> Self {
        Self {
            time,
            carrington_lon: qtty::Degrees::new(carrington_lon),
        }
    }
}

/// One perihelion pass with its ordered bins.
///
/// Bins follow temporal aggregation order; they are not guaranteed to be
/// angularly monotonic near the window edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: String,
    pub perihelion: DateTime<Utc>,
    pub perihelion_lon: qtty::Degrees,
    pub n_detections: u64,
    pub bins: Vec<AngularBin>,
}

/// Conventional identifier for the n-th encounter, e.g. `E04`.
pub fn encounter_id(number: u32) -> String {
    format!("E{:02}", number)
}
