//! Encounter diagnostics.
//!
//! Checks an aggregated [`Encounter`] for the anomalies an analyst would want
//! to look at before trusting a plot: backward bins away from the window
//! edges and occurrence fractions outside [0, 1].

use serde::{Deserialize, Serialize};

use crate::models::angular::Encounter;
use crate::services::angular::{backward_runs, classify, wrap_delta, BackwardRuns, Direction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Backward bin that is not part of a leading or trailing run.
    InteriorBackward { index: usize, delta: f64 },
    /// Detections on a faster clock than the reference stream.
    FractionAboveOne { index: usize, ham_frac: f64 },
    NegativeFraction { index: usize, ham_frac: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub encounter_id: String,
    pub n_bins: usize,
    pub runs: BackwardRuns,
    pub anomalies: Vec<Anomaly>,
}

impl ValidationReport {
    /// True when every backward bin sits in an edge run.
    ///
    /// Fraction anomalies are reported but do not make an encounter malformed.
    pub fn is_well_formed(&self) -> bool {
        self.runs.is_edge_concentrated()
    }

    pub fn interior_backward(&self) -> impl Iterator<Item = usize> + '_ {
        self.anomalies.iter().filter_map(|a| match a {
            Anomaly::InteriorBackward { index, .. } => Some(*index),
            _ => None,
        })
    }
}

pub fn validate_encounter(encounter: &Encounter) -> ValidationReport {
    let deltas: Vec<f64> = encounter
        .bins
        .iter()
        .map(|b| wrap_delta(b.start_lon.value(), b.end_lon.value()))
        .collect();
    let directions: Vec<Direction> = deltas.iter().map(|&d| classify(d)).collect();
    let runs = backward_runs(&directions);

    let mut anomalies: Vec<Anomaly> = runs
        .interior
        .iter()
        .map(|&index| Anomaly::InteriorBackward {
            index,
            delta: deltas[index],
        })
        .collect();

    for (index, bin) in encounter.bins.iter().enumerate() {
        if bin.ham_frac > 1.0 {
            anomalies.push(Anomaly::FractionAboveOne {
                index,
                ham_frac: bin.ham_frac,
            });
        } else if bin.ham_frac < 0.0 {
            anomalies.push(Anomaly::NegativeFraction {
                index,
                ham_frac: bin.ham_frac,
            });
        }
    }

    for anomaly in &anomalies {
        log::warn!("Encounter {}: {:?}", encounter.id, anomaly);
    }
    if runs.total() > 0 {
        log::debug!(
            "Encounter {}: backward bins leading={} trailing={} interior={}",
            encounter.id,
            runs.leading,
            runs.trailing,
            runs.interior.len()
        );
    }

    ValidationReport {
        encounter_id: encounter.id.clone(),
        n_bins: encounter.bins.len(),
        runs,
        anomalies,
    }
}
