//! Encounter batch: aggregate each encounter of an input bundle, validate it,
//! then insert it into or check it against the bin cache.
//!
//! One encounter failing never stops the others. Encounters with interior
//! backward bins are reported and left out of the cache, so a known anomalous
//! result never becomes the reference for later runs.

use serde::Deserialize;

use crate::config::PipelineConfig;
use crate::db::cache::{compare_bins, BinCache, CacheDiscrepancy, CachedEncounter};
use crate::db::sources::{DetectionSource, LocalSource, TrajectorySource};
use crate::error::{ErrorContext, PipelineResult};
use crate::models::angular::{Encounter, TrajectorySample};
use crate::models::time::{parse_iso8601, Epoch};
use crate::services::aggregation::aggregate_encounter;
use crate::services::validation::validate_encounter;

/// `{"encounters": [...]}` as read by `hh-cache`.
#[derive(Debug, Clone, Deserialize)]
pub struct InputBundle {
    pub encounters: Vec<EncounterInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncounterInput {
    pub id: String,
    /// ISO 8601 perihelion time.
    pub perihelion: String,
    /// `[epoch_seconds, carrington_lon_deg]` pairs.
    pub trajectory: Vec<[f64; 2]>,
    pub detections: Vec<f64>,
}

impl EncounterInput {
    pub fn source(&self) -> PipelineResult<LocalSource> {
        let trajectory = self
            .trajectory
            .iter()
            .map(|[t, lon]| TrajectorySample::new(*t, *lon))
            .collect();
        LocalSource::new()
            .with_trajectory(trajectory)?
            .with_detections(self.detections.clone())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Insert encounters that are not cached yet.
    #[default]
    Populate,
    /// Never write; uncached encounters are only reported.
    VerifyOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EncounterOutcome {
    /// Newly inserted into the cache.
    Inserted,
    /// Agrees with its cached entry.
    Matched,
    /// Verify-only run and no cached entry exists.
    NotCached,
    Mismatched {
        discrepancies: Vec<CacheDiscrepancy>,
        /// `(fresh, cached)` when the detection totals differ.
        n_detections: Option<(u64, u64)>,
    },
    /// Interior backward bins; never cached.
    Malformed { interior_backward: Vec<usize> },
}

impl EncounterOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Mismatched { .. } | Self::Malformed { .. })
    }
}

/// Aggregate, validate, then cache or verify one encounter.
///
/// # Errors
/// Unparseable perihelion, unordered streams, no trajectory coverage inside
/// the window, or an aggregation config that cannot be used.
pub fn process_encounter(
    input: &EncounterInput,
    cache: &mut BinCache,
    config: &PipelineConfig,
    mode: CacheMode,
) -> PipelineResult<EncounterOutcome> {
    let ctx = || {
        ErrorContext::new("process_encounter").with_details(format!("encounter={}", input.id))
    };
    let perihelion = parse_iso8601(&input.perihelion).map_err(|e| e.with_context(ctx()))?;
    let source = input.source().map_err(|e| e.with_context(ctx()))?;

    let peri = Epoch::from_datetime(perihelion).value();
    let half = config.encounter.half_window_s;
    let trajectory = source.trajectory(peri - half, peri + half)?;
    let detections = source.detections(peri - half, peri + half)?;

    let encounter = aggregate_encounter(
        &input.id,
        perihelion,
        &trajectory,
        &detections,
        None,
        &config.encounter,
    )?;

    let report = validate_encounter(&encounter);
    if !report.is_well_formed() {
        let interior_backward: Vec<usize> = report.interior_backward().collect();
        log::error!(
            "Encounter {}: interior backward bins at {:?}",
            encounter.id,
            interior_backward
        );
        return Ok(EncounterOutcome::Malformed { interior_backward });
    }

    if let Some(cached) = cache.get(&encounter.id) {
        return Ok(verify(&encounter, cached, config.cache.tolerance));
    }
    if mode == CacheMode::VerifyOnly {
        log::warn!("Encounter {}: not cached, nothing to verify", encounter.id);
        return Ok(EncounterOutcome::NotCached);
    }
    let entry = CachedEncounter::from_encounter(&encounter, encounter.n_detections);
    cache.insert(encounter.id.clone(), entry)?;
    log::info!("Encounter {}: cached {} bins", encounter.id, encounter.bins.len());
    Ok(EncounterOutcome::Inserted)
}

fn verify(encounter: &Encounter, cached: &CachedEncounter, tolerance: f64) -> EncounterOutcome {
    let discrepancies = compare_bins(&encounter.bins, &cached.bins, tolerance);
    for d in &discrepancies {
        log::warn!("Encounter {}: {:?}", encounter.id, d);
    }
    let n_detections = (cached.n_detections != encounter.n_detections)
        .then_some((encounter.n_detections, cached.n_detections));
    if let Some((fresh, cached)) = n_detections {
        log::warn!(
            "Encounter {}: n_detections {} vs cached {}",
            encounter.id,
            fresh,
            cached
        );
    }

    if discrepancies.is_empty() && n_detections.is_none() {
        log::info!("Encounter {}: matches cache", encounter.id);
        EncounterOutcome::Matched
    } else {
        EncounterOutcome::Mismatched {
            discrepancies,
            n_detections,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub inserted: usize,
    pub matched: usize,
    pub not_cached: usize,
    /// `(encounter id, reason)` for every encounter that errored, disagreed
    /// with the cache or was malformed.
    pub failures: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Process every encounter of `bundle`, in order.
///
/// The cache is only modified in memory; saving it is left to the caller.
pub fn run_batch(
    bundle: &InputBundle,
    cache: &mut BinCache,
    config: &PipelineConfig,
    mode: CacheMode,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for input in &bundle.encounters {
        match process_encounter(input, cache, config, mode) {
            Ok(EncounterOutcome::Inserted) => summary.inserted += 1,
            Ok(EncounterOutcome::Matched) => summary.matched += 1,
            Ok(EncounterOutcome::NotCached) => summary.not_cached += 1,
            Ok(outcome) => summary
                .failures
                .push((input.id.clone(), format!("{:?}", outcome))),
            Err(e) => {
                log::error!("Encounter {}: {}", input.id, e);
                summary.failures.push((input.id.clone(), e.to_string()));
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregation::AggregationConfig;

    const PERIHELION: &str = "2020-01-29T09:37:00Z";

    fn config() -> PipelineConfig {
        PipelineConfig {
            encounter: AggregationConfig {
                half_window_s: 6.0 * 3600.0,
                bin_width_s: 3600.0,
            },
            ..PipelineConfig::default()
        }
    }

    fn peri() -> f64 {
        parse_iso8601(PERIHELION)
            .map(|dt| Epoch::from_datetime(dt).value())
            .unwrap()
    }

    /// 5-minute samples over the 12 hour window, 1.5 degrees per hour.
    fn encounter(id: &str, lon0: f64) -> EncounterInput {
        let start = peri() - 6.0 * 3600.0;
        EncounterInput {
            id: id.to_string(),
            perihelion: PERIHELION.to_string(),
            trajectory: (0..=144)
                .map(|i| {
                    let dt = i as f64 * 300.0;
                    [start + dt, lon0 + 1.5 * dt / 3600.0]
                })
                .collect(),
            detections: (0..30).map(|i| peri() + i as f64 * 60.0).collect(),
        }
    }

    fn outside_window(id: &str) -> EncounterInput {
        EncounterInput {
            trajectory: vec![[0.0, 1.0], [300.0, 2.0]],
            ..encounter(id, 0.0)
        }
    }

    #[test]
    fn test_bad_encounter_does_not_stop_the_batch() {
        let bundle = InputBundle {
            encounters: vec![
                encounter("E04", 80.0),
                outside_window("E05"),
                encounter("E06", 200.0),
            ],
        };
        let mut cache = BinCache::new();
        let summary = run_batch(&bundle, &mut cache, &config(), CacheMode::Populate);

        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "E05");
        assert!(summary.failures[0].1.contains("Missing input"));
        assert!(cache.contains("E04"));
        assert!(cache.contains("E06"));
        assert!(!cache.contains("E05"));
    }

    #[test]
    fn test_second_run_matches_cache() {
        let bundle = InputBundle {
            encounters: vec![encounter("E04", 80.0)],
        };
        let mut cache = BinCache::new();
        run_batch(&bundle, &mut cache, &config(), CacheMode::Populate);
        let summary = run_batch(&bundle, &mut cache, &config(), CacheMode::Populate);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.inserted, 0);
        assert!(summary.is_success());
    }

    #[test]
    fn test_shifted_recomputation_is_mismatch() {
        let mut cache = BinCache::new();
        let cfg = config();
        process_encounter(&encounter("E04", 80.0), &mut cache, &cfg, CacheMode::Populate).unwrap();
        let outcome =
            process_encounter(&encounter("E04", 81.0), &mut cache, &cfg, CacheMode::Populate)
                .unwrap();
        assert!(outcome.is_failure());
        assert!(matches!(
            outcome,
            EncounterOutcome::Mismatched { n_detections: None, .. }
        ));
    }

    #[test]
    fn test_verify_only_never_writes() {
        let bundle = InputBundle {
            encounters: vec![encounter("E04", 80.0)],
        };
        let mut cache = BinCache::new();
        let summary = run_batch(&bundle, &mut cache, &config(), CacheMode::VerifyOnly);
        assert_eq!(summary.not_cached, 1);
        assert!(summary.is_success());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_malformed_encounter_is_not_cached() {
        // the third hour runs backward, away from both window edges
        let mut input = encounter("E07", 80.0);
        for (i, sample) in input.trajectory.iter_mut().enumerate() {
            let hours = i as f64 * 300.0 / 3600.0;
            sample[1] = if (2.0..3.0).contains(&hours) {
                83.0 - 1.5 * (hours - 2.0)
            } else if hours >= 3.0 {
                81.5 + 1.5 * (hours - 3.0)
            } else {
                80.0 + 1.5 * hours
            };
        }
        let mut cache = BinCache::new();
        let outcome =
            process_encounter(&input, &mut cache, &config(), CacheMode::Populate).unwrap();
        assert_eq!(
            outcome,
            EncounterOutcome::Malformed {
                interior_backward: vec![2]
            }
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unparseable_perihelion_is_error() {
        let input = EncounterInput {
            perihelion: "not a date".to_string(),
            ..encounter("E08", 10.0)
        };
        let mut cache = BinCache::new();
        assert!(process_encounter(&input, &mut cache, &config(), CacheMode::Populate).is_err());
    }
}
