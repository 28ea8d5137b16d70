//! Integration tests for encounter aggregation, validation and the bin cache.

mod support;

use hammerhead_rust::db::{
    compare_bins, run_batch, BinCache, CacheError, CacheMode, CachedEncounter, EncounterInput,
    InputBundle, DEFAULT_TOLERANCE,
};
use hammerhead_rust::services::{
    aggregate_encounter, encounter_geometry, validate_encounter, AggregationConfig, Direction,
};
use hammerhead_rust::PipelineConfig;
use support::{epoch, linear_trajectory, perihelion_e04, turnaround_trajectory};

fn twelve_hour_window() -> AggregationConfig {
    AggregationConfig {
        half_window_s: 6.0 * 3600.0,
        bin_width_s: 3600.0,
    }
}

#[test]
fn test_recomputed_bins_match_saved_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bins.json");
    let cfg = twelve_hour_window();
    let peri = perihelion_e04();
    let trajectory = linear_trajectory(peri, cfg.half_window_s, 80.0, 1.5);
    let detections: Vec<f64> = (0..50).map(|i| epoch(peri) - 3600.0 + i as f64 * 60.0).collect();

    let first = aggregate_encounter("E04", peri, &trajectory, &detections, None, &cfg).unwrap();
    let mut cache = BinCache::load(&path).unwrap();
    assert!(cache.is_empty());
    cache
        .insert("E04", CachedEncounter::from_encounter(&first, first.n_detections))
        .unwrap();
    cache.save(&path).unwrap();

    let reloaded = BinCache::load(&path).unwrap();
    let cached = reloaded.get("E04").unwrap();
    assert_eq!(cached.perihelion, peri);
    assert_eq!(cached.n_detections, 50);

    let second = aggregate_encounter("E04", peri, &trajectory, &detections, None, &cfg).unwrap();
    assert!(compare_bins(&second.bins, &cached.bins, DEFAULT_TOLERANCE).is_empty());
}

#[test]
fn test_cache_file_is_plain_json_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bins.json");
    let cfg = twelve_hour_window();
    let peri = perihelion_e04();
    let enc = aggregate_encounter(
        "E04",
        peri,
        &linear_trajectory(peri, cfg.half_window_s, 10.0, 1.0),
        &[],
        None,
        &cfg,
    )
    .unwrap();

    let mut cache = BinCache::new();
    cache.insert("E04", CachedEncounter::from_encounter(&enc, 0)).unwrap();
    cache.save(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["E04"]["perihelion"], "2020-01-29T09:37:00Z");
    assert_eq!(raw["E04"]["bins"].as_array().unwrap().len(), 12);
    assert!(raw["E04"]["bins"][0]["start_lon"].is_f64());
    assert!(!dir.path().join("bins.json.tmp").exists());
}

#[test]
fn test_existing_entry_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bins.json");
    let cfg = twelve_hour_window();
    let peri = perihelion_e04();
    let original = aggregate_encounter(
        "E04",
        peri,
        &linear_trajectory(peri, cfg.half_window_s, 10.0, 1.0),
        &[],
        None,
        &cfg,
    )
    .unwrap();
    let mut cache = BinCache::new();
    cache
        .insert("E04", CachedEncounter::from_encounter(&original, 0))
        .unwrap();
    cache.save(&path).unwrap();

    let shifted = aggregate_encounter(
        "E04",
        peri,
        &linear_trajectory(peri, cfg.half_window_s, 11.0, 1.0),
        &[],
        None,
        &cfg,
    )
    .unwrap();
    let mut reloaded = BinCache::load(&path).unwrap();
    let err = reloaded
        .insert("E04", CachedEncounter::from_encounter(&shifted, 0))
        .unwrap_err();
    assert!(matches!(err, CacheError::AlreadyCached(_)));

    // a 1 degree shift is reported on every longitude, not corrected
    let found = compare_bins(
        &shifted.bins,
        &reloaded.get("E04").unwrap().bins,
        DEFAULT_TOLERANCE,
    );
    assert_eq!(found.len(), 2 * shifted.bins.len());
    assert_eq!(reloaded.get("E04").unwrap().bins, original.bins);
}

#[test]
fn test_turnaround_backward_bins_are_edge_concentrated() {
    let cfg = twelve_hour_window();
    let peri = perihelion_e04();
    let trajectory = turnaround_trajectory(peri, cfg.half_window_s, 120.0, 2.0);
    let enc = aggregate_encounter("E05", peri, &trajectory, &[], None, &cfg).unwrap();

    let report = validate_encounter(&enc);
    assert_eq!(report.runs.leading, 2);
    assert_eq!(report.runs.trailing, 0);
    assert!(report.is_well_formed());

    let geometry = encounter_geometry(&enc.bins, enc.perihelion_lon.value());
    assert_eq!(geometry[0].direction, Direction::Backward);
    assert!(geometry[2..]
        .iter()
        .all(|g| g.direction == Direction::Forward));
}

#[test]
fn test_seam_crossing_encounter_has_no_backward_bins() {
    let cfg = twelve_hour_window();
    let peri = perihelion_e04();
    let trajectory = linear_trajectory(peri, cfg.half_window_s, 352.0, 1.5);
    let enc = aggregate_encounter("E06", peri, &trajectory, &[], None, &cfg).unwrap();

    let report = validate_encounter(&enc);
    assert_eq!(report.runs.total(), 0);
    let geometry = encounter_geometry(&enc.bins, enc.perihelion_lon.value());
    assert!(geometry.iter().all(|g| g.delta > 0.0 && g.delta < 180.0));
    assert!(geometry.iter().all(|g| (0.0..360.0).contains(&g.center)));
}

fn bundle_entry(id: &str, trajectory: &[hammerhead_rust::models::TrajectorySample]) -> EncounterInput {
    EncounterInput {
        id: id.to_string(),
        perihelion: "2020-01-29T09:37:00Z".to_string(),
        trajectory: trajectory
            .iter()
            .map(|s| [s.time, s.carrington_lon.value()])
            .collect(),
        detections: vec![epoch(perihelion_e04())],
    }
}

#[test]
fn test_batch_saves_good_encounters_past_a_failing_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bins.json");
    let config = PipelineConfig {
        encounter: twelve_hour_window(),
        ..PipelineConfig::default()
    };
    let peri = perihelion_e04();
    let good = linear_trajectory(peri, config.encounter.half_window_s, 80.0, 1.5);
    let bundle = InputBundle {
        encounters: vec![
            bundle_entry("E04", &good),
            bundle_entry("E05", &[]),
            bundle_entry("E06", &good),
        ],
    };

    let mut cache = BinCache::load(&path).unwrap();
    let summary = run_batch(&bundle, &mut cache, &config, CacheMode::Populate);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.failures.len(), 1);
    cache.save(&path).unwrap();

    let mut reloaded = BinCache::load(&path).unwrap();
    assert_eq!(reloaded.ids().collect::<Vec<_>>(), vec!["E04", "E06"]);
    let verify = run_batch(&bundle, &mut reloaded, &config, CacheMode::VerifyOnly);
    assert_eq!(verify.matched, 2);
    assert_eq!(verify.inserted, 0);
    assert_eq!(verify.failures[0].0, "E05");
}
