//! Integration tests for derived products computed from an in-memory source.

mod support;

use hammerhead_rust::db::LocalSource;
use hammerhead_rust::models::{PitchAngleDistribution, TimeSeries};
use hammerhead_rust::services::{DerivedRun, HistogramStatus, DEFAULT_TAUS_S};
use hammerhead_rust::PipelineConfig;

/// One day of 1 s magnetometer-like data and 7 s plasma moments.
fn full_source() -> LocalSource {
    let mag_times: Vec<f64> = (0..86_400).map(|i| i as f64).collect();
    let component = |scale: f64| {
        TimeSeries::new(
            mag_times.clone(),
            mag_times.iter().map(|t| scale * (1.0 + (t / 3600.0).sin().abs())).collect(),
        )
        .unwrap()
    };
    let plasma_times: Vec<f64> = (0..12_343).map(|i| i as f64 * 7.0).collect();
    let density = TimeSeries::new(plasma_times.clone(), vec![120.0; plasma_times.len()]).unwrap();

    // wave power with a zero (masked) hour in the middle of the day
    let wave = TimeSeries::new(
        mag_times.clone(),
        mag_times
            .iter()
            .map(|&t| if (43_200.0..46_800.0).contains(&t) { 0.0 } else { 0.05 })
            .collect(),
    )
    .unwrap();

    let n_e = 10;
    let pitch = vec![15.0, 45.0, 75.0, 105.0, 135.0, 165.0];
    let pad_times: Vec<f64> = (0..24).map(|h| h as f64 * 3600.0).collect();
    let flux = (0..pad_times.len() * n_e * pitch.len())
        .map(|i| if i % pitch.len() == 0 { 10.0 } else { 1.0 })
        .collect();
    let pad = PitchAngleDistribution::new(
        pad_times,
        (0..n_e).map(|e| 10f64.powi(e as i32 / 2 + 1)).collect(),
        pitch,
        flux,
    )
    .unwrap();

    LocalSource::new()
        .with_series("mag_rtn_r", component(3.0))
        .with_series("mag_rtn_t", component(4.0))
        .with_series("mag_rtn_n", component(0.0))
        .with_series("spi_density", density)
        .with_series("scm_wave_power", wave)
        .with_pitch_angle_distribution("spe_eflux_vs_pa_e", pad)
}

#[test]
fn test_full_run_produces_every_product() {
    let config = PipelineConfig::default();
    let products = DerivedRun::new(&config).execute(&full_source()).unwrap();

    let mag = products.field_magnitude.unwrap();
    assert_eq!(mag.len(), 86_400);
    assert!((mag.values()[0] - 5.0).abs() < 1e-12);

    assert_eq!(products.wave_power.len(), DEFAULT_TAUS_S.len());
    for p in &products.wave_power {
        assert_eq!(p.histogram.status, HistogramStatus::Ok);
        assert_eq!(p.centroid.len(), p.histogram.n_time_bins());
    }
    // the zero hour is one full 20 minute window's worth of NaN centroids
    let twenty_min = &products.wave_power[2];
    assert_eq!(twenty_min.tau.value(), 1200.0);
    let masked_rows = twenty_min.centroid.values.iter().filter(|v| v.is_nan()).count();
    assert_eq!(masked_rows, 3);

    let pad = products.electron_pitch_angle.unwrap();
    assert_eq!(pad.energy_channel, 8);
    assert_eq!(pad.centroid.len(), 24);
    // weights 10, 1, 1, 1, 1, 1 over 15..165
    let expected = (10.0 * 15.0 + 45.0 + 75.0 + 105.0 + 135.0 + 165.0) / 15.0;
    assert!((pad.centroid.values[0] - expected).abs() < 1e-9);

    // spi_density aligned, spi_temperature absent
    assert_eq!(products.aligned.len(), 1);
    assert_eq!(products.aligned[0].series.len(), 86_400);
    assert_eq!(products.aligned[0].series.unmatched, 0);
    assert_eq!(products.skipped.len(), 1);
    assert_eq!(products.skipped[0].name, "spi_temperature");
}

#[test]
fn test_empty_source_skips_everything_without_failing() {
    let config = PipelineConfig::default();
    let products = DerivedRun::new(&config).execute(&LocalSource::new()).unwrap();
    assert!(products.field_magnitude.is_none());
    assert!(products.wave_power.is_empty());
    assert!(products.electron_pitch_angle.is_none());
    assert_eq!(products.skipped.len(), 5);
}
