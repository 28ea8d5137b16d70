//! Derived science products.
//!
//! Each product is computed independently from named upstream variables.
//! A product whose input is missing, or whose configured index does not fit
//! the data, is skipped with a warning while the others still complete.

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::db::sources::VariableSource;
use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::axis::{pitch_angle_axis, AxisMeta};
use crate::models::series::{ResampledSeries, TimeSeries};
use crate::services::centroid::{histogram_centroid, Centroid};
use crate::services::histogram::{build_multi_resolution, HistogramConfig, LogHistogram2D};
use crate::services::resample::{resample, ResampleMethod};

/// Histogram and centroid at one window width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WavePowerProduct {
    pub tau: qtty::Seconds,
    pub histogram: LogHistogram2D,
    pub centroid: Centroid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchAngleProduct {
    pub energy_channel: usize,
    /// Energy of the selected channel, eV.
    pub energy: f64,
    pub times: Vec<f64>,
    pub pitch_axis: AxisMeta,
    pub centroid: Centroid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeries {
    pub name: String,
    pub series: ResampledSeries,
}

/// A product that could not be computed, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedProduct {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedProducts {
    pub field_magnitude: Option<TimeSeries>,
    pub aligned: Vec<AlignedSeries>,
    pub wave_power: Vec<WavePowerProduct>,
    pub electron_pitch_angle: Option<PitchAngleProduct>,
    pub skipped: Vec<SkippedProduct>,
}

/// `|B|` from three components.
///
/// `by` and `bz` are aligned onto the `bx` clock with the nearest sample
/// when their timestamps differ. A NaN component gives a NaN magnitude.
pub fn field_magnitude(
    bx: &TimeSeries,
    by: &TimeSeries,
    bz: &TimeSeries,
) -> PipelineResult<TimeSeries> {
    let on_bx_clock = |c: &TimeSeries| -> PipelineResult<Vec<f64>> {
        if c.times() == bx.times() {
            Ok(c.values().to_vec())
        } else {
            Ok(resample(c, bx.times(), ResampleMethod::default())?.values)
        }
    };
    let y = on_bx_clock(by)?;
    let z = on_bx_clock(bz)?;

    let magnitude = bx
        .values()
        .iter()
        .zip(&y)
        .zip(&z)
        .map(|((x, y), z)| (x * x + y * y + z * z).sqrt())
        .collect();
    TimeSeries::new(bx.times().to_vec(), magnitude)
}

/// Align `source` onto the timestamps of `target`.
pub fn align_to(
    source: &TimeSeries,
    target: &TimeSeries,
    tolerance: f64,
) -> PipelineResult<ResampledSeries> {
    resample(
        source,
        target.times(),
        ResampleMethod::Nearest {
            tolerance: Some(tolerance),
        },
    )
}

/// One product per valid `tau`; invalid widths are skipped.
pub fn wave_power_products(
    series: &TimeSeries,
    taus: &[f64],
    cfg: &HistogramConfig,
) -> PipelineResult<Vec<WavePowerProduct>> {
    build_multi_resolution(series, taus, cfg)
        .into_iter()
        .map(|histogram| {
            let centroid = histogram_centroid(&histogram)?;
            Ok(WavePowerProduct {
                tau: histogram.tau,
                histogram,
                centroid,
            })
        })
        .collect()
}

/// Runs every configured product against one source.
pub struct DerivedRun<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DerivedRun<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Compute all products.
    ///
    /// # Errors
    /// Configuration, I/O and serialization errors abort the run. Missing
    /// variables, shape mismatches and malformed inputs end up in `skipped`.
    pub fn execute(&self, source: &dyn VariableSource) -> PipelineResult<DerivedProducts> {
        let vars = &self.config.variables;
        let mut out = DerivedProducts::default();

        let mag = isolate(
            "field_magnitude",
            (|| -> PipelineResult<_> {
                let [r, t, n] = &vars.mag_components;
                field_magnitude(&source.series(r)?, &source.series(t)?, &source.series(n)?)
            })(),
            &mut out.skipped,
        )?;

        for name in &vars.aligned {
            let aligned = isolate(
                name,
                (|| -> PipelineResult<_> {
                    let target = mag.as_ref().ok_or_else(|| {
                        PipelineError::missing(vars.mag_components[0].as_str())
                            .with_context(ErrorContext::new("align_to").with_details(
                                "magnetometer clock unavailable".to_string(),
                            ))
                    })?;
                    align_to(&source.series(name)?, target, self.config.resample.tolerance_s)
                })(),
                &mut out.skipped,
            )?;
            if let Some(series) = aligned {
                out.aligned.push(AlignedSeries {
                    name: name.clone(),
                    series,
                });
            }
        }

        let histogram = &self.config.histogram;
        if let Some(products) = isolate(
            "wave_power",
            source
                .series(&vars.wave_power)
                .and_then(|s| wave_power_products(&s, &histogram.taus_s, &histogram.binning())),
            &mut out.skipped,
        )? {
            out.wave_power = products;
        }

        out.electron_pitch_angle = isolate(
            "electron_pitch_angle",
            (|| -> PipelineResult<_> {
                let channel = vars.electron_energy_channel;
                let pad = source.pitch_angle_distribution(&vars.electron_pad)?;
                let centroid = pad.pitch_angle_centroid(channel)?;
                Ok(PitchAngleProduct {
                    energy_channel: channel,
                    energy: pad.energies()[channel],
                    pitch_axis: pitch_angle_axis(pad.pitch_angles()),
                    times: pad.times().to_vec(),
                    centroid,
                })
            })(),
            &mut out.skipped,
        )?;

        out.field_magnitude = mag;
        log::info!(
            "Derived products: {} wave-power resolutions, {} aligned series, {} skipped",
            out.wave_power.len(),
            out.aligned.len(),
            out.skipped.len()
        );
        Ok(out)
    }
}

/// Turn a recoverable failure into a skipped product.
fn isolate<T>(
    name: &str,
    result: PipelineResult<T>,
    skipped: &mut Vec<SkippedProduct>,
) -> PipelineResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recoverable() => {
            log::warn!("Skipping {}: {}", name, e);
            skipped.push(SkippedProduct {
                name: name.to_string(),
                reason: e.to_string(),
            });
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
