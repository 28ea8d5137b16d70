//! Electron pitch-angle distributions.
//!
//! A distribution is only built through [`PitchAngleDistribution::new`], which
//! checks the flux shape against the three axes, so every energy slice taken
//! from it is in bounds.

use ndarray::{Array2, Array3, Axis};
use serde::Serialize;

use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::series::check_ordered;
use crate::services::centroid::{weighted_centroid, Centroid};

/// Flux indexed by (time, energy, pitch angle).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchAngleDistribution {
    times: Vec<f64>,
    /// Energy channel centers, eV.
    energies: Vec<f64>,
    /// Pitch-angle bin centers, degrees.
    pitch_angles: Vec<f64>,
    flux: Array3<f64>,
}

impl PitchAngleDistribution {
    /// `flux` is row-major with pitch angle varying fastest.
    pub fn new(
        times: Vec<f64>,
        energies: Vec<f64>,
        pitch_angles: Vec<f64>,
        flux: Vec<f64>,
    ) -> PipelineResult<Self> {
        let ctx = || ErrorContext::new("PitchAngleDistribution::new");
        let shape = (times.len(), energies.len(), pitch_angles.len());
        let n_flux = flux.len();
        let flux = Array3::from_shape_vec(shape, flux).map_err(|_| {
            PipelineError::shape(format!(
                "flux has {} entries, expected {}x{}x{} = {}",
                n_flux,
                shape.0,
                shape.1,
                shape.2,
                shape.0 * shape.1 * shape.2
            ))
            .with_context(ctx())
        })?;
        check_ordered(&times).map_err(|e| e.with_context(ctx()))?;
        Ok(Self {
            times,
            energies,
            pitch_angles,
            flux,
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn pitch_angles(&self) -> &[f64] {
        &self.pitch_angles
    }

    /// Flux at one energy channel as a (time, pitch angle) grid.
    pub fn energy_slice(&self, channel: usize) -> PipelineResult<Array2<f64>> {
        let n_e = self.energies.len();
        if channel >= n_e {
            return Err(PipelineError::shape(format!(
                "energy channel {} out of bounds for {} channels",
                channel, n_e
            ))
            .with_context(ErrorContext::new("energy_slice")));
        }
        Ok(self.flux.index_axis(Axis(1), channel).to_owned())
    }

    /// Flux-weighted mean pitch angle per timestamp at one energy channel.
    pub fn pitch_angle_centroid(&self, channel: usize) -> PipelineResult<Centroid> {
        weighted_centroid(&self.energy_slice(channel)?, &self.pitch_angles)
    }
}
