//! Upstream data sources.
//!
//! The pipeline never fetches or decodes instrument files itself. Loaders
//! implement these traits and hand over already decoded, time-ordered arrays.
//! [`LocalSource`] keeps everything in memory and backs both tests and the
//! `hh-cache` input bundle.

use std::collections::HashMap;

use crate::error::{PipelineError, PipelineResult};
use crate::models::angular::TrajectorySample;
use crate::models::pitch_angle::PitchAngleDistribution;
use crate::models::series::{check_ordered, TimeSeries};

/// Named scalar series and pitch-angle distributions.
pub trait VariableSource {
    /// `MissingInput` when no variable of that name exists.
    fn series(&self, name: &str) -> PipelineResult<TimeSeries>;

    fn pitch_angle_distribution(&self, name: &str) -> PipelineResult<PitchAngleDistribution>;
}

pub trait TrajectorySource {
    /// Samples with `start <= time < end`, ordered by time.
    fn trajectory(&self, start: f64, end: f64) -> PipelineResult<Vec<TrajectorySample>>;
}

pub trait DetectionSource {
    /// Detection timestamps with `start <= t < end`, ordered.
    fn detections(&self, start: f64, end: f64) -> PipelineResult<Vec<f64>>;
}

/// In-memory source.
#[derive(Debug, Clone, Default)]
pub struct LocalSource {
    series: HashMap<String, TimeSeries>,
    pads: HashMap<String, PitchAngleDistribution>,
    trajectory: Vec<TrajectorySample>,
    detections: Vec<f64>,
}

impl LocalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, name: impl Into<String>, series: TimeSeries) -> Self {
        self.series.insert(name.into(), series);
        self
    }

    pub fn with_pitch_angle_distribution(
        mut self,
        name: impl Into<String>,
        pad: PitchAngleDistribution,
    ) -> Self {
        self.pads.insert(name.into(), pad);
        self
    }

    pub fn with_trajectory(mut self, trajectory: Vec<TrajectorySample>) -> PipelineResult<Self> {
        let times: Vec<f64> = trajectory.iter().map(|s| s.time).collect();
        check_ordered(&times)?;
        self.trajectory = trajectory;
        Ok(self)
    }

    pub fn with_detections(mut self, detections: Vec<f64>) -> PipelineResult<Self> {
        check_ordered(&detections)?;
        self.detections = detections;
        Ok(self)
    }

    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .series
            .keys()
            .chain(self.pads.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

impl VariableSource for LocalSource {
    fn series(&self, name: &str) -> PipelineResult<TimeSeries> {
        self.series
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::missing(name))
    }

    fn pitch_angle_distribution(&self, name: &str) -> PipelineResult<PitchAngleDistribution> {
        self.pads
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::missing(name))
    }
}

impl TrajectorySource for LocalSource {
    fn trajectory(&self, start: f64, end: f64) -> PipelineResult<Vec<TrajectorySample>> {
        let lo = self.trajectory.partition_point(|s| s.time < start);
        let hi = self.trajectory.partition_point(|s| s.time < end);
        Ok(self.trajectory[lo..hi.max(lo)].to_vec())
    }
}

impl DetectionSource for LocalSource {
    fn detections(&self, start: f64, end: f64) -> PipelineResult<Vec<f64>> {
        let lo = self.detections.partition_point(|&t| t < start);
        let hi = self.detections.partition_point(|&t| t < end);
        Ok(self.detections[lo..hi.max(lo)].to_vec())
    }
}
