//! Pipeline configuration file support.
//!
//! Every field has a default so a partial (or empty) `hammerhead.toml` is
//! valid. Example:
//!
//! ```toml
//! [histogram]
//! taus_s = [30.0, 120.0]
//! n_value_bins = 60
//! normalization = "row_density"
//!
//! [encounter]
//! bin_width_s = 1800.0
//!
//! [cache]
//! path = "data/hammerhead_bins.json"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::services::aggregation::AggregationConfig;
use crate::services::histogram::{HistogramConfig, Normalization, DEFAULT_TAUS_S};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "HAMMERHEAD_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub histogram: HistogramSettings,
    #[serde(default)]
    pub encounter: AggregationConfig,
    #[serde(default)]
    pub resample: ResampleSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub variables: VariableNames,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSettings {
    #[serde(default = "default_taus_s")]
    pub taus_s: Vec<f64>,
    #[serde(default = "default_log_min")]
    pub log_min: f64,
    #[serde(default = "default_log_max")]
    pub log_max: f64,
    #[serde(default = "default_n_value_bins")]
    pub n_value_bins: usize,
    #[serde(default)]
    pub normalization: Normalization,
}

fn default_taus_s() -> Vec<f64> {
    DEFAULT_TAUS_S.to_vec()
}

fn default_log_min() -> f64 {
    HistogramConfig::default().log_min
}

fn default_log_max() -> f64 {
    HistogramConfig::default().log_max
}

fn default_n_value_bins() -> usize {
    HistogramConfig::default().n_value_bins
}

impl Default for HistogramSettings {
    fn default() -> Self {
        Self {
            taus_s: default_taus_s(),
            log_min: default_log_min(),
            log_max: default_log_max(),
            n_value_bins: default_n_value_bins(),
            normalization: Normalization::default(),
        }
    }
}

impl HistogramSettings {
    pub fn binning(&self) -> HistogramConfig {
        HistogramConfig {
            log_min: self.log_min,
            log_max: self.log_max,
            n_value_bins: self.n_value_bins,
            normalization: self.normalization,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampleSettings {
    /// Maximum distance, seconds, between a target timestamp and the nearest
    /// source sample for cross-instrument alignment.
    #[serde(default = "default_tolerance_s")]
    pub tolerance_s: f64,
}

fn default_tolerance_s() -> f64 {
    60.0
}

impl Default for ResampleSettings {
    fn default() -> Self {
        Self {
            tolerance_s: default_tolerance_s(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Absolute tolerance for comparing fresh bins against cached ones.
    #[serde(default = "default_cache_tolerance")]
    pub tolerance: f64,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("hammerhead_bins.json")
}

fn default_cache_tolerance() -> f64 {
    crate::db::cache::DEFAULT_TOLERANCE
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            tolerance: default_cache_tolerance(),
        }
    }
}

/// Upstream variable names consumed by the derived-product run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableNames {
    #[serde(default = "default_mag_components")]
    pub mag_components: [String; 3],
    #[serde(default = "default_wave_power")]
    pub wave_power: String,
    #[serde(default = "default_electron_pad")]
    pub electron_pad: String,
    #[serde(default = "default_electron_energy_channel")]
    pub electron_energy_channel: usize,
    /// Plasma moments aligned onto the magnetometer clock.
    #[serde(default = "default_aligned")]
    pub aligned: Vec<String>,
}

fn default_mag_components() -> [String; 3] {
    [
        "mag_rtn_r".to_string(),
        "mag_rtn_t".to_string(),
        "mag_rtn_n".to_string(),
    ]
}

fn default_wave_power() -> String {
    "scm_wave_power".to_string()
}

fn default_electron_pad() -> String {
    "spe_eflux_vs_pa_e".to_string()
}

fn default_electron_energy_channel() -> usize {
    8
}

fn default_aligned() -> Vec<String> {
    vec!["spi_density".to_string(), "spi_temperature".to_string()]
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            mag_components: default_mag_components(),
            wave_power: default_wave_power(),
            electron_pad: default_electron_pad(),
            electron_energy_channel: default_electron_energy_channel(),
            aligned: default_aligned(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// `Configuration` if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        toml::from_str(content).map_err(|e| {
            PipelineError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `hammerhead.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> PipelineResult<Self> {
        let search_paths = [
            PathBuf::from("hammerhead.toml"),
            PathBuf::from("backend/hammerhead.toml"),
            PathBuf::from("../hammerhead.toml"),
        ];

        for path in &search_paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Err(PipelineError::configuration(
            "No hammerhead.toml found in standard locations",
        ))
    }

    /// Load from `HAMMERHEAD_CONFIG` when set, else the default location,
    /// else built-in defaults.
    pub fn from_env() -> PipelineResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(path);
        }
        match Self::from_default_location() {
            Ok(config) => Ok(config),
            Err(_) => {
                log::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}
