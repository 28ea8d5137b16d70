//! Axis metadata attached to derived products.
//!
//! Every product carries plain `AxisMeta` records built by the pure functions
//! below; renderers read them as data.

use serde::{Deserialize, Serialize};

/// Name, label, unit and coordinate values of one product axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisMeta {
    pub name: String,
    pub label: String,
    pub unit: String,
    pub values: Vec<f64>,
}

impl AxisMeta {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            unit: unit.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Time bin edges in epoch seconds.
pub fn time_axis(edges: &[f64]) -> AxisMeta {
    AxisMeta::new("time", "Time", "s", edges.to_vec())
}

/// Log10 value bin edges for a histogram of `quantity` measured in `unit`.
pub fn log_value_axis(quantity: &str, unit: &str, edges: &[f64]) -> AxisMeta {
    AxisMeta::new(
        format!("log10_{}", quantity),
        format!("log10({}) [{}]", quantity, unit),
        format!("log10({})", unit),
        edges.to_vec(),
    )
}

/// Pitch-angle bin centers in degrees.
pub fn pitch_angle_axis(centers: &[f64]) -> AxisMeta {
    AxisMeta::new("pitch_angle", "Pitch angle", "deg", centers.to_vec())
}
