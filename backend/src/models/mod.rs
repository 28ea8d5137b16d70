pub mod angular;
pub mod axis;
pub mod pitch_angle;
pub mod series;
pub mod time;

pub use angular::*;
pub use axis::AxisMeta;
pub use pitch_angle::PitchAngleDistribution;
pub use series::*;
pub use time::*;
