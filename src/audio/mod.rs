pub mod analysis;
pub mod curve;
pub mod decode;
pub mod hpss;
pub mod params;

pub use analysis::IntensityAnalyzer;
pub use curve::IntensityCurve;
pub use params::{AnalysisParams, Envelope};
