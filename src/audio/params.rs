use serde::Deserialize;

use crate::error::{Error, Result};

/// How the blended signal is turned into a non-negative energy curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// Absolute value of the blended signal.
    #[default]
    Abs,
    /// Magnitude of the analytic signal.
    Hilbert,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Smoothing kernel divisor; the kernel spans `sample_rate / smooth_factor`
    /// samples, so larger values smooth less.
    pub smooth_factor: u32,
    /// Output scale applied after min-max normalization.
    pub widening_factor: f32,
    pub percussive_influence: f32,
    pub harmonic_influence: f32,
    /// Separation aggressiveness, 1.0 or more.
    pub percussive_margin: f32,
    pub harmonic_margin: f32,
    pub envelope: Envelope,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            smooth_factor: 8,
            widening_factor: 0.5,
            percussive_influence: 0.5,
            harmonic_influence: 0.5,
            percussive_margin: 1.0,
            harmonic_margin: 1.0,
            envelope: Envelope::Abs,
        }
    }
}

impl AnalysisParams {
    /// Width of the moving-average kernel for the given sample rate.
    pub fn kernel_size(&self, sample_rate: u32) -> Result<usize> {
        if self.smooth_factor == 0 {
            return Err(Error::InvalidParams("smooth factor must be positive".into()));
        }
        let k = (sample_rate / self.smooth_factor) as usize;
        if k == 0 {
            return Err(Error::InvalidParams(format!(
                "smooth factor {} leaves an empty kernel at {}Hz",
                self.smooth_factor, sample_rate
            )));
        }
        Ok(k)
    }

    pub fn validate(&self) -> Result<()> {
        if self.smooth_factor == 0 {
            return Err(Error::InvalidParams("smooth factor must be positive".into()));
        }
        if !self.widening_factor.is_finite() || self.widening_factor <= 0.0 {
            return Err(Error::InvalidParams(format!(
                "widening factor must be positive, got {}",
                self.widening_factor
            )));
        }
        for (name, margin) in [
            ("percussive", self.percussive_margin),
            ("harmonic", self.harmonic_margin),
        ] {
            if margin.is_nan() || margin < 1.0 {
                return Err(Error::InvalidParams(format!(
                    "{name} margin must be >= 1.0, got {margin}"
                )));
            }
        }
        Ok(())
    }
}
