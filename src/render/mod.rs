//! Frame synthesis: maps the intensity curve onto an ordered PNG sequence.

pub mod cache;
pub mod compositing;
pub mod pipeline;
pub mod procedural;
pub mod sequence;
pub mod text;
pub mod timing;

use image::RgbaImage;

use crate::audio::IntensityCurve;
use crate::error::Result;
use procedural::ProceduralCompositor;
use sequence::SequenceCompositor;
use timing::FrameRequest;

/// How a frame is built from its intensity.
pub enum Compositor {
    Procedural(ProceduralCompositor),
    Sequence(SequenceCompositor),
}

impl Compositor {
    pub fn name(&self) -> &'static str {
        match self {
            Compositor::Procedural(_) => "procedural",
            Compositor::Sequence(_) => "sequence",
        }
    }

    /// Procedural frames sample the curve at the frame's instant; sequence
    /// frames use the mean over the frame's bucket.
    pub fn intensity_for(&self, request: &FrameRequest, curve: &IntensityCurve) -> f32 {
        match self {
            Compositor::Procedural(_) => curve.get(request.sample_idx).unwrap_or(0.0),
            Compositor::Sequence(seq) => seq.frame_intensity(request.index),
        }
    }

    pub fn compose(&self, index: u64, intensity: f32) -> Result<RgbaImage> {
        match self {
            Compositor::Procedural(p) => Ok(p.compose(intensity)),
            Compositor::Sequence(s) => s.compose(index, intensity),
        }
    }
}
