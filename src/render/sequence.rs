use std::path::{Path, PathBuf};

use image::RgbaImage;

use super::compositing;
use crate::audio::IntensityCurve;
use crate::error::{Error, Result};
use crate::histogram::bins;
use crate::templates::loader::scan_sequence;

/// An ordered, non-empty run of pre-rendered PNG frames for one layer.
#[derive(Clone, Debug)]
pub struct LayerSequence {
    pub frames: Vec<PathBuf>,
}

impl LayerSequence {
    /// Scan `dir` for PNG frames. A required layer with no frames is an error.
    pub fn scan(layer: &'static str, dir: &Path) -> Result<Self> {
        let sequence = Self {
            frames: scan_sequence(dir)?,
        };
        if sequence.is_empty() {
            return Err(Error::LayerSequenceMissing {
                layer,
                dir: dir.to_path_buf(),
            });
        }
        log::info!("{layer}: {} frames in {}", sequence.len(), dir.display());
        Ok(sequence)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Opening phase of a sequence-mode render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntroPhase {
    Disabled,
    /// Play the scene backwards for the first `frames` output frames,
    /// capped at the scene length.
    Reversed { frames: usize },
}

#[derive(Clone, Debug)]
pub struct SequenceLayers {
    pub scene: LayerSequence,
    pub user_info: LayerSequence,
    pub overlay: Option<LayerSequence>,
}

/// Picks and composites frames from pre-rendered layer sequences.
pub struct SequenceCompositor {
    layers: SequenceLayers,
    intro: IntroPhase,
    overlay_opacity: f32,
    frame_intensity: Vec<f32>,
}

impl SequenceCompositor {
    pub fn new(
        layers: SequenceLayers,
        intro: IntroPhase,
        overlay_opacity: f32,
        frame_intensity: Vec<f32>,
    ) -> Self {
        Self {
            layers,
            intro,
            overlay_opacity,
            frame_intensity,
        }
    }

    /// Mean intensity of the curve slice belonging to output frame `index`.
    pub fn frame_intensity(&self, index: u64) -> f32 {
        self.frame_intensity
            .get(index as usize)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn intro_len(&self) -> usize {
        match self.intro {
            IntroPhase::Disabled => 0,
            IntroPhase::Reversed { frames } => frames.min(self.layers.scene.len()),
        }
    }

    pub fn scene_index(&self, index: u64, intensity: f32) -> usize {
        let len = self.layers.scene.len();
        let index = usize::try_from(index).unwrap_or(usize::MAX);
        if index < self.intro_len() {
            return len - 1 - index;
        }
        let pick = (intensity.max(0.0) * (len - 1) as f32).round() as usize;
        pick.min(len - 1)
    }

    pub fn user_info_index(&self, index: u64) -> usize {
        let last = self.layers.user_info.len() - 1;
        usize::try_from(index).map_or(last, |i| i.min(last))
    }

    pub fn overlay_index(&self, index: u64) -> Option<usize> {
        self.layers
            .overlay
            .as_ref()
            .map(|seq| (index % seq.len() as u64) as usize)
    }

    pub fn compose(&self, index: u64, intensity: f32) -> Result<RgbaImage> {
        let scene_path = &self.layers.scene.frames[self.scene_index(index, intensity)];
        let mut frame = image::open(scene_path)?.to_rgba8();
        let (width, height) = frame.dimensions();

        let info_path = &self.layers.user_info.frames[self.user_info_index(index)];
        let info = compositing::fit(image::open(info_path)?.to_rgba8(), width, height);
        compositing::paste_masked(&mut frame, &info, 0, 0);

        if let (Some(seq), Some(i)) = (&self.layers.overlay, self.overlay_index(index)) {
            let overlay = compositing::fit(image::open(&seq.frames[i])?.to_rgba8(), width, height);
            frame = compositing::overlay_blend(&frame, &overlay, self.overlay_opacity);
        }

        Ok(frame)
    }
}

/// Split the curve into one contiguous bucket per output frame and average
/// each. Frames past the end of a short curve reuse the last sample.
pub fn bucket_intensities(curve: &IntensityCurve, total_frames: u64) -> Vec<f32> {
    let values = &curve.values;
    let Some(&last) = values.last() else {
        return vec![0.0; total_frames as usize];
    };
    bins::partition(values.len(), total_frames as usize)
        .into_iter()
        .map(|range| {
            if range.is_empty() {
                values.get(range.start).copied().unwrap_or(last)
            } else {
                bins::mean(&values[range])
            }
        })
        .collect()
}
