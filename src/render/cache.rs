use std::path::{Path, PathBuf};

use super::timing::{frame_file_name, FrameTiming};
use super::Compositor;

/// Everything a frame worker reads. Built once before dispatch and shared
/// immutably across the pool.
pub struct RenderCache {
    pub timing: FrameTiming,
    pub output_dir: PathBuf,
    pub compositor: Compositor,
}

impl RenderCache {
    pub fn new(timing: FrameTiming, output_dir: &Path, compositor: Compositor) -> Self {
        log::info!(
            "Render cache: {} frames @ {}fps, {} compositor, output {}",
            timing.total_frames,
            timing.framerate,
            compositor.name(),
            output_dir.display()
        );
        Self {
            timing,
            output_dir: output_dir.to_path_buf(),
            compositor,
        }
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.output_dir
            .join(frame_file_name(index, self.timing.digits))
    }
}
