use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use super::cache::RenderCache;
use super::timing::FrameRequest;
use crate::audio::IntensityCurve;
use crate::error::{Error, Result};

/// Per-frame outcome of a synthesis run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Written,
    /// The frame's instant lies past the end of the curve.
    Skipped,
}

#[derive(Debug, Default)]
pub struct SynthesisReport {
    pub total: u64,
    pub written: u64,
    pub skipped: Vec<u64>,
    /// `Error::FrameWrite` for every frame that could not be produced.
    pub failed: Vec<Error>,
}

impl SynthesisReport {
    fn record(&mut self, index: u64, outcome: Result<FrameOutcome>) {
        match outcome {
            Ok(FrameOutcome::Written) => self.written += 1,
            Ok(FrameOutcome::Skipped) => self.skipped.push(index),
            Err(e) => self.failed.push(e),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.written == self.total
    }

    pub fn failed_indices(&self) -> Vec<u64> {
        self.failed
            .iter()
            .filter_map(|e| match e {
                Error::FrameWrite { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    pub fn log_summary(&self) {
        if self.is_complete() {
            log::info!("All {} frames written", self.total);
        } else {
            log::info!("Frames written: {}/{}", self.written, self.total);
        }
        if !self.skipped.is_empty() {
            log::info!(
                "Skipped {} frame(s) past the end of the audio: {:?}",
                self.skipped.len(),
                self.skipped
            );
        }
        if !self.failed.is_empty() {
            log::warn!("Failed {} frame(s): {:?}", self.failed.len(), self.failed_indices());
        }
    }
}

/// Render every frame of `cache` on a pool of `jobs` workers.
///
/// Frames are independent: a failure is recorded and the batch continues.
/// Only setup errors (output dir, thread pool) abort the run.
pub fn synthesize(
    cache: &RenderCache,
    curve: &IntensityCurve,
    jobs: usize,
    progress: bool,
) -> Result<SynthesisReport> {
    std::fs::create_dir_all(&cache.output_dir)?;
    let pool = build_thread_pool(jobs)?;

    let total = cache.timing.total_frames;
    if curve.is_empty() {
        log::warn!("Intensity curve is empty; every frame will be skipped");
    }
    log::info!("Synthesizing {} frames on {} workers...", total, pool.current_num_threads());

    let pb = if progress {
        ProgressBar::new(total)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let outcomes: Vec<(u64, Result<FrameOutcome>)> = pool.install(|| {
        (0..total)
            .into_par_iter()
            .map(|index| {
                let outcome = render_one(cache, curve, index);
                pb.inc(1);
                (index, outcome)
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut report = SynthesisReport {
        total,
        ..Default::default()
    };
    for (index, outcome) in outcomes {
        report.record(index, outcome);
    }
    Ok(report)
}

/// Resolve, compose and write one frame. Failures come back as
/// `Error::FrameWrite` so the batch can carry on.
pub fn render_one(
    cache: &RenderCache,
    curve: &IntensityCurve,
    index: u64,
) -> Result<FrameOutcome> {
    let Some(request) = FrameRequest::resolve(index, &cache.timing, curve.len()) else {
        return Ok(FrameOutcome::Skipped);
    };
    let intensity = cache.compositor.intensity_for(&request, curve);
    log::debug!(
        "frame {}: time {:.3}s sample {} intensity {:.4}",
        index,
        request.time,
        request.sample_idx,
        intensity
    );

    let path = cache.frame_path(index);
    cache
        .compositor
        .compose(index, intensity)
        .and_then(|img| img.save(&path).map_err(Error::from))
        .map(|()| FrameOutcome::Written)
        .map_err(|e| {
            log::warn!("frame {} failed: {}", index, e);
            Error::FrameWrite {
                index,
                reason: e.to_string(),
            }
        })
}

fn build_thread_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    if jobs == 0 {
        return Err(Error::InvalidParams("jobs must be at least 1".into()));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("frame-worker-{i}"))
        .build()
        .map_err(|e| Error::InvalidParams(format!("failed to build thread pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::procedural::{ProceduralCompositor, ProceduralSettings};
    use crate::render::sequence::{IntroPhase, LayerSequence, SequenceCompositor, SequenceLayers};
    use crate::render::timing::FrameTiming;
    use crate::render::Compositor;
    use image::{Rgba, RgbaImage};
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pulseframe_{name}_{}", std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        dir
    }

    fn procedural() -> Compositor {
        let cover =
            RgbaImage::from_fn(16, 16, |x, y| Rgba([(x * 16) as u8, (y * 16) as u8, 90, 255]));
        let settings = ProceduralSettings {
            width: 18,
            height: 32,
            avatar_size: 8,
            avatar_y: 12,
            corner_radius: 2,
            blur_radius: 1.0,
        };
        Compositor::Procedural(ProceduralCompositor::new(&cover, None, &settings, None).unwrap())
    }

    #[test]
    fn demo_curve_writes_two_frames() {
        let dir = temp_dir("demo");
        let curve = IntensityCurve::demo();
        let timing = FrameTiming::new(curve.duration(), 2, curve.sample_rate).unwrap();
        let cache = RenderCache::new(timing, &dir, procedural());

        let report = synthesize(&cache, &curve, 2, false).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.written, 2);
        assert!(report.is_complete());

        let first = image::open(dir.join("img0.png")).unwrap().to_rgba8();
        let second = image::open(dir.join("img1.png")).unwrap().to_rgba8();
        assert_eq!(first.dimensions(), (18, 32));
        assert_ne!(first.as_raw(), second.as_raw());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn frames_past_curve_are_skipped_not_failed() {
        let dir = temp_dir("skip");
        let curve = IntensityCurve {
            values: vec![0.0, 0.5, 1.0],
            sample_rate: 4,
            duration_secs: 0.75,
        };
        // 1s at 4fps: frame 3 maps to sample 3, past the curve
        let timing = FrameTiming::new(curve.duration(), 4, curve.sample_rate).unwrap();
        let cache = RenderCache::new(timing, &dir, procedural());

        let report = synthesize(&cache, &curve, 1, false).unwrap();
        assert_eq!(report.written, 3);
        assert_eq!(report.skipped, vec![3]);
        assert!(report.failed.is_empty());
        assert!(!dir.join("img3.png").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rerendering_is_byte_identical() {
        let dir = temp_dir("idem");
        let curve = IntensityCurve::demo();
        let timing = FrameTiming::new(curve.duration(), 2, curve.sample_rate).unwrap();
        let cache = RenderCache::new(timing, &dir, procedural());

        synthesize(&cache, &curve, 2, false).unwrap();
        let before = std::fs::read(dir.join("img1.png")).unwrap();
        synthesize(&cache, &curve, 1, false).unwrap();
        assert_eq!(std::fs::read(dir.join("img1.png")).unwrap(), before);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn zero_jobs_rejected() {
        assert!(build_thread_pool(0).is_err());
    }

    #[test]
    fn report_tracks_failures() {
        let mut report = SynthesisReport {
            total: 3,
            ..Default::default()
        };
        report.record(0, Ok(FrameOutcome::Written));
        report.record(1, Ok(FrameOutcome::Skipped));
        report.record(
            2,
            Err(Error::FrameWrite {
                index: 2,
                reason: "disk full".into(),
            }),
        );
        assert_eq!(report.written, 1);
        assert_eq!(report.skipped, vec![1]);
        assert_eq!(report.failed_indices(), vec![2]);
        assert!(!report.is_complete());
    }

    #[test]
    fn one_broken_frame_does_not_stop_the_batch() {
        let dir = temp_dir("isolation");
        let scene_dir = dir.join("scene");
        let info_dir = dir.join("info");
        std::fs::create_dir_all(&scene_dir).unwrap();
        std::fs::create_dir_all(&info_dir).unwrap();
        for i in 0..3u8 {
            RgbaImage::from_pixel(6, 6, Rgba([i * 80, 40, 40, 255]))
                .save(scene_dir.join(format!("{:04}.png", i + 1)))
                .unwrap();
        }
        RgbaImage::new(6, 6).save(info_dir.join("0001.png")).unwrap();

        let layers = SequenceLayers {
            scene: LayerSequence::scan("scene", &scene_dir).unwrap(),
            user_info: LayerSequence::scan("user-info", &info_dir).unwrap(),
            overlay: None,
        };
        // frame 2 is the only one that picks the last scene frame
        let intensities = vec![0.0, 0.5, 1.0, 0.0];
        let compositor = SequenceCompositor::new(layers, IntroPhase::Disabled, 0.5, intensities);
        std::fs::write(scene_dir.join("0003.png"), b"not a png").unwrap();

        let curve = IntensityCurve {
            values: vec![0.0, 0.5, 1.0, 0.0],
            sample_rate: 4,
            duration_secs: 1.0,
        };
        let timing = FrameTiming::new(curve.duration(), 4, curve.sample_rate).unwrap();
        let out = dir.join("frames");
        let cache = RenderCache::new(timing, &out, Compositor::Sequence(compositor));

        let report = synthesize(&cache, &curve, 2, false).unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.written, 3);
        assert_eq!(report.failed_indices(), vec![2]);
        assert!(matches!(report.failed[0], Error::FrameWrite { index: 2, .. }));
        for written in [0, 1, 3] {
            assert!(out.join(format!("img{written}.png")).exists());
        }
        assert!(!out.join("img2.png").exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
