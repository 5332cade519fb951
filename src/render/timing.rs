use crate::error::{Error, Result};

/// Maps wall-clock frame indices onto audio sample positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTiming {
    pub framerate: u32,
    pub sample_rate: u32,
    pub total_frames: u64,
    /// Zero-padding width of frame file names.
    pub digits: usize,
}

impl FrameTiming {
    /// `duration` is in whole seconds (already rounded up).
    pub fn new(duration: u64, framerate: u32, sample_rate: u32) -> Result<Self> {
        if framerate == 0 {
            return Err(Error::InvalidParams("framerate must be at least 1".into()));
        }
        if sample_rate == 0 {
            return Err(Error::InvalidParams("sample rate must be positive".into()));
        }
        let total_frames = total_frame_count(duration, framerate);
        if total_frames == 0 {
            return Err(Error::InvalidParams("audio is too short to render any frame".into()));
        }
        Ok(Self {
            framerate,
            sample_rate,
            total_frames,
            digits: digit_width(total_frames),
        })
    }

    pub fn time_of(&self, index: u64) -> f64 {
        index as f64 / self.framerate as f64
    }

    /// `floor(index / framerate * sample_rate)`, in exact integer arithmetic.
    pub fn sample_of(&self, index: u64) -> usize {
        (index as u128 * self.sample_rate as u128 / self.framerate as u128) as usize
    }
}

pub fn total_frame_count(duration: u64, framerate: u32) -> u64 {
    duration * framerate as u64
}

/// Number of decimal digits in `n` (`floor(log10(n)) + 1`, with 0 taking one digit).
pub fn digit_width(n: u64) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

pub fn frame_file_name(index: u64, digits: usize) -> String {
    format!("img{:0width$}.png", index, width = digits)
}

/// One frame's resolved position in the audio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRequest {
    pub index: u64,
    pub time: f64,
    pub sample_idx: usize,
}

impl FrameRequest {
    /// `None` when the frame falls past the end of the curve; no file is written for it.
    pub fn resolve(index: u64, timing: &FrameTiming, curve_len: usize) -> Option<Self> {
        let sample_idx = timing.sample_of(index);
        if sample_idx >= curve_len {
            return None;
        }
        Some(Self {
            index,
            time: timing.time_of(index),
            sample_idx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_frame_scenario() {
        let timing = FrameTiming::new(1, 2, 2).unwrap();
        assert_eq!(timing.total_frames, 2);
        assert_eq!(timing.digits, 1);

        let first = FrameRequest::resolve(0, &timing, 2).unwrap();
        assert_eq!(first.sample_idx, 0);
        let second = FrameRequest::resolve(1, &timing, 2).unwrap();
        assert_eq!(second.sample_idx, 1);
        assert_eq!(second.time, 0.5);
    }

    #[test]
    fn frames_past_curve_are_skipped() {
        let timing = FrameTiming::new(2, 30, 100).unwrap();
        assert_eq!(timing.total_frames, 60);
        assert!(FrameRequest::resolve(59, &timing, 150).is_none());
        assert!(FrameRequest::resolve(44, &timing, 150).is_some());
        assert!(FrameRequest::resolve(45, &timing, 150).is_none());
    }

    #[test]
    fn frame_count_is_duration_times_rate() {
        for fps in [1u32, 24, 30, 60] {
            assert_eq!(total_frame_count(7, fps), 7 * fps as u64);
        }
    }

    #[test]
    fn sample_index_is_exact() {
        let timing = FrameTiming::new(10, 30, 44100).unwrap();
        assert_eq!(timing.sample_of(3), 4410);
        assert_eq!(timing.sample_of(299), 439530);
    }

    #[test]
    fn digit_widths() {
        assert_eq!(digit_width(0), 1);
        assert_eq!(digit_width(9), 1);
        assert_eq!(digit_width(10), 2);
        assert_eq!(digit_width(5400), 4);
        assert_eq!(digit_width(10000), 5);
    }

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(frame_file_name(7, 4), "img0007.png");
        assert_eq!(frame_file_name(1234, 4), "img1234.png");
    }

    #[test]
    fn zero_framerate_rejected() {
        assert!(FrameTiming::new(5, 0, 44100).is_err());
        assert!(FrameTiming::new(0, 30, 44100).is_err());
    }
}
