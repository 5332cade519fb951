use rustfft::{num_complex::Complex, FftPlanner};

use super::curve::IntensityCurve;
use super::decode::AudioData;
use super::hpss;
use super::params::{AnalysisParams, Envelope};
use crate::error::{Error, Result};

/// Turns a decoded sample buffer into a normalized, smoothed intensity curve.
pub struct IntensityAnalyzer {
    audio: AudioData,
}

impl IntensityAnalyzer {
    pub fn new(audio: AudioData) -> Self {
        Self { audio }
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.audio.duration_secs()
    }

    /// Duration rounded up to whole seconds, the unit frame counts are built on.
    pub fn duration(&self) -> u64 {
        self.duration_secs().ceil() as u64
    }

    pub fn analyze(&self, params: &AnalysisParams) -> Result<IntensityCurve> {
        params.validate()?;
        let samples = &self.audio.samples;
        if samples.is_empty() {
            return Err(Error::EmptySignal);
        }
        let kernel = params.kernel_size(self.audio.sample_rate)?;

        log::info!(
            "Pass 1: Percussive extraction (margins h={:.2}, p={:.2})...",
            params.harmonic_margin,
            params.percussive_margin
        );
        let parts = hpss::separate(samples, params.harmonic_margin, params.percussive_margin);
        let blended: Vec<f32> = parts
            .percussive
            .iter()
            .zip(&parts.harmonic)
            .map(|(p, h)| p * params.percussive_influence + h * params.harmonic_influence)
            .collect();

        log::info!("Pass 2: Envelope ({:?})...", params.envelope);
        let energy = match params.envelope {
            Envelope::Abs => rectify(&blended),
            Envelope::Hilbert => hilbert_envelope(&blended),
        };

        log::info!("Pass 3: Smoothing (kernel={} samples)...", kernel);
        let smoothed = smooth(&energy, kernel);

        log::info!("Pass 4: Normalization (widening={:.2})...", params.widening_factor);
        let values = normalize(&smoothed, params.widening_factor, "smoothing")?;

        Ok(IntensityCurve {
            values,
            sample_rate: self.audio.sample_rate,
            duration_secs: self.duration_secs(),
        })
    }
}

pub fn rectify(signal: &[f32]) -> Vec<f32> {
    signal.iter().map(|s| s.abs()).collect()
}

/// Magnitude of the analytic signal, computed with a full-length FFT.
pub fn hilbert_envelope(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f32>::new();
    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&s| Complex::new(s, 0.0)).collect();
    planner.plan_fft_forward(n).process(&mut buffer);

    // Keep DC (and Nyquist for even n), double positive frequencies, drop negatives.
    let positive_end = n.div_ceil(2);
    for (k, c) in buffer.iter_mut().enumerate() {
        let gain = if k == 0 || (n % 2 == 0 && k == n / 2) {
            1.0
        } else if k < positive_end {
            2.0
        } else {
            0.0
        };
        *c *= gain;
    }

    planner.plan_fft_inverse(n).process(&mut buffer);
    let scale = 1.0 / n as f32;
    buffer.iter().map(|c| c.norm() * scale).collect()
}

/// Uniform moving average of width `kernel`, same length as the input.
///
/// The signal is extended by `(kernel - 1) / 2` samples on the left and the
/// remainder on the right, mirroring around each boundary with the edge
/// sample repeated (`x[1], x[0] | x[0], x[1], ...`).
pub fn smooth(signal: &[f32], kernel: usize) -> Vec<f32> {
    let n = signal.len();
    if n == 0 || kernel <= 1 {
        return signal.to_vec();
    }

    let left = (kernel - 1) / 2;
    let padded_len = n + kernel - 1;

    let mut prefix = Vec::with_capacity(padded_len + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for j in 0..padded_len {
        let idx = symmetric_index(j as isize - left as isize, n);
        acc += signal[idx] as f64;
        prefix.push(acc);
    }

    let width = kernel as f64;
    (0..n)
        .map(|i| ((prefix[i + kernel] - prefix[i]) / width) as f32)
        .collect()
}

/// Min-max scale to `[0, 1]`, then multiply by `scale`. Fails only when
/// `max == min`; any non-zero range is stretched.
pub fn normalize(values: &[f32], scale: f32, stage: &'static str) -> Result<Vec<f32>> {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if values.is_empty() {
        return Err(Error::FlatSignal { stage });
    }

    let (min, max) = (min as f64, max as f64);
    let range = max - min;
    if range.is_nan() || range == 0.0 {
        return Err(Error::FlatSignal { stage });
    }

    let scale = scale as f64;
    Ok(values
        .iter()
        .map(|&v| ((v as f64 - min) / range * scale) as f32)
        .collect())
}

/// Mirror an index into `0..n`, repeating the edge sample at each boundary.
fn symmetric_index(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulses(sample_rate: u32, seconds: f32) -> Vec<f32> {
        let len = (sample_rate as f32 * seconds) as usize;
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let tone = (2.0 * std::f32::consts::PI * 330.0 * t).sin() * 0.2;
                let beat = if (t * 4.0).fract() < 0.02 { 0.9 } else { 0.0 };
                tone + beat
            })
            .collect()
    }

    #[test]
    fn curve_spans_zero_to_widening() {
        let audio = AudioData {
            samples: pulses(8000, 1.5),
            sample_rate: 8000,
        };
        let params = AnalysisParams {
            smooth_factor: 40,
            widening_factor: 0.75,
            ..Default::default()
        };
        let analyzer = IntensityAnalyzer::new(audio);
        let curve = analyzer.analyze(&params).unwrap();

        assert_eq!(curve.len(), 12000);
        assert_eq!(curve.sample_rate, 8000);
        assert_eq!(curve.duration(), 2);
        assert!(curve.values.iter().all(|&v| (0.0..=0.75).contains(&v)));
        assert!(curve.values.iter().any(|&v| v == 0.0));
        assert!(curve.values.iter().any(|&v| v == 0.75));
    }

    #[test]
    fn hilbert_mode_also_normalizes() {
        let audio = AudioData {
            samples: pulses(4000, 1.0),
            sample_rate: 4000,
        };
        let params = AnalysisParams {
            smooth_factor: 20,
            envelope: Envelope::Hilbert,
            ..Default::default()
        };
        let curve = IntensityAnalyzer::new(audio).analyze(&params).unwrap();
        assert!(curve.values.iter().all(|&v| (0.0..=0.5).contains(&v)));
        assert!(curve.values.iter().any(|&v| v == 0.5));
    }

    #[test]
    fn silent_input_is_flat_signal() {
        let audio = AudioData {
            samples: vec![0.0; 4000],
            sample_rate: 4000,
        };
        let err = IntensityAnalyzer::new(audio)
            .analyze(&AnalysisParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::FlatSignal { stage: "smoothing" }));
    }

    #[test]
    fn empty_input_is_rejected() {
        let audio = AudioData {
            samples: Vec::new(),
            sample_rate: 4000,
        };
        let err = IntensityAnalyzer::new(audio)
            .analyze(&AnalysisParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::EmptySignal));
    }

    #[test]
    fn zero_kernel_fails_before_analysis() {
        let audio = AudioData {
            samples: vec![0.1; 10],
            sample_rate: 10,
        };
        let params = AnalysisParams {
            smooth_factor: 11,
            ..Default::default()
        };
        let err = IntensityAnalyzer::new(audio).analyze(&params).unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn duration_rounds_up_to_seconds() {
        let analyzer = IntensityAnalyzer::new(AudioData {
            samples: vec![0.0; 44101],
            sample_rate: 44100,
        });
        assert_eq!(analyzer.duration(), 2);
        assert_eq!(analyzer.sample_rate(), 44100);
    }

    #[test]
    fn smooth_preserves_length_and_constants() {
        let out = smooth(&[2.0; 7], 4);
        assert_eq!(out.len(), 7);
        assert!(out.iter().all(|&v| (v - 2.0).abs() < 1e-6));
    }

    #[test]
    fn smooth_mirrors_edges() {
        // kernel 3 pads one sample each side: [1 | 1 2 3 | 3]
        let out = smooth(&[1.0, 2.0, 3.0], 3);
        let expected = [4.0 / 3.0, 2.0, 8.0 / 3.0];
        for (a, b) in out.iter().zip(expected) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn smooth_handles_kernel_longer_than_signal() {
        let out = smooth(&[1.0, 3.0], 5);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn normalize_rejects_flat_input() {
        let err = normalize(&[0.3; 5], 1.0, "test").unwrap_err();
        assert!(matches!(err, Error::FlatSignal { stage: "test" }));
        assert!(normalize(&[], 1.0, "test").is_err());
    }

    #[test]
    fn normalize_stretches_tiny_ranges() {
        let out = normalize(&[1.0, 1.000_000_2, 1.0], 1.0, "test").unwrap();
        assert_eq!(out, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn normalize_hits_both_bounds() {
        let out = normalize(&[2.0, 4.0, 3.0], 2.0, "test").unwrap();
        assert_eq!(out, vec![0.0, 2.0, 1.0]);
    }

    #[test]
    fn hilbert_of_sine_is_flat_envelope() {
        let n = 1000;
        let signal: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 50.0 * i as f32 / n as f32).sin())
            .collect();
        let env = hilbert_envelope(&signal);
        for v in &env[100..900] {
            assert!((v - 1.0).abs() < 1e-2, "{v}");
        }
    }

    #[test]
    fn symmetric_index_repeats_edges() {
        assert_eq!(symmetric_index(-1, 4), 0);
        assert_eq!(symmetric_index(-2, 4), 1);
        assert_eq!(symmetric_index(4, 4), 3);
        assert_eq!(symmetric_index(5, 4), 2);
    }
}
