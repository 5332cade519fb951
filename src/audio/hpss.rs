//! Harmonic/percussive source separation by median filtering a magnitude
//! spectrogram.
//!
//! Tonal content forms horizontal ridges in the spectrogram (stable across
//! time), transients form vertical ridges (broadband within one frame).
//! Median filtering along each axis enhances one and suppresses the other;
//! the two enhanced spectrograms drive soft masks applied to the complex
//! STFT, which is then inverted back to the time domain.

use rustfft::{num_complex::Complex, FftPlanner};

const FFT_SIZE: usize = 2048;
const HOP_SIZE: usize = 512;
const MEDIAN_KERNEL: usize = 31;
const TINY: f32 = 1e-20;

pub struct Separated {
    pub harmonic: Vec<f32>,
    pub percussive: Vec<f32>,
}

/// Split `samples` into harmonic and percussive components of the same length.
///
/// Margins of 1.0 give complementary masks (the two outputs sum back to the
/// input); larger margins isolate each component more aggressively and leave a
/// residual that belongs to neither.
pub fn separate(samples: &[f32], harmonic_margin: f32, percussive_margin: f32) -> Separated {
    if samples.is_empty() {
        return Separated {
            harmonic: Vec::new(),
            percussive: Vec::new(),
        };
    }

    let window = hann_window(FFT_SIZE);
    let spectrum = stft(samples, &window);
    let bins = FFT_SIZE / 2 + 1;
    let frames = spectrum.len() / bins;

    let magnitudes: Vec<f32> = spectrum.iter().map(|c| c.norm()).collect();
    let harmonic_enh = median_across_time(&magnitudes, frames, bins);
    let percussive_enh = median_across_frequency(&magnitudes, frames, bins);

    let mut harmonic_spec = Vec::with_capacity(spectrum.len());
    let mut percussive_spec = Vec::with_capacity(spectrum.len());
    for ((c, &h), &p) in spectrum.iter().zip(&harmonic_enh).zip(&percussive_enh) {
        harmonic_spec.push(*c * soft_mask(h, p * harmonic_margin));
        percussive_spec.push(*c * soft_mask(p, h * percussive_margin));
    }

    Separated {
        harmonic: istft(&harmonic_spec, &window, samples.len()),
        percussive: istft(&percussive_spec, &window, samples.len()),
    }
}

/// Power-2 Wiener-style mask. Zero where both inputs vanish.
fn soft_mask(x: f32, x_ref: f32) -> f32 {
    let z = x.max(x_ref);
    if z < TINY {
        return 0.0;
    }
    let a = (x / z).powi(2);
    let b = (x_ref / z).powi(2);
    a / (a + b)
}

/// Centered STFT, frame-major: `out[frame * bins + bin]`.
fn stft(samples: &[f32], window: &[f32]) -> Vec<Complex<f32>> {
    let pad = FFT_SIZE / 2;
    let n = samples.len();
    let frames = 1 + n / HOP_SIZE;
    let bins = FFT_SIZE / 2 + 1;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);

    let mut out = Vec::with_capacity(frames * bins);
    let mut buffer = vec![Complex::new(0.0, 0.0); FFT_SIZE];

    for frame in 0..frames {
        let start = (frame * HOP_SIZE) as isize - pad as isize;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let idx = reflect_index(start + i as isize, n);
            *slot = Complex::new(samples[idx] * window[i], 0.0);
        }
        fft.process(&mut buffer);
        out.extend_from_slice(&buffer[..bins]);
    }

    out
}

/// Weighted overlap-add inverse of [`stft`], trimmed to `length` samples.
fn istft(spectrum: &[Complex<f32>], window: &[f32], length: usize) -> Vec<f32> {
    let bins = FFT_SIZE / 2 + 1;
    let frames = spectrum.len() / bins;
    let pad = FFT_SIZE / 2;
    let total = FFT_SIZE + HOP_SIZE * frames.saturating_sub(1);

    let mut planner = FftPlanner::<f32>::new();
    let ifft = planner.plan_fft_inverse(FFT_SIZE);

    let mut signal = vec![0.0f32; total];
    let mut weights = vec![0.0f32; total];
    let mut buffer = vec![Complex::new(0.0, 0.0); FFT_SIZE];
    let scale = 1.0 / FFT_SIZE as f32;

    for frame in 0..frames {
        let half = &spectrum[frame * bins..(frame + 1) * bins];
        buffer[..bins].copy_from_slice(half);
        for k in 1..FFT_SIZE / 2 {
            buffer[FFT_SIZE - k] = half[k].conj();
        }
        ifft.process(&mut buffer);

        let offset = frame * HOP_SIZE;
        for i in 0..FFT_SIZE {
            signal[offset + i] += buffer[i].re * scale * window[i];
            weights[offset + i] += window[i] * window[i];
        }
    }

    (pad..pad + length)
        .map(|i| match (signal.get(i), weights.get(i)) {
            (Some(&s), Some(&w)) if w > 1e-8 => s / w,
            _ => 0.0,
        })
        .collect()
}

/// Median over a sliding time window for every frequency bin.
fn median_across_time(mags: &[f32], frames: usize, bins: usize) -> Vec<f32> {
    let half = MEDIAN_KERNEL / 2;
    let mut out = vec![0.0f32; mags.len()];
    let mut scratch = Vec::with_capacity(MEDIAN_KERNEL);

    for bin in 0..bins {
        for frame in 0..frames {
            let lo = frame.saturating_sub(half);
            let hi = (frame + half + 1).min(frames);
            scratch.clear();
            scratch.extend((lo..hi).map(|t| mags[t * bins + bin]));
            out[frame * bins + bin] = median(&mut scratch);
        }
    }

    out
}

/// Median over a sliding frequency window within every frame.
fn median_across_frequency(mags: &[f32], frames: usize, bins: usize) -> Vec<f32> {
    let half = MEDIAN_KERNEL / 2;
    let mut out = vec![0.0f32; mags.len()];
    let mut scratch = Vec::with_capacity(MEDIAN_KERNEL);

    for frame in 0..frames {
        let row = &mags[frame * bins..(frame + 1) * bins];
        for bin in 0..bins {
            let lo = bin.saturating_sub(half);
            let hi = (bin + half + 1).min(bins);
            scratch.clear();
            scratch.extend_from_slice(&row[lo..hi]);
            out[frame * bins + bin] = median(&mut scratch);
        }
    }

    out
}

fn median(values: &mut [f32]) -> f32 {
    let mid = values.len() / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *m
}

/// Mirror an out-of-range index back into `0..n` without repeating the edge.
fn reflect_index(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn energy(x: &[f32]) -> f32 {
        x.iter().map(|v| v * v).sum()
    }

    #[test]
    fn stft_roundtrip_reconstructs_signal() {
        let input = sine(440.0, 22050, 8000);
        let window = hann_window(FFT_SIZE);
        let spec = stft(&input, &window);
        let output = istft(&spec, &window, input.len());
        assert_eq!(output.len(), input.len());
        for (a, b) in input.iter().zip(&output) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn unit_margins_split_the_signal() {
        let mut input = sine(220.0, 22050, 6000);
        input[3000] += 4.0;
        let parts = separate(&input, 1.0, 1.0);
        assert_eq!(parts.harmonic.len(), input.len());
        assert_eq!(parts.percussive.len(), input.len());
        for i in (0..input.len()).step_by(97) {
            let sum = parts.harmonic[i] + parts.percussive[i];
            assert!((sum - input[i]).abs() < 1e-2, "sample {i}: {sum} vs {}", input[i]);
        }
    }

    #[test]
    fn steady_tone_lands_in_harmonic_part() {
        let input = sine(440.0, 22050, 22050);
        let parts = separate(&input, 1.0, 1.0);
        assert!(energy(&parts.harmonic) > 10.0 * energy(&parts.percussive));
    }

    #[test]
    fn click_train_lands_in_percussive_part() {
        let mut input = vec![0.0f32; 22050];
        for i in (0..input.len()).step_by(8820) {
            input[i] = 1.0;
        }
        let parts = separate(&input, 1.0, 1.0);
        assert!(energy(&parts.percussive) > energy(&parts.harmonic));
    }

    #[test]
    fn empty_and_tiny_inputs() {
        let parts = separate(&[], 1.0, 1.0);
        assert!(parts.harmonic.is_empty());
        let parts = separate(&[0.5], 2.0, 2.0);
        assert_eq!(parts.percussive.len(), 1);
    }

    #[test]
    fn soft_mask_handles_zeros() {
        assert_eq!(soft_mask(0.0, 0.0), 0.0);
        assert_eq!(soft_mask(1.0, 0.0), 1.0);
        assert!((soft_mask(1.0, 1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn reflect_index_mirrors_both_ends() {
        assert_eq!(reflect_index(-1, 5), 1);
        assert_eq!(reflect_index(-2, 5), 2);
        assert_eq!(reflect_index(5, 5), 3);
        assert_eq!(reflect_index(13, 5), 3);
        assert_eq!(reflect_index(7, 1), 0);
    }
}
