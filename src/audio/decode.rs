use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};

/// Rate the intensity analysis runs at; STFT sizes are tuned for it.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Mono-folded samples plus their sample rate. Immutable once loaded.
#[derive(Clone, Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Resample to `rate` with a windowed-sinc interpolator. Returns `self`
    /// unchanged when it is already at `rate`.
    pub fn resample(self, rate: u32) -> Result<AudioData> {
        use rubato::{
            Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
            WindowFunction,
        };

        if self.sample_rate == rate || self.samples.is_empty() {
            return Ok(self);
        }
        if rate == 0 || self.sample_rate == 0 {
            return Err(Error::InvalidParams("sample rates must be positive".into()));
        }
        let fail = |reason: String| Error::Resample { rate, reason };

        log::info!("Resampling {}Hz -> {}Hz...", self.sample_rate, rate);
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let ratio = rate as f64 / self.sample_rate as f64;
        let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, self.samples.len(), 1)
            .map_err(|e| fail(e.to_string()))?;

        let input = vec![self.samples];
        let output = resampler
            .process(&input, None)
            .map_err(|e| fail(e.to_string()))?;

        Ok(AudioData {
            samples: output.into_iter().next().unwrap_or_default(),
            sample_rate: rate,
        })
    }
}

pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let fail = |reason: String| Error::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(path).map_err(|e| fail(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| fail(format!("unrecognized format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| fail("no audio tracks found".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| fail("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| fail(format!("unsupported codec: {e}")))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(fail(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping corrupt packet: {}", msg);
                continue;
            }
            Err(e) => return Err(fail(e.to_string())),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        fold_to_mono(sample_buf.samples(), spec.channels.count().max(1), &mut all_samples);
    }

    let audio = AudioData {
        samples: all_samples,
        sample_rate,
    };

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        audio.samples.len(),
        audio.sample_rate,
        audio.duration_secs()
    );

    Ok(audio)
}

/// Average interleaved channels into a single mono stream.
fn fold_to_mono(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    for frame in interleaved.chunks(channels) {
        out.push(frame.iter().sum::<f32>() / frame.len() as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_stereo_by_averaging() {
        let mut out = Vec::new();
        fold_to_mono(&[1.0, 0.0, -1.0, -1.0, 0.5, 0.5], 2, &mut out);
        assert_eq!(out, vec![0.5, -1.0, 0.5]);
    }

    #[test]
    fn mono_passes_through() {
        let mut out = vec![9.0];
        fold_to_mono(&[0.1, 0.2], 1, &mut out);
        assert_eq!(out, vec![9.0, 0.1, 0.2]);
    }

    #[test]
    fn missing_file_is_decode_error() {
        let err = decode_audio(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn duration_of_empty_rate_is_zero() {
        let audio = AudioData {
            samples: vec![0.0; 10],
            sample_rate: 0,
        };
        assert_eq!(audio.duration_secs(), 0.0);
    }

    #[test]
    fn resample_halves_a_44k_signal() {
        let audio = AudioData {
            samples: (0..44100).map(|i| (i as f32 * 0.01).sin()).collect(),
            sample_rate: 44100,
        };
        let out = audio.resample(ANALYSIS_SAMPLE_RATE).unwrap();
        assert_eq!(out.sample_rate, 22050);
        assert!(out.samples.len().abs_diff(22050) <= 4, "got {}", out.samples.len());
        assert!((out.duration_secs() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn resample_at_same_rate_is_untouched() {
        let audio = AudioData {
            samples: vec![0.1, 0.2, 0.3],
            sample_rate: 22050,
        };
        let out = audio.resample(22050).unwrap();
        assert_eq!(out.samples, vec![0.1, 0.2, 0.3]);
    }
}
