use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::audio::{AnalysisParams, Envelope};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputType {
    /// Numbered PNG frames (optionally encoded with --video)
    Frames,
    /// The full intensity curve as packed float32
    Raw,
    /// A fixed-size histogram of the curve as packed float32
    Histogram,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Zooming blurred cover behind a static avatar
    Procedural,
    /// Frames picked from pre-rendered scene templates
    Sequence,
}

#[derive(Parser, Debug)]
#[command(
    name = "pulseframe",
    version,
    about = "Turns a music track into beat-synchronized video frames"
)]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Output directory for frames and packed curves
    #[arg(short, long, default_value = "frames")]
    pub output: PathBuf,

    /// What to produce
    #[arg(long, value_enum, default_value_t = OutputType::Frames)]
    pub output_type: OutputType,

    /// Frame compositing mode
    #[arg(short, long, value_enum, default_value_t = Mode::Procedural)]
    pub mode: Mode,

    /// Use a fixed two-sample curve instead of analysing audio (forces 2fps)
    #[arg(long)]
    pub demo: bool,

    /// Build the histogram from a previously written raw curve
    #[arg(long)]
    pub raw_input: Option<PathBuf>,

    /// Number of histogram bins
    #[arg(long, default_value_t = 90)]
    pub bins: usize,

    // --- analysis ---
    /// Smoothing divisor; the kernel spans sample_rate / smooth samples
    #[arg(short, long, default_value_t = 8)]
    pub smooth: u32,

    /// Scale of the normalized curve
    #[arg(short, long, default_value_t = 0.5)]
    pub widening: f32,

    #[arg(long, default_value_t = 0.5)]
    pub percussive_influence: f32,

    #[arg(long, default_value_t = 0.5)]
    pub harmonic_influence: f32,

    /// Percussive separation margin (>= 1.0)
    #[arg(long, default_value_t = 1.0)]
    pub percussive_margin: f32,

    /// Harmonic separation margin (>= 1.0)
    #[arg(long, default_value_t = 1.0)]
    pub harmonic_margin: f32,

    #[arg(long, value_enum, default_value_t = Envelope::Abs)]
    pub envelope: Envelope,

    // --- output ---
    /// Frame width in pixels
    #[arg(long, default_value_t = 720)]
    pub width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 1280)]
    pub height: u32,

    /// Frames per second
    #[arg(short, long, default_value_t = 30)]
    pub framerate: u32,

    /// Parallel frame workers [default: 2 x available cores]
    #[arg(short, long)]
    pub jobs: Option<usize>,

    // --- procedural ---
    /// Cover / avatar image
    #[arg(short, long)]
    pub avatar: Option<PathBuf>,

    /// Shade image drawn over the background (default: generated vignette)
    #[arg(long)]
    pub shade: Option<PathBuf>,

    #[arg(long, default_value_t = 50.0)]
    pub blur_radius: f32,

    #[arg(long, default_value_t = 400)]
    pub avatar_size: u32,

    /// Top edge of the avatar; it is centred horizontally
    #[arg(long, default_value_t = 246)]
    pub avatar_y: u32,

    #[arg(long, default_value_t = 40)]
    pub corner_radius: u32,

    /// Track name shown under the avatar
    #[arg(long)]
    pub track_name: Option<String>,

    /// Author name shown under the track name
    #[arg(long)]
    pub username: Option<String>,

    /// TTF/OTF font for the title lines
    #[arg(long)]
    pub font: Option<PathBuf>,

    // --- sequence ---
    /// Scene template id, or `random` [default: random when no --scene-dir]
    #[arg(short = 't', long)]
    pub scene_template: Option<String>,

    /// User-info template id, or `random` [default: random when no --user-info-dir]
    #[arg(long)]
    pub user_info_template: Option<String>,

    /// Overlay template id, or `random`
    #[arg(long)]
    pub overlay_template: Option<String>,

    /// Pre-rendered scene frames (skips the renderer)
    #[arg(long)]
    pub scene_dir: Option<PathBuf>,

    /// Pre-rendered user-info frames (skips the renderer)
    #[arg(long)]
    pub user_info_dir: Option<PathBuf>,

    /// Pre-rendered overlay frames (skips the renderer)
    #[arg(long)]
    pub overlay_dir: Option<PathBuf>,

    /// Templates root [default: next to the executable]
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    /// Working directory for renderer output and staged assets
    #[arg(long, default_value = "renders")]
    pub work_dir: PathBuf,

    /// External scene renderer, invoked as `<engine> --job <job.json>`
    #[arg(long, default_value = "pulseframe-render")]
    pub engine: PathBuf,

    #[arg(long, default_value = "CYCLES")]
    pub render_engine: String,

    #[arg(long, default_value = "CUDA")]
    pub render_device: String,

    #[arg(long, default_value_t = 64)]
    pub samples: u32,

    /// Overlay layer opacity (0.0-1.0)
    #[arg(long, default_value_t = 0.5)]
    pub overlay_opacity: f32,

    /// Start straight on intensity-driven scene frames
    #[arg(long)]
    pub no_intro: bool,

    /// Length of the reversed scene intro [default: scene length]
    #[arg(long, conflicts_with = "no_intro")]
    pub intro_frames: Option<usize>,

    /// List available templates and exit
    #[arg(long)]
    pub list_templates: bool,

    // --- encode ---
    /// Encode the frames with the input audio into this video file
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    // --- general ---
    /// Config file [default: ./pulseframe.toml, then the user config dir]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Debug logging, including per-frame timing
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn analysis_params(&self) -> AnalysisParams {
        AnalysisParams {
            smooth_factor: self.smooth,
            widening_factor: self.widening,
            percussive_influence: self.percussive_influence,
            harmonic_influence: self.harmonic_influence,
            percussive_margin: self.percussive_margin,
            harmonic_margin: self.harmonic_margin,
            envelope: self.envelope,
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
            cores * 2
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["pulseframe", "beat.mp3"]);
        assert_eq!(cli.output_type, OutputType::Frames);
        assert_eq!(cli.mode, Mode::Procedural);
        assert_eq!((cli.width, cli.height, cli.framerate), (720, 1280, 30));
        assert_eq!(cli.bins, 90);
        assert_eq!(cli.analysis_params(), AnalysisParams::default());
        assert!(cli.jobs() >= 2);
    }

    #[test]
    fn sequence_flags() {
        let cli = Cli::parse_from([
            "pulseframe",
            "beat.mp3",
            "--mode",
            "sequence",
            "-t",
            "neon",
            "--intro-frames",
            "12",
            "--envelope",
            "hilbert",
        ]);
        assert_eq!(cli.mode, Mode::Sequence);
        assert_eq!(cli.scene_template.as_deref(), Some("neon"));
        assert_eq!(cli.intro_frames, Some(12));
        assert_eq!(cli.envelope, Envelope::Hilbert);
    }

    #[test]
    fn intro_flags_conflict() {
        assert!(Cli::try_parse_from(["pulseframe", "--no-intro", "--intro-frames", "3"]).is_err());
    }
}
