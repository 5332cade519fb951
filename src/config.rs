use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::AnalysisParams;
use crate::cli::Cli;
use crate::error::{Error, Result};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisParams,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub procedural: ProceduralConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub jobs: Option<usize>,
    pub crf: u32,
    pub codec: String,
    pub bins: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 720,
            height: 1280,
            framerate: 30,
            jobs: None,
            crf: 18,
            codec: "libx264".into(),
            bins: 90,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProceduralConfig {
    pub blur_radius: f32,
    pub avatar_size: u32,
    pub avatar_y: u32,
    pub corner_radius: u32,
    pub font: Option<PathBuf>,
    pub shade: Option<PathBuf>,
}

impl Default for ProceduralConfig {
    fn default() -> Self {
        Self {
            blur_radius: 50.0,
            avatar_size: 400,
            avatar_y: 246,
            corner_radius: 40,
            font: None,
            shade: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub templates_dir: Option<PathBuf>,
    pub engine: Option<PathBuf>,
    pub render_engine: Option<String>,
    pub render_device: Option<String>,
    pub samples: u32,
    pub overlay_opacity: f32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            templates_dir: None,
            engine: None,
            render_engine: None,
            render_device: None,
            samples: 64,
            overlay_opacity: 0.5,
        }
    }
}

/// Explicit path, else `./pulseframe.toml`, else `~/.config/pulseframe/config.toml`,
/// else the platform config dir.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("pulseframe.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("pulseframe").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("pulseframe").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content).map_err(|e| match e {
        Error::InvalidParams(reason) => {
            Error::InvalidParams(format!("{}: {reason}", path.display()))
        }
        other => other,
    })
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| Error::InvalidParams(e.to_string()))
}

impl Config {
    /// Merge into `cli`: config values apply only where the CLI is still at its default.
    pub fn apply(self, cli: &mut Cli) {
        let analysis = self.analysis;
        let defaults = AnalysisParams::default();
        if cli.smooth == defaults.smooth_factor { cli.smooth = analysis.smooth_factor; }
        if cli.widening == defaults.widening_factor { cli.widening = analysis.widening_factor; }
        if cli.percussive_influence == defaults.percussive_influence {
            cli.percussive_influence = analysis.percussive_influence;
        }
        if cli.harmonic_influence == defaults.harmonic_influence {
            cli.harmonic_influence = analysis.harmonic_influence;
        }
        if cli.percussive_margin == defaults.percussive_margin {
            cli.percussive_margin = analysis.percussive_margin;
        }
        if cli.harmonic_margin == defaults.harmonic_margin {
            cli.harmonic_margin = analysis.harmonic_margin;
        }
        if cli.envelope == defaults.envelope { cli.envelope = analysis.envelope; }

        let output = self.output;
        if cli.width == 720 { cli.width = output.width; }
        if cli.height == 1280 { cli.height = output.height; }
        if cli.framerate == 30 { cli.framerate = output.framerate; }
        if cli.jobs.is_none() { cli.jobs = output.jobs; }
        if cli.crf == 18 { cli.crf = output.crf; }
        if cli.codec == "libx264" { cli.codec = output.codec; }
        if cli.bins == 90 { cli.bins = output.bins; }

        let procedural = self.procedural;
        if cli.blur_radius == 50.0 { cli.blur_radius = procedural.blur_radius; }
        if cli.avatar_size == 400 { cli.avatar_size = procedural.avatar_size; }
        if cli.avatar_y == 246 { cli.avatar_y = procedural.avatar_y; }
        if cli.corner_radius == 40 { cli.corner_radius = procedural.corner_radius; }
        if cli.font.is_none() { cli.font = procedural.font; }
        if cli.shade.is_none() { cli.shade = procedural.shade; }

        let sequence = self.sequence;
        if cli.templates_dir.is_none() { cli.templates_dir = sequence.templates_dir; }
        if let Some(engine) = sequence.engine {
            if cli.engine.as_os_str() == "pulseframe-render" { cli.engine = engine; }
        }
        if let Some(render_engine) = sequence.render_engine {
            if cli.render_engine == "CYCLES" { cli.render_engine = render_engine; }
        }
        if let Some(device) = sequence.render_device {
            if cli.render_device == "CUDA" { cli.render_device = device; }
        }
        if cli.samples == 64 { cli.samples = sequence.samples; }
        if cli.overlay_opacity == 0.5 { cli.overlay_opacity = sequence.overlay_opacity; }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Envelope;
    use clap::Parser;

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.analysis, AnalysisParams::default());
        assert_eq!(cfg.output.width, 720);
        assert_eq!(cfg.procedural.avatar_y, 246);
        assert_eq!(cfg.sequence.overlay_opacity, 0.5);
    }

    #[test]
    fn config_fills_defaults_but_not_explicit_flags() {
        let cfg = parse_config(
            r#"
            [analysis]
            smooth_factor = 16
            envelope = "hilbert"

            [output]
            width = 1080
            framerate = 60

            [sequence]
            overlay_opacity = 0.8
            "#,
        )
        .unwrap();

        let mut cli = Cli::parse_from(["pulseframe", "beat.mp3", "--framerate", "24"]);
        cfg.apply(&mut cli);

        assert_eq!(cli.smooth, 16);
        assert_eq!(cli.envelope, Envelope::Hilbert);
        assert_eq!(cli.width, 1080);
        assert_eq!(cli.height, 1280);
        assert_eq!(cli.framerate, 24);
        assert_eq!(cli.overlay_opacity, 0.8);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(parse_config("[output]\nwidth = \"wide\""), Err(Error::InvalidParams(_))));
    }

    #[test]
    fn explicit_path_wins() {
        let p = Path::new("/tmp/custom.toml");
        assert_eq!(find_config_path(Some(p)), Some(p.to_path_buf()));
    }
}
