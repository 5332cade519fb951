use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct EncodeSettings {
    pub framerate: u32,
    pub codec: String,
    pub pix_fmt: String,
    /// Ignored when `bitrate` is set.
    pub crf: u32,
    pub bitrate: Option<String>,
}

/// Muxes a numbered PNG sequence with the source audio into a video file.
pub struct FfmpegEncoder {
    frame_pattern: PathBuf,
    audio: PathBuf,
    output: PathBuf,
    settings: EncodeSettings,
}

impl FfmpegEncoder {
    /// `digits` is the zero-padding width used for `img<index>.png` names.
    pub fn new(
        frame_dir: &Path,
        digits: usize,
        audio: &Path,
        output: &Path,
        settings: EncodeSettings,
    ) -> Self {
        Self {
            frame_pattern: frame_dir.join(format!("img%0{digits}d.png")),
            audio: audio.to_path_buf(),
            output: output.to_path_buf(),
            settings,
        }
    }

    pub fn args(&self) -> Vec<String> {
        let s = &self.settings;
        let mut args = vec![
            "-y".to_string(),
            "-framerate".into(), s.framerate.to_string(),
            "-i".into(), self.frame_pattern.to_string_lossy().into_owned(),
            "-i".into(), self.audio.to_string_lossy().into_owned(),
            "-map".into(), "0:v".into(),
            "-map".into(), "1:a".into(),
            "-c:v".into(), s.codec.clone(),
            "-pix_fmt".into(), s.pix_fmt.clone(),
        ];

        if let Some(br) = &s.bitrate {
            args.extend(["-b:v".to_string(), br.clone()]);
        } else {
            args.extend(["-crf".to_string(), s.crf.to_string()]);
            args.extend(["-preset".to_string(), "medium".to_string()]);
        }

        args.extend([
            "-c:a".into(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
            self.output.to_string_lossy().into_owned(),
        ]);
        args
    }

    pub fn encode(&self) -> Result<()> {
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        log::info!(
            "Encoding {} @ {}fps, codec={}",
            self.output.display(),
            self.settings.framerate,
            self.settings.codec
        );

        let output = Command::new("ffmpeg")
            .args(self.args())
            .output()
            .map_err(|e| Error::ExternalTool {
                tool: "ffmpeg".into(),
                reason: format!("failed to spawn ({e}); is ffmpeg installed?"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExternalTool {
                tool: "ffmpeg".into(),
                reason: format!("{}\n{}", output.status, tail(&stderr, 20)),
            });
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
