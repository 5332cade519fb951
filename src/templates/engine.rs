use std::path::{Path, PathBuf};
use std::process::Command;

use image::{imageops, RgbaImage};

use super::loader::LoadedTemplate;
use super::manifest::{JobAssets, RenderJob, JOB_VERSION};
use crate::error::{Error, Result};

/// Turns a render job into an ordered PNG sequence in `job.output_dir`.
pub trait SceneRenderer {
    fn render(&self, job: &RenderJob) -> Result<()>;
}

/// Runs an external engine as `<engine> --job <output_dir>/job.json`.
pub struct CommandRenderer {
    engine: PathBuf,
}

impl CommandRenderer {
    pub fn new(engine: impl Into<PathBuf>) -> Self {
        Self {
            engine: engine.into(),
        }
    }

    fn tool_name(&self) -> String {
        self.engine
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.engine.display().to_string())
    }
}

impl SceneRenderer for CommandRenderer {
    fn render(&self, job: &RenderJob) -> Result<()> {
        std::fs::create_dir_all(&job.output_dir)?;
        let job_path = job.output_dir.join("job.json");
        let json = serde_json::to_string_pretty(job)
            .map_err(|e| Error::Template(format!("failed to serialize render job: {e}")))?;
        std::fs::write(&job_path, json)?;

        log::info!(
            "Rendering {} template '{}' (frames {}-{}) with {}",
            job.layer.label(),
            job.template,
            job.frame_start,
            job.frame_end,
            self.engine.display()
        );

        let output = Command::new(&self.engine)
            .arg("--job")
            .arg(&job_path)
            .output()
            .map_err(|e| Error::ExternalTool {
                tool: self.tool_name(),
                reason: format!("failed to start: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExternalTool {
                tool: self.tool_name(),
                reason: format!("{} ({})", output.status, stderr.trim()),
            });
        }
        Ok(())
    }
}

/// Resolution and engine options shared by every layer of a run.
#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub engine: String,
    pub device: String,
    pub samples: u32,
}

/// Render one layer template into `<work_dir>/<layer>/<id>` and return that dir.
///
/// PNGs left over from a previous run are removed first so the scanned
/// sequence only holds this run's frames.
pub fn render_layer(
    renderer: &dyn SceneRenderer,
    template: &LoadedTemplate,
    settings: &RenderSettings,
    work_dir: &Path,
    assets: &JobAssets,
) -> Result<PathBuf> {
    let output_dir = work_dir
        .join(template.layer.dir_name())
        .join(&template.id);
    clear_pngs(&output_dir)?;

    let job = RenderJob {
        version: JOB_VERSION,
        layer: template.layer,
        template: template.id.clone(),
        project: template.project_path(),
        output_dir: output_dir.clone(),
        frame_start: 1,
        frame_end: template.manifest.frames,
        width: settings.width,
        height: settings.height,
        engine: settings.engine.clone(),
        device: settings.device.clone(),
        samples: settings.samples,
        assets: assets.clone(),
    };
    renderer.render(&job)?;
    Ok(output_dir)
}

/// Write the images templates may reference into `dir`: the cover as
/// `avatar.png`, a blurred copy as `avatar-blur.png` and, when given, the
/// rendered title card as `user-info.png`.
pub fn stage_assets(
    dir: &Path,
    cover: &RgbaImage,
    blur_radius: f32,
    user_info: Option<&RgbaImage>,
) -> Result<JobAssets> {
    std::fs::create_dir_all(dir)?;

    let avatar = dir.join("avatar.png");
    cover.save(&avatar)?;

    let avatar_blurred = dir.join("avatar-blur.png");
    if blur_radius > 0.0 {
        imageops::fast_blur(cover, blur_radius).save(&avatar_blurred)?;
    } else {
        cover.save(&avatar_blurred)?;
    }

    let user_info = match user_info {
        Some(card) => {
            let path = dir.join("user-info.png");
            card.save(&path)?;
            Some(path)
        }
        None => None,
    };

    Ok(JobAssets {
        avatar: Some(avatar),
        avatar_blurred: Some(avatar_blurred),
        user_info,
    })
}

fn clear_pngs(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("png")) {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}
