use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current `RenderJob` schema version.
pub const JOB_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Scene,
    UserInfo,
    Overlay,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Scene, LayerKind::UserInfo, LayerKind::Overlay];

    /// Sub-directory of the templates root holding this layer's templates.
    pub fn dir_name(self) -> &'static str {
        match self {
            LayerKind::Scene => "scene",
            LayerKind::UserInfo => "user_info",
            LayerKind::Overlay => "overlay",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayerKind::Scene => "scene",
            LayerKind::UserInfo => "user-info",
            LayerKind::Overlay => "overlay",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TemplateManifest {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Scene file handed to the renderer, relative to the template directory.
    #[serde(default = "default_project")]
    pub project: String,
    /// Number of frames the template animates over.
    pub frames: u32,
}

fn default_project() -> String {
    "project.blend".to_string()
}

/// Images produced by this tool that a template may reference.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAssets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_blurred: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<PathBuf>,
}

/// Descriptor handed to the external scene renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub version: u32,
    pub layer: LayerKind,
    pub template: String,
    pub project: PathBuf,
    pub output_dir: PathBuf,
    /// Inclusive, 1-based.
    pub frame_start: u32,
    pub frame_end: u32,
    pub width: u32,
    pub height: u32,
    pub engine: String,
    pub device: String,
    pub samples: u32,
    #[serde(default)]
    pub assets: JobAssets,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_defaults() {
        let m: TemplateManifest =
            serde_json::from_str(r#"{"name":"neon","display_name":"Neon","frames":120}"#).unwrap();
        assert_eq!(m.project, "project.blend");
        assert!(m.description.is_empty());
        assert_eq!(m.frames, 120);
    }

    #[test]
    fn job_json_shape() {
        let job = RenderJob {
            version: JOB_VERSION,
            layer: LayerKind::UserInfo,
            template: "plain".into(),
            project: PathBuf::from("templates/user_info/plain/project.blend"),
            output_dir: PathBuf::from("renders/user_info/plain"),
            frame_start: 1,
            frame_end: 60,
            width: 720,
            height: 1280,
            engine: "CYCLES".into(),
            device: "CUDA".into(),
            samples: 64,
            assets: JobAssets {
                user_info: Some(PathBuf::from("assets/user-info.png")),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["layer"], "user_info");
        assert_eq!(value["assets"]["user_info"], "assets/user-info.png");
        assert!(value["assets"].get("avatar").is_none());

        let back: RenderJob = serde_json::from_value(value).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn layer_names() {
        assert_eq!(LayerKind::UserInfo.dir_name(), "user_info");
        assert_eq!(LayerKind::UserInfo.label(), "user-info");
    }
}
