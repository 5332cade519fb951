use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use super::manifest::{LayerKind, TemplateManifest};
use crate::error::{Error, Result};

pub struct LoadedTemplate {
    pub id: String,
    pub layer: LayerKind,
    pub dir: PathBuf,
    pub manifest: TemplateManifest,
}

impl LoadedTemplate {
    pub fn project_path(&self) -> PathBuf {
        self.dir.join(&self.manifest.project)
    }
}

/// Discover the templates root: next to the executable, then its parents
/// (target/debug layout), then `CARGO_MANIFEST_DIR`.
pub fn find_templates_dir() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));

    if let Some(dir) = exe_dir {
        for candidate in dir.ancestors().take(3) {
            let templates_dir = candidate.join("templates");
            if templates_dir.is_dir() {
                return templates_dir;
            }
        }
    }

    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// Template ids available for `layer`, sorted.
pub fn list_templates(root: &Path, layer: LayerKind) -> Result<Vec<String>> {
    let dir = root.join(layer.dir_name());
    let mut ids = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() && entry.path().join("manifest.json").exists() {
                if let Some(id) = entry.file_name().to_str() {
                    ids.push(id.to_string());
                }
            }
        }
    }
    ids.sort_by(|a, b| natural_cmp(a, b));
    Ok(ids)
}

/// Template id that asks for a random pick among the installed templates.
pub const RANDOM_TEMPLATE: &str = "random";

/// Resolve a requested id. `random` draws one of the templates installed
/// for `layer`; any other id is returned as is.
pub fn resolve_template_id(
    root: &Path,
    layer: LayerKind,
    requested: &str,
    rng: &mut fastrand::Rng,
) -> Result<String> {
    if requested != RANDOM_TEMPLATE {
        return Ok(requested.to_string());
    }
    let ids = list_templates(root, layer)?;
    if ids.is_empty() {
        return Err(Error::Template(format!(
            "no {} templates in {} to pick from",
            layer.label(),
            root.display()
        )));
    }
    let id = ids[rng.usize(..ids.len())].clone();
    log::info!("Picked {} template '{}' at random", layer.label(), id);
    Ok(id)
}

pub fn load_template(root: &Path, layer: LayerKind, id: &str) -> Result<LoadedTemplate> {
    let dir = root.join(layer.dir_name()).join(id);
    if !dir.is_dir() {
        return Err(Error::Template(format!(
            "{} template '{}' not found. Available: {:?}",
            layer.label(),
            id,
            list_templates(root, layer).unwrap_or_default()
        )));
    }

    let manifest_path = dir.join("manifest.json");
    let manifest_str = std::fs::read_to_string(&manifest_path).map_err(|e| {
        Error::Template(format!("failed to read {}: {e}", manifest_path.display()))
    })?;
    let manifest: TemplateManifest = serde_json::from_str(&manifest_str).map_err(|e| {
        Error::Template(format!("failed to parse {}: {e}", manifest_path.display()))
    })?;
    if manifest.frames == 0 {
        return Err(Error::Template(format!(
            "{}: 'frames' must be at least 1",
            manifest_path.display()
        )));
    }

    if manifest.name != id {
        log::warn!(
            "{} template '{}' declares name '{}'",
            layer.label(),
            id,
            manifest.name
        );
    }

    Ok(LoadedTemplate {
        id: id.to_string(),
        layer,
        dir,
        manifest,
    })
}

/// PNG files in `dir`, in natural order. A missing directory yields no frames.
pub fn scan_sequence(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            frames.push(path);
        }
    }
    frames.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
    Ok(frames)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compare strings with digit runs ordered by numeric value, so `frame2`
/// sorts before `frame10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.as_bytes();
    let mut b = b.as_bytes();

    loop {
        match (a.first(), b.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (na, rest_a) = split_digits(a);
                let (nb, rest_b) = split_digits(b);
                let ord = cmp_digit_runs(na, nb);
                if ord != Ordering::Equal {
                    return ord;
                }
                a = rest_a;
                b = rest_b;
            }
            (Some(x), Some(y)) => {
                let ord = x.cmp(y);
                if ord != Ordering::Equal {
                    return ord;
                }
                a = &a[1..];
                b = &b[1..];
            }
        }
    }
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s.iter().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Numeric comparison of arbitrary-length digit runs; ties broken by run
/// length so `007` and `7` still have a stable order.
fn cmp_digit_runs(a: &[u8], b: &[u8]) -> Ordering {
    let ta = trim_zeros(a);
    let tb = trim_zeros(b);
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}

fn trim_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&c| c != b'0').unwrap_or(s.len());
    &s[start..]
}
