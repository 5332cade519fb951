//! Scene templates and the external renderer that turns them into PNG sequences.
//!
//! Layout: `<root>/<layer>/<id>/manifest.json`, where `<layer>` is one of
//! `scene`, `user_info` or `overlay`.

pub mod engine;
pub mod loader;
pub mod manifest;

pub use engine::{render_layer, CommandRenderer, RenderSettings};
pub use manifest::{JobAssets, LayerKind};
