use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to decode audio {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("signal is flat at stage '{stage}': cannot normalize a zero range")]
    FlatSignal { stage: &'static str },

    #[error("audio contains no samples")]
    EmptySignal,

    #[error("resampling to {rate}Hz failed: {reason}")]
    Resample { rate: u32, reason: String },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("invalid bin count {requested} for a curve of {len} values")]
    InvalidBinCount { requested: usize, len: usize },

    #[error("no frames found for layer '{layer}' in {dir}")]
    LayerSequenceMissing { layer: &'static str, dir: PathBuf },

    #[error("frame {index}: {reason}")]
    FrameWrite { index: u64, reason: String },

    #[error("blob of {len} bytes is not a whole number of float32 values")]
    MalformedBlob { len: usize },

    #[error("template error: {0}")]
    Template(String),

    #[error("{tool} failed: {reason}")]
    ExternalTool { tool: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
