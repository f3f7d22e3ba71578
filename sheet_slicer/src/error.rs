// THEORY:
// Every fatal condition the slicer can hit is a variant of `SlicerError`. The
// engine never swallows configuration or I/O problems: a malformed sheet, a
// frames map that disagrees with the inferred grid, or a failing texture packer
// abort the run with a descriptive message. Degraded situations (OCR missing,
// an ambiguous grid) are not errors at all; they surface as empty labels and
// `needs_review` flags instead.

use std::path::PathBuf;
use thiserror::Error;

pub type SlicerResult<T> = Result<T, SlicerError>;

#[derive(Debug, Error)]
pub enum SlicerError {
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported channel count {channels} (expected 3 or 4)")]
    UnsupportedChannels { channels: u8 },

    #[error("failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "frames map entry for {key} declares {declared} directions but the block has {rows} rows"
    )]
    DirectionMismatch {
        key: String,
        declared: usize,
        rows: u32,
    },

    #[error("frames map has no entry for block {key} (strict mode)")]
    MissingFramesMapEntry { key: String },

    #[error("failed to parse frames map {path}: {source}")]
    FramesMapRead {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialise manifest: {source}")]
    ManifestSerialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("trim requested on an image without an alpha channel")]
    TrimWithoutAlpha,

    #[error("texture packer failed: {message}")]
    Packer { message: String },

    #[error("block worker failed: {message}")]
    Worker { message: String },
}

impl SlicerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SlicerError::Io {
            path: path.into(),
            source,
        }
    }
}
