// THEORY:
// Two steps of the tool chain are delegated to external programs: packing frames
// into a texture atlas and reading the handwritten action labels. Both sit
// behind small traits so the pipeline never depends on a particular binary, and
// tests substitute in-process fakes.
//
// The two capabilities fail differently. Packing is requested explicitly and
// its output is the point of the run, so failure is fatal. Label reading is a
// convenience: a missing or failing OCR binary degrades to "no label" with a
// warning.

use crate::core_modules::utils::image_helper::image_helper::save_png;
use crate::error::{SlicerError, SlicerResult};
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// Where the atlas packer reads frames and writes its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequest {
    pub frames_dir: PathBuf,
    pub data_path: PathBuf,
    pub sheet_path: PathBuf,
    pub max_size: u32,
}

pub trait TexturePacker: Send + Sync {
    fn pack(&self, request: &PackRequest) -> SlicerResult<()>;
}

/// Runs a TexturePacker-compatible executable producing a multipack Phaser atlas.
#[derive(Debug, Clone)]
pub struct CommandTexturePacker {
    binary: PathBuf,
}

impl CommandTexturePacker {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Multipack output needs an `{n}` placeholder in the sheet name.
    fn sheet_template(sheet: &Path) -> PathBuf {
        let name = sheet.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if name.contains("{n") {
            return sheet.to_path_buf();
        }
        let stem = sheet.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let extension = sheet
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        sheet.with_file_name(format!("{stem}-{{n1}}{extension}"))
    }

    pub fn arguments(request: &PackRequest) -> Vec<String> {
        vec![
            "--format".into(),
            "phaser".into(),
            "--data".into(),
            request.data_path.display().to_string(),
            "--sheet".into(),
            Self::sheet_template(&request.sheet_path).display().to_string(),
            "--algorithm".into(),
            "MaxRects".into(),
            "--maxrects-heuristics".into(),
            "Best".into(),
            "--trim-sprite-names".into(),
            "--trim-mode".into(),
            "Crop".into(),
            "--disable-rotation".into(),
            "--max-size".into(),
            request.max_size.to_string(),
            "--multipack".into(),
            request.frames_dir.display().to_string(),
        ]
    }
}

impl TexturePacker for CommandTexturePacker {
    fn pack(&self, request: &PackRequest) -> SlicerResult<()> {
        for path in [&request.data_path, &request.sheet_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| SlicerError::io(parent, e))?;
            }
        }

        let status = Command::new(&self.binary)
            .args(Self::arguments(request))
            .status()
            .map_err(|e| SlicerError::Packer {
                message: format!("could not start {}: {e}", self.binary.display()),
            })?;
        if !status.success() {
            return Err(SlicerError::Packer {
                message: format!("{} exited with {status}", self.binary.display()),
            });
        }

        if request.data_path.exists() {
            info!(data = %request.data_path.display(), "atlas packed");
            return Ok(());
        }

        // Multipack sometimes names the data file after the sheet template.
        let data = &request.data_path;
        let stem = data.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let extension = data
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let fallback = data.with_file_name(format!("{stem}-{extension}"));
        if fallback.exists() {
            fs::rename(&fallback, data).map_err(|e| SlicerError::io(&fallback, e))?;
            return Ok(());
        }

        Err(SlicerError::Packer {
            message: format!("expected atlas data not found: {}", data.display()),
        })
    }
}

pub trait LabelReader: Send + Sync {
    /// The text of a label crop, or `None` when nothing could be read.
    fn read(&self, label: &RgbaImage) -> Option<String>;
}

/// Never reads anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLabelReader;

impl LabelReader for NoopLabelReader {
    fn read(&self, _label: &RgbaImage) -> Option<String> {
        None
    }
}

/// Runs `tesseract <file> stdout --psm 7` on a temporary PNG of the label.
#[derive(Debug, Clone)]
pub struct TesseractLabelReader {
    binary: PathBuf,
}

impl TesseractLabelReader {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for TesseractLabelReader {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl LabelReader for TesseractLabelReader {
    fn read(&self, label: &RgbaImage) -> Option<String> {
        let file = match tempfile::Builder::new().prefix("label-").suffix(".png").tempfile() {
            Ok(file) => file,
            Err(e) => {
                warn!("could not create a temporary label file: {e}");
                return None;
            }
        };
        if let Err(e) = save_png(file.path(), label) {
            warn!("could not write label image: {e}");
            return None;
        }

        let output = match Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .args(["--psm", "7"])
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                warn!(binary = %self.binary.display(), "OCR unavailable: {e}");
                return None;
            }
        };
        if !output.status.success() {
            warn!(status = %output.status, "OCR failed");
            return None;
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}
