// THEORY:
// The exporter owns the output directory layout:
//
//     <out>/blocks/block_NNN.png
//     <out>/frames/block_NNN/r<row>_c<col>.png      (nested)
//     <out>/frames/block_NNN_r<row>_c<col>.png      (flat)
//     <out>/labels/block_NNN.png
//     <out>/manifest.json
//
// A frames-map entry replaces the grid names with `<name>_<direction>_<index>`.
// Every write creates its parent directory. The exporter is shared read-only by
// all block workers; each block writes only its own files.

use crate::config::{ExportConfig, FrameLayout};
use crate::core_modules::block_box::BlockBox;
use crate::core_modules::block_info::{BlockInfo, FrameCoordinate};
use crate::core_modules::transparency::trim_transparent;
use crate::core_modules::utils::image_helper::image_helper::save_png;
use crate::error::SlicerResult;
use crate::frames_map::FramesMap;
use crate::manifest::{LabelRecord, ManifestBlock};
use image::RgbaImage;
use std::path::PathBuf;
use tracing::debug;

/// A located label strip and what was read from it.
#[derive(Debug, Clone)]
pub struct LabelCrop {
    pub bounds: BlockBox,
    pub image: RgbaImage,
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BlockExporter {
    out_dir: PathBuf,
    config: ExportConfig,
    frames_map: Option<FramesMap>,
}

impl BlockExporter {
    pub fn new(out_dir: impl Into<PathBuf>, config: ExportConfig, frames_map: Option<FramesMap>) -> Self {
        Self {
            out_dir: out_dir.into(),
            config,
            frames_map,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.out_dir.join("manifest.json")
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.out_dir.join("frames")
    }

    /// Checks the frames map against every block of the run. Strict mode and
    /// the direction check apply whatever the frame layout, and nothing is
    /// written, so a failure leaves the output directory untouched.
    pub fn validate(&self, blocks: &[BlockInfo]) -> SlicerResult<()> {
        let Some(map) = &self.frames_map else {
            return Ok(());
        };
        for info in blocks {
            map.plan(info, self.config.strict_frames_map)?;
        }
        Ok(())
    }

    /// Writes every file of one block and returns its manifest entry.
    /// `has_alpha` tells whether `crop` carries meaningful alpha.
    pub fn export(
        &self,
        info: &BlockInfo,
        crop: &RgbaImage,
        has_alpha: bool,
        label: Option<LabelCrop>,
    ) -> SlicerResult<ManifestBlock> {
        let planned = self.planned_frames(info)?;
        let file = format!("blocks/{}.png", info.key);
        save_png(&self.out_dir.join(&file), crop)?;

        let frames = self.export_frames(info, crop, has_alpha, planned)?;
        let label = label.map(|label| self.export_label(info, label)).transpose()?;
        debug!(key = %info.key, frames = frames.len(), "block exported");

        Ok(ManifestBlock {
            info: info.clone(),
            file,
            label,
            frames,
        })
    }

    fn frame_path(&self, info: &BlockInfo, file_name: &str) -> Option<String> {
        match self.config.frames {
            FrameLayout::None => None,
            FrameLayout::Nested => Some(format!("frames/{}/{file_name}", info.key)),
            FrameLayout::Flat => Some(format!("frames/{}_{file_name}", info.key)),
        }
    }

    fn mapped_frame_path(&self, info: &BlockInfo, file_name: &str) -> Option<String> {
        match self.config.frames {
            FrameLayout::None => None,
            FrameLayout::Nested => Some(format!("frames/{}/{file_name}", info.key)),
            FrameLayout::Flat => Some(format!("frames/{file_name}")),
        }
    }

    fn planned_frames(&self, info: &BlockInfo) -> SlicerResult<Vec<(FrameCoordinate, String)>> {
        let mapped = match &self.frames_map {
            Some(map) => map.plan(info, self.config.strict_frames_map)?,
            None => None,
        };
        if self.config.frames == FrameLayout::None {
            return Ok(Vec::new());
        }
        Ok(match mapped {
            Some(named) => named
                .into_iter()
                .filter_map(|f| Some((f.coordinate, self.mapped_frame_path(info, &f.file_name)?)))
                .collect(),
            None => info
                .frames()
                .filter_map(|c| {
                    let name = format!("r{}_c{}.png", c.row, c.col);
                    Some((c, self.frame_path(info, &name)?))
                })
                .collect(),
        })
    }

    fn export_frames(
        &self,
        info: &BlockInfo,
        crop: &RgbaImage,
        has_alpha: bool,
        planned: Vec<(FrameCoordinate, String)>,
    ) -> SlicerResult<Vec<String>> {
        let mut written = Vec::new();
        for (coordinate, relative) in planned {
            let Some(frame) = info.slice_frame(crop, coordinate) else {
                continue;
            };
            let frame = if self.config.trim.enabled {
                trim_transparent(&frame, has_alpha, self.config.trim.alpha_threshold, self.config.trim.padding)?
            } else {
                frame
            };
            save_png(&self.out_dir.join(&relative), &frame)?;
            written.push(relative);
        }
        Ok(written)
    }

    fn export_label(&self, info: &BlockInfo, label: LabelCrop) -> SlicerResult<LabelRecord> {
        let file = if self.config.labels {
            let relative = format!("labels/{}.png", info.key);
            save_png(&self.out_dir.join(&relative), &label.image)?;
            Some(relative)
        } else {
            None
        };
        Ok(LabelRecord {
            bounds: label.bounds,
            file,
            text: label.text,
        })
    }
}
