// THEORY:
// The `pipeline` module is the top-level API of the slicing engine. It wires the
// stages together in one place:
//
//     sheet -> guide mask -> box finder -> (per block) crop -> transparency
//           -> grid inference -> label lookup -> export -> manifest
//
// Everything up to the box list is computed once per sheet (`analyze`). After
// that every block is independent: `process_block` reads only immutable inputs
// and produces a self-contained result. `SheetPipeline::run` walks the blocks in
// order on the calling thread; `ParallelPipeline` runs the very same
// `process_block` on a worker pool.

use crate::config::SlicerConfig;
use crate::core_modules::block_box::BlockBox;
use crate::core_modules::block_info::BlockInfo;
use crate::core_modules::box_finder::{build_finder, BoxFinder, FinderInput};
use crate::core_modules::grid_inferer::GridInferer;
use crate::core_modules::guide_mask::extract_guide_mask;
use crate::core_modules::label_region::LabelRegionLocator;
use crate::core_modules::mask::Mask;
use crate::core_modules::sprite_sheet::SpriteSheet;
use crate::core_modules::transparency::TransparencyEstimator;
use crate::error::SlicerResult;
use crate::exporter::{BlockExporter, LabelCrop};
use crate::external::{LabelReader, NoopLabelReader};
use crate::manifest::Manifest;
use image::RgbaImage;
use std::path::Path;
use tracing::{info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::grid_inferer::GridEstimate;
pub use crate::manifest::ManifestBlock;

/// Sheet-level results shared by every block.
#[derive(Debug, Clone)]
pub struct SheetAnalysis {
    pub guide: Mask,
    pub sprite: Mask,
    /// Accepted block interiors in reading order.
    pub boxes: Vec<BlockBox>,
}

/// One block after transparency, grid inference and label lookup.
#[derive(Debug, Clone)]
pub struct ProcessedBlock {
    pub info: BlockInfo,
    pub grid: GridEstimate,
    pub image: RgbaImage,
    /// Whether `image` carries meaningful alpha.
    pub has_alpha: bool,
    pub label: Option<LabelCrop>,
}

/// The main, top-level struct for the slicing engine.
pub struct SheetPipeline {
    config: SlicerConfig,
    finder: Box<dyn BoxFinder>,
    grid: GridInferer,
    transparency: TransparencyEstimator,
    labels: LabelRegionLocator,
    label_reader: Box<dyn LabelReader>,
}

impl SheetPipeline {
    pub fn new(config: SlicerConfig) -> SlicerResult<Self> {
        config.validate()?;
        Ok(Self {
            finder: build_finder(&config),
            grid: GridInferer::new(config.grid.clone(), config.sprite),
            transparency: TransparencyEstimator::from_config(&config.transparency),
            labels: LabelRegionLocator::new(config.label.clone()),
            label_reader: Box::new(NoopLabelReader),
            config,
        })
    }

    pub fn with_label_reader(mut self, reader: Box<dyn LabelReader>) -> Self {
        self.label_reader = reader;
        self
    }

    pub fn config(&self) -> &SlicerConfig {
        &self.config
    }

    /// Guide mask, sprite mask and the sorted block boxes of `sheet`.
    pub fn analyze(&self, sheet: &SpriteSheet) -> SheetAnalysis {
        let guide = extract_guide_mask(sheet.rgba(), self.config.guide_color);
        let sprite = sheet.sprite_mask(&self.config.sprite);
        let boxes = self.finder.find(&FinderInput {
            guide: &guide,
            sprite: &sprite,
        });
        info!(
            finder = self.finder.name(),
            blocks = boxes.len(),
            width = sheet.width(),
            height = sheet.height(),
            "sheet analysed"
        );
        SheetAnalysis { guide, sprite, boxes }
    }

    /// Crop, transparency, grid and label for the block at `index`.
    pub fn process_block(&self, sheet: &SpriteSheet, guide: &Mask, index: usize, bounds: BlockBox) -> ProcessedBlock {
        let crop = sheet.crop(&bounds);
        let (image, has_alpha) = if self.transparency.is_enabled() {
            (self.transparency.apply(&crop), true)
        } else {
            let has_alpha = sheet.has_alpha() && crop.pixels().any(|p| p[3] < u8::MAX);
            (crop, has_alpha)
        };

        let grid = self.grid.infer_crop(&image, has_alpha);
        let info = BlockInfo::new(index, bounds, &grid);
        if info.needs_review {
            warn!(
                key = %info.key,
                rows = info.rows,
                cols = info.cols,
                "grid needs review"
            );
        }

        let label = self.labels.locate(guide, &bounds).map(|region| {
            let image = sheet.crop(&region);
            let text = self.label_reader.read(&image);
            LabelCrop {
                bounds: region,
                image,
                text,
            }
        });

        ProcessedBlock {
            info,
            grid,
            image,
            has_alpha,
            label,
        }
    }

    /// Processes every block of `sheet` in order, validates the run against
    /// the exporter, then exports the blocks and writes the manifest.
    pub fn run(&self, sheet: &SpriteSheet, source: &Path, exporter: &BlockExporter) -> SlicerResult<Manifest> {
        let analysis = self.analyze(sheet);
        let processed: Vec<ProcessedBlock> = analysis
            .boxes
            .iter()
            .enumerate()
            .map(|(index, bounds)| self.process_block(sheet, &analysis.guide, index, *bounds))
            .collect();
        validate_run(&processed, exporter)?;

        let mut blocks = Vec::with_capacity(processed.len());
        for block in processed {
            blocks.push(exporter.export(&block.info, &block.image, block.has_alpha, block.label)?);
        }
        finish_run(source, blocks, exporter)
    }
}

/// Fails before any file is written when the exporter rejects a block.
pub(crate) fn validate_run(processed: &[ProcessedBlock], exporter: &BlockExporter) -> SlicerResult<()> {
    let infos: Vec<BlockInfo> = processed.iter().map(|block| block.info.clone()).collect();
    exporter.validate(&infos)
}

/// Writes the manifest and logs the run summary.
pub(crate) fn finish_run(source: &Path, blocks: Vec<ManifestBlock>, exporter: &BlockExporter) -> SlicerResult<Manifest> {
    let manifest = Manifest::new(source, blocks);
    let path = exporter.manifest_path();
    manifest.write(&path)?;
    info!(
        blocks = manifest.blocks.len(),
        needs_review = manifest.review_count(),
        manifest = %path.display(),
        "run finished"
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AcceptanceConfig, TransparencyMode};
    use crate::error::SlicerError;
    use crate::frames_map::FramesMap;
    use image::Rgba;

    const CANVAS: Rgba<u8> = Rgba([20, 20, 20, 255]);
    const GUIDE: Rgba<u8> = Rgba([255, 0, 255, 255]);
    const PAINT: Rgba<u8> = Rgba([200, 120, 40, 255]);

    /// One closed block at (10, 10) 120×60 holding two 30 px poses.
    fn sheet() -> SpriteSheet {
        let image = RgbaImage::from_fn(150, 90, |x, y| {
            let inside = (10..130).contains(&x) && (10..70).contains(&y);
            let frame = (8..132).contains(&x) && (8..72).contains(&y) && !inside;
            let pose = (20..50).contains(&y) && ((20..50).contains(&x) || (80..110).contains(&x));
            if frame {
                GUIDE
            } else if pose {
                PAINT
            } else {
                CANVAS
            }
        });
        SpriteSheet::from_rgba(image, false)
    }

    fn config() -> SlicerConfig {
        let mut config = SlicerConfig::default();
        config.acceptance = AcceptanceConfig {
            margin: 2,
            min_area: 1_000,
            min_sprite_pixels: 500,
        };
        config
    }

    #[test]
    fn analyze_finds_the_block() {
        let pipeline = SheetPipeline::new(config()).expect("valid config");
        let analysis = pipeline.analyze(&sheet());
        assert_eq!(analysis.boxes, vec![BlockBox::new(12, 12, 116, 56).expect("box")]);
    }

    #[test]
    fn process_block_infers_two_columns() {
        let mut config = config();
        config.transparency.mode = TransparencyMode::None;
        let pipeline = SheetPipeline::new(config).expect("valid config");
        let sheet = sheet();
        let analysis = pipeline.analyze(&sheet);
        let block = pipeline.process_block(&sheet, &analysis.guide, 0, analysis.boxes[0]);
        assert_eq!((block.info.rows, block.info.cols), (1, 2));
        assert_eq!(block.info.frame_width, 58);
        assert!(!block.has_alpha);
        assert_eq!(block.image.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn transparency_produces_alpha() {
        let pipeline = SheetPipeline::new(config()).expect("valid config");
        let sheet = sheet();
        let analysis = pipeline.analyze(&sheet);
        let block = pipeline.process_block(&sheet, &analysis.guide, 0, analysis.boxes[0]);
        assert!(block.has_alpha);
        assert_eq!(block.image.get_pixel(0, 0)[3], 0);
        assert_eq!(block.image.get_pixel(10, 10)[3], 255);
        assert_eq!((block.info.rows, block.info.cols), (1, 2));
    }

    #[test]
    fn strict_map_failure_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("out");
        let mut config = config();
        config.export.strict_frames_map = true;
        let exporter = BlockExporter::new(&out, config.export.clone(), Some(FramesMap::default()));

        let result = SheetPipeline::new(config)
            .expect("valid config")
            .run(&sheet(), Path::new("sheet.png"), &exporter);
        assert!(matches!(result, Err(SlicerError::MissingFramesMapEntry { .. })));
        assert!(!out.exists());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config();
        config.transparency.colorkey.clusters = 0;
        assert!(SheetPipeline::new(config).is_err());
    }
}
