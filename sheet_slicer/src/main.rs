// Command-line front end: loads a sheet, runs the parallel pipeline and
// optionally hands the exported frames to a texture packer.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use sheet_slicer::config::{FinderMode, FrameLayout, SlicerConfig, TransparencyMode};
use sheet_slicer::core_modules::guide_mask::GuideColor;
use sheet_slicer::external::{CommandTexturePacker, PackRequest, TesseractLabelReader, TexturePacker};
use sheet_slicer::frames_map::FramesMap;
use sheet_slicer::{BlockExporter, ParallelPipeline, SheetPipeline, SpriteSheet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GuideArg {
    Magenta,
    Pink,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FinderArg {
    Auto,
    Closed,
    Contour,
    Open,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackgroundArg {
    Hsv,
    Colorkey,
    None,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FramesArg {
    Nested,
    Flat,
    None,
}

/// Segment a hand-painted spritesheet into animation blocks and frames.
#[derive(Parser, Debug)]
#[command(name = "sheet-slicer", version, about)]
struct Cli {
    /// Sheet image to slice.
    #[arg(short, long, value_name = "PNG")]
    input: PathBuf,

    /// Output directory (default: out/<sheet stem>, with a -transparent suffix
    /// when transparency is on).
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// TOML configuration file; flags below override it.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    guide_color: Option<GuideArg>,

    #[arg(long, value_enum)]
    finder: Option<FinderArg>,

    /// Background model used to make block crops transparent.
    #[arg(long, value_enum)]
    transparent_bg: Option<BackgroundArg>,

    /// Export per-frame images.
    #[arg(long, value_enum)]
    frames: Option<FramesArg>,

    /// JSON file naming the frames of each block.
    #[arg(long, value_name = "FILE")]
    frames_map: Option<PathBuf>,

    /// Fail when a detected block has no frames-map entry.
    #[arg(long)]
    strict_frames_map: bool,

    /// Trim transparent borders off exported frames.
    #[arg(long)]
    trim: bool,

    /// Export the label strip under every block.
    #[arg(long)]
    labels: bool,

    /// Read label text with tesseract.
    #[arg(long)]
    ocr: bool,

    #[arg(long, value_name = "BIN", default_value = "tesseract")]
    ocr_bin: PathBuf,

    /// Pack the exported frames into an atlas.
    #[arg(long)]
    pack: bool,

    #[arg(long, value_name = "BIN", default_value = "TexturePacker")]
    packer_bin: PathBuf,

    /// Atlas data file (default: <out>/atlas/<stem>.json).
    #[arg(long, value_name = "FILE")]
    atlas_json: Option<PathBuf>,

    /// Atlas image file (default: <out>/atlas/<stem>.png).
    #[arg(long, value_name = "FILE")]
    atlas_png: Option<PathBuf>,

    #[arg(long, value_name = "N", default_value_t = 4096)]
    max_size: u32,

    /// Worker count, 0 for one per CPU.
    #[arg(short = 'j', long, value_name = "N")]
    workers: Option<usize>,

    /// Inward margin applied to every candidate box.
    #[arg(long, value_name = "N")]
    shrink_px: Option<u32>,

    #[arg(long, value_name = "N")]
    min_area: Option<u64>,

    #[arg(long, value_name = "N")]
    min_sprite_pixels: Option<u64>,

    /// Elliptical kernel size used by grid inference.
    #[arg(long, value_name = "N")]
    grid_kernel: Option<u32>,

    /// 1-D closing window used by grid inference.
    #[arg(long, value_name = "N")]
    grid_close_k: Option<u32>,

    /// HSV background: maximum value.
    #[arg(long, value_name = "N")]
    bg_v_max: Option<u8>,

    /// HSV background: maximum saturation.
    #[arg(long, value_name = "N")]
    bg_s_max: Option<u8>,

    /// Odd Gaussian kernel size for alpha feathering, 0 to disable.
    #[arg(long, value_name = "N")]
    alpha_blur: Option<u32>,
}

impl Cli {
    /// Applies the flags on top of `config`.
    fn apply(&self, config: &mut SlicerConfig) {
        if let Some(color) = self.guide_color {
            config.guide_color = match color {
                GuideArg::Magenta => GuideColor::Magenta,
                GuideArg::Pink => GuideColor::Pink,
            };
        }
        if let Some(finder) = self.finder {
            config.finder = match finder {
                FinderArg::Auto => FinderMode::Auto,
                FinderArg::Closed => FinderMode::Closed,
                FinderArg::Contour => FinderMode::Contour,
                FinderArg::Open => FinderMode::Open,
            };
        }
        if let Some(background) = self.transparent_bg {
            config.transparency.mode = match background {
                BackgroundArg::Hsv => TransparencyMode::Hsv,
                BackgroundArg::Colorkey => TransparencyMode::Colorkey,
                BackgroundArg::None => TransparencyMode::None,
            };
        }
        if let Some(frames) = self.frames {
            config.export.frames = match frames {
                FramesArg::Nested => FrameLayout::Nested,
                FramesArg::Flat => FrameLayout::Flat,
                FramesArg::None => FrameLayout::None,
            };
        }
        config.export.strict_frames_map |= self.strict_frames_map;
        config.export.trim.enabled |= self.trim;
        config.export.labels |= self.labels;

        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(margin) = self.shrink_px {
            config.acceptance.margin = margin;
        }
        if let Some(min_area) = self.min_area {
            config.acceptance.min_area = min_area;
        }
        if let Some(pixels) = self.min_sprite_pixels {
            config.acceptance.min_sprite_pixels = pixels;
        }
        if let Some(kernel) = self.grid_kernel {
            config.grid.kernel = kernel;
        }
        if let Some(window) = self.grid_close_k {
            config.grid.close_window = window;
        }
        if let Some(value) = self.bg_v_max {
            config.transparency.hsv.value_max = value;
        }
        if let Some(saturation) = self.bg_s_max {
            config.transparency.hsv.saturation_max = saturation;
        }
        if let Some(blur) = self.alpha_blur {
            config.transparency.smoothing.alpha_blur = blur;
        }
    }
}

fn sheet_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet".to_string())
}

fn default_out_dir(input: &Path, config: &SlicerConfig) -> PathBuf {
    let mut name = sheet_stem(input);
    if config.transparency.mode != TransparencyMode::None {
        name.push_str("-transparent");
    }
    Path::new("out").join(name)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SlicerConfig::from_toml_file(path)?,
        None => SlicerConfig::default(),
    };
    cli.apply(&mut config);
    if cli.pack && config.export.frames == FrameLayout::None {
        info!("packing needs frames; exporting them flat");
        config.export.frames = FrameLayout::Flat;
    }

    let out_dir = cli.out_dir.clone().unwrap_or_else(|| default_out_dir(&cli.input, &config));
    let frames_map = cli
        .frames_map
        .as_deref()
        .map(FramesMap::from_json_file)
        .transpose()?;

    let sheet = SpriteSheet::open(&cli.input)?;
    info!(
        input = %cli.input.display(),
        width = sheet.width(),
        height = sheet.height(),
        "sheet loaded"
    );

    let mut pipeline = SheetPipeline::new(config.clone())?;
    if cli.ocr {
        pipeline = pipeline.with_label_reader(Box::new(TesseractLabelReader::new(&cli.ocr_bin)));
    }
    let exporter = Arc::new(BlockExporter::new(&out_dir, config.export.clone(), frames_map));
    let manifest = ParallelPipeline::new(pipeline)
        .run(Arc::new(sheet), &cli.input, Arc::clone(&exporter))
        .await
        .with_context(|| format!("slicing {}", cli.input.display()))?;

    if cli.pack {
        let stem = sheet_stem(&cli.input);
        let request = PackRequest {
            frames_dir: exporter.frames_dir(),
            data_path: cli
                .atlas_json
                .clone()
                .unwrap_or_else(|| out_dir.join("atlas").join(format!("{stem}.json"))),
            sheet_path: cli
                .atlas_png
                .clone()
                .unwrap_or_else(|| out_dir.join("atlas").join(format!("{stem}.png"))),
            max_size: cli.max_size,
        };
        CommandTexturePacker::new(&cli.packer_bin)
            .pack(&request)
            .context("packing atlas")?;
        println!("Atlas: {}", request.data_path.display());
    }

    println!("Extracted {} blocks", manifest.blocks.len());
    println!("Manifest: {}", exporter.manifest_path().display());
    println!("Blocks needing review: {}", manifest.review_count());
    Ok(())
}
