// THEORY:
// Every numeric heuristic of the engine is a tuning knob, not an invariant. The
// defaults below were tuned against hand-painted sheets drawn on a dark canvas
// with saturated magenta guides; they are provisional and meant to be swept.
//
// The configuration is a plain tree of `serde` structs. Every struct carries
// `#[serde(default)]`, so a TOML file only needs to mention the values it
// changes. The CLI loads the file first and then applies its own flags on top.

use crate::core_modules::guide_mask::GuideColor;
use crate::error::{SlicerError, SlicerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How block boxes are recovered from the guide mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FinderMode {
    /// Guides form fully closed rectangles.
    Closed,
    /// Closed guides with gaps, recovered from the guide contours.
    Contour,
    /// Only a bottom rule plus right-hand ticks are drawn.
    Open,
    /// Try closed, then contour, then open until enough boxes are found.
    #[default]
    Auto,
}

/// Which background model turns a crop into an RGBA image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransparencyMode {
    /// Keep the crop as it is.
    None,
    /// Fixed HSV value/saturation cutoffs.
    Hsv,
    /// Cluster border colours and key them out.
    #[default]
    Colorkey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlphaMode {
    #[default]
    Straight,
    Premultiplied,
}

/// Layout of exported per-frame images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FrameLayout {
    /// Do not export frames.
    #[default]
    None,
    /// `frames/<block>/r<row>_c<col>.png`
    Nested,
    /// `frames/<block>_r<row>_c<col>.png`
    Flat,
}

/// Candidate acceptance shared by every box finder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// Inward margin (px) applied on every side before the interior checks.
    pub margin: u32,
    /// Minimum candidate area. Component pixel count for the closed finder,
    /// rectangle area for the contour and open finders.
    pub min_area: u64,
    /// Minimum count of sprite pixels inside the shrunk interior.
    pub min_sprite_pixels: u64,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            margin: 2,
            min_area: 10_000,
            min_sprite_pixels: 2_000,
        }
    }
}

/// The permissive "painted content" test: `V > value_min || S > saturation_min`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteThresholds {
    pub value_min: u8,
    pub saturation_min: u8,
}

impl Default for SpriteThresholds {
    fn default() -> Self {
        Self {
            value_min: 45,
            saturation_min: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Radius of the square closing applied to the guide mask (2 → 5×5).
    pub close_radius: u8,
    /// An outer candidate is dropped when it is more than this many times
    /// larger than a candidate it fully contains.
    pub nesting_ratio: f64,
    /// Bounding-box edge rows/columns with at least this share of guide
    /// pixels are stripped before acceptance.
    pub edge_strip_fraction: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            close_radius: 2,
            nesting_ratio: 4.0,
            edge_strip_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenConfig {
    /// Horizontal closing kernel length bridging gaps in bottom rules.
    pub horizontal_close: u32,
    /// Horizontal opening kernel length; shorter runs are discarded.
    pub horizontal_open: u32,
    /// Vertical closing kernel length for the column ticks.
    pub vertical_close: u32,
    /// Vertical opening kernel length; shorter ticks are discarded.
    pub vertical_open: u32,
    /// A row is a bottom-line candidate when its run pixels reach this
    /// fraction of the image width.
    pub row_fraction: f64,
    /// Qualifying rows closer than this merge into one line.
    pub line_merge_tolerance: u32,
    /// Minimum length of a horizontal segment on a bottom line.
    pub min_segment_length: u32,
    /// Allowed distance between a tick's bottom end and the line.
    pub y_tolerance: u32,
    /// Horizontal slack when testing whether a tick lies on a segment.
    pub x_slack: u32,
    /// Ticks closer than this are considered the same boundary.
    pub dedup_distance: u32,
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            horizontal_close: 15,
            horizontal_open: 41,
            vertical_close: 15,
            vertical_open: 21,
            row_fraction: 0.1,
            line_merge_tolerance: 3,
            min_segment_length: 40,
            y_tolerance: 6,
            x_slack: 4,
            dedup_distance: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Odd elliptical kernel used to dilate/close the content mask.
    pub kernel: u32,
    /// 1-D closing window stabilising row/column content bands.
    pub close_window: u32,
    /// Minimum run length of a content band.
    pub min_segment: u32,
    /// A projection sum at or below `max(1, floor(len * gap_fraction))` is a gap.
    pub gap_fraction: f64,
    /// Maximum mismatch between `frame * count` and the block size.
    pub size_tolerance: u32,
    /// Relative std-dev of band lengths above which cells are irregular.
    pub irregular_ratio: f64,
    /// Absolute std-dev floor (px) for the irregularity test.
    pub irregular_min: f64,
    /// More rows or columns than this is treated as noise.
    pub max_cells: u32,
    /// Alpha above this value counts as content when alpha is known.
    pub alpha_threshold: u8,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            kernel: 5,
            close_window: 7,
            min_segment: 6,
            gap_fraction: 0.002,
            size_tolerance: 4,
            irregular_ratio: 0.15,
            irregular_min: 2.0,
            max_cells: 64,
            alpha_threshold: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HsvBackgroundConfig {
    pub value_max: u8,
    pub saturation_max: u8,
}

impl Default for HsvBackgroundConfig {
    fn default() -> Self {
        Self {
            value_max: 40,
            saturation_max: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorkeyConfig {
    /// Thickness of the border band sampled for background colours.
    pub sample_border: u32,
    /// Below this many samples the crop median is used instead of clustering.
    pub min_samples: usize,
    /// Upper bound on cluster centres (never more than 6).
    pub clusters: usize,
    /// Required samples per centre; caps `k` at `samples / min_samples_per_center`.
    pub min_samples_per_center: usize,
    pub iterations: usize,
    /// Lab distance within which a pixel is a background candidate.
    pub radius: f32,
    /// Candidate components must reach this close to the crop edge.
    pub edge_touch: u32,
}

impl Default for ColorkeyConfig {
    fn default() -> Self {
        Self {
            sample_border: 4,
            min_samples: 32,
            clusters: 6,
            min_samples_per_center: 24,
            iterations: 12,
            radius: 22.0,
            edge_touch: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Cross-shaped closing radius applied to the foreground (0 disables).
    pub close_radius: u8,
    /// Cross-shaped dilation radius applied after closing (0 disables).
    pub dilate_radius: u8,
    /// Odd Gaussian kernel size used to feather the alpha (0 disables).
    pub alpha_blur: u32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            close_radius: 1,
            dilate_radius: 1,
            alpha_blur: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TransparencyConfig {
    pub mode: TransparencyMode,
    pub hsv: HsvBackgroundConfig,
    pub colorkey: ColorkeyConfig,
    pub smoothing: SmoothingConfig,
    pub alpha_mode: AlphaMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// How many rows below the block are searched for the separating line.
    pub search_window: u32,
    /// Height of the label crop.
    pub height: u32,
    /// Share of the block width covered by the label crop.
    pub width_fraction: f64,
    /// A row is a guide line when guide pixels cover this share of the width.
    pub line_fraction: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            search_window: 40,
            height: 48,
            width_fraction: 1.0,
            line_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    pub enabled: bool,
    /// Alpha at or below this value counts as transparent.
    pub alpha_threshold: u8,
    /// Symmetric padding kept around the trimmed content.
    pub padding: u32,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            alpha_threshold: 0,
            padding: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportConfig {
    pub frames: FrameLayout,
    pub trim: TrimConfig,
    /// Write the label region of every block.
    pub labels: bool,
    /// Abort when a detected block has no frames-map entry.
    pub strict_frames_map: bool,
}

/// Configuration for a whole slicing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerConfig {
    pub guide_color: GuideColor,
    pub finder: FinderMode,
    /// In `Auto` mode a strategy "succeeds" once it finds at least this many boxes.
    pub auto_min_boxes: usize,
    pub acceptance: AcceptanceConfig,
    pub sprite: SpriteThresholds,
    pub contour: ContourConfig,
    pub open: OpenConfig,
    pub grid: GridConfig,
    pub transparency: TransparencyConfig,
    pub label: LabelConfig,
    pub export: ExportConfig,
    /// Worker count for the parallel pipeline; 0 means one per CPU.
    pub workers: usize,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            guide_color: GuideColor::Magenta,
            finder: FinderMode::Auto,
            auto_min_boxes: 1,
            acceptance: AcceptanceConfig::default(),
            sprite: SpriteThresholds::default(),
            contour: ContourConfig::default(),
            open: OpenConfig::default(),
            grid: GridConfig::default(),
            transparency: TransparencyConfig::default(),
            label: LabelConfig::default(),
            export: ExportConfig::default(),
            workers: 0,
        }
    }
}

impl SlicerConfig {
    /// Reads a (possibly partial) TOML configuration file.
    pub fn from_toml_file(path: &Path) -> SlicerResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| SlicerError::io(path, e))?;
        let config: SlicerConfig = toml::from_str(&text).map_err(|source| SlicerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SlicerResult<()> {
        if self.transparency.colorkey.clusters == 0 || self.transparency.colorkey.clusters > 6 {
            return Err(SlicerError::InvalidConfig {
                message: format!(
                    "colorkey clusters must be within 1..=6, got {}",
                    self.transparency.colorkey.clusters
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.label.width_fraction) || self.label.width_fraction == 0.0 {
            return Err(SlicerError::InvalidConfig {
                message: format!(
                    "label width fraction must be within (0, 1], got {}",
                    self.label.width_fraction
                ),
            });
        }
        if self.grid.close_window == 0 || self.grid.min_segment == 0 {
            return Err(SlicerError::InvalidConfig {
                message: "grid close window and minimum segment must be positive".into(),
            });
        }
        Ok(())
    }

    /// Worker count with the "0 = one per CPU" rule applied.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}
