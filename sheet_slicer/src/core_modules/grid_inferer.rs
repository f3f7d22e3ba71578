// THEORY:
// The `GridInferer` recovers the frame grid of one animation block from where
// its pixels are. It never looks for drawn cell lines; it looks for the empty
// gutters between poses.
//
// Algorithm steps:
// 1.  **Content mask**: alpha above a threshold when the crop's alpha was
//     computed, otherwise the permissive sprite-pixel test.
// 2.  **Consolidation**: dilate then close with a small round kernel so that the
//     loose strokes of one pose form a single mass.
// 3.  **Projection**: count content per column and per row. A column whose count
//     is at (or under) a tiny noise floor is a gap.
// 4.  **Stabilisation**: the content flags are closed along their axis so narrow
//     gaps inside a pose do not split it.
// 5.  **Segmentation**: runs of content of a minimum length are frames. Their
//     counts give the grid; the frame size is the block size divided evenly.
//
// The inferer never fails. When the result is doubtful (no content, frames that
// do not tile the block, uneven frame widths, absurd counts) the best-effort grid
// is returned with `needs_review` set.

use crate::config::{GridConfig, SpriteThresholds};
use crate::core_modules::mask::{close_1d, runs, Kernel, Mask};
use crate::core_modules::sprite_sheet::sprite_mask;
use image::RgbaImage;
use tracing::debug;

/// Result of grid inference for one block.
#[derive(Debug, Clone, PartialEq)]
pub struct GridEstimate {
    pub rows: u32,
    pub cols: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub needs_review: bool,
    /// Column content runs `(start, end)` in block coordinates.
    pub col_segments: Vec<(u32, u32)>,
    /// Row content runs `(start, end)` in block coordinates.
    pub row_segments: Vec<(u32, u32)>,
}

impl GridEstimate {
    /// The single-cell fallback covering the whole block.
    pub fn whole_block(width: u32, height: u32) -> Self {
        Self {
            rows: 1,
            cols: 1,
            frame_width: width,
            frame_height: height,
            needs_review: true,
            col_segments: Vec::new(),
            row_segments: Vec::new(),
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.rows * self.cols
    }
}

#[derive(Debug, Clone)]
pub struct GridInferer {
    config: GridConfig,
    sprite: SpriteThresholds,
}

impl GridInferer {
    pub fn new(config: GridConfig, sprite: SpriteThresholds) -> Self {
        Self { config, sprite }
    }

    /// Pixels that belong to a pose. `alpha_known` selects the alpha test.
    pub fn content_mask(&self, crop: &RgbaImage, alpha_known: bool) -> Mask {
        if alpha_known {
            let threshold = self.config.alpha_threshold;
            Mask::from_fn(crop.width(), crop.height(), |x, y| crop.get_pixel(x, y)[3] > threshold)
        } else {
            sprite_mask(crop, &self.sprite)
        }
    }

    pub fn infer_crop(&self, crop: &RgbaImage, alpha_known: bool) -> GridEstimate {
        self.infer(&self.content_mask(crop, alpha_known))
    }

    pub fn infer(&self, content: &Mask) -> GridEstimate {
        let (width, height) = content.dimensions();
        if width == 0 || height == 0 {
            return GridEstimate::whole_block(width, height);
        }

        let kernel = Kernel::ellipse(self.config.kernel);
        let mass = content.dilate(kernel).close(kernel);

        let mut col_sums = vec![0u32; width as usize];
        let mut row_sums = vec![0u32; height as usize];
        for y in 0..height {
            for x in 0..width {
                if mass.get(x, y) {
                    col_sums[x as usize] += 1;
                    row_sums[y as usize] += 1;
                }
            }
        }

        let col_segments = self.segments(&col_sums, height);
        let row_segments = self.segments(&row_sums, width);
        let (cols, rows) = (col_segments.len() as u32, row_segments.len() as u32);

        if cols == 0 || rows == 0 {
            debug!(width, height, "no content bands; single-cell fallback");
            return GridEstimate::whole_block(width, height);
        }

        let frame_width = (width as f64 / cols as f64).round_ties_even() as u32;
        let frame_height = (height as f64 / rows as f64).round_ties_even() as u32;
        if frame_width == 0 || frame_height == 0 {
            return GridEstimate::whole_block(width, height);
        }

        let tolerance = self.config.size_tolerance as i64;
        let mut needs_review = (frame_width as i64 * cols as i64 - width as i64).abs() > tolerance
            || (frame_height as i64 * rows as i64 - height as i64).abs() > tolerance;
        needs_review |= self.irregular(&col_segments) || self.irregular(&row_segments);
        needs_review |= cols > self.config.max_cells || rows > self.config.max_cells;

        debug!(
            rows,
            cols,
            frame_width,
            frame_height,
            needs_review,
            ?col_segments,
            ?row_segments,
            "grid inferred"
        );

        GridEstimate {
            rows,
            cols,
            frame_width,
            frame_height,
            needs_review,
            col_segments,
            row_segments,
        }
    }

    /// Content runs of one projection. `cross_len` is the length of the other
    /// axis, which sets the gap floor.
    fn segments(&self, sums: &[u32], cross_len: u32) -> Vec<(u32, u32)> {
        let floor = ((cross_len as f64 * self.config.gap_fraction).floor() as u32).max(1);
        let content: Vec<bool> = sums.iter().map(|&s| s > floor).collect();
        let content = close_1d(&content, self.config.close_window as usize);
        runs(&content)
            .into_iter()
            .filter(|(start, end)| end - start >= self.config.min_segment as usize)
            .map(|(start, end)| (start as u32, end as u32))
            .collect()
    }

    fn irregular(&self, segments: &[(u32, u32)]) -> bool {
        if segments.is_empty() {
            return false;
        }
        let lengths: Vec<f64> = segments.iter().map(|(s, e)| (e - s) as f64).collect();
        let n = lengths.len() as f64;
        let mean = lengths.iter().sum::<f64>() / n;
        let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt() > self.config.irregular_min.max(mean * self.config.irregular_ratio)
    }
}
