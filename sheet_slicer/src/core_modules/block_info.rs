// THEORY:
// The `BlockInfo` module is the summary layer of the slicer. Where a `BlockBox`
// only says *where* an animation block is, a `BlockInfo` says *what* it is: its
// stable key, the frame grid inside it and whether a human should look at it.
//
// Key architectural principles:
// 1.  **Stable identity**: the key is derived from the block's ordinal in reading
//     order (`block_000`, `block_001`, ...). Boxes are sorted before keys are
//     assigned, so the same sheet always yields the same keys.
// 2.  **Consistent grid**: `frame_count` is always `rows * cols`; the
//     constructor computes it, nobody sets it.
// 3.  **Stateless Data Container**: the struct is plain data, serialised straight
//     into the manifest. It has no behaviour beyond naming and frame slicing.

use crate::core_modules::block_box::BlockBox;
use crate::core_modules::grid_inferer::GridEstimate;
use crate::core_modules::sprite_sheet::crop_rgba;
use image::RgbaImage;
use serde::Serialize;

/// Position of one frame inside a block's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameCoordinate {
    pub row: u32,
    pub col: u32,
}

impl FrameCoordinate {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// One animation block as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub key: String,
    #[serde(flatten)]
    pub bounds: BlockBox,
    pub rows: u32,
    pub cols: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frame_count: u32,
    pub needs_review: bool,
}

impl BlockInfo {
    pub fn new(index: usize, bounds: BlockBox, grid: &GridEstimate) -> Self {
        Self {
            key: block_key(index),
            bounds,
            rows: grid.rows,
            cols: grid.cols,
            frame_width: grid.frame_width,
            frame_height: grid.frame_height,
            frame_count: grid.rows * grid.cols,
            needs_review: grid.needs_review,
        }
    }

    /// Every frame coordinate in row-major order.
    pub fn frames(&self) -> impl Iterator<Item = FrameCoordinate> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| FrameCoordinate::new(row, col)))
    }

    /// The rectangle of `frame` inside the block crop, clipped to the crop.
    /// `None` when the frame falls entirely outside.
    pub fn frame_rect(&self, frame: FrameCoordinate) -> Option<BlockBox> {
        let x0 = frame.col * self.frame_width;
        let y0 = frame.row * self.frame_height;
        BlockBox::from_corners(
            x0,
            y0,
            (x0 + self.frame_width).min(self.bounds.width),
            (y0 + self.frame_height).min(self.bounds.height),
        )
    }

    /// Copies `frame` out of the block crop.
    pub fn slice_frame(&self, crop: &RgbaImage, frame: FrameCoordinate) -> Option<RgbaImage> {
        let rect = self.frame_rect(frame)?;
        Some(crop_rgba(crop, &rect))
    }
}

/// `block_007` for index 7.
pub fn block_key(index: usize) -> String {
    format!("block_{index:03}")
}
