// THEORY:
// `BlockBox` is an axis-aligned rectangle in source-image pixel coordinates with
// strictly positive width and height. Finders produce them, the grid inferer and
// transparency estimator consume them; nobody mutates one after creation, every
// transformation (shrinking, clipping) returns a new box.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BlockBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BlockBox {
    /// `None` when either dimension is zero.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Box spanning `[x0, x1) × [y0, y1)`; `None` when empty.
    pub fn from_corners(x0: u32, y0: u32, x1: u32, y1: u32) -> Option<Self> {
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Moves every edge inward by `margin` and clips to a `bounds` sized image.
    pub fn shrink(&self, margin: u32, bounds: (u32, u32)) -> Option<BlockBox> {
        let x0 = self.x.saturating_add(margin).min(bounds.0);
        let y0 = self.y.saturating_add(margin).min(bounds.1);
        let x1 = self.right().saturating_sub(margin).min(bounds.0);
        let y1 = self.bottom().saturating_sub(margin).min(bounds.1);
        Self::from_corners(x0, y0, x1, y1)
    }

    pub fn clip(&self, bounds: (u32, u32)) -> Option<BlockBox> {
        self.shrink(0, bounds)
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &BlockBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Deterministic reading order: top to bottom, then left to right.
pub fn sort_boxes(boxes: &mut [BlockBox]) {
    boxes.sort_by_key(|b| (b.y, b.x, b.height, b.width));
}
