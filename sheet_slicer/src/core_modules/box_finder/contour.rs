// THEORY:
// Hand-drawn rectangles are often not quite closed: a brush lift leaves a gap of
// a few pixels and the closed finder sees the block leak into the background.
// This strategy repairs the guide mask with a heavier square closing and traces
// the borders of the repaired lines.
//
// Every traced border yields its bounding box. Outer borders of a line network
// and the borders of the holes inside it are both kept: a grid of rectangles
// sharing walls has a single outer border, its blocks only show up as holes.
// The bounding box of a border sits on the line itself, so edge rows and columns
// that are mostly guide are peeled off until the box is the region the line
// encloses. An outer box that is many times larger than a box it contains is
// the frame around a group of blocks and is dropped.

use super::{finish, Acceptance, BoxFinder, FinderInput};
use crate::config::ContourConfig;
use crate::core_modules::block_box::BlockBox;
use crate::core_modules::mask::{Kernel, Mask};
use imageproc::contours::find_contours;
use tracing::debug;

pub struct ContourBoxFinder {
    acceptance: Acceptance,
    config: ContourConfig,
}

impl ContourBoxFinder {
    pub fn new(acceptance: Acceptance, config: ContourConfig) -> Self {
        Self { acceptance, config }
    }

    fn traced_boxes(&self, lines: &Mask) -> Vec<BlockBox> {
        find_contours::<u32>(lines.as_gray())
            .iter()
            .filter_map(|contour| {
                let mut points = contour.points.iter();
                let first = points.next()?;
                let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
                for p in points {
                    x0 = x0.min(p.x);
                    y0 = y0.min(p.y);
                    x1 = x1.max(p.x);
                    y1 = y1.max(p.y);
                }
                BlockBox::from_corners(x0, y0, x1 + 1, y1 + 1)
            })
            .collect()
    }

    /// Peels edge rows/columns whose guide share reaches `edge_strip_fraction`.
    fn strip_edges(&self, lines: &Mask, candidate: BlockBox) -> Option<BlockBox> {
        let fraction = self.config.edge_strip_fraction;
        let (mut x0, mut y0, mut x1, mut y1) = (candidate.x, candidate.y, candidate.right(), candidate.bottom());
        let mostly_guide = |count: u32, len: u32| count as f64 >= fraction * len as f64;

        loop {
            if x1 <= x0 || y1 <= y0 {
                return None;
            }
            let (w, h) = (x1 - x0, y1 - y0);
            if mostly_guide(lines.count_row(y0, x0, x1), w) {
                y0 += 1;
            } else if mostly_guide(lines.count_row(y1 - 1, x0, x1), w) {
                y1 -= 1;
            } else if mostly_guide(count_column(lines, x0, y0, y1), h) {
                x0 += 1;
            } else if mostly_guide(count_column(lines, x1 - 1, y0, y1), h) {
                x1 -= 1;
            } else {
                return BlockBox::from_corners(x0, y0, x1, y1);
            }
        }
    }

    /// Drops every candidate that wraps a much smaller candidate.
    fn suppress_outer_frames(&self, candidates: Vec<BlockBox>) -> Vec<BlockBox> {
        let ratio = self.config.nesting_ratio;
        candidates
            .iter()
            .filter(|outer| {
                let wraps_smaller = candidates.iter().any(|inner| {
                    inner != *outer
                        && outer.contains(inner)
                        && outer.area() as f64 > ratio * inner.area() as f64
                });
                if wraps_smaller {
                    debug!(candidate = ?outer, "dropped outer frame");
                }
                !wraps_smaller
            })
            .copied()
            .collect()
    }
}

fn count_column(mask: &Mask, x: u32, y0: u32, y1: u32) -> u32 {
    (y0..y1.min(mask.height())).filter(|&y| mask.get(x, y)).count() as u32
}

impl BoxFinder for ContourBoxFinder {
    fn name(&self) -> &'static str {
        "contour"
    }

    fn find(&self, input: &FinderInput<'_>) -> Vec<BlockBox> {
        let lines = input.guide.close(Kernel::Square(self.config.close_radius));
        let traced = self.traced_boxes(&lines);
        debug!(borders = traced.len(), "guide borders traced");

        let mut candidates: Vec<BlockBox> = traced
            .into_iter()
            .filter_map(|b| self.strip_edges(&lines, b))
            .filter(|b| b.area() >= self.acceptance.min_area())
            .collect();
        candidates.sort_by_key(|b| (b.y, b.x, b.height, b.width));
        candidates.dedup();

        let boxes = self
            .suppress_outer_frames(candidates)
            .iter()
            .filter_map(|b| self.acceptance.accept(b, input))
            .collect();
        finish(boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcceptanceConfig;
    use crate::core_modules::box_finder::ClosedBoxFinder;

    /// Draws a 2-px frame just outside `interior`, leaving `gap` pixels of the
    /// top edge undrawn starting at `gap_x`.
    fn frame(guide: &mut Mask, interior: BlockBox, gap_x: u32, gap: u32) {
        let (x0, y0) = (interior.x - 2, interior.y - 2);
        let (x1, y1) = (interior.right() + 2, interior.bottom() + 2);
        for y in y0..y1 {
            for x in x0..x1 {
                let on_line = x < interior.x || x >= interior.right() || y < interior.y || y >= interior.bottom();
                let in_gap = y < interior.y && (gap_x..gap_x + gap).contains(&x);
                if on_line && !in_gap {
                    guide.set(x, y, true);
                }
            }
        }
    }

    fn acceptance() -> Acceptance {
        Acceptance::new(AcceptanceConfig {
            margin: 2,
            min_area: 400,
            min_sprite_pixels: 20,
        })
    }

    #[test]
    fn recovers_rectangles_with_brush_gaps() {
        let mut guide = Mask::new(140, 80);
        let left = BlockBox::new(10, 10, 50, 50).expect("box");
        let right = BlockBox::new(80, 10, 40, 50).expect("box");
        frame(&mut guide, left, 30, 3);
        frame(&mut guide, right, 90, 2);
        let sprite = Mask::from_fn(140, 80, |_, _| true);
        let input = FinderInput {
            guide: &guide,
            sprite: &sprite,
        };

        // The gaps leak both interiors into the background.
        assert!(ClosedBoxFinder::new(acceptance()).find(&input).is_empty());

        let finder = ContourBoxFinder::new(acceptance(), ContourConfig::default());
        let boxes = finder.find(&input);
        assert_eq!(
            boxes,
            vec![
                left.shrink(2, (140, 80)).expect("box"),
                right.shrink(2, (140, 80)).expect("box"),
            ]
        );
    }

    #[test]
    fn shared_walls_yield_every_cell() {
        // Two cells side by side sharing a 2-px wall, wrapped by one outline.
        let mut guide = Mask::new(120, 60);
        let a = BlockBox::new(10, 10, 40, 40).expect("box");
        let b = BlockBox::new(52, 10, 40, 40).expect("box");
        frame(&mut guide, a, 0, 0);
        frame(&mut guide, b, 0, 0);
        let sprite = Mask::from_fn(120, 60, |_, _| true);

        let finder = ContourBoxFinder::new(acceptance(), ContourConfig::default());
        let boxes = finder.find(&FinderInput {
            guide: &guide,
            sprite: &sprite,
        });
        assert_eq!(
            boxes,
            vec![a.shrink(2, (120, 60)).expect("box"), b.shrink(2, (120, 60)).expect("box")]
        );
    }

    #[test]
    fn outer_frame_is_suppressed() {
        let finder = ContourBoxFinder::new(acceptance(), ContourConfig::default());
        let outer = BlockBox::new(0, 0, 100, 100).expect("box");
        let inner = BlockBox::new(10, 10, 20, 20).expect("box");
        let similar = BlockBox::new(5, 5, 90, 90).expect("box");
        let kept = finder.suppress_outer_frames(vec![outer, inner, similar]);
        assert_eq!(kept, vec![inner]);

        // Containing a box of comparable size is not enough.
        let kept = finder.suppress_outer_frames(vec![outer, similar]);
        assert_eq!(kept, vec![outer, similar]);
    }
}
