// THEORY:
// Some sheets mark blocks with only two strokes: a long horizontal rule under
// each block and a short vertical tick at its right end. There is no enclosed
// region to label, so the boxes are rebuilt from geometry:
//
// 1.  Line morphology splits the guide mask into a horizontal-run mask and a
//     vertical-run mask. Closing bridges brush gaps, opening with a longer
//     kernel discards everything that is not a real rule or tick.
// 2.  Rows whose run pixels cover enough of the width are bottom rules; a
//     thick rule yields several adjacent rows that merge to their median.
// 3.  Each tick is reduced to (x, top, bottom).
// 4.  On every rule, ticks that end at the rule partition each horizontal
//     segment left to right. A block spans from the previous tick (or the
//     segment start) to its tick, and from the tick top down to the rule.
//
// The candidates then go through the shared acceptance test.

use super::{finish, Acceptance, BoxFinder, FinderInput};
use crate::config::OpenConfig;
use crate::core_modules::block_box::BlockBox;
use crate::core_modules::components::components::component_stats;
use crate::core_modules::mask::{runs, Mask};
use tracing::debug;

/// A vertical guide stroke reduced to its median column and extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub x: u32,
    pub top: u32,
    /// Last row covered by the stroke (inclusive).
    pub bottom: u32,
}

pub struct OpenBoxFinder {
    acceptance: Acceptance,
    config: OpenConfig,
}

impl OpenBoxFinder {
    pub fn new(acceptance: Acceptance, config: OpenConfig) -> Self {
        Self { acceptance, config }
    }

    /// Rows of the bottom rules, merged within `line_merge_tolerance`.
    fn bottom_lines(&self, horizontal: &Mask) -> Vec<u32> {
        let (width, height) = horizontal.dimensions();
        let needed = self.config.row_fraction * width as f64;
        let rows: Vec<u32> = (0..height)
            .filter(|&y| horizontal.count_row(y, 0, width) as f64 >= needed)
            .collect();
        merge_rows(&rows, self.config.line_merge_tolerance)
    }

    fn ticks(&self, vertical: &Mask) -> Vec<Tick> {
        component_stats(vertical)
            .iter()
            .map(|c| Tick {
                x: c.bounds.x + c.bounds.width / 2,
                top: c.bounds.y,
                bottom: c.bounds.bottom() - 1,
            })
            .collect()
    }

    /// Ticks ending on the rule at `line_y` inside `[start, end)`, sorted by x
    /// and deduplicated.
    fn boundaries(&self, ticks: &[Tick], line_y: u32, start: u32, end: u32) -> Vec<Tick> {
        let slack = self.config.x_slack;
        let mut hits: Vec<Tick> = ticks
            .iter()
            .filter(|t| t.bottom.abs_diff(line_y) <= self.config.y_tolerance)
            .filter(|t| t.x + slack >= start && t.x <= end + slack)
            .copied()
            .collect();
        hits.sort_by_key(|t| t.x);

        let mut boundaries: Vec<Tick> = Vec::with_capacity(hits.len());
        for tick in hits {
            match boundaries.last() {
                Some(last) if tick.x - last.x < self.config.dedup_distance => {}
                _ => boundaries.push(tick),
            }
        }
        boundaries
    }

    fn candidates(&self, horizontal: &Mask, ticks: &[Tick], line_y: u32) -> Vec<BlockBox> {
        let width = horizontal.width();
        let row: Vec<bool> = (0..width).map(|x| horizontal.get(x, line_y)).collect();
        let mut out = Vec::new();

        for (start, end) in runs(&row) {
            let (start, end) = (start as u32, end as u32);
            if end - start < self.config.min_segment_length {
                continue;
            }
            let mut left = start;
            for tick in self.boundaries(ticks, line_y, start, end) {
                let right = tick.x.min(width);
                if let Some(candidate) = BlockBox::from_corners(left, tick.top, right, line_y) {
                    out.push(candidate);
                }
                left = right;
            }
        }
        out
    }
}

/// Groups sorted rows whose neighbours are within `tolerance` and returns each
/// group's median row.
fn merge_rows(rows: &[u32], tolerance: u32) -> Vec<u32> {
    let mut groups: Vec<Vec<u32>> = Vec::new();
    for &y in rows {
        match groups.last_mut() {
            Some(group) if group.last().is_some_and(|&last| y - last <= tolerance) => group.push(y),
            _ => groups.push(vec![y]),
        }
    }
    groups.iter().map(|g| g[g.len() / 2]).collect()
}

impl BoxFinder for OpenBoxFinder {
    fn name(&self) -> &'static str {
        "open"
    }

    fn find(&self, input: &FinderInput<'_>) -> Vec<BlockBox> {
        let horizontal = input
            .guide
            .close_rows(self.config.horizontal_close)
            .open_rows(self.config.horizontal_open);
        let vertical = input
            .guide
            .close_cols(self.config.vertical_close)
            .open_cols(self.config.vertical_open);

        let lines = self.bottom_lines(&horizontal);
        let ticks = self.ticks(&vertical);
        debug!(lines = lines.len(), ticks = ticks.len(), "open guide geometry");

        let boxes = lines
            .iter()
            .flat_map(|&y| self.candidates(&horizontal, &ticks, y))
            .filter(|b| b.area() >= self.acceptance.min_area())
            .filter_map(|b| self.acceptance.accept(&b, input))
            .collect();
        finish(boxes)
    }
}
