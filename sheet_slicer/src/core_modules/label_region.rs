// THEORY:
// Artists write the action name ("walk", "attack_2", ...) just below each block,
// under the guide rule that closes it. The label locator finds that strip:
// walk down from the block to the first guide rule, step over the rule, and take
// a fixed-height band of the block's width, stopping early if another rule
// starts. What the text says is not decided here; reading it is an external
// capability.

use crate::config::LabelConfig;
use crate::core_modules::block_box::BlockBox;
use crate::core_modules::mask::Mask;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LabelRegionLocator {
    config: LabelConfig,
}

impl LabelRegionLocator {
    pub fn new(config: LabelConfig) -> Self {
        Self { config }
    }

    fn is_rule(&self, guide: &Mask, y: u32, x0: u32, x1: u32) -> bool {
        let needed = self.config.line_fraction * (x1 - x0) as f64;
        guide.count_row(y, x0, x1) as f64 >= needed
    }

    /// The label rectangle under `block`, if a rule is found below it.
    pub fn locate(&self, guide: &Mask, block: &BlockBox) -> Option<BlockBox> {
        let (width, height) = guide.dimensions();
        let x0 = block.x.min(width);
        let x1 = block.right().min(width);
        if x1 <= x0 {
            return None;
        }

        let search_end = block.bottom().saturating_add(self.config.search_window).min(height);
        let mut y = (block.bottom()..search_end).find(|&y| self.is_rule(guide, y, x0, x1))?;
        while y < height && self.is_rule(guide, y, x0, x1) {
            y += 1;
        }

        let label_width = ((block.width as f64 * self.config.width_fraction).round() as u32).max(1);
        let label_x1 = (x0 + label_width).min(width);
        let mut top = y;
        let limit = top.saturating_add(self.config.height).min(height);
        let bottom = (top..limit)
            .find(|&row| self.is_rule(guide, row, x0, x1))
            .unwrap_or(limit);
        while top < bottom && guide.count_row(top, x0, label_x1) > 0 {
            top += 1;
        }

        let region = BlockBox::from_corners(x0, top, label_x1, bottom);
        debug!(?block, ?region, "label region");
        region
    }
}
