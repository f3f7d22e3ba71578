// THEORY:
// Fully closed guide rectangles split the sheet into regions of "not guide".
// Each 8-connected region is a candidate; its pixel count (not its bounding-box
// area) is compared with `min_area`, so thin slivers between neighbouring
// rectangles never qualify. The region around all rectangles is rejected by the
// interior test because its shrunk bounding box is full of guide pixels.

use super::{finish, Acceptance, BoxFinder, FinderInput};
use crate::core_modules::block_box::BlockBox;
use crate::core_modules::components::components::component_stats;
use tracing::debug;

pub struct ClosedBoxFinder {
    acceptance: Acceptance,
}

impl ClosedBoxFinder {
    pub fn new(acceptance: Acceptance) -> Self {
        Self { acceptance }
    }
}

impl BoxFinder for ClosedBoxFinder {
    fn name(&self) -> &'static str {
        "closed"
    }

    fn find(&self, input: &FinderInput<'_>) -> Vec<BlockBox> {
        let regions = component_stats(&input.guide.inverted());
        debug!(regions = regions.len(), "non-guide regions labelled");

        let boxes = regions
            .iter()
            .filter(|region| region.pixel_count >= self.acceptance.min_area())
            .filter_map(|region| self.acceptance.accept(&region.bounds, input))
            .collect();
        finish(boxes)
    }
}
