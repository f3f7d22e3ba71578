// THEORY:
// A box finder turns the guide mask of a sheet into the list of animation-block
// interiors. Three strategies exist because artists draw guides three ways:
//
// 1.  **Closed**: every block is a fully closed rectangle. The blocks are simply
//     the connected regions of "not guide".
// 2.  **Contour**: rectangles that are almost closed (brush gaps, overlaps). A
//     heavier closing repairs the lines and the traced borders give the boxes.
// 3.  **Open**: only a bottom rule with short right-hand ticks is drawn. Boxes are
//     rebuilt from line and tick geometry.
//
// All strategies share one acceptance test (`Acceptance`): shrink the candidate
// by a margin, require zero guide pixels and enough sprite pixels inside. The
// accepted box is the shrunk interior. Output is always sorted top to bottom,
// then left to right.
//
// The strategy is chosen once per run (`build_finder`). `Auto` chains the three
// and stops at the first one that produces enough boxes.

pub mod closed;
pub mod contour;
pub mod open;

use crate::config::{AcceptanceConfig, FinderMode, SlicerConfig};
use crate::core_modules::block_box::{sort_boxes, BlockBox};
use crate::core_modules::mask::Mask;
use tracing::{debug, info, warn};

pub use closed::ClosedBoxFinder;
pub use contour::ContourBoxFinder;
pub use open::OpenBoxFinder;

/// The masks every finder reads. Both are aligned to the sheet.
#[derive(Debug, Clone, Copy)]
pub struct FinderInput<'a> {
    pub guide: &'a Mask,
    pub sprite: &'a Mask,
}

impl FinderInput<'_> {
    pub fn dimensions(&self) -> (u32, u32) {
        self.guide.dimensions()
    }
}

pub trait BoxFinder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Accepted block interiors, sorted `(y, x)`.
    fn find(&self, input: &FinderInput<'_>) -> Vec<BlockBox>;
}

/// The interior test shared by every strategy.
#[derive(Debug, Clone)]
pub struct Acceptance {
    config: AcceptanceConfig,
}

impl Acceptance {
    pub fn new(config: AcceptanceConfig) -> Self {
        Self { config }
    }

    pub fn min_area(&self) -> u64 {
        self.config.min_area
    }

    /// Shrinks `candidate` by the margin and checks its interior. Returns the
    /// shrunk interior when it holds no guide pixels and enough sprite pixels.
    pub fn accept(&self, candidate: &BlockBox, input: &FinderInput<'_>) -> Option<BlockBox> {
        let Some(interior) = candidate.shrink(self.config.margin, input.dimensions()) else {
            debug!(?candidate, "rejected: empty after margin");
            return None;
        };
        let guide_pixels = input.guide.count_in(&interior);
        if guide_pixels > 0 {
            debug!(?candidate, guide_pixels, "rejected: guide pixels inside");
            return None;
        }
        let sprite_pixels = input.sprite.count_in(&interior);
        if sprite_pixels < self.config.min_sprite_pixels {
            debug!(?candidate, sprite_pixels, "rejected: too little content");
            return None;
        }
        Some(interior)
    }
}

/// Sorts and drops exact duplicates.
pub(crate) fn finish(mut boxes: Vec<BlockBox>) -> Vec<BlockBox> {
    sort_boxes(&mut boxes);
    boxes.dedup();
    boxes
}

/// Runs several strategies in order until one yields `min_boxes` boxes.
pub struct AutoBoxFinder {
    strategies: Vec<Box<dyn BoxFinder>>,
    min_boxes: usize,
}

impl AutoBoxFinder {
    pub fn new(strategies: Vec<Box<dyn BoxFinder>>, min_boxes: usize) -> Self {
        Self {
            strategies,
            min_boxes: min_boxes.max(1),
        }
    }
}

impl BoxFinder for AutoBoxFinder {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn find(&self, input: &FinderInput<'_>) -> Vec<BlockBox> {
        let mut best: Vec<BlockBox> = Vec::new();
        for strategy in &self.strategies {
            let boxes = strategy.find(input);
            info!(strategy = strategy.name(), boxes = boxes.len(), "box finder finished");
            if boxes.len() >= self.min_boxes {
                return boxes;
            }
            warn!(
                strategy = strategy.name(),
                found = boxes.len(),
                wanted = self.min_boxes,
                "falling back to the next box finder"
            );
            if boxes.len() > best.len() {
                best = boxes;
            }
        }
        best
    }
}

/// The finder selected by `config.finder`.
pub fn build_finder(config: &SlicerConfig) -> Box<dyn BoxFinder> {
    let acceptance = Acceptance::new(config.acceptance.clone());
    let closed = || Box::new(ClosedBoxFinder::new(acceptance.clone())) as Box<dyn BoxFinder>;
    let contour = || {
        Box::new(ContourBoxFinder::new(acceptance.clone(), config.contour.clone())) as Box<dyn BoxFinder>
    };
    let open = || Box::new(OpenBoxFinder::new(acceptance.clone(), config.open.clone())) as Box<dyn BoxFinder>;

    match config.finder {
        FinderMode::Closed => closed(),
        FinderMode::Contour => contour(),
        FinderMode::Open => open(),
        FinderMode::Auto => Box::new(AutoBoxFinder::new(
            vec![closed(), contour(), open()],
            config.auto_min_boxes,
        )),
    }
}
