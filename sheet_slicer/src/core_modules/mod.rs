// THEORY:
// `core_modules` holds the image-level building blocks of the slicer. Nothing in
// here touches the filesystem except `sprite_sheet::SpriteSheet::open` and the
// PNG helper; every other module maps images and masks to new values.
//
// Dependency order, bottom to top:
//     pixel, mask, block_box
//     sprite_sheet, guide_mask, components, clustering
//     box_finder, grid_inferer, transparency, label_region
//     block_info

pub mod block_box;
pub mod block_info;
pub mod box_finder;
pub mod clustering;
pub mod components;
pub mod grid_inferer;
pub mod guide_mask;
pub mod label_region;
pub mod mask;
pub mod pixel;
pub mod sprite_sheet;
pub mod transparency;
pub mod utils;
