// THEORY:
// This file is the main entry point for the `sheet_slicer` library crate.
// It exposes the sheet pipelines (`SheetPipeline`, `ParallelPipeline`) and the
// data they produce (`Manifest`, `BlockInfo`, `GridEstimate`) as the high-level
// interface. The image-level stages live in `core_modules` and stay usable on
// their own: a caller can build a guide mask, run one box finder or infer a
// single block's grid without going through a whole run.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod exporter;
pub mod external;
pub mod frames_map;
pub mod manifest;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::SlicerConfig;
pub use core_modules::block_box::BlockBox;
pub use core_modules::block_info::BlockInfo;
pub use core_modules::sprite_sheet::SpriteSheet;
pub use error::{SlicerError, SlicerResult};
pub use exporter::BlockExporter;
pub use manifest::Manifest;
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{GridEstimate, SheetPipeline};
