mod common;

use common::{blob_grid, canvas, guide_frame};
use sheet_slicer::config::{FrameLayout, SlicerConfig};
use sheet_slicer::error::SlicerError;
use sheet_slicer::frames_map::FramesMap;
use sheet_slicer::{BlockBox, BlockExporter, ParallelPipeline, SheetPipeline, SpriteSheet};
use std::path::Path;
use std::sync::Arc;

/// Two closed blocks: a 2×3 grid of poses above a single pose.
fn write_sheet(dir: &Path) -> std::path::PathBuf {
    let mut image = canvas(330, 350);
    guide_frame(&mut image, 10, 10, 300, 200, 2);
    blob_grid(&mut image, 10, 10, 2, 3, 100, 60);
    guide_frame(&mut image, 10, 230, 100, 100, 2);
    blob_grid(&mut image, 10, 230, 1, 1, 100, 60);

    let path = dir.join("hero.png");
    image.save(&path).expect("sheet saved");
    path
}

fn config() -> SlicerConfig {
    let mut config = SlicerConfig::default();
    config.export.frames = FrameLayout::Nested;
    config.export.labels = true;
    config
}

#[test]
fn two_blocks_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_sheet(dir.path());
    let out = dir.path().join("out");

    let config = config();
    let sheet = SpriteSheet::open(&input).expect("sheet loads");
    let exporter = BlockExporter::new(&out, config.export.clone(), None);
    let manifest = SheetPipeline::new(config)
        .expect("valid config")
        .run(&sheet, &input, &exporter)
        .expect("run succeeds");

    assert_eq!(manifest.blocks.len(), 2);
    assert_eq!(manifest.review_count(), 0);

    let first = &manifest.blocks[0].info;
    assert_eq!(first.key, "block_000");
    assert_eq!(first.bounds, BlockBox::new(12, 12, 296, 196).expect("box"));
    assert_eq!((first.rows, first.cols, first.frame_count), (2, 3, 6));
    assert!(!first.needs_review);

    let second = &manifest.blocks[1].info;
    assert_eq!(second.key, "block_001");
    assert_eq!(second.bounds, BlockBox::new(12, 232, 96, 96).expect("box"));
    assert_eq!((second.rows, second.cols, second.frame_count), (1, 1, 1));
    assert!(!second.needs_review);

    // Files.
    assert!(out.join("blocks/block_000.png").is_file());
    assert!(out.join("blocks/block_001.png").is_file());
    assert_eq!(manifest.blocks[0].frames.len(), 6);
    for row in 0..2 {
        for col in 0..3 {
            assert!(out.join(format!("frames/block_000/r{row}_c{col}.png")).is_file());
        }
    }
    let label = manifest.blocks[0].label.as_ref().expect("label under the first block");
    assert_eq!(label.bounds.y, 212);
    assert!(out.join("labels/block_000.png").is_file());

    // Transparency made the canvas clear and kept the poses.
    let block = image::open(out.join("blocks/block_001.png")).expect("block").to_rgba8();
    assert_eq!(block.dimensions(), (96, 96));
    assert_eq!(block.get_pixel(0, 0)[3], 0);
    assert_eq!(block.get_pixel(48, 48)[3], 255);

    // Manifest on disk.
    let text = std::fs::read_to_string(out.join("manifest.json")).expect("manifest");
    assert!(text.ends_with('\n'));
    let json: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(json["blocks"][0]["frameCount"], 6);
    assert_eq!(json["blocks"][0]["frameWidth"], 99);
    assert_eq!(json["blocks"][0]["frameHeight"], 98);
    assert_eq!(json["blocks"][1]["y"], 232);
    assert_eq!(json["blocks"][1]["needsReview"], false);
}

#[tokio::test]
async fn parallel_run_writes_the_same_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_sheet(dir.path());

    let config = config();
    let sheet = SpriteSheet::open(&input).expect("sheet loads");
    let sequential = SheetPipeline::new(config.clone())
        .expect("valid config")
        .run(&sheet, &input, &BlockExporter::new(dir.path().join("seq"), config.export.clone(), None))
        .expect("sequential run");

    let parallel = ParallelPipeline::new(SheetPipeline::new(config.clone()).expect("valid config"))
        .with_workers(2)
        .run(
            Arc::new(sheet),
            &input,
            Arc::new(BlockExporter::new(dir.path().join("par"), config.export.clone(), None)),
        )
        .await
        .expect("parallel run");

    assert_eq!(parallel, sequential);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("seq/manifest.json")).expect("seq manifest"),
        std::fs::read_to_string(dir.path().join("par/manifest.json")).expect("par manifest"),
    );
}

#[test]
fn strict_frames_map_without_frames_stops_before_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_sheet(dir.path());
    let out = dir.path().join("out");
    let map_path = dir.path().join("frames.json");
    std::fs::write(&map_path, r#"{ "block_000": { "name": "hero_walk", "directions": ["down", "up"] } }"#)
        .expect("map written");

    let mut config = SlicerConfig::default();
    config.export.strict_frames_map = true;
    assert_eq!(config.export.frames, FrameLayout::None);
    let map = FramesMap::from_json_file(&map_path).expect("map loads");
    let exporter = BlockExporter::new(&out, config.export.clone(), Some(map));

    let sheet = SpriteSheet::open(&input).expect("sheet loads");
    let result = SheetPipeline::new(config).expect("valid config").run(&sheet, &input, &exporter);
    assert!(matches!(
        result,
        Err(SlicerError::MissingFramesMapEntry { key }) if key == "block_001"
    ));
    assert!(!out.exists());
}
