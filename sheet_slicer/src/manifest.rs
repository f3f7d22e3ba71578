// THEORY:
// The manifest is the machine-readable result of a run: one entry per block in
// reading order, with the files written for it. Downstream tools (atlas
// builders, animation definitions) read nothing else, so field names are
// camelCase and stable.

use crate::core_modules::block_box::BlockBox;
use crate::core_modules::block_info::BlockInfo;
use crate::error::{SlicerError, SlicerResult};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The label strip found under a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRecord {
    #[serde(flatten)]
    pub bounds: BlockBox,
    /// Relative path of the exported crop, when labels are written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// OCR text, when a reader produced any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestBlock {
    #[serde(flatten)]
    pub info: BlockInfo,
    /// Relative path of the block image.
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelRecord>,
    /// Relative paths of the exported frames, row-major.
    pub frames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub source: String,
    pub blocks: Vec<ManifestBlock>,
}

impl Manifest {
    pub fn new(source: &Path, blocks: Vec<ManifestBlock>) -> Self {
        Self {
            source: source.to_string_lossy().replace('\\', "/"),
            blocks,
        }
    }

    pub fn review_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.info.needs_review).count()
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json(&self) -> SlicerResult<String> {
        let mut json =
            serde_json::to_string_pretty(self).map_err(|source| SlicerError::ManifestSerialize { source })?;
        json.push('\n');
        Ok(json)
    }

    pub fn write(&self, path: &Path) -> SlicerResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SlicerError::io(parent, e))?;
        }
        fs::write(path, self.to_json()?).map_err(|e| SlicerError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::grid_inferer::GridEstimate;

    fn block(index: usize, needs_review: bool) -> ManifestBlock {
        let mut grid = GridEstimate::whole_block(40, 30);
        grid.needs_review = needs_review;
        let info = BlockInfo::new(index, BlockBox::new(1, 2, 40, 30).expect("box"), &grid);
        ManifestBlock {
            file: format!("blocks/{}.png", info.key),
            info,
            label: None,
            frames: vec![],
        }
    }

    #[test]
    fn writes_camel_case_json_with_trailing_newline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("manifest.json");
        let manifest = Manifest::new(Path::new("sheets/hero.png"), vec![block(0, false), block(1, true)]);
        manifest.write(&path).expect("written");

        let text = fs::read_to_string(&path).expect("readable");
        assert!(text.ends_with("}\n"));
        let json: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(json["source"], "sheets/hero.png");
        assert_eq!(json["blocks"][1]["key"], "block_001");
        assert_eq!(json["blocks"][1]["file"], "blocks/block_001.png");
        assert_eq!(json["blocks"][1]["needsReview"], true);
        assert_eq!(json["blocks"][0]["frameCount"], 1);
        assert!(json["blocks"][0].get("label").is_none());
        assert_eq!(manifest.review_count(), 1);
    }

    #[test]
    fn label_is_flattened() {
        let mut entry = block(0, false);
        entry.label = Some(LabelRecord {
            bounds: BlockBox::new(1, 40, 40, 12).expect("box"),
            file: Some("labels/block_000.png".into()),
            text: Some("walk".into()),
        });
        let json = serde_json::to_value(&entry).expect("json");
        assert_eq!(json["label"]["y"], 40);
        assert_eq!(json["label"]["text"], "walk");
    }
}
