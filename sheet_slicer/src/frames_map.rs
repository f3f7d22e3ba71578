// THEORY:
// A frames map gives detected blocks their game-facing names. It is a JSON
// object keyed by block key:
//
//     { "block_000": { "name": "hero_walk", "directions": ["down", "up"],
//                      "colStart": 0, "colEnd": 5, "frameIndexPad": 2 } }
//
// Each grid row is one facing direction, so the declared direction count must
// equal the inferred row count; anything else means the grid or the map is wrong
// and the run stops. Only columns `colStart..=colEnd` are exported, which lets an
// artist leave scratch poses at the end of a row.

use crate::core_modules::block_info::{BlockInfo, FrameCoordinate};
use crate::error::{SlicerError, SlicerResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

fn default_pad() -> usize {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FramesMapEntry {
    pub name: String,
    pub directions: Vec<String>,
    #[serde(default)]
    pub col_start: u32,
    /// Inclusive; defaults to the last inferred column.
    #[serde(default)]
    pub col_end: Option<u32>,
    #[serde(default = "default_pad")]
    pub frame_index_pad: usize,
}

/// A frame to export under a mapped name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFrame {
    pub coordinate: FrameCoordinate,
    pub file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FramesMap {
    entries: HashMap<String, FramesMapEntry>,
}

impl FramesMap {
    pub fn from_json_file(path: &Path) -> SlicerResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| SlicerError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| SlicerError::FramesMapRead {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<&FramesMapEntry> {
        self.entries.get(key)
    }

    /// Named frames for `block`. `Ok(None)` means "no entry, use grid names";
    /// with `strict` a missing entry is an error instead.
    pub fn plan(&self, block: &BlockInfo, strict: bool) -> SlicerResult<Option<Vec<NamedFrame>>> {
        let Some(entry) = self.get(&block.key) else {
            if strict {
                return Err(SlicerError::MissingFramesMapEntry {
                    key: block.key.clone(),
                });
            }
            return Ok(None);
        };

        if entry.directions.len() != block.rows as usize {
            return Err(SlicerError::DirectionMismatch {
                key: block.key.clone(),
                declared: entry.directions.len(),
                rows: block.rows,
            });
        }

        let last_col = block.cols.saturating_sub(1);
        let col_end = entry.col_end.unwrap_or(last_col).min(last_col);
        let pad = entry.frame_index_pad;

        let frames = entry
            .directions
            .iter()
            .enumerate()
            .flat_map(move |(row, direction)| {
                (entry.col_start..=col_end).map(move |col| NamedFrame {
                    coordinate: FrameCoordinate::new(row as u32, col),
                    file_name: format!(
                        "{}_{}_{:0pad$}.png",
                        entry.name,
                        direction,
                        col - entry.col_start,
                        pad = pad
                    ),
                })
            })
            .collect();
        Ok(Some(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::block_box::BlockBox;
    use crate::core_modules::grid_inferer::GridEstimate;

    fn block(rows: u32, cols: u32) -> BlockInfo {
        let grid = GridEstimate {
            rows,
            cols,
            frame_width: 10,
            frame_height: 10,
            needs_review: false,
            col_segments: Vec::new(),
            row_segments: Vec::new(),
        };
        BlockInfo::new(0, BlockBox::new(0, 0, cols * 10, rows * 10).expect("box"), &grid)
    }

    fn map(json: &str) -> FramesMap {
        serde_json::from_str(json).expect("valid frames map")
    }

    #[test]
    fn names_frames_by_direction_and_index() {
        let map = map(r#"{ "block_000": { "name": "hero_walk", "directions": ["down", "up"], "colStart": 1, "colEnd": 2 } }"#);
        let frames = map.plan(&block(2, 4), false).expect("valid").expect("mapped");
        let names: Vec<&str> = frames.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "hero_walk_down_00.png",
                "hero_walk_down_01.png",
                "hero_walk_up_00.png",
                "hero_walk_up_01.png"
            ]
        );
        assert_eq!(frames[3].coordinate, FrameCoordinate::new(1, 2));
    }

    #[test]
    fn col_end_defaults_to_the_last_column_and_pad_is_honoured() {
        let map = map(r#"{ "block_000": { "name": "idle", "directions": ["s"], "frameIndexPad": 3 } }"#);
        let frames = map.plan(&block(1, 3), false).expect("valid").expect("mapped");
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].file_name, "idle_s_002.png");
    }

    #[test]
    fn direction_count_must_match_rows() {
        let map = map(r#"{ "block_000": { "name": "x", "directions": ["a", "b", "c"] } }"#);
        assert!(matches!(
            map.plan(&block(2, 2), false),
            Err(SlicerError::DirectionMismatch {
                declared: 3,
                rows: 2,
                ..
            })
        ));
    }

    #[test]
    fn missing_entries_depend_on_strictness() {
        let map = FramesMap::default();
        assert_eq!(map.plan(&block(1, 1), false).expect("lenient"), None);
        assert!(matches!(
            map.plan(&block(1, 1), true),
            Err(SlicerError::MissingFramesMapEntry { .. })
        ));
    }

    #[test]
    fn unreadable_map_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frames.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            FramesMap::from_json_file(&path),
            Err(SlicerError::FramesMapRead { .. })
        ));
    }
}
