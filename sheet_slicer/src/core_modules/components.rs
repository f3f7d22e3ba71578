// THEORY:
// The `components` module is the spatial grouping layer of the slicer. Where the
// pixel heuristics decide what a single pixel *is*, this module decides which
// pixels *belong together*.
//
// Key architectural principles:
// 1.  **Labelling is delegated**: 8-connected labelling of a `Mask` goes through
//     `imageproc::region_labelling`. This module only aggregates the label image
//     into per-component statistics (bounding box and pixel count).
// 2.  **Stateless Utility**: every function takes a mask and returns new values.
//     Nothing is cached between calls.
// 3.  **Border reachability**: the colorkey background model needs "candidate
//     pixels connected to the crop border". That filter lives here because it is
//     purely a question of connectivity.

use crate::core_modules::block_box::BlockBox;
use crate::core_modules::mask::Mask;
use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

pub mod components {
    use super::*;

    /// Summary of a single 8-connected component.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ComponentStats {
        /// Label assigned by the labelling pass (1-based).
        pub label: u32,
        pub bounds: BlockBox,
        pub pixel_count: u64,
    }

    struct Accumulator {
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        pixel_count: u64,
    }

    /// Labels the set pixels of `mask` and returns one entry per component,
    /// ordered by label.
    pub fn label_components(mask: &Mask) -> (image::ImageBuffer<Luma<u32>, Vec<u32>>, Vec<ComponentStats>) {
        let labels = connected_components(mask.as_gray(), Connectivity::Eight, Luma([0u8]));

        let mut accumulators: Vec<Option<Accumulator>> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0] as usize;
            if label == 0 {
                continue;
            }
            if accumulators.len() <= label {
                accumulators.resize_with(label + 1, || None);
            }
            match &mut accumulators[label] {
                Some(acc) => {
                    acc.min_x = acc.min_x.min(x);
                    acc.min_y = acc.min_y.min(y);
                    acc.max_x = acc.max_x.max(x);
                    acc.max_y = acc.max_y.max(y);
                    acc.pixel_count += 1;
                }
                slot @ None => {
                    *slot = Some(Accumulator {
                        min_x: x,
                        min_y: y,
                        max_x: x,
                        max_y: y,
                        pixel_count: 1,
                    });
                }
            }
        }

        let stats = accumulators
            .into_iter()
            .enumerate()
            .filter_map(|(label, acc)| {
                let acc = acc?;
                let bounds = BlockBox::from_corners(acc.min_x, acc.min_y, acc.max_x + 1, acc.max_y + 1)?;
                Some(ComponentStats {
                    label: label as u32,
                    bounds,
                    pixel_count: acc.pixel_count,
                })
            })
            .collect();
        (labels, stats)
    }

    /// Statistics of every 8-connected component of `mask`.
    pub fn component_stats(mask: &Mask) -> Vec<ComponentStats> {
        label_components(mask).1
    }

    /// Keeps only the components of `mask` that come within `band` pixels of
    /// the image border. A band of 0 still keeps components that touch it.
    pub fn keep_border_components(mask: &Mask, band: u32) -> Mask {
        let (width, height) = mask.dimensions();
        if width == 0 || height == 0 {
            return mask.clone();
        }
        let (labels, stats) = label_components(mask);
        let band = band.max(1);

        let mut keep = vec![false; stats.iter().map(|s| s.label as usize + 1).max().unwrap_or(1)];
        for s in &stats {
            let b = &s.bounds;
            if b.x < band || b.y < band || b.right() + band > width || b.bottom() + band > height {
                keep[s.label as usize] = true;
            }
        }

        Mask::from_fn(width, height, |x, y| {
            let label = labels.get_pixel(x, y)[0] as usize;
            label != 0 && keep[label]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::components::*;
    use crate::core_modules::block_box::BlockBox;
    use crate::core_modules::mask::Mask;

    #[test]
    fn stats_cover_each_blob() {
        let mask = Mask::from_fn(20, 20, |x, y| {
            (x < 3 && y < 3) || ((10..15).contains(&x) && (12..14).contains(&y))
        });
        let stats = component_stats(&mask);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].bounds, BlockBox::new(0, 0, 3, 3).expect("box"));
        assert_eq!(stats[0].pixel_count, 9);
        assert_eq!(stats[1].bounds, BlockBox::new(10, 12, 5, 2).expect("box"));
        assert_eq!(stats[1].pixel_count, 10);
    }

    #[test]
    fn diagonal_pixels_are_connected() {
        let mask = Mask::from_fn(5, 5, |x, y| x == y);
        let stats = component_stats(&mask);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].pixel_count, 5);
    }

    #[test]
    fn border_filter_drops_enclosed_components() {
        // A frame touching the border plus an isolated island in the middle.
        let mask = Mask::from_fn(20, 20, |x, y| {
            x < 2 || y < 2 || x >= 18 || y >= 18 || ((8..12).contains(&x) && (8..12).contains(&y))
        });
        let kept = keep_border_components(&mask, 2);
        assert!(kept.get(0, 0));
        assert!(kept.get(19, 10));
        assert!(!kept.get(9, 9));
        assert_eq!(kept.count(), mask.count() - 16);
    }

    #[test]
    fn border_band_reaches_inward() {
        let mask = Mask::from_fn(20, 20, |x, y| (2..5).contains(&x) && (2..5).contains(&y));
        assert_eq!(keep_border_components(&mask, 1).count(), 0);
        assert_eq!(keep_border_components(&mask, 3).count(), 9);
    }
}
