// THEORY:
// Colorkey learns the background from the crop itself. Painted canvases are
// rarely one flat colour (paper texture, gradients, JPEG noise), so the border
// band is sampled and summarised by a handful of Lab cluster centres. A pixel
// close to any centre *could* be background; only candidates connected to the
// crop border actually are. That keeps background-coloured details inside a
// sprite (eyes, outlines, shadows) opaque.
//
// Tiny crops without enough border samples fall back to the crop's median
// colour as the single centre.

use super::{BackgroundEstimator, BackgroundModel};
use crate::config::ColorkeyConfig;
use crate::core_modules::clustering::kmeans;
use crate::core_modules::components::components::keep_border_components;
use crate::core_modules::mask::Mask;
use crate::core_modules::pixel::pixel::{LabColor, Pixel};
use image::RgbaImage;
use std::collections::HashMap;
use tracing::debug;

pub struct ColorkeyEstimator {
    config: ColorkeyConfig,
}

impl ColorkeyEstimator {
    pub fn new(config: ColorkeyConfig) -> Self {
        Self { config }
    }

    fn border_samples(&self, crop: &RgbaImage) -> Vec<LabColor> {
        let (w, h) = crop.dimensions();
        let band = self.config.sample_border;
        crop.enumerate_pixels()
            .filter(|(x, y, _)| *x < band || *y < band || *x + band >= w || *y + band >= h)
            .map(|(_, _, p)| Pixel::from(p).lab())
            .collect()
    }

    fn centers(&self, crop: &RgbaImage) -> Vec<LabColor> {
        let samples = self.border_samples(crop);
        if samples.len() < self.config.min_samples {
            debug!(samples = samples.len(), "too few border samples; using median colour");
            return median_color(crop).into_iter().collect();
        }
        let k = self
            .config
            .clusters
            .min(samples.len() / self.config.min_samples_per_center.max(1));
        if k == 0 {
            return median_color(crop).into_iter().collect();
        }
        let clusters = kmeans(&samples, k, self.config.iterations);
        debug!(
            samples = samples.len(),
            k,
            populations = ?clusters.iter().map(|c| c.population).collect::<Vec<_>>(),
            "border colours clustered"
        );
        clusters.into_iter().map(|c| c.center).collect()
    }
}

/// Per-channel median colour of `crop`, in Lab.
fn median_color(crop: &RgbaImage) -> Option<LabColor> {
    let n = (crop.width() * crop.height()) as usize;
    if n == 0 {
        return None;
    }
    let median = |channel: usize| {
        let mut values: Vec<u8> = crop.pixels().map(|p| p[channel]).collect();
        values.sort_unstable();
        values[n / 2]
    };
    Some(Pixel::new(median(0), median(1), median(2), 255).lab())
}

impl BackgroundEstimator for ColorkeyEstimator {
    fn name(&self) -> &'static str {
        "colorkey"
    }

    fn model(&self, crop: &RgbaImage) -> BackgroundModel {
        BackgroundModel::Centers(self.centers(crop))
    }

    fn classify(&self, crop: &RgbaImage, model: &BackgroundModel) -> Mask {
        let BackgroundModel::Centers(centers) = model else {
            return Mask::new(crop.width(), crop.height());
        };
        let radius_sq = self.config.radius * self.config.radius;

        // Sprites use few distinct colours; convert each once.
        let mut near_cache: HashMap<[u8; 3], bool> = HashMap::new();
        let candidates = Mask::from_fn(crop.width(), crop.height(), |x, y| {
            let p = crop.get_pixel(x, y);
            *near_cache.entry([p[0], p[1], p[2]]).or_insert_with(|| {
                let lab = Pixel::from(p).lab();
                centers.iter().any(|c| c.distance_sq(&lab) <= radius_sq)
            })
        });

        keep_border_components(&candidates, self.config.edge_touch)
    }
}
