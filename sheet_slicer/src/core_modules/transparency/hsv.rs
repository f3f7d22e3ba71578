// THEORY:
// Fixed-threshold background model for sheets painted on a dark, low-saturation
// canvas: anything both dark and grey is background. It needs no sampling and
// is the right choice when the canvas colour is known in advance.

use super::{BackgroundEstimator, BackgroundModel};
use crate::config::HsvBackgroundConfig;
use crate::core_modules::mask::Mask;
use crate::core_modules::pixel::pixel::Pixel;
use image::RgbaImage;

pub struct HsvThresholdEstimator {
    config: HsvBackgroundConfig,
}

impl HsvThresholdEstimator {
    pub fn new(config: HsvBackgroundConfig) -> Self {
        Self { config }
    }
}

impl BackgroundEstimator for HsvThresholdEstimator {
    fn name(&self) -> &'static str {
        "hsv"
    }

    fn model(&self, _crop: &RgbaImage) -> BackgroundModel {
        BackgroundModel::Thresholds {
            value_max: self.config.value_max,
            saturation_max: self.config.saturation_max,
        }
    }

    fn classify(&self, crop: &RgbaImage, model: &BackgroundModel) -> Mask {
        let BackgroundModel::Thresholds {
            value_max,
            saturation_max,
        } = *model
        else {
            return Mask::new(crop.width(), crop.height());
        };
        Mask::from_fn(crop.width(), crop.height(), |x, y| {
            let pixel = Pixel::from(crop.get_pixel(x, y));
            pixel.value() <= value_max && pixel.saturation() <= saturation_max
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn dark_grey_is_background() {
        let estimator = HsvThresholdEstimator::new(HsvBackgroundConfig::default());
        let crop = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([30, 30, 32, 255]),
            // Dark but saturated: kept.
            1 => Rgba([40, 0, 0, 255]),
            _ => Rgba([90, 90, 90, 255]),
        });
        let mask = estimator.background_mask(&crop);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(!mask.get(2, 0));
        assert_eq!(
            estimator.model(&crop),
            BackgroundModel::Thresholds {
                value_max: 40,
                saturation_max: 80
            }
        );
    }
}
