// THEORY:
// The transparency layer turns an opaque block crop into an RGBA image whose
// alpha separates the poses from the painted background.
//
// Key architectural principles:
// 1.  **Strategy per run**: a `BackgroundEstimator` decides, for one crop, which
//     pixels are background. Two exist: fixed HSV cutoffs for dark canvases and
//     "colorkey", which learns the background colours from the crop border. The
//     strategy is picked once from configuration and shared by every block.
// 2.  **Mask first, alpha second**: the estimator only produces a binary
//     background mask. Everything after that (closing small holes, growing the
//     silhouette by a pixel, optional feathering, straight or premultiplied
//     output) is common and lives in `TransparencyEstimator`.
// 3.  **Pure**: crops go in, new images come out. Nothing is cached between
//     blocks, which keeps the parallel pipeline free of shared state.

pub mod colorkey;
pub mod hsv;
pub mod trim;

use crate::config::{AlphaMode, SmoothingConfig, TransparencyConfig, TransparencyMode};
use crate::core_modules::mask::{Kernel, Mask};
use crate::core_modules::pixel::pixel::LabColor;
use image::{GrayImage, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

pub use colorkey::ColorkeyEstimator;
pub use hsv::HsvThresholdEstimator;
pub use trim::trim_transparent;

/// What a background estimator learned about one crop.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundModel {
    /// Background iff `V <= value_max && S <= saturation_max`.
    Thresholds { value_max: u8, saturation_max: u8 },
    /// Background colour centres, most populous first.
    Centers(Vec<LabColor>),
}

pub trait BackgroundEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Learns the background of one crop.
    fn model(&self, crop: &RgbaImage) -> BackgroundModel;

    /// Set where `crop` shows background according to `model`.
    fn classify(&self, crop: &RgbaImage, model: &BackgroundModel) -> Mask;

    fn background_mask(&self, crop: &RgbaImage) -> Mask {
        self.classify(crop, &self.model(crop))
    }
}

/// Computes and applies alpha for block crops.
pub struct TransparencyEstimator {
    estimator: Option<Box<dyn BackgroundEstimator>>,
    smoothing: SmoothingConfig,
    alpha_mode: AlphaMode,
}

impl TransparencyEstimator {
    pub fn new(
        estimator: Option<Box<dyn BackgroundEstimator>>,
        smoothing: SmoothingConfig,
        alpha_mode: AlphaMode,
    ) -> Self {
        Self {
            estimator,
            smoothing,
            alpha_mode,
        }
    }

    pub fn from_config(config: &TransparencyConfig) -> Self {
        let estimator: Option<Box<dyn BackgroundEstimator>> = match config.mode {
            TransparencyMode::None => None,
            TransparencyMode::Hsv => Some(Box::new(HsvThresholdEstimator::new(config.hsv.clone()))),
            TransparencyMode::Colorkey => Some(Box::new(ColorkeyEstimator::new(config.colorkey.clone()))),
        };
        Self::new(estimator, config.smoothing.clone(), config.alpha_mode)
    }

    pub fn is_enabled(&self) -> bool {
        self.estimator.is_some()
    }

    /// Complement of the background, before any smoothing.
    pub fn foreground_mask(&self, crop: &RgbaImage) -> Option<Mask> {
        let estimator = self.estimator.as_ref()?;
        let model = estimator.model(crop);
        let background = estimator.classify(crop, &model);
        debug!(
            estimator = estimator.name(),
            ?model,
            background_pixels = background.count(),
            "background estimated"
        );
        Some(background.inverted())
    }

    /// Smoothed, optionally feathered alpha for `crop`.
    pub fn alpha(&self, crop: &RgbaImage) -> Option<GrayImage> {
        let foreground = self.foreground_mask(crop)?;
        Some(self.smooth(&foreground))
    }

    fn smooth(&self, foreground: &Mask) -> GrayImage {
        let mask = foreground
            .close(Kernel::Cross(self.smoothing.close_radius))
            .dilate(Kernel::Cross(self.smoothing.dilate_radius));
        let alpha = mask.into_gray();
        match blur_sigma(self.smoothing.alpha_blur) {
            Some(sigma) => gaussian_blur_f32(&alpha, sigma),
            None => alpha,
        }
    }

    /// The crop with computed alpha, or an unchanged copy when disabled.
    pub fn apply(&self, crop: &RgbaImage) -> RgbaImage {
        match self.alpha(crop) {
            Some(alpha) => merge_alpha(crop, &alpha, self.alpha_mode),
            None => crop.clone(),
        }
    }
}

/// Gaussian sigma for an odd kernel size, as image editors derive it when
/// only the size is given. Sizes of 0 and 1 disable feathering; even sizes
/// are rounded up.
fn blur_sigma(kernel: u32) -> Option<f32> {
    if kernel <= 1 {
        return None;
    }
    let k = (kernel | 1) as f32;
    Some(0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8)
}

/// Replaces the alpha channel of `crop`.
pub fn merge_alpha(crop: &RgbaImage, alpha: &GrayImage, mode: AlphaMode) -> RgbaImage {
    RgbaImage::from_fn(crop.width(), crop.height(), |x, y| {
        let [r, g, b, _] = crop.get_pixel(x, y).0;
        let a = alpha.get_pixel(x, y)[0];
        match mode {
            AlphaMode::Straight => Rgba([r, g, b, a]),
            AlphaMode::Premultiplied => {
                let scale = |c: u8| ((c as u32 * a as u32 + 127) / 255) as u8;
                Rgba([scale(r), scale(g), scale(b), a])
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HsvBackgroundConfig;

    fn dark_with_square() -> RgbaImage {
        RgbaImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Rgba([220, 140, 60, 255])
            } else {
                Rgba([15, 15, 18, 255])
            }
        })
    }

    #[test]
    fn disabled_estimator_leaves_the_crop_alone() {
        let estimator = TransparencyEstimator::from_config(&TransparencyConfig {
            mode: TransparencyMode::None,
            ..TransparencyConfig::default()
        });
        let crop = dark_with_square();
        assert!(!estimator.is_enabled());
        assert!(estimator.alpha(&crop).is_none());
        assert_eq!(estimator.apply(&crop), crop);
    }

    #[test]
    fn smoothing_grows_the_silhouette_by_one_pixel() {
        let estimator = TransparencyEstimator::new(
            Some(Box::new(HsvThresholdEstimator::new(HsvBackgroundConfig::default()))),
            SmoothingConfig::default(),
            AlphaMode::Straight,
        );
        let crop = dark_with_square();
        let foreground = estimator.foreground_mask(&crop).expect("enabled");
        assert_eq!(foreground.count(), 400);

        let out = estimator.apply(&crop);
        assert_eq!(out.get_pixel(20, 20).0, [220, 140, 60, 255]);
        assert_eq!(out.get_pixel(9, 20)[3], 255);
        assert_eq!(out.get_pixel(8, 20)[3], 0);
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        // The cross does not reach the diagonal.
        assert_eq!(out.get_pixel(9, 9)[3], 0);
    }

    #[test]
    fn premultiplied_scales_colour() {
        let crop = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 255]));
        let alpha = GrayImage::from_pixel(1, 1, image::Luma([128]));
        let out = merge_alpha(&crop, &alpha, AlphaMode::Premultiplied);
        assert_eq!(out.get_pixel(0, 0).0, [100, 50, 25, 128]);
        let out = merge_alpha(&crop, &alpha, AlphaMode::Straight);
        assert_eq!(out.get_pixel(0, 0).0, [200, 100, 50, 128]);
    }

    #[test]
    fn blur_sigma_matches_kernel_size() {
        assert_eq!(blur_sigma(0), None);
        assert_eq!(blur_sigma(1), None);
        assert!((blur_sigma(3).expect("sigma") - 0.8).abs() < 1e-6);
        assert!((blur_sigma(4).expect("sigma") - 1.1).abs() < 1e-6);
    }

    #[test]
    fn feathering_softens_the_edge() {
        let estimator = TransparencyEstimator::new(
            Some(Box::new(HsvThresholdEstimator::new(HsvBackgroundConfig::default()))),
            SmoothingConfig {
                alpha_blur: 5,
                ..SmoothingConfig::default()
            },
            AlphaMode::Straight,
        );
        let alpha = estimator.alpha(&dark_with_square()).expect("enabled");
        let edge = alpha.get_pixel(9, 20)[0];
        assert!(edge > 0 && edge < 255);
        assert!(alpha.get_pixel(20, 20)[0] >= 254);
        assert!(alpha.get_pixel(0, 0)[0] <= 1);
    }
}
