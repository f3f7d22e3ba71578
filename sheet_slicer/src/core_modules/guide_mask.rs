// THEORY:
// Guide lines are painted in one saturated colour family. Extraction is a pure
// single-pixel band-pass in 8-bit HSV followed by one 3×3 closing that heals
// anti-aliasing holes and one-pixel breaks in hand-drawn strokes.
//
// Two bands are known:
// - magenta: the narrow band the painting tools default to.
// - pink: wider in hue and with lower saturation/value floors, for guides that
//   were painted with a softer brush or washed out by compression.
// A band with `hue_min > hue_max` wraps around the red end of the wheel.

use crate::core_modules::mask::{Kernel, Mask};
use crate::core_modules::pixel::pixel::{Hsv8, Pixel};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GuideColor {
    #[default]
    Magenta,
    Pink,
}

impl GuideColor {
    pub fn band(self) -> HsvBand {
        match self {
            GuideColor::Magenta => HsvBand {
                hue_min: 140,
                hue_max: 170,
                saturation_min: 80,
                value_min: 80,
            },
            GuideColor::Pink => HsvBand {
                hue_min: 135,
                hue_max: 178,
                saturation_min: 35,
                value_min: 70,
            },
        }
    }
}

/// Inclusive hue band with saturation and value floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvBand {
    pub hue_min: u8,
    pub hue_max: u8,
    pub saturation_min: u8,
    pub value_min: u8,
}

impl HsvBand {
    #[inline]
    pub fn contains(&self, hsv: Hsv8) -> bool {
        let hue_ok = if self.hue_min <= self.hue_max {
            (self.hue_min..=self.hue_max).contains(&hsv.hue)
        } else {
            hsv.hue >= self.hue_min || hsv.hue <= self.hue_max
        };
        hue_ok && hsv.saturation >= self.saturation_min && hsv.value >= self.value_min
    }
}

/// Marks every guide-coloured pixel of `image`.
pub fn extract_guide_mask(image: &RgbaImage, color: GuideColor) -> Mask {
    let band = color.band();
    let raw = Mask::from_fn(image.width(), image.height(), |x, y| {
        band.contains(Pixel::from(image.get_pixel(x, y)).hsv8())
    });
    let mask = raw.close(Kernel::Square(1));
    debug!(
        guide_color = ?color,
        guide_pixels = mask.count(),
        "extracted guide mask"
    );
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn magenta_band_accepts_pure_magenta_only() {
        let band = GuideColor::Magenta.band();
        assert!(band.contains(Pixel::new(255, 0, 255, 255).hsv8()));
        assert!(!band.contains(Pixel::new(255, 0, 0, 255).hsv8()));
        // Washed-out pink falls below the magenta saturation floor.
        assert!(!band.contains(Pixel::new(230, 170, 220, 255).hsv8()));
    }

    #[test]
    fn pink_band_is_wider() {
        let band = GuideColor::Pink.band();
        assert!(band.contains(Pixel::new(255, 0, 255, 255).hsv8()));
        assert!(band.contains(Pixel::new(230, 170, 220, 255).hsv8()));
        assert!(!band.contains(Pixel::new(0, 200, 0, 255).hsv8()));
    }

    #[test]
    fn wrapping_band() {
        let band = HsvBand {
            hue_min: 170,
            hue_max: 10,
            saturation_min: 50,
            value_min: 50,
        };
        assert!(band.contains(Pixel::new(255, 0, 0, 255).hsv8()));
        assert!(!band.contains(Pixel::new(0, 255, 0, 255).hsv8()));
    }

    #[test]
    fn mask_marks_the_drawn_line_and_heals_a_gap() {
        let mut image = RgbaImage::from_pixel(30, 10, Rgba([20, 20, 20, 255]));
        for x in 2..28 {
            if x != 15 {
                image.put_pixel(x, 5, Rgba([255, 0, 255, 255]));
            }
        }
        let mask = extract_guide_mask(&image, GuideColor::Magenta);
        assert_eq!(mask.dimensions(), (30, 10));
        assert!(mask.get(15, 5));
        assert_eq!(mask.count_row(5, 0, 30), 26);
        assert_eq!(mask.count_row(2, 0, 30), 0);
    }
}
