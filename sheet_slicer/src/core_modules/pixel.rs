// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the slicer. It is a "dumb"
// container for a single RGBA pixel plus the single-pixel heuristics every later
// stage thresholds on. Nothing here looks at neighbours; masks, components and
// projections are built on top in higher modules.
//
// Heuristic families (all single-pixel):
// - HSV in the common 8-bit vision-library convention: hue in [0, 180),
//   saturation and value in [0, 255]. Guide detection, the sprite test and the
//   fixed-threshold background model all use this scale.
// - CIE Lab (D65): perceptually uniform, used for colour distances in the
//   colorkey background model. sRGB is linearised through a 256-entry `OnceLock`
//   LUT; the hot path is a table lookup, the Lab transform itself goes through
//   `palette`.

pub mod pixel {
    use crate::config::SpriteThresholds;
    use image::Rgba;
    use palette::{FromColor, Lab, LinSrgb};
    use std::sync::OnceLock;

    pub type Channel = u8;
    pub type NormalizedChannel = f32;
    pub type Hue = f32;

    // Fast path: 256-entry LUT for sRGB (0..255) -> linear normalized (0..1)
    static SRGB_TO_LINEAR_LUT: OnceLock<[NormalizedChannel; 256]> = OnceLock::new();

    /// A colour in CIE Lab (D65).
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct LabColor {
        pub l: f32,
        pub a: f32,
        pub b: f32,
    }

    impl LabColor {
        pub fn new(l: f32, a: f32, b: f32) -> Self {
            Self { l, a, b }
        }

        /// Squared Euclidean distance (CIE76 ΔE²).
        #[inline]
        pub fn distance_sq(&self, other: &LabColor) -> f32 {
            let dl = self.l - other.l;
            let da = self.a - other.a;
            let db = self.b - other.b;
            dl * dl + da * da + db * db
        }

        #[inline]
        pub fn distance(&self, other: &LabColor) -> f32 {
            self.distance_sq(other).sqrt()
        }
    }

    /// HSV triple in the 8-bit convention (H 0..180, S/V 0..=255).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Hsv8 {
        pub hue: u8,
        pub saturation: u8,
        pub value: u8,
    }

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        #[inline]
        fn srgb_to_linear_normalized_from_byte(srgb_value: Channel) -> NormalizedChannel {
            let table = SRGB_TO_LINEAR_LUT.get_or_init(|| {
                let mut table = [0.0f32; 256];
                let mut i = 0usize;
                while i < 256 {
                    let srgb_normalized = i as NormalizedChannel / 255.0f32;
                    table[i] = if srgb_normalized <= 0.04045f32 {
                        srgb_normalized / 12.92f32
                    } else {
                        ((srgb_normalized + 0.055f32) / 1.055f32).powf(2.4f32)
                    };
                    i += 1;
                }
                table
            });
            table[srgb_value as usize]
        }

        /// =================================Heuristics==================================

        #[inline]
        fn max_channel(&self) -> Channel {
            self.red.max(self.green.max(self.blue))
        }

        #[inline]
        fn min_channel(&self) -> Channel {
            self.red.min(self.green.min(self.blue))
        }

        /// Hue angle in degrees [0, 360) from gamma-encoded channels.
        /// Achromatic pixels report 0.
        pub fn hue_degrees(&self) -> Hue {
            let maximum_channel = self.max_channel() as f32;
            let chroma = maximum_channel - self.min_channel() as f32;

            if chroma <= 0.0 {
                return 0.0;
            }

            let (red, green, blue) = (self.red as f32, self.green as f32, self.blue as f32);
            let inverse_chroma = 1.0 / chroma;

            let (base_difference, sector_offset) = if maximum_channel == red {
                (green - blue, 0.0)
            } else if maximum_channel == green {
                (blue - red, 2.0)
            } else {
                (red - green, 4.0)
            };

            let mut hue_degrees = (base_difference * inverse_chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        /// HSV value: the brightest channel.
        #[inline]
        pub fn value(&self) -> u8 {
            self.max_channel()
        }

        /// HSV saturation scaled to 0..=255: `255 * chroma / value`.
        #[inline]
        pub fn saturation(&self) -> u8 {
            let maximum_channel = self.max_channel() as u32;
            if maximum_channel == 0 {
                return 0;
            }
            let chroma = maximum_channel - self.min_channel() as u32;
            ((255 * chroma + maximum_channel / 2) / maximum_channel) as u8
        }

        /// Full HSV triple in the 8-bit convention. Hue is halved so it fits a
        /// byte; 360° wraps back to 0.
        pub fn hsv8(&self) -> Hsv8 {
            let hue = ((self.hue_degrees() * 0.5).round() as u32 % 180) as u8;
            Hsv8 {
                hue,
                saturation: self.saturation(),
                value: self.value(),
            }
        }

        /// The permissive "painted content" test used for box acceptance and
        /// grid inference: bright enough or saturated enough.
        #[inline]
        pub fn is_sprite(&self, thresholds: &SpriteThresholds) -> bool {
            self.value() > thresholds.value_min || self.saturation() > thresholds.saturation_min
        }

        /// CIE Lab (D65) of the colour channels; alpha is ignored.
        pub fn lab(&self) -> LabColor {
            let linear = LinSrgb::new(
                Self::srgb_to_linear_normalized_from_byte(self.red),
                Self::srgb_to_linear_normalized_from_byte(self.green),
                Self::srgb_to_linear_normalized_from_byte(self.blue),
            );
            let lab: Lab = Lab::from_color(linear);
            LabColor::new(lab.l, lab.a, lab.b)
        }
    }

    impl From<&Rgba<u8>> for Pixel {
        fn from(rgba: &Rgba<u8>) -> Self {
            Pixel::new(rgba[0], rgba[1], rgba[2], rgba[3])
        }
    }

    impl From<Pixel> for Rgba<u8> {
        fn from(pixel: Pixel) -> Self {
            Rgba([pixel.red, pixel.green, pixel.blue, pixel.alpha])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;
    use crate::config::SpriteThresholds;

    #[test]
    fn magenta_lands_in_the_guide_hue_band() {
        let hsv = Pixel::new(255, 0, 255, 255).hsv8();
        assert_eq!(hsv.hue, 150);
        assert_eq!(hsv.saturation, 255);
        assert_eq!(hsv.value, 255);
    }

    #[test]
    fn grey_has_no_saturation_or_hue() {
        let hsv = Pixel::new(90, 90, 90, 255).hsv8();
        assert_eq!(hsv.hue, 0);
        assert_eq!(hsv.saturation, 0);
        assert_eq!(hsv.value, 90);
    }

    #[test]
    fn primary_hues_follow_the_half_degree_scale() {
        assert_eq!(Pixel::new(255, 0, 0, 255).hsv8().hue, 0);
        assert_eq!(Pixel::new(0, 255, 0, 255).hsv8().hue, 60);
        assert_eq!(Pixel::new(0, 0, 255, 255).hsv8().hue, 120);
    }

    #[test]
    fn sprite_test_rejects_dark_flat_background() {
        let thresholds = SpriteThresholds::default();
        assert!(!Pixel::new(20, 20, 20, 255).is_sprite(&thresholds));
        assert!(Pixel::new(200, 120, 40, 255).is_sprite(&thresholds));
        // Dark but strongly saturated paint still counts.
        assert!(Pixel::new(40, 0, 0, 255).is_sprite(&thresholds));
    }

    #[test]
    fn lab_of_white_and_black() {
        let white = Pixel::new(255, 255, 255, 255).lab();
        let black = Pixel::new(0, 0, 0, 255).lab();
        assert!((white.l - 100.0).abs() < 0.5);
        assert!(white.a.abs() < 0.5 && white.b.abs() < 0.5);
        assert!(black.l.abs() < 0.5);
        assert!(white.distance(&black) > 99.0);
    }
}

// -----------------------------------------------------------------------------
// Glossary: Single-Pixel Color Terms (1D)
//
// - Hue: angle on the colour wheel. Stored halved (0..180) so it fits a byte.
//
// - Value (HSV): the maximum of the RGB channels.
//
// - Saturation (HSV): chroma divided by value, scaled to 0..255. Drops to zero
//   for greys and near black.
//
// - Lab: CIE L*a*b*, a perceptually uniform space; Euclidean distance (ΔE76)
//   approximates how different two colours look.
//
// - Linearized Channel: gamma-decoded channel proportional to light intensity,
//   looked up from a 256-entry table.
