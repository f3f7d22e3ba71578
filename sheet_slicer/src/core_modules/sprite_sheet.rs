// THEORY:
// `SpriteSheet` is the immutable source image of a run. Whatever the file
// format, it is normalised once to an RGBA8 buffer; `has_alpha` remembers whether
// the source carried a real alpha channel (trimming and export depend on it).
// Only colour images are accepted: one- and two-channel inputs are rejected with
// a format error instead of being silently promoted.

use crate::config::SpriteThresholds;
use crate::core_modules::block_box::BlockBox;
use crate::core_modules::mask::Mask;
use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{SlicerError, SlicerResult};
use image::{DynamicImage, RgbaImage};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SpriteSheet {
    rgba: RgbaImage,
    has_alpha: bool,
}

impl SpriteSheet {
    pub fn open(path: &Path) -> SlicerResult<Self> {
        let image = image::open(path).map_err(|source| SlicerError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_dynamic(image)
    }

    pub fn from_dynamic(image: DynamicImage) -> SlicerResult<Self> {
        let color = image.color();
        let channels = color.channel_count();
        if channels != 3 && channels != 4 {
            return Err(SlicerError::UnsupportedChannels { channels });
        }
        Ok(Self {
            has_alpha: color.has_alpha(),
            rgba: image.to_rgba8(),
        })
    }

    /// An opaque sheet built from an in-memory buffer.
    pub fn from_rgba(rgba: RgbaImage, has_alpha: bool) -> Self {
        Self { rgba, has_alpha }
    }

    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    /// Copies the pixels under `rect` (clipped to the sheet).
    pub fn crop(&self, rect: &BlockBox) -> RgbaImage {
        crop_rgba(&self.rgba, rect)
    }

    /// Pixels that look painted rather than flat background.
    pub fn sprite_mask(&self, thresholds: &SpriteThresholds) -> Mask {
        sprite_mask(&self.rgba, thresholds)
    }
}

pub fn crop_rgba(image: &RgbaImage, rect: &BlockBox) -> RgbaImage {
    let x1 = rect.right().min(image.width());
    let y1 = rect.bottom().min(image.height());
    let x0 = rect.x.min(x1);
    let y0 = rect.y.min(y1);
    image::imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image()
}

pub fn sprite_mask(image: &RgbaImage, thresholds: &SpriteThresholds) -> Mask {
    Mask::from_fn(image.width(), image.height(), |x, y| {
        Pixel::from(image.get_pixel(x, y)).is_sprite(thresholds)
    })
}
