// THEORY:
// Packed atlases waste space on the transparent margin around each pose, so
// frames can be cropped to the bounding box of their visible pixels. A fixed
// padding is kept on every side so bilinear sampling in the engine does not
// bleed into a neighbouring frame. Trimming only makes sense once alpha exists;
// asking for it on an opaque crop is a configuration mistake, not a no-op.

use crate::core_modules::block_box::BlockBox;
use crate::core_modules::sprite_sheet::crop_rgba;
use crate::error::{SlicerError, SlicerResult};
use image::RgbaImage;

/// Crops away fully transparent margins (`alpha <= threshold`), keeping
/// `padding` pixels on every side where the image allows it.
///
/// An image without alpha cannot be trimmed. An image with no visible pixel at
/// all is returned unchanged.
pub fn trim_transparent(
    image: &RgbaImage,
    has_alpha: bool,
    threshold: u8,
    padding: u32,
) -> SlicerResult<RgbaImage> {
    if !has_alpha {
        return Err(SlicerError::TrimWithoutAlpha);
    }

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in image.enumerate_pixels() {
        if p[3] > threshold {
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }

    let Some((x0, y0, x1, y1)) = bounds else {
        return Ok(image.clone());
    };
    let rect = BlockBox::from_corners(
        x0.saturating_sub(padding),
        y0.saturating_sub(padding),
        (x1 + 1 + padding).min(image.width()),
        (y1 + 1 + padding).min(image.height()),
    );
    Ok(match rect {
        Some(rect) => crop_rgba(image, &rect),
        None => image.clone(),
    })
}
