//! Drawing helpers for synthetic sheets.

#![allow(dead_code)]

use image::{Rgba, RgbaImage};

pub const CANVAS: Rgba<u8> = Rgba([20, 20, 20, 255]);
pub const GUIDE: Rgba<u8> = Rgba([255, 0, 255, 255]);
pub const PAINT: Rgba<u8> = Rgba([200, 120, 40, 255]);

pub fn canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, CANVAS)
}

pub fn fill(image: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    for py in y..(y + height).min(image.height()) {
        for px in x..(x + width).min(image.width()) {
            image.put_pixel(px, py, color);
        }
    }
}

/// A closed guide frame of `thickness` drawn just outside the given interior.
pub fn guide_frame(image: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, thickness: u32) {
    let (ox, oy) = (x - thickness, y - thickness);
    let (ow, oh) = (width + 2 * thickness, height + 2 * thickness);
    fill(image, ox, oy, ow, thickness, GUIDE);
    fill(image, ox, y + height, ow, thickness, GUIDE);
    fill(image, ox, oy, thickness, oh, GUIDE);
    fill(image, x + width, oy, thickness, oh, GUIDE);
}

/// `rows × cols` square blobs centred in equal cells of the interior.
pub fn blob_grid(image: &mut RgbaImage, x: u32, y: u32, rows: u32, cols: u32, cell: u32, blob: u32) {
    let inset = (cell - blob) / 2;
    for r in 0..rows {
        for c in 0..cols {
            fill(image, x + c * cell + inset, y + r * cell + inset, blob, blob, PAINT);
        }
    }
}
