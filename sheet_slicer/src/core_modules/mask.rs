// THEORY:
// A `Mask` is a binary image aligned to a source image: 255 marks "set", 0 marks
// "clear". It is the currency between every stage of the engine (guide pixels,
// sprite pixels, background candidates, content for grid inference). Masks are
// derived, disposable values. Stages take `&Mask` and return new masks; nothing
// is mutated in place once handed on, which keeps block-level parallelism free
// of synchronisation.
//
// Square and cross-shaped morphology goes through `imageproc`. Long, thin line
// kernels (15×1, 41×1, …) are not expressible there, so row/column morphology is
// done here with sliding-window counts along one axis.

use crate::core_modules::block_box::BlockBox;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

pub const SET: u8 = 255;
pub const CLEAR: u8 = 0;

/// Structuring element shape for 2-D morphology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// (2r+1)×(2r+1) square.
    Square(u8),
    /// L1 ball of radius r; radius 1 is the 3×3 cross.
    Cross(u8),
    /// Ellipse inscribed in the (2r+1)×(2r+1) square, rasterised row by row
    /// with half-width `round(r * sqrt(1 - dy²/r²))`. Radius 1 is the cross,
    /// radius 2 is the 5×5 square without its corners.
    Ellipse(u8),
}

impl Kernel {
    /// The `size`×`size` ellipse; even sizes are rounded up.
    pub fn ellipse(size: u32) -> Self {
        let size = size.max(1) | 1;
        Kernel::Ellipse(((size - 1) / 2).min(u8::MAX as u32) as u8)
    }

    pub fn radius(self) -> u8 {
        match self {
            Kernel::Square(r) | Kernel::Cross(r) | Kernel::Ellipse(r) => r,
        }
    }

    fn shape(self) -> Shape {
        match self {
            Kernel::Square(r) => Shape::Norm(Norm::LInf, r),
            Kernel::Cross(r) => Shape::Norm(Norm::L1, r),
            Kernel::Ellipse(r) => Shape::Mask(ellipse_mask(r)),
        }
    }
}

/// How a kernel is handed to `imageproc`: distance-based for the norm balls,
/// an explicit structuring element for the ellipse.
enum Shape {
    Norm(Norm, u8),
    Mask(morphology::Mask),
}

fn ellipse_mask(radius: u8) -> morphology::Mask {
    let r = radius as i32;
    let size = 2 * radius as u32 + 1;
    let shape = GrayImage::from_fn(size, size, |x, y| {
        let dy = y as i32 - r;
        let half = if r == 0 {
            0
        } else {
            (r as f64 * ((r * r - dy * dy) as f64 / (r * r) as f64).sqrt()).round() as i32
        };
        Luma([if (x as i32 - r).abs() <= half { SET } else { CLEAR }])
    });
    morphology::Mask::from_image(&shape, radius, radius)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self {
            image: GrayImage::from_fn(width, height, |x, y| Luma([if f(x, y) { SET } else { CLEAR }])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] != CLEAR
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.image.put_pixel(x, y, Luma([if value { SET } else { CLEAR }]));
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    pub fn count(&self) -> u64 {
        self.image.pixels().filter(|p| p[0] != CLEAR).count() as u64
    }

    /// Number of set pixels inside `rect` (clipped to the mask).
    pub fn count_in(&self, rect: &BlockBox) -> u64 {
        let x1 = rect.right().min(self.width());
        let y1 = rect.bottom().min(self.height());
        let mut total = 0u64;
        for y in rect.y.min(y1)..y1 {
            total += self.count_row(y, rect.x, x1) as u64;
        }
        total
    }

    /// Number of set pixels in row `y` over columns `[x0, x1)`.
    pub fn count_row(&self, y: u32, x0: u32, x1: u32) -> u32 {
        if y >= self.height() {
            return 0;
        }
        let x1 = x1.min(self.width());
        (x0.min(x1)..x1).filter(|&x| self.get(x, y)).count() as u32
    }

    pub fn inverted(&self) -> Mask {
        let mut image = self.image.clone();
        for p in image.pixels_mut() {
            p[0] = if p[0] == CLEAR { SET } else { CLEAR };
        }
        Mask { image }
    }

    // --- 2-D morphology (imageproc) ---

    pub fn dilate(&self, kernel: Kernel) -> Mask {
        if kernel.radius() == 0 {
            return self.clone();
        }
        let image = match kernel.shape() {
            Shape::Norm(norm, k) => morphology::dilate(&self.image, norm, k),
            Shape::Mask(mask) => morphology::grayscale_dilate(&self.image, &mask),
        };
        Mask { image }
    }

    pub fn close(&self, kernel: Kernel) -> Mask {
        if kernel.radius() == 0 {
            return self.clone();
        }
        let image = match kernel.shape() {
            Shape::Norm(norm, k) => morphology::close(&self.image, norm, k),
            Shape::Mask(mask) => morphology::grayscale_close(&self.image, &mask),
        };
        Mask { image }
    }

    // --- 1-D line morphology ---

    /// Closes every row with a horizontal line kernel of `length` pixels.
    pub fn close_rows(&self, length: u32) -> Mask {
        self.map_rows(|line| close_1d(line, length as usize))
    }

    /// Opens every row with a horizontal line kernel of `length` pixels,
    /// removing set runs shorter than `length`.
    pub fn open_rows(&self, length: u32) -> Mask {
        self.map_rows(|line| open_1d(line, length as usize))
    }

    pub fn close_cols(&self, length: u32) -> Mask {
        self.map_cols(|line| close_1d(line, length as usize))
    }

    pub fn open_cols(&self, length: u32) -> Mask {
        self.map_cols(|line| open_1d(line, length as usize))
    }

    fn map_rows(&self, f: impl Fn(&[bool]) -> Vec<bool>) -> Mask {
        let (w, h) = self.dimensions();
        let mut out = Mask::new(w, h);
        let mut line = vec![false; w as usize];
        for y in 0..h {
            for x in 0..w {
                line[x as usize] = self.get(x, y);
            }
            for (x, v) in f(&line).into_iter().enumerate() {
                if v {
                    out.set(x as u32, y, true);
                }
            }
        }
        out
    }

    fn map_cols(&self, f: impl Fn(&[bool]) -> Vec<bool>) -> Mask {
        let (w, h) = self.dimensions();
        let mut out = Mask::new(w, h);
        let mut line = vec![false; h as usize];
        for x in 0..w {
            for y in 0..h {
                line[y as usize] = self.get(x, y);
            }
            for (y, v) in f(&line).into_iter().enumerate() {
                if v {
                    out.set(x, y as u32, true);
                }
            }
        }
        out
    }
}

/// Window `[i - anchor, i - anchor + k)` around index `i`, clipped to the line.
/// Returns (set count, in-bounds length) for every index.
fn window_counts(line: &[bool], k: usize) -> Vec<(usize, usize)> {
    let n = line.len();
    let anchor = k / 2;
    let mut prefix = vec![0usize; n + 1];
    for (i, &v) in line.iter().enumerate() {
        prefix[i + 1] = prefix[i] + v as usize;
    }
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(anchor);
            let end = (i + k - anchor).min(n);
            (prefix[end] - prefix[start], end - start)
        })
        .collect()
}

/// 1-D dilation with a `k`-long flat kernel anchored at its centre.
pub fn dilate_1d(line: &[bool], k: usize) -> Vec<bool> {
    if k <= 1 {
        return line.to_vec();
    }
    window_counts(line, k).into_iter().map(|(set, _)| set > 0).collect()
}

/// 1-D erosion; positions outside the line do not erode.
pub fn erode_1d(line: &[bool], k: usize) -> Vec<bool> {
    if k <= 1 {
        return line.to_vec();
    }
    window_counts(line, k)
        .into_iter()
        .map(|(set, len)| set == len)
        .collect()
}

pub fn close_1d(line: &[bool], k: usize) -> Vec<bool> {
    erode_1d(&dilate_1d(line, k), k)
}

pub fn open_1d(line: &[bool], k: usize) -> Vec<bool> {
    dilate_1d(&erode_1d(line, k), k)
}

/// Half-open runs of `true` values, as `(start, end)`.
pub fn runs(line: &[bool]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, &v) in line.iter().enumerate() {
        match (v, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, line.len()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(pattern: &str) -> Vec<bool> {
        pattern.chars().map(|c| c == '#').collect()
    }

    fn show(line: &[bool]) -> String {
        line.iter().map(|&v| if v { '#' } else { '.' }).collect()
    }

    #[test]
    fn close_bridges_short_gaps_only() {
        let closed = close_1d(&line("###...###......###"), 3);
        assert_eq!(show(&closed), "###...###......###");
        let closed = close_1d(&line("###...###......###"), 5);
        assert_eq!(show(&closed), "#########......###");
    }

    #[test]
    fn open_removes_short_runs() {
        let opened = open_1d(&line("##....#####...#"), 5);
        assert_eq!(show(&opened), "......#####....");
    }

    #[test]
    fn erosion_ignores_the_line_ends() {
        assert_eq!(show(&erode_1d(&line("####"), 3)), "####");
    }

    #[test]
    fn runs_are_half_open() {
        assert_eq!(runs(&line("##..###.#")), vec![(0, 2), (4, 7), (8, 9)]);
        assert!(runs(&line("....")).is_empty());
    }

    #[test]
    fn square_close_fills_a_one_pixel_gap() {
        let mut mask = Mask::new(20, 5);
        for x in 2..18 {
            if x != 9 {
                mask.set(x, 2, true);
            }
        }
        let closed = mask.close(Kernel::Square(1));
        assert!(closed.get(9, 2));
        assert_eq!(closed.count(), 16);
    }

    #[test]
    fn ellipse_dilation_rounds_off_the_corners() {
        let mut mask = Mask::new(25, 25);
        mask.set(12, 12, true);

        let grown = mask.dilate(Kernel::ellipse(5));
        assert_eq!(grown.count(), 17);
        assert!(grown.get(12, 10));
        assert!(grown.get(10, 12));
        assert!(grown.get(10, 11));
        assert!(!grown.get(11, 10));
        assert!(!grown.get(10, 10));

        let cross = mask.dilate(Kernel::ellipse(3));
        assert_eq!(cross, mask.dilate(Kernel::Cross(1)));
        assert_eq!(Kernel::ellipse(4), Kernel::Ellipse(2));
    }

    #[test]
    fn row_open_keeps_only_long_lines() {
        let mut mask = Mask::new(60, 4);
        for x in 0..50 {
            mask.set(x, 1, true);
        }
        for x in 10..14 {
            mask.set(x, 3, true);
        }
        let opened = mask.open_rows(21);
        assert_eq!(opened.count_row(1, 0, 60), 50);
        assert_eq!(opened.count_row(3, 0, 60), 0);
    }

    #[test]
    fn counts_inside_a_rectangle() {
        let mask = Mask::from_fn(10, 10, |x, y| x >= 5 && y >= 5);
        let rect = BlockBox::new(3, 3, 4, 4).expect("non-empty");
        assert_eq!(mask.count_in(&rect), 4);
        assert_eq!(mask.inverted().count_in(&rect), 12);
    }
}
