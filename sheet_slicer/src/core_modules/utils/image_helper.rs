pub mod image_helper {
    use crate::error::{SlicerError, SlicerResult};
    use image::{ImageEncoder, RgbaImage};
    use std::fs;
    use std::io::BufWriter;
    use std::path::Path;

    /// Writes `image` as an RGBA PNG, creating parent directories as needed.
    pub fn save_png(path: &Path, image: &RgbaImage) -> SlicerResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SlicerError::io(parent, e))?;
        }
        let output = fs::File::create(path).map_err(|e| SlicerError::io(path, e))?;
        let encoder = image::codecs::png::PngEncoder::new(BufWriter::new(output));

        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|source| SlicerError::ImageWrite {
                path: path.to_path_buf(),
                source,
            })
    }
}
