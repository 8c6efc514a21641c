use crate::Error;
use image::{imageops, RgbImage};
use std::path::Path;

/// Decodes the image at `path` into an RGB raster.
///
/// The decoder's default size limits are lifted, dataset images can be
/// arbitrarily large.
pub fn load_rgb_image(path: &Path) -> Result<RgbImage, Error> {
    let mut reader = image::io::Reader::open(path)?.with_guessed_format()?;
    reader.no_limits();

    Ok(reader.decode()?.to_rgb8())
}

/// Saves an image, the encoding is inferred from the extension of `path`.
/// Missing parent directories are created first.
pub fn save_rgb_image(img: &RgbImage, path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    img.save(path)?;
    Ok(())
}

/// Resizes `img` so that its shorter side equals `size`, keeping the aspect
/// ratio. A `size` of 0 keeps the image as is.
pub(crate) fn resize_shorter_side(img: RgbImage, size: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    if size == 0 || width.min(height) == size {
        return img;
    }

    let (new_width, new_height) = if width < height {
        let h = (u64::from(size) * u64::from(height) / u64::from(width)) as u32;
        (size, h.max(1))
    } else {
        let w = (u64::from(size) * u64::from(width) / u64::from(height)) as u32;
        (w.max(1), size)
    };

    imageops::resize(&img, new_width, new_height, imageops::FilterType::Triangle)
}

/// Crops a centered square with sides of `size` pixels, clamped to the
/// shorter side of the image. A `size` of 0 uses the shorter side.
pub(crate) fn center_crop(img: RgbImage, size: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    let side = match size {
        0 => width.min(height),
        s => s.min(width).min(height),
    };

    if side == width && side == height {
        return img;
    }

    let left = ((f64::from(width - side)) / 2.0).round() as u32;
    let top = ((f64::from(height - side)) / 2.0).round() as u32;

    imageops::crop_imm(&img, left, top, side, side).to_image()
}
