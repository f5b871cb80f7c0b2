//! Decoding source files into upright pixels.
//!
//! HEIC/HEIF goes through libheif (behind the `heic` feature); everything
//! else goes through the `image` crate followed by the EXIF orientation fix.

use std::path::Path;

use image::DynamicImage;

use super::orientation::{apply_orientation, read_exif_orientation};
use crate::error::DataprepError;

/// Extensions decoded with libheif.
pub const HEIF_EXTENSIONS: [&str; 2] = ["heic", "heif"];

fn is_heif(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| HEIF_EXTENSIONS.contains(&ext.as_str()))
}

/// Decode `bytes` and return the image the way it should be displayed.
pub fn decode_upright(path: &Path, bytes: &[u8]) -> Result<DynamicImage, DataprepError> {
    if is_heif(path) {
        // libheif applies the container's irot/imir transforms itself.
        return decode_heif(path, bytes);
    }

    let decoded =
        image::load_from_memory(bytes).map_err(|source| DataprepError::UnreadableImage {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(apply_orientation(decoded, read_exif_orientation(bytes)))
}

#[cfg(feature = "heic")]
fn decode_heif(path: &Path, bytes: &[u8]) -> Result<DynamicImage, DataprepError> {
    use image::RgbImage;
    use libheif_rs::{ColorSpace, HeifContext, HeifError, LibHeif, RgbChroma};

    let heif_error = |message: String| DataprepError::HeifDecode {
        path: path.to_path_buf(),
        message,
    };
    let from_heif = |e: HeifError| heif_error(e.to_string());

    let context = HeifContext::read_from_bytes(bytes).map_err(from_heif)?;
    let handle = context.primary_image_handle().map_err(from_heif)?;
    let decoded = LibHeif::new()
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(from_heif)?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| heif_error("no interleaved RGB plane".to_string()))?;

    let (width, height) = (plane.width, plane.height);
    let row_len = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        let row = row
            .get(..row_len)
            .ok_or_else(|| heif_error("truncated pixel row".to_string()))?;
        pixels.extend_from_slice(row);
    }

    RgbImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| heif_error(format!("pixel buffer does not fit {}x{}", width, height)))
}

#[cfg(not(feature = "heic"))]
fn decode_heif(path: &Path, _bytes: &[u8]) -> Result<DynamicImage, DataprepError> {
    Err(DataprepError::HeifUnsupported {
        path: path.to_path_buf(),
    })
}
