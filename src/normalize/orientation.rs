//! EXIF orientation handling.
//!
//! Cameras and phones often store pixels in sensor order and record the
//! intended rotation in EXIF tag 0x0112. Training code never looks at that
//! tag, so the transform is baked into the pixels before re-encoding.
//!
//! Orientation values:
//! 1 = normal, 2 = mirrored, 3 = 180°, 4 = flipped vertically,
//! 5 = mirrored + 90° CW, 6 = 90° CW, 7 = mirrored + 270° CW, 8 = 270° CW

use std::io::Cursor;

use image::DynamicImage;

/// Read the EXIF orientation tag from raw file bytes.
///
/// Returns 1 (normal) if there is no EXIF block or no orientation tag.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation transform so pixels match display orientation.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
