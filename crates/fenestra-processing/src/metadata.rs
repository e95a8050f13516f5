//! Cheap metadata probing for uploaded images.

use crate::orientation;
use image::ImageReader;
use std::io::Cursor;

/// Pixel dimensions of an image as it will be displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Probe display dimensions from raw image bytes without a full decode.
///
/// EXIF orientations 5-8 rotate the image by 90/270 degrees, so stored width
/// and height are swapped to match what variant generation will produce.
/// Returns `None` for undecodable or unsupported data (e.g. HEIC).
pub fn probe_dimensions(data: &[u8]) -> Option<ImageDimensions> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format().ok()?;
    let (width, height) = reader.into_dimensions().ok()?;

    let orientation = orientation::read_orientation(data);
    let (width, height) = if matches!(orientation, 5..=8) {
        (height, width)
    } else {
        (width, height)
    };

    Some(ImageDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_probe_dimensions_png() {
        let img = RgbaImage::from_pixel(120, 80, Rgba([10, 20, 30, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();

        let dims = probe_dimensions(&buffer).unwrap();
        assert_eq!(dims, ImageDimensions { width: 120, height: 80 });
    }

    #[test]
    fn test_probe_dimensions_garbage() {
        assert!(probe_dimensions(b"definitely not an image").is_none());
        assert!(probe_dimensions(b"").is_none());
    }
}
