//! Image checks for rendered figures.

use image::{DynamicImage, GenericImageView, ImageError, ImageFormat, Rgba};
use std::path::Path;

/// Load an image from a file
pub fn load_image(path: &Path) -> Result<DynamicImage, ImageError> {
    image::open(path)
}

/// Load an image from a byte array
pub fn load_image_from_bytes(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(bytes)
}

/// Detect image format from bytes
pub fn detect_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Check if an image has the expected dimensions
pub fn assert_image_dimensions(
    image: &DynamicImage,
    expected_width: u32,
    expected_height: u32,
) -> Result<(), String> {
    let (actual_width, actual_height) = image.dimensions();

    if actual_width != expected_width || actual_height != expected_height {
        return Err(format!(
            "Image dimensions differ: actual = {}x{}, expected = {}x{}",
            actual_width, actual_height, expected_width, expected_height
        ));
    }

    Ok(())
}

/// Check if encoded bytes have the expected format
pub fn assert_image_format(bytes: &[u8], expected_format: ImageFormat) -> Result<(), String> {
    let actual_format =
        detect_image_format(bytes).ok_or_else(|| "Could not detect image format".to_string())?;

    if actual_format != expected_format {
        return Err(format!(
            "Image format differs: actual = {:?}, expected = {:?}",
            actual_format, expected_format
        ));
    }

    Ok(())
}

/// Count the pixels that differ from `background` in any channel.
pub fn count_non_background(image: &DynamicImage, background: Rgba<u8>) -> usize {
    image
        .pixels()
        .filter(|(_, _, pixel)| *pixel != background)
        .count()
}

/// Count the distinct colours in an image.
pub fn count_colors(image: &DynamicImage) -> usize {
    let mut colors: Vec<[u8; 4]> = image.pixels().map(|(_, _, pixel)| pixel.0).collect();
    colors.sort_unstable();
    colors.dedup();
    colors.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    #[test]
    fn test_detect_image_format() {
        let img = ImageBuffer::<Rgba<u8>, Vec<u8>>::new(2, 2);
        let mut png_bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
            .unwrap();

        assert_eq!(detect_image_format(&png_bytes), Some(ImageFormat::Png));
        assert!(assert_image_format(&png_bytes, ImageFormat::Gif).is_err());
    }

    #[test]
    fn test_assert_image_dimensions() {
        let img = DynamicImage::new_rgb8(10, 20);

        assert!(assert_image_dimensions(&img, 10, 20).is_ok());
        assert!(assert_image_dimensions(&img, 11, 20).is_err());
    }

    #[test]
    fn test_count_non_background() {
        let mut img = ImageBuffer::from_pixel(3, 3, Rgba([255u8, 255, 255, 255]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let img = DynamicImage::ImageRgba8(img);

        assert_eq!(count_non_background(&img, Rgba([255, 255, 255, 255])), 1);
        assert_eq!(count_colors(&img), 2);
    }
}
