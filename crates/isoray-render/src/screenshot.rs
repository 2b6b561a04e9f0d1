//! Saving rendered frames to image files.

use image::{ImageBuffer, Rgba};
use std::path::Path;

/// Saves RGBA8 pixel data to an image file.
///
/// The format follows the extension: `.png`, or `.jpg`/`.jpeg` with alpha
/// dropped. Row 0 is the top of the image, as read back from wgpu.
pub fn save_image(
    path: impl AsRef<Path>,
    data: &[u8],
    width: u32,
    height: u32,
) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_image(data, width, height)?;
    match extension.as_str() {
        "png" => {
            img.save_with_format(path, image::ImageFormat::Png)?;
        }
        "jpg" | "jpeg" => {
            // Convert to RGB for JPEG (no alpha)
            let rgb_img = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb_img.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => {
            return Err(ScreenshotError::UnsupportedFormat(extension));
        }
    }

    log::info!("saved {width}x{height} image to {}", path.display());
    Ok(())
}

/// Encodes RGBA8 pixel data as PNG in memory.
pub fn encode_png(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ScreenshotError> {
    let img = to_image(data, width, height)?;
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

fn to_image(
    data: &[u8],
    width: u32,
    height: u32,
) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>, ScreenshotError> {
    ImageBuffer::from_raw(width, height, data.to_vec()).ok_or(ScreenshotError::InvalidImageData)
}

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&[255, 0, 0, 255, 0, 255, 0, 128], 2, 1).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_short_data_rejected() {
        assert!(matches!(
            encode_png(&[0; 7], 2, 1),
            Err(ScreenshotError::InvalidImageData)
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join("isoray_frame.bmpx");
        assert!(matches!(
            save_image(&path, &[0; 4], 1, 1),
            Err(ScreenshotError::UnsupportedFormat(ext)) if ext == "bmpx"
        ));
    }

    #[test]
    fn test_save_png_roundtrip_size() {
        let path = std::env::temp_dir().join(format!("isoray_frame_{}.png", std::process::id()));
        save_image(&path, &[10; 4 * 6], 3, 2).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
        std::fs::remove_file(&path).ok();
    }
}
