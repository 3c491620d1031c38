//! Receipt image preparation for the vision call.
//!
//! The extraction endpoint has payload limits, so the stored image is
//! downsampled to fit within 2048px on the longer edge and re-encoded
//! as JPEG before being sent.

use std::io::Cursor;

use image::{ImageReader, codecs::jpeg::JpegEncoder};

use crate::EngineError;

const MAX_EDGE: u32 = 2048;
const JPEG_QUALITY: u8 = 85;

/// MIME type of every prepared payload.
pub const PREPARED_MIME: &str = "image/jpeg";

/// Decodes `bytes`, shrinks the image to fit within 2048x2048 without
/// enlarging, and re-encodes it as JPEG.
///
/// Fails with [`EngineError::Upstream`] when the stored blob is not a
/// decodable image; the caller records that on the receipt.
pub fn prepare(bytes: &[u8]) -> Result<Vec<u8>, EngineError> {
    let decoded = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| EngineError::Upstream(format!("failed to read image: {err}")))?
        .decode()
        .map_err(|err| EngineError::Upstream(format!("failed to decode image: {err}")))?;

    let resized = if decoded.width() > MAX_EDGE || decoded.height() > MAX_EDGE {
        // `resize` preserves aspect ratio within the bounding box.
        decoded.resize(MAX_EDGE, MAX_EDGE, image::imageops::FilterType::Triangle)
    } else {
        decoded
    };

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    resized
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|err| EngineError::Upstream(format!("failed to encode image: {err}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, RgbImage};

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([200, 180, 160]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn large_images_shrink_to_fit_the_bounding_box() {
        let bytes = png_bytes(4096, 1024);
        let prepared = prepare(&bytes).unwrap();

        let reread = image::load_from_memory(&prepared).unwrap();
        assert_eq!(reread.width(), 2048);
        assert_eq!(reread.height(), 512);
    }

    #[test]
    fn small_images_are_not_enlarged() {
        let bytes = png_bytes(640, 480);
        let prepared = prepare(&bytes).unwrap();

        let reread = image::load_from_memory(&prepared).unwrap();
        assert_eq!(reread.width(), 640);
        assert_eq!(reread.height(), 480);
    }

    #[test]
    fn garbage_bytes_fail_as_upstream() {
        let err = prepare(b"definitely not an image").unwrap_err();
        assert!(matches!(err, EngineError::Upstream(_)));
    }
}
