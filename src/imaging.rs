//! Raster helpers for scroll screenshots.

// ============================================================================
// Imports
// ============================================================================

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage, codecs::jpeg::JpegEncoder};

use crate::error::{Error, Result};
use crate::protocol::methods::ScreenshotFormat;

// ============================================================================
// Constants
// ============================================================================

/// JPEG quality used when the caller does not specify one.
const DEFAULT_JPEG_QUALITY: u8 = 80;

// ============================================================================
// Splice
// ============================================================================

/// Stacks encoded slices vertically into one image.
///
/// Slices are decoded, drawn top to bottom onto a canvas as wide as the
/// widest slice, and re-encoded in `format`. Only PNG and JPEG are
/// supported.
pub(crate) fn splice_vertical(
    slices: &[Vec<u8>],
    format: ScreenshotFormat,
    quality: Option<u8>,
) -> Result<Vec<u8>> {
    if slices.is_empty() {
        return Err(Error::protocol("no screenshot slices to splice"));
    }

    let decoded: Vec<DynamicImage> = slices
        .iter()
        .map(|bytes| image::load_from_memory(bytes).map_err(Error::Image))
        .collect::<Result<_>>()?;

    let width = decoded.iter().map(DynamicImage::width).max().unwrap_or(0);
    let height: u32 = decoded.iter().map(DynamicImage::height).sum();

    let mut canvas = RgbaImage::new(width, height);
    let mut offset: i64 = 0;
    for slice in &decoded {
        image::imageops::replace(&mut canvas, &slice.to_rgba8(), 0, offset);
        offset += i64::from(slice.height());
    }

    encode(DynamicImage::ImageRgba8(canvas), format, quality)
}

fn encode(img: DynamicImage, format: ScreenshotFormat, quality: Option<u8>) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());

    match format {
        ScreenshotFormat::Png => {
            img.write_to(&mut out, ImageFormat::Png)?;
        }
        ScreenshotFormat::Jpeg => {
            // JPEG carries no alpha channel.
            let rgb = img.to_rgb8();
            let encoder =
                JpegEncoder::new_with_quality(&mut out, quality.unwrap_or(DEFAULT_JPEG_QUALITY));
            rgb.write_with_encoder(encoder)?;
        }
        ScreenshotFormat::Webp => {
            return Err(Error::protocol("webp splicing is not supported"));
        }
    }

    Ok(out.into_inner())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid_png(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode");
        out.into_inner()
    }

    #[test]
    fn test_splice_stacks_vertically() {
        let red = solid_png(4, 2, Rgba([255, 0, 0, 255]));
        let blue = solid_png(4, 3, Rgba([0, 0, 255, 255]));

        let spliced =
            splice_vertical(&[red, blue], ScreenshotFormat::Png, None).expect("splice");
        let img = image::load_from_memory(&spliced).expect("decode").to_rgba8();

        assert_eq!(img.dimensions(), (4, 5));
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(img.get_pixel(0, 4), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_splice_jpeg_output_decodes() {
        let slice = solid_png(4, 4, Rgba([0, 255, 0, 255]));

        let spliced =
            splice_vertical(&[slice], ScreenshotFormat::Jpeg, Some(90)).expect("splice");
        let img = image::load_from_memory(&spliced).expect("decode");
        assert_eq!(img.width(), 4);
    }

    #[test]
    fn test_splice_rejects_empty_and_webp() {
        assert!(splice_vertical(&[], ScreenshotFormat::Png, None).is_err());

        let slice = solid_png(1, 1, Rgba([0, 0, 0, 255]));
        assert!(splice_vertical(&[slice], ScreenshotFormat::Webp, None).is_err());
    }
}
