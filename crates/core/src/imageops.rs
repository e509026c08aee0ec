//! Artifact post-processing: center-crop, resize, watermark, PNG encode.
//!
//! The worker feeds the raw model output through [`finalize_image`] before
//! upload. Output is always a square PNG at the channel's configured size.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba};

use crate::error::CoreError;

/// Fraction of the output edge covered by the watermark band.
const WATERMARK_BAND_FRACTION: u32 = 8;

/// Alpha applied when darkening watermark pixels (0..=255).
const WATERMARK_STRENGTH: u8 = 96;

/// Decode `bytes`, center-crop to square, resize to `size`×`size`, apply
/// the watermark band if requested, and re-encode as PNG.
pub fn finalize_image(bytes: &[u8], size: u32, watermark: bool) -> Result<Vec<u8>, CoreError> {
    if size == 0 {
        return Err(CoreError::Validation("output size must be non-zero".into()));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| CoreError::Image(format!("Failed to decode model output: {e}")))?;

    let cropped = center_crop_square(&decoded);
    let mut resized = cropped.resize_exact(size, size, FilterType::Lanczos3);

    if watermark {
        resized = apply_watermark(resized);
    }

    let mut out = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| CoreError::Image(format!("Failed to encode PNG: {e}")))?;
    Ok(out)
}

/// Crop the largest centered square out of `img`.
fn center_crop_square(img: &DynamicImage) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let side = w.min(h);
    let x = (w - side) / 2;
    let y = (h - side) / 2;
    img.crop_imm(x, y, side, side)
}

/// Darken a band along the bottom-right corner as a plan watermark.
fn apply_watermark(img: DynamicImage) -> DynamicImage {
    let mut rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let band_h = (h / WATERMARK_BAND_FRACTION).max(1);
    let band_w = (w / 2).max(1);

    for y in (h - band_h)..h {
        for x in (w - band_w)..w {
            let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let blend = |c: u8| {
                let keep = 255 - WATERMARK_STRENGTH as u16;
                ((c as u16 * keep) / 255) as u8
            };
            rgba.put_pixel(x, y, Rgba([blend(r), blend(g), blend(b), a]));
        }
    }
    DynamicImage::ImageRgba8(rgba)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
