//! Image encoding: `RgbImage` → PNG bytes.
//!
//! PNG is lossless, so every compression mode produces identical pixels; the
//! mode only trades encode time against file size. Output is never
//! interlaced. `Best` pairs the strongest deflate level with adaptive
//! per-row filtering, which is what "optimize" means for the poppler preset.

use crate::config::PngCompression;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use tracing::debug;

/// Encode a rasterised page as PNG.
pub fn encode_png(img: &RgbImage, compression: PngCompression) -> Result<Vec<u8>, image::ImageError> {
    let (compression_type, filter) = match compression {
        PngCompression::Default => (CompressionType::Default, FilterType::Adaptive),
        PngCompression::Fast => (CompressionType::Fast, FilterType::NoFilter),
        PngCompression::Best => (CompressionType::Best, FilterType::Adaptive),
    };

    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, compression_type, filter).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgb8,
    )?;

    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn striped(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([10, 20, 30])
            }
        })
    }

    #[test]
    fn encodes_valid_png() {
        let img = striped(10, 10);
        let bytes = encode_png(&img, PngCompression::Default).expect("encode should succeed");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn every_mode_is_lossless() {
        let img = striped(33, 17);
        for mode in [PngCompression::Default, PngCompression::Fast, PngCompression::Best] {
            let bytes = encode_png(&img, mode).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
            assert_eq!(decoded, img, "mode {mode:?} altered pixels");
        }
    }

    #[test]
    fn best_is_not_larger_than_fast() {
        let img = striped(256, 256);
        let fast = encode_png(&img, PngCompression::Fast).unwrap();
        let best = encode_png(&img, PngCompression::Best).unwrap();
        assert!(best.len() <= fast.len(), "best={} fast={}", best.len(), fast.len());
    }

    #[test]
    fn output_has_no_alpha_channel() {
        let bytes = encode_png(&striped(4, 4), PngCompression::Default).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }
}
