use std::io::Cursor;

use bytes::Bytes;
use image::{
    codecs::{jpeg::JpegEncoder, png::PngEncoder, webp::WebPEncoder},
    imageops::FilterType,
    DynamicImage, ImageError, ImageFormat,
};
use tracing::debug;

use crate::{
    domain::{
        errors::{TransformError, TransformResult},
        models::{CropAnchor, FitMode, OutputFormat, TransformSpec, MAX_DIMENSION},
    },
    ports::transform::ImageTransformer,
};

/// Resize, crop and re-encode rasters in process
#[derive(Debug, Clone, Copy)]
pub struct RasterTransformer {
    filter: FilterType,
}

impl Default for RasterTransformer {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl RasterTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    fn decode(source: &[u8]) -> TransformResult<(DynamicImage, ImageFormat)> {
        let format = image::guess_format(source).map_err(decode_error)?;
        let img = image::load_from_memory_with_format(source, format).map_err(decode_error)?;
        Ok((img, format))
    }

    fn resize(&self, img: DynamicImage, spec: &TransformSpec) -> TransformResult<DynamicImage> {
        let (sw, sh) = (img.width(), img.height());
        let (nw, nh) = match (spec.width, spec.height) {
            (None, None) => return Ok(img),
            (Some(w), None) => bounded(w as u64, scale_side(sh, w, sw))?,
            (None, Some(h)) => bounded(scale_side(sw, h, sh), h as u64)?,
            (Some(w), Some(h)) => match spec.fit_mode() {
                FitMode::Fill => (w, h),
                FitMode::Contain => contain_size(sw, sh, w, h),
                FitMode::Cover => {
                    let (nw, nh) = cover_size(sw, sh, w, h)?;
                    let scaled = img.resize_exact(nw, nh, self.filter);
                    let anchor = spec.crop.unwrap_or(CropAnchor::Center);
                    let (x, y) = anchor.offset(nw, nh, w, h);
                    return Ok(scaled.crop_imm(x, y, w, h));
                }
            },
        };
        Ok(img.resize_exact(nw, nh, self.filter))
    }

    /// Crop to the requested box, clamped to what the raster has left
    fn crop(img: DynamicImage, spec: &TransformSpec) -> DynamicImage {
        let Some(anchor) = spec.crop else {
            return img;
        };
        let (cw, ch) = (img.width(), img.height());
        let w = spec.width.unwrap_or(cw).min(cw);
        let h = spec.height.unwrap_or(ch).min(ch);
        if (w, h) == (cw, ch) {
            return img;
        }
        let (x, y) = anchor.offset(cw, ch, w, h);
        img.crop_imm(x, y, w, h)
    }

    fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> TransformResult<Bytes> {
        let mut out = Cursor::new(Vec::new());
        let result = match format {
            OutputFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
            }
            OutputFormat::Png => img.write_with_encoder(PngEncoder::new(&mut out)),
            OutputFormat::Webp => {
                let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
                rgba.write_with_encoder(WebPEncoder::new_lossless(&mut out))
            }
        };
        result.map_err(|e| TransformError::EncodeFailure(e.to_string()))?;
        Ok(Bytes::from(out.into_inner()))
    }
}

impl ImageTransformer for RasterTransformer {
    fn transform(&self, source: &[u8], spec: &TransformSpec) -> TransformResult<Bytes> {
        if spec.is_passthrough() {
            return Ok(Bytes::copy_from_slice(source));
        }

        let (img, source_format) = Self::decode(source)?;
        let (sw, sh) = (img.width(), img.height());

        let img = self.resize(img, spec)?;
        let img = match spec.fit_mode() {
            // cover has already cut the box at the anchor
            FitMode::Cover if spec.width.is_some() && spec.height.is_some() => img,
            _ => Self::crop(img, spec),
        };

        let format = spec.format.unwrap_or_else(|| default_output(source_format));
        let output = Self::encode(&img, format, spec.jpeg_quality())?;
        debug!(
            source_width = sw,
            source_height = sh,
            width = img.width(),
            height = img.height(),
            format = format.as_str(),
            bytes = output.len(),
            "transformed image"
        );
        Ok(output)
    }
}

fn decode_error(err: ImageError) -> TransformError {
    match err {
        ImageError::Unsupported(e) => TransformError::UnsupportedFormat(e.to_string()),
        other => TransformError::DecodeFailure(other.to_string()),
    }
}

fn default_output(source: ImageFormat) -> OutputFormat {
    match source {
        ImageFormat::Png => OutputFormat::Png,
        ImageFormat::WebP => OutputFormat::Webp,
        _ => OutputFormat::Jpeg,
    }
}

/// `side * given / source_given`, truncated, never below 1
fn scale_side(side: u32, given: u32, source_given: u32) -> u64 {
    ((side as u64 * given as u64) / source_given.max(1) as u64).max(1)
}

/// Reject target sizes the validator could not see, derived from the source
fn bounded(width: u64, height: u64) -> TransformResult<(u32, u32)> {
    let too_large = || TransformError::OutputTooLarge {
        width,
        height,
        max: MAX_DIMENSION,
    };
    let w = u32::try_from(width).map_err(|_| too_large())?;
    let h = u32::try_from(height).map_err(|_| too_large())?;
    if w > MAX_DIMENSION || h > MAX_DIMENSION {
        return Err(too_large());
    }
    Ok((w, h))
}

/// Largest size inside the box that keeps the aspect ratio
fn contain_size(sw: u32, sh: u32, w: u32, h: u32) -> (u32, u32) {
    // both sides stay within the box, so the narrowing is lossless
    if sw as u64 * h as u64 <= w as u64 * sh as u64 {
        (scale_side(sw, h, sh) as u32, h)
    } else {
        (w, scale_side(sh, w, sw) as u32)
    }
}

/// Smallest size covering the box that keeps the aspect ratio
fn cover_size(sw: u32, sh: u32, w: u32, h: u32) -> TransformResult<(u32, u32)> {
    let (sw64, sh64, w64, h64) = (sw.max(1) as u64, sh.max(1) as u64, w as u64, h as u64);
    if w64 * sh64 >= h64 * sw64 {
        bounded(w64, (sh64 * w64).div_ceil(sw64).max(h64))
    } else {
        bounded((sw64 * h64).div_ceil(sh64).max(w64), h64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contain_size() {
        assert_eq!(contain_size(400, 300, 100, 100), (100, 75));
        assert_eq!(contain_size(300, 400, 100, 100), (75, 100));
        assert_eq!(contain_size(100, 50, 400, 400), (400, 200));
    }

    #[test]
    fn test_cover_size() {
        assert_eq!(cover_size(400, 300, 150, 150), Ok((200, 150)));
        assert_eq!(cover_size(300, 400, 150, 150), Ok((150, 200)));
        assert_eq!(cover_size(333, 100, 100, 100), Ok((333, 100)));
        assert_eq!(cover_size(100, 333, 10, 10), Ok((10, 34)));
        assert!(matches!(
            cover_size(1, 200_000, 100, 100),
            Err(TransformError::OutputTooLarge { .. })
        ));
    }

    #[test]
    fn test_scale_side_never_collapses() {
        assert_eq!(scale_side(1, 10, 1000), 1);
        assert_eq!(scale_side(300, 200, 400), 150);
    }

    #[test]
    fn test_derived_side_is_bounded() {
        assert_eq!(bounded(16384, 16384), Ok((16384, 16384)));
        assert!(bounded(16384, scale_side(200_000, 16384, 1)).is_err());
        assert!(bounded(u32::MAX as u64 + 1, 1).is_err());
    }

    #[test]
    fn test_garbage_is_unsupported() {
        let spec = TransformSpec {
            width: Some(10),
            height: None,
            fit: None,
            crop: None,
            quality: None,
            format: None,
            preset: None,
            fresh: false,
        };
        let err = RasterTransformer::new()
            .transform(b"definitely not an image", &spec)
            .unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedFormat(_)));
    }
}
