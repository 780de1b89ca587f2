use std::fmt;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, RgbImage};

use super::orientation::{Orientation, OrientationPolicy};
use super::spec::ThumbnailSpec;
use crate::error::{GatherError, Result};

/// Encoded thumbnail plus the pixel box it was rendered to.
#[derive(Clone, Debug)]
pub struct RenderedThumbnail {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Decode, orientation-correct, resize and encode. Synchronous and CPU
/// bound; callers run it on the blocking pool.
pub trait ImageTransform: Send + Sync + fmt::Debug {
    fn render(&self, source: &[u8], spec: &ThumbnailSpec) -> Result<RenderedThumbnail>;
}

/// Crop-to-fill JPEG thumbnailer backed by the `image` crate.
#[derive(Clone, Debug)]
pub struct JpegThumbnailer {
    quality: u8,
    orientation: OrientationPolicy,
}

impl JpegThumbnailer {
    pub fn new(quality: u8, orientation: OrientationPolicy) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            orientation,
        }
    }
}

impl ImageTransform for JpegThumbnailer {
    fn render(&self, source: &[u8], spec: &ThumbnailSpec) -> Result<RenderedThumbnail> {
        let orientation = Orientation::from_encoded(source);
        let decoded = image::load_from_memory(source)?;
        let upright = orientation.correct(decoded, self.orientation);

        let (target_w, target_h) =
            spec.target_dimensions(upright.width(), upright.height());
        let filled = fill_center(&upright.to_rgb8(), target_w, target_h)?;

        let mut out = Cursor::new(Vec::new());
        let mut encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
        encoder
            .encode(filled.as_raw(), target_w, target_h, ColorType::Rgb8.into())
            .map_err(|e| {
                GatherError::Transform(format!("failed to encode thumbnail JPEG: {e}"))
            })?;

        Ok(RenderedThumbnail {
            width: target_w,
            height: target_h,
            bytes: out.into_inner(),
        })
    }
}

/// Cover the `target_w x target_h` box completely: center-crop the source to
/// the target aspect ratio, then resample with Lanczos3. Never letterboxes.
pub fn fill_center(src: &RgbImage, target_w: u32, target_h: u32) -> Result<RgbImage> {
    if target_w == 0 || target_h == 0 {
        return Err(GatherError::Transform(
            "Thumbnail target dimensions must be non-zero".into(),
        ));
    }
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(GatherError::Transform("source image is empty".into()));
    }

    let dst_aspect = target_w as f64 / target_h as f64;
    let src_aspect = src_w as f64 / src_h as f64;

    let (crop_x, crop_y, crop_w, crop_h) = if src_aspect > dst_aspect {
        // Wider than target: crop width.
        let crop_w = (((src_h as f64) * dst_aspect).round() as u32).clamp(1, src_w);
        let crop_x = (src_w - crop_w) / 2;
        (crop_x, 0, crop_w, src_h)
    } else {
        // Taller than target: crop height.
        let crop_h = (((src_w as f64) / dst_aspect).round() as u32).clamp(1, src_h);
        let crop_y = (src_h - crop_h) / 2;
        (0, crop_y, src_w, crop_h)
    };

    let cropped = image::imageops::crop_imm(src, crop_x, crop_y, crop_w, crop_h).to_image();
    Ok(image::imageops::resize(
        &cropped,
        target_w,
        target_h,
        FilterType::Lanczos3,
    ))
}
