//! Mask compositing
//!
//! Blends the source over a fully transparent background, using the mask as a
//! per-pixel weight.

use crate::error::{BgRemoverError, Result};
use crate::types::SegmentationMask;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Filter used to bring the mask to the source resolution
pub const MASK_FILTER: FilterType = FilterType::Triangle;

/// Applies segmentation masks to source images
#[derive(Debug, Default, Clone, Copy)]
pub struct MaskCompositor;

impl MaskCompositor {
    /// Scale `mask` to exactly `width` x `height`
    ///
    /// # Errors
    /// - `CompositeFailed` for an empty mask or target, or a resize that does
    ///   not produce the requested dimensions
    pub fn fit_mask(mask: &SegmentationMask, width: u32, height: u32) -> Result<SegmentationMask> {
        if mask.is_empty() {
            return Err(BgRemoverError::composite("segmentation mask is empty"));
        }
        if width == 0 || height == 0 {
            return Err(BgRemoverError::composite(format!(
                "cannot composite onto a {width}x{height} image"
            )));
        }
        if mask.dimensions() == (width, height) {
            return Ok(mask.clone());
        }

        let resized = mask.resize(width, height, MASK_FILTER);
        if resized.dimensions() != (width, height) {
            let (got_w, got_h) = resized.dimensions();
            return Err(BgRemoverError::composite(format!(
                "mask resize produced {got_w}x{got_h}, expected {width}x{height}"
            )));
        }
        Ok(resized)
    }

    /// Composite `source` over transparency using `mask` as the weight
    ///
    /// Colour channels keep the source colour; alpha becomes
    /// `source_alpha * mask / 255`, rounded. Fully transparent pixels are
    /// written as `(0, 0, 0, 0)`.
    ///
    /// # Errors
    /// - `CompositeFailed` as for [`MaskCompositor::fit_mask`]
    pub fn composite(source: &DynamicImage, mask: &SegmentationMask) -> Result<RgbaImage> {
        let (width, height) = source.dimensions();
        let fitted = Self::fit_mask(mask, width, height)?;
        let weights = fitted.as_image();

        let rgba = source.to_rgba8();
        let mut result = RgbaImage::new(width, height);
        for ((src, weight), out) in rgba
            .pixels()
            .zip(weights.pixels())
            .zip(result.pixels_mut())
        {
            *out = blend_pixel(*src, weight.0[0]);
        }

        Ok(result)
    }
}

/// Blend one source pixel against transparency with weight `mask`
#[must_use]
pub fn blend_pixel(source: Rgba<u8>, mask: u8) -> Rgba<u8> {
    let [r, g, b, a] = source.0;
    let alpha = ((u32::from(a) * u32::from(mask) + 127) / 255) as u8;
    if alpha == 0 {
        Rgba([0, 0, 0, 0])
    } else {
        Rgba([r, g, b, alpha])
    }
}
