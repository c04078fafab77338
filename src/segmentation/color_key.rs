//! Colour-key segmentation for photos shot against a solid backdrop

use super::Segmenter;
use crate::config::{KeyColor, MAX_TOLERANCE};
use crate::error::{BgRemoverError, Result};
use crate::types::SegmentationMask;
use image::{DynamicImage, GrayImage, Luma};

/// Marks pixels close to a key colour as background
///
/// A pixel is background when the sum of its per-channel absolute
/// differences from the key colour is at most `tolerance * 3`. The source
/// alpha channel is ignored; the compositor folds it back in.
#[derive(Debug, Clone, Copy)]
pub struct ColorKeySegmenter {
    color: KeyColor,
    tolerance: u8,
}

impl ColorKeySegmenter {
    /// # Errors
    /// - `InvalidArguments` when `tolerance` exceeds 100
    pub fn new(color: KeyColor, tolerance: u8) -> Result<Self> {
        if tolerance > MAX_TOLERANCE {
            return Err(BgRemoverError::invalid_arguments(format!(
                "tolerance must be between 0 and {MAX_TOLERANCE}, got {tolerance}"
            )));
        }
        Ok(Self { color, tolerance })
    }

    #[must_use]
    pub fn color(&self) -> KeyColor {
        self.color
    }

    #[must_use]
    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }

    fn is_background(&self, rgb: [u8; 3]) -> bool {
        let key = self.color.rgb();
        let distance: u32 = rgb
            .iter()
            .zip(key.iter())
            .map(|(&c, &k)| u32::from(c.abs_diff(k)))
            .sum();
        distance <= u32::from(self.tolerance) * 3
    }
}

impl Segmenter for ColorKeySegmenter {
    fn segment(&mut self, image: &DynamicImage) -> Result<SegmentationMask> {
        let rgb = image.to_rgb8();
        let mask = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            if self.is_background(rgb.get_pixel(x, y).0) {
                Luma([0])
            } else {
                Luma([255])
            }
        });

        let mask = SegmentationMask::from_image(mask);
        tracing::debug!(
            color = %self.color,
            tolerance = self.tolerance,
            foreground_ratio = mask.statistics().foreground_ratio,
            "colour-key mask computed"
        );
        Ok(mask)
    }

    fn describe(&self) -> String {
        format!("colour key {} (tolerance {})", self.color, self.tolerance)
    }
}
