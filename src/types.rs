//! Core types shared by the removal pipeline

use crate::error::{BgRemoverError, Result};
use image::imageops::FilterType;
use image::{GrayImage, RgbaImage};
use std::time::Duration;

/// Single-channel foreground confidence mask
///
/// 255 marks foreground, 0 marks background. Dimensions are independent of the
/// source image until the compositor rescales the mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    image: GrayImage,
}

impl SegmentationMask {
    /// Create a mask from raw row-major grayscale data
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let (width, height) = dimensions;
        let expected = width as usize * height as usize;
        let actual = data.len();
        GrayImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| {
                BgRemoverError::segmentation(format!(
                    "mask data has {actual} bytes, expected {expected} for {width}x{height}"
                ))
            })
    }

    /// Create mask from a grayscale image
    #[must_use]
    pub fn from_image(image: GrayImage) -> Self {
        Self { image }
    }

    /// Create a mask where every pixel has the same confidence
    #[must_use]
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            image: GrayImage::from_pixel(width, height, image::Luma([value])),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// Confidence at `(x, y)`, or `None` outside the mask
    #[must_use]
    pub fn value_at(&self, x: u32, y: u32) -> Option<u8> {
        self.image.get_pixel_checked(x, y).map(|p| p.0[0])
    }

    #[must_use]
    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    #[must_use]
    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// Resample the mask to new dimensions with the given filter
    #[must_use]
    pub fn resize(&self, new_width: u32, new_height: u32, filter: FilterType) -> Self {
        Self {
            image: image::imageops::resize(&self.image, new_width, new_height, filter),
        }
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.image.as_raw().len();
        let foreground_pixels = self.image.as_raw().iter().filter(|&&x| x > 127).count();
        let background_pixels = total_pixels - foreground_pixels;
        let ratio = |count: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                count as f32 / total_pixels as f32
            }
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: ratio(foreground_pixels),
            background_ratio: ratio(background_pixels),
        }
    }
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// Timing breakdown for one removal run
#[derive(Debug, Clone, Default)]
pub struct ProcessingTimings {
    /// Model loading time (first segmentation only)
    pub model_load: Option<Duration>,

    /// Reading and decoding the input file
    pub image_decode: Duration,

    /// Mask generation, including any preprocessing and inference
    pub segmentation: Duration,

    /// Mask resampling and blending
    pub compositing: Duration,

    /// PNG encoding and writing, if the result was saved
    pub image_encode: Option<Duration>,

    /// Total end-to-end processing time
    pub total: Duration,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One-line summary suitable for debug logging
    #[must_use]
    pub fn summary(&self) -> String {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        let mut parts = vec![
            format!("decode {:.1}ms", ms(self.image_decode)),
            format!("segment {:.1}ms", ms(self.segmentation)),
            format!("composite {:.1}ms", ms(self.compositing)),
        ];
        if let Some(load) = self.model_load {
            parts.insert(0, format!("model load {:.1}ms", ms(load)));
        }
        if let Some(encode) = self.image_encode {
            parts.push(format!("encode {:.1}ms", ms(encode)));
        }
        format!("{} (total {:.1}ms)", parts.join(", "), ms(self.total))
    }
}

/// Result of removing the background from one image
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// RGBA composite with the source's exact dimensions
    pub image: RgbaImage,

    /// Mask as produced by the segmenter, before rescaling
    pub mask: SegmentationMask,

    /// Source dimensions (width, height)
    pub original_dimensions: (u32, u32),

    pub timings: ProcessingTimings,
}

impl RemovalResult {
    #[must_use]
    pub fn new(
        image: RgbaImage,
        mask: SegmentationMask,
        original_dimensions: (u32, u32),
        timings: ProcessingTimings,
    ) -> Self {
        Self {
            image,
            mask,
            original_dimensions,
            timings,
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_new_validates_length() {
        assert!(SegmentationMask::new(vec![0; 12], (4, 3)).is_ok());
        let err = SegmentationMask::new(vec![0; 11], (4, 3)).unwrap_err();
        assert!(matches!(err, BgRemoverError::SegmentationFailed(_)));
    }

    #[test]
    fn test_mask_statistics() {
        let mask = SegmentationMask::new(vec![0, 255, 200, 10], (2, 2)).unwrap();
        let stats = mask.statistics();
        assert_eq!(stats.total_pixels, 4);
        assert_eq!(stats.foreground_pixels, 2);
        assert_eq!(stats.background_pixels, 2);
        assert!((stats.foreground_ratio - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_mask_statistics() {
        let mask = SegmentationMask::filled(0, 0, 0);
        assert!(mask.is_empty());
        assert!(mask.statistics().foreground_ratio.abs() < f32::EPSILON);
    }

    #[test]
    fn test_mask_resize_changes_dimensions() {
        let mask = SegmentationMask::filled(10, 20, 255);
        let resized = mask.resize(40, 30, FilterType::Triangle);
        assert_eq!(resized.dimensions(), (40, 30));
        assert_eq!(resized.value_at(39, 29), Some(255));
        assert_eq!(resized.value_at(40, 0), None);
    }

    #[test]
    fn test_timing_summary_includes_optional_phases() {
        let mut timings = ProcessingTimings::new();
        assert!(!timings.summary().contains("model load"));
        timings.model_load = Some(Duration::from_millis(12));
        timings.image_encode = Some(Duration::from_millis(3));
        let summary = timings.summary();
        assert!(summary.starts_with("model load"));
        assert!(summary.contains("encode 3.0ms"));
    }
}
