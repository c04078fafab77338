//! Image preprocessing for model inference
//!
//! Converts a decoded image into the NCHW tensor a segmentation model expects
//! and records where the image landed inside the padded canvas, so the
//! predicted mask can be cropped back to the source's aspect ratio.

use crate::{
    error::{BgRemoverError, Result},
    models::PreprocessingConfig,
};
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

/// Configuration for preprocessing behavior
#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    /// Padding color for aspect ratio preservation (RGB)
    pub padding_color: [u8; 3],
    /// Filter used to scale the image to the model input
    pub filter: FilterType,
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            padding_color: [255, 255, 255],
            filter: FilterType::Lanczos3,
        }
    }
}

/// Placement of the resized image inside the model canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
    pub offset_x: u32,
    pub offset_y: u32,
    pub content_width: u32,
    pub content_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Letterbox {
    /// Compute an aspect-preserving, centred fit of `source` into `canvas`
    ///
    /// Both content dimensions are at least one pixel.
    #[must_use]
    pub fn fit(source: (u32, u32), canvas: (u32, u32)) -> Self {
        let (src_w, src_h) = source;
        let (canvas_width, canvas_height) = canvas;

        let scale = (canvas_width as f32 / src_w.max(1) as f32)
            .min(canvas_height as f32 / src_h.max(1) as f32);
        let content_width = ((src_w as f32 * scale).round() as u32).clamp(1, canvas_width.max(1));
        let content_height =
            ((src_h as f32 * scale).round() as u32).clamp(1, canvas_height.max(1));

        Self {
            offset_x: canvas_width.saturating_sub(content_width) / 2,
            offset_y: canvas_height.saturating_sub(content_height) / 2,
            content_width,
            content_height,
            canvas_width,
            canvas_height,
        }
    }

    /// Rescale this letterbox to a canvas of a different size
    ///
    /// Used when a model's output resolution differs from its input.
    #[must_use]
    pub fn scaled_to(&self, canvas_width: u32, canvas_height: u32) -> Self {
        if (canvas_width, canvas_height) == (self.canvas_width, self.canvas_height) {
            return *self;
        }
        let sx = canvas_width as f32 / self.canvas_width.max(1) as f32;
        let sy = canvas_height as f32 / self.canvas_height.max(1) as f32;
        let scale = |v: u32, s: f32, limit: u32| ((v as f32 * s).round() as u32).min(limit);

        let offset_x = scale(self.offset_x, sx, canvas_width.saturating_sub(1));
        let offset_y = scale(self.offset_y, sy, canvas_height.saturating_sub(1));
        Self {
            offset_x,
            offset_y,
            content_width: scale(self.content_width, sx, canvas_width - offset_x).max(1),
            content_height: scale(self.content_height, sy, canvas_height - offset_y).max(1),
            canvas_width,
            canvas_height,
        }
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess image for model inference
    ///
    /// - RGB conversion
    /// - Aspect ratio preserving resize
    /// - Center padding to target size
    /// - Normalization to tensor format (NCHW)
    ///
    /// # Errors
    /// - `SegmentationFailed` for an empty image or a zero target size
    pub fn preprocess_image(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
        options: &PreprocessingOptions,
    ) -> Result<(Array4<f32>, Letterbox)> {
        let [target_height, target_width] = preprocessing_config.target_size;
        if target_height == 0 || target_width == 0 {
            return Err(BgRemoverError::segmentation("model input size must be non-zero"));
        }

        let rgb_image = image.to_rgb8();
        let (orig_width, orig_height) = rgb_image.dimensions();
        if orig_width == 0 || orig_height == 0 {
            return Err(BgRemoverError::segmentation(
                "cannot segment an image with zero width or height",
            ));
        }

        let letterbox = Letterbox::fit((orig_width, orig_height), (target_width, target_height));

        let resized = image::imageops::resize(
            &rgb_image,
            letterbox.content_width,
            letterbox.content_height,
            options.filter,
        );

        let mut canvas = RgbImage::from_pixel(
            target_width,
            target_height,
            image::Rgb(options.padding_color),
        );
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        let tensor = Self::canvas_to_tensor(&canvas, preprocessing_config);
        Ok((tensor, letterbox))
    }

    /// Convert canvas to normalized tensor
    fn canvas_to_tensor(canvas: &RgbImage, preprocessing_config: &PreprocessingConfig) -> Array4<f32> {
        let (width, height) = canvas.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match canvas size
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for channel in 0..3 {
                tensor[[0, channel, y, x]] =
                    (f32::from(pixel[channel]) / 255.0 - mean[channel]) / std[channel];
            }
        }

        tensor
    }
}
