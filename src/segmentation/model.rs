//! Model-backed segmentation

use super::Segmenter;
use crate::backends::{BackendFactory, DefaultBackendFactory};
use crate::config::RemovalConfig;
use crate::error::{BgRemoverError, Result};
use crate::inference::InferenceBackend;
use crate::models::ModelManager;
use crate::types::SegmentationMask;
use crate::utils::preprocessing::{ImagePreprocessor, Letterbox, PreprocessingOptions};
use image::{DynamicImage, GrayImage};
use ndarray::Array4;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, span, Level};

/// Segments people with a pretrained model
///
/// The backend is created and the model loaded on the first call to
/// [`Segmenter::segment`].
pub struct ModelSegmenter {
    config: RemovalConfig,
    factory: Box<dyn BackendFactory>,
    backend: Option<Box<dyn InferenceBackend>>,
    model_load_time: Option<Duration>,
}

impl ModelSegmenter {
    /// Create a segmenter using the backends compiled into this crate
    #[must_use]
    pub fn new(config: RemovalConfig) -> Self {
        Self::with_factory(config, Box::new(DefaultBackendFactory))
    }

    /// Create a segmenter with a custom backend factory
    #[must_use]
    pub fn with_factory(config: RemovalConfig, factory: Box<dyn BackendFactory>) -> Self {
        Self {
            config,
            factory,
            backend: None,
            model_load_time: None,
        }
    }

    /// Create a segmenter around an already constructed backend
    ///
    /// The backend is still initialised lazily.
    #[must_use]
    pub fn with_backend(config: RemovalConfig, backend: Box<dyn InferenceBackend>) -> Self {
        Self {
            config,
            factory: Box::new(DefaultBackendFactory),
            backend: Some(backend),
            model_load_time: None,
        }
    }

    fn ensure_backend(&mut self) -> Result<&mut Box<dyn InferenceBackend>> {
        if self.backend.is_none() {
            let manager = ModelManager::from_source(&self.config.model)?;
            let backend = self.factory.create_backend(self.config.backend, manager)?;
            self.backend = Some(backend);
        }

        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| BgRemoverError::segmentation("backend not created"))?;

        self.model_load_time = backend.initialize(&self.config)?;
        if let Some(load_time) = self.model_load_time {
            info!(
                backend = %self.config.backend,
                model = %self.config.model.display_name(),
                load_ms = load_time.as_millis(),
                "segmentation model loaded"
            );
        }
        Ok(backend)
    }
}

impl Segmenter for ModelSegmenter {
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn segment(&mut self, image: &DynamicImage) -> Result<SegmentationMask> {
        let options = PreprocessingOptions {
            filter: self.config.quality.resize_filter(),
            ..PreprocessingOptions::default()
        };
        let backend = self.ensure_backend()?;
        let preprocessing_config = backend.get_preprocessing_config()?;

        let preprocess_start = Instant::now();
        let (input_tensor, letterbox) = {
            let _span = span!(
                Level::DEBUG,
                "preprocessing",
                target_size = ?preprocessing_config.target_size
            )
            .entered();
            ImagePreprocessor::preprocess_image(image, &preprocessing_config, &options)?
        };
        debug!(
            elapsed_ms = preprocess_start.elapsed().as_secs_f64() * 1000.0,
            ?letterbox,
            "preprocessed input tensor"
        );

        let output_tensor = {
            let _span = span!(Level::DEBUG, "inference").entered();
            backend.infer(&input_tensor)?
        };

        let _span = span!(Level::DEBUG, "postprocessing").entered();
        tensor_to_mask(&output_tensor, &letterbox)
    }

    fn describe(&self) -> String {
        format!(
            "model {} ({} backend)",
            self.config.model.display_name(),
            self.config.backend
        )
    }

    fn model_load_time(&self) -> Option<Duration> {
        self.model_load_time
    }
}

/// Convert a `[1, 1, H, W]` confidence tensor into a mask
///
/// Values are clamped to `[0, 1]` and scaled to `0..=255`. The letterbox
/// padding added during preprocessing is cropped away, so the mask keeps the
/// source's aspect ratio at the model's resolution.
///
/// # Errors
/// - `SegmentationFailed` for any other tensor shape
pub fn tensor_to_mask(tensor: &Array4<f32>, letterbox: &Letterbox) -> Result<SegmentationMask> {
    let (batch, channels, height, width) = tensor.dim();
    if batch != 1 || channels != 1 || height == 0 || width == 0 {
        return Err(BgRemoverError::segmentation(format!(
            "expected output tensor of shape [1, 1, H, W], got [{batch}, {channels}, {height}, {width}]"
        )));
    }

    let crop = letterbox.scaled_to(width as u32, height as u32);
    let mask = GrayImage::from_fn(crop.content_width, crop.content_height, |x, y| {
        let tx = (x + crop.offset_x) as usize;
        let ty = (y + crop.offset_y) as usize;
        let value = tensor.get((0, 0, ty, tx)).copied().unwrap_or(0.0);
        image::Luma([(value.clamp(0.0, 1.0) * 255.0).round() as u8])
    });

    Ok(SegmentationMask::from_image(mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::{MockBackend, MockOutput};
    use image::{ImageBuffer, Rgb};

    fn photo(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([120u8, 90, 60])))
    }

    #[test]
    fn test_tensor_to_mask_crops_letterbox() {
        // 8x4 tensor: columns 0..8, rows 0 and 3 are padding
        let tensor = Array4::from_shape_fn((1, 1, 4, 8), |(_, _, y, _)| {
            if y == 0 || y == 3 {
                0.0
            } else {
                1.0
            }
        });
        let letterbox = Letterbox::fit((400, 100), (8, 4));
        assert_eq!((letterbox.offset_y, letterbox.content_height), (1, 2));

        let mask = tensor_to_mask(&tensor, &letterbox).unwrap();
        assert_eq!(mask.dimensions(), (8, 2));
        assert!(mask.as_image().pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_tensor_to_mask_clamps_values() {
        let tensor = Array4::from_shape_vec((1, 1, 1, 4), vec![-0.5, 0.5, 1.7, f32::NAN]).unwrap();
        let letterbox = Letterbox::fit((4, 1), (4, 1));
        let mask = tensor_to_mask(&tensor, &letterbox).unwrap();
        assert_eq!(mask.value_at(0, 0), Some(0));
        assert_eq!(mask.value_at(1, 0), Some(128));
        assert_eq!(mask.value_at(2, 0), Some(255));
        assert_eq!(mask.value_at(3, 0), Some(0));
    }

    #[test]
    fn test_tensor_to_mask_rejects_wrong_shape() {
        let tensor = Array4::<f32>::zeros((1, 2, 4, 4));
        let letterbox = Letterbox::fit((4, 4), (4, 4));
        let err = tensor_to_mask(&tensor, &letterbox).unwrap_err();
        assert!(matches!(err, BgRemoverError::SegmentationFailed(_)));
    }

    #[test]
    fn test_segment_with_mock_backend() {
        let backend = MockBackend::with_input_size(64, 64);
        let history = backend.history_handle();
        let mut segmenter = ModelSegmenter::with_backend(RemovalConfig::default(), Box::new(backend));

        let mask = segmenter.segment(&photo(200, 100)).unwrap();
        // Letterbox removed: 64x32 keeps the 2:1 aspect
        assert_eq!(mask.dimensions(), (64, 32));
        assert!(mask.value_at(32, 16).unwrap() > mask.value_at(0, 0).unwrap());
        assert!(segmenter.model_load_time().is_some());

        let calls = history.lock().unwrap().clone();
        assert_eq!(calls.first().map(String::as_str), Some("initialize"));
        assert!(calls.contains(&"infer".to_string()));
    }

    #[test]
    fn test_second_segment_reuses_loaded_model() {
        let backend = MockBackend::with_input_size(32, 32);
        let mut segmenter = ModelSegmenter::with_backend(RemovalConfig::default(), Box::new(backend));
        segmenter.segment(&photo(10, 10)).unwrap();
        segmenter.segment(&photo(10, 10)).unwrap();
        assert!(segmenter.model_load_time().is_none());
    }

    #[test]
    fn test_backend_failures_map_to_segmentation_failed() {
        for backend in [MockBackend::new_failing_init(), MockBackend::new_failing_inference()] {
            let mut segmenter =
                ModelSegmenter::with_backend(RemovalConfig::default(), Box::new(backend));
            let err = segmenter.segment(&photo(10, 10)).unwrap_err();
            assert!(matches!(err, BgRemoverError::SegmentationFailed(_)));
        }

        let backend = MockBackend::with_input_size(16, 16).with_output(MockOutput::WrongChannels);
        let mut segmenter = ModelSegmenter::with_backend(RemovalConfig::default(), Box::new(backend));
        assert!(segmenter.segment(&photo(10, 10)).is_err());
    }

    #[test]
    fn test_missing_model_fails_on_first_segment() {
        let config = RemovalConfig::builder()
            .model(crate::models::ModelSource::External(
                "/definitely/not/here.onnx".into(),
            ))
            .build()
            .unwrap();
        let mut segmenter = ModelSegmenter::new(config);
        let err = segmenter.segment(&photo(4, 4)).unwrap_err();
        assert!(matches!(err, BgRemoverError::SegmentationFailed(_)));
    }
}
