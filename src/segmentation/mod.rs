//! Person segmentation
//!
//! [`Segmenter`] is the seam between the pipeline and whatever produces the
//! foreground mask. Two implementations ship with the crate:
//!
//! - [`ModelSegmenter`] runs a pretrained ONNX model through an
//!   [`InferenceBackend`](crate::inference::InferenceBackend)
//! - [`ColorKeySegmenter`] treats a solid studio backdrop as background

pub mod color_key;
pub mod model;

pub use color_key::ColorKeySegmenter;
pub use model::ModelSegmenter;

use crate::config::RemovalConfig;
use crate::error::Result;
use crate::types::SegmentationMask;
use image::DynamicImage;
use std::time::Duration;

/// Produces a foreground mask for an image
///
/// The returned mask may have any dimensions; the compositor rescales it to
/// the source. Every failure is reported as `SegmentationFailed`, except for
/// configuration problems detected at construction time.
pub trait Segmenter {
    /// Compute the foreground mask for `image`
    ///
    /// # Errors
    /// - `SegmentationFailed` when the mask cannot be produced
    fn segment(&mut self, image: &DynamicImage) -> Result<SegmentationMask>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;

    /// Time spent loading a model during the most recent `segment` call
    fn model_load_time(&self) -> Option<Duration> {
        None
    }
}

/// Build the segmenter selected by `config`
///
/// Model segmenters are created lazily: no model is touched until the first
/// call to [`Segmenter::segment`].
///
/// # Errors
/// - `InvalidArguments` for an out-of-range colour-key tolerance
pub fn segmenter_for(config: &RemovalConfig) -> Result<Box<dyn Segmenter>> {
    config.validate()?;
    match config.color_key {
        Some(key) => Ok(Box::new(ColorKeySegmenter::new(key.color, key.tolerance)?)),
        None => Ok(Box::new(ModelSegmenter::new(config.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyColor;
    use crate::error::BgRemoverError;

    #[test]
    fn test_color_key_selected_from_config() {
        let config = RemovalConfig::builder()
            .color_key(KeyColor::Green, 10)
            .build()
            .unwrap();
        let segmenter = segmenter_for(&config).unwrap();
        assert!(segmenter.describe().contains("green"));
    }

    #[test]
    fn test_model_segmenter_is_lazy() {
        let config = RemovalConfig::builder()
            .model(crate::models::ModelSource::External("/nonexistent/model.onnx".into()))
            .build()
            .unwrap();
        // Construction succeeds even though the model does not exist
        let segmenter = segmenter_for(&config).unwrap();
        assert!(segmenter.describe().contains("model"));
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let mut config = RemovalConfig::default();
        config.color_key = Some(crate::config::ColorKeyConfig {
            color: KeyColor::White,
            tolerance: 150,
        });
        let err = segmenter_for(&config).err().unwrap();
        assert!(matches!(err, BgRemoverError::InvalidArguments(_)));
    }
}
