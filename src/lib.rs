#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

//! # bgremover
//!
//! Removes the background behind a person in a photo and produces an RGBA
//! image whose alpha channel comes from a segmentation mask.
//!
//! The pipeline is synchronous and runs one image at a time:
//!
//! 1. load and decode the input ([`services::ImageIOService`])
//! 2. compute a foreground mask ([`segmentation::Segmenter`]), either with an
//!    ONNX person-segmentation model or with a solid-colour key
//! 3. blend the source over transparency ([`compositor::MaskCompositor`])
//! 4. write the result as PNG
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremover::{remove_background, RemovalConfig};
//!
//! let config = RemovalConfig::default();
//! let result = remove_background("photo.jpg", "photo.png", &config)?;
//! println!("{}x{}", result.image.width(), result.image.height());
//! # Ok::<(), bgremover::BgRemoverError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `onnx` (default): ONNX Runtime backend, with CUDA and `CoreML` providers
//! - `tract` (default): pure Rust backend
//! - `cli` (default): the `bgremover` binary and its tracing subscriber
//! - `webp-support` (default): WebP input
//! - `tracing-json`: JSON log output for the binary

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod processor;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

pub use backends::{BackendFactory, DefaultBackendFactory};
pub use compositor::MaskCompositor;
pub use config::{
    BackendType, ColorKeyConfig, ExecutionProvider, KeyColor, RemovalConfig,
    RemovalConfigBuilder, SegmentationQuality,
};
pub use error::{BgRemoverError, Result};
pub use inference::InferenceBackend;
pub use models::{ModelInfo, ModelManager, ModelSource, PreprocessingConfig};
pub use processor::BackgroundRemover;
pub use segmentation::{segmenter_for, ColorKeySegmenter, ModelSegmenter, Segmenter};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressUpdate,
};
pub use types::{ProcessingTimings, RemovalResult, SegmentationMask};
pub use utils::{expand_tilde, ImagePreprocessor, PreprocessingOptions};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Remove the background of the image at `input` and write a PNG to `output`
///
/// # Errors
/// Any [`BgRemoverError`]; on failure no file is left at `output`.
pub fn remove_background<P, Q>(input: P, output: Q, config: &RemovalConfig) -> Result<RemovalResult>
where
    P: AsRef<std::path::Path>,
    Q: AsRef<std::path::Path>,
{
    BackgroundRemover::new(config)?.process_file(input, output)
}

/// Remove the background of an already decoded image
///
/// # Errors
/// - `InvalidArguments` for an invalid `config`
/// - `SegmentationFailed` / `CompositeFailed` from the pipeline
pub fn remove_background_from_image(
    image: &image::DynamicImage,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    BackgroundRemover::new(config)?.process_image(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    #[test]
    fn test_color_key_from_image() {
        let mut photo = RgbImage::from_pixel(20, 10, Rgb([0, 255, 0]));
        photo.put_pixel(10, 5, Rgb([200, 30, 30]));
        let config = RemovalConfig::builder()
            .color_key(KeyColor::Green, 10)
            .build()
            .unwrap();

        let result = remove_background_from_image(&DynamicImage::ImageRgb8(photo), &config).unwrap();
        assert_eq!(result.dimensions(), (20, 10));
        assert_eq!(result.image.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(result.image.get_pixel(10, 5).0, [200, 30, 30, 255]);
    }

    #[test]
    fn test_invalid_config_rejected_before_io() {
        let config = RemovalConfig {
            intra_threads: 10_000,
            ..RemovalConfig::default()
        };
        let err = remove_background("missing.jpg", "out.png", &config).unwrap_err();
        assert!(matches!(err, BgRemoverError::InvalidArguments(_)));
    }
}
