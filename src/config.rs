//! Configuration types for background removal operations

use crate::error::{BgRemoverError, Result};
use crate::models::ModelSource;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Largest accepted thread count for the inference backends
pub const MAX_THREADS: usize = 256;

/// Largest accepted colour-key tolerance
pub const MAX_TOLERANCE: u8 = 100;

/// Colour-key tolerance used when none is given
pub const DEFAULT_TOLERANCE: u8 = 30;

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

/// Inference backend used by the model segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// ONNX Runtime
    Onnx,
    /// Tract (pure Rust)
    Tract,
}

impl Default for BackendType {
    fn default() -> Self {
        if cfg!(feature = "onnx") {
            Self::Onnx
        } else {
            Self::Tract
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onnx => write!(f, "onnx"),
            Self::Tract => write!(f, "tract"),
        }
    }
}

/// Quality tier requested from the segmentation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationQuality {
    /// Highest-quality preprocessing and full graph optimisation
    #[default]
    Accurate,
    /// Cheaper resize and basic optimisation
    Fast,
}

impl SegmentationQuality {
    /// Filter used when scaling the source down to the model input
    #[must_use]
    pub fn resize_filter(self) -> FilterType {
        match self {
            Self::Accurate => FilterType::Lanczos3,
            Self::Fast => FilterType::Triangle,
        }
    }
}

/// Solid backdrop colours understood by the colour-key segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyColor {
    #[default]
    White,
    Black,
    Green,
    Blue,
}

impl KeyColor {
    #[must_use]
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Self::White => [255, 255, 255],
            Self::Black => [0, 0, 0],
            Self::Green => [0, 255, 0],
            Self::Blue => [0, 0, 255],
        }
    }
}

impl std::fmt::Display for KeyColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
            Self::Green => write!(f, "green"),
            Self::Blue => write!(f, "blue"),
        }
    }
}

/// Colour-key segmentation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorKeyConfig {
    pub color: KeyColor,
    /// 0-100; per-channel distance allowance
    pub tolerance: u8,
}

impl Default for ColorKeyConfig {
    fn default() -> Self {
        Self {
            color: KeyColor::default(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Configuration for one background removal run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// Inference backend for model segmentation
    pub backend: BackendType,

    /// Execution provider for ONNX Runtime
    pub execution_provider: ExecutionProvider,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,

    /// Number of inter-op threads for inference (0 = auto)
    pub inter_threads: usize,

    /// Quality tier; the CLI always runs `Accurate`
    pub quality: SegmentationQuality,

    /// Where the segmentation model is loaded from
    pub model: ModelSource,

    /// Use colour keying instead of the model when set
    pub color_key: Option<ColorKeyConfig>,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            execution_provider: ExecutionProvider::default(),
            intra_threads: 0,
            inter_threads: 0,
            quality: SegmentationQuality::Accurate,
            model: ModelSource::Default,
            color_key: None,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bgremover::{RemovalConfig, ExecutionProvider, BackendType};
    ///
    /// let config = RemovalConfig::builder()
    ///     .backend(BackendType::Tract)
    ///     .execution_provider(ExecutionProvider::Cpu)
    ///     .intra_threads(4)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.intra_threads, 4);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Thread counts above [`MAX_THREADS`]
    /// - Colour-key tolerance above [`MAX_TOLERANCE`]
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("intra-op threads", self.intra_threads),
            ("inter-op threads", self.inter_threads),
        ] {
            if value > MAX_THREADS {
                return Err(BgRemoverError::invalid_arguments(format!(
                    "{name} must be between 0 and {MAX_THREADS}, got {value}"
                )));
            }
        }

        if let Some(key) = &self.color_key {
            if key.tolerance > MAX_TOLERANCE {
                return Err(BgRemoverError::invalid_arguments(format!(
                    "tolerance must be between 0 and {MAX_TOLERANCE}, got {}",
                    key.tolerance
                )));
            }
        }

        Ok(())
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    #[must_use]
    pub fn backend(mut self, backend: BackendType) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set execution provider
    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn inter_threads(mut self, threads: usize) -> Self {
        self.config.inter_threads = threads;
        self
    }

    /// Set quality tier
    #[must_use]
    pub fn quality(mut self, quality: SegmentationQuality) -> Self {
        self.config.quality = quality;
        self
    }

    /// Set the model location
    #[must_use]
    pub fn model(mut self, model: ModelSource) -> Self {
        self.config.model = model;
        self
    }

    /// Switch to colour keying against `color` with `tolerance`
    #[must_use]
    pub fn color_key(mut self, color: KeyColor, tolerance: u8) -> Self {
        self.config.color_key = Some(ColorKeyConfig { color, tolerance });
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<RemovalConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RemovalConfig::default();
        assert_eq!(config.quality, SegmentationQuality::Accurate);
        assert_eq!(config.execution_provider, ExecutionProvider::Auto);
        assert_eq!(config.model, ModelSource::Default);
        assert!(config.color_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RemovalConfig::builder()
            .backend(BackendType::Tract)
            .intra_threads(8)
            .color_key(KeyColor::Green, 45)
            .build()
            .unwrap();

        assert_eq!(config.backend, BackendType::Tract);
        assert_eq!(config.intra_threads, 8);
        assert_eq!(
            config.color_key,
            Some(ColorKeyConfig {
                color: KeyColor::Green,
                tolerance: 45
            })
        );
    }

    #[test]
    fn test_tolerance_out_of_range_is_invalid_arguments() {
        let err = RemovalConfig::builder()
            .color_key(KeyColor::White, 101)
            .build()
            .unwrap_err();
        assert!(matches!(err, BgRemoverError::InvalidArguments(_)));

        assert!(RemovalConfig::builder()
            .color_key(KeyColor::White, MAX_TOLERANCE)
            .build()
            .is_ok());
    }

    #[test]
    fn test_thread_limit() {
        assert!(RemovalConfig::builder()
            .intra_threads(MAX_THREADS + 1)
            .build()
            .is_err());
        assert!(RemovalConfig::builder()
            .inter_threads(MAX_THREADS)
            .build()
            .is_ok());
    }

    #[test]
    fn test_quality_filters() {
        assert_eq!(
            SegmentationQuality::Accurate.resize_filter(),
            FilterType::Lanczos3
        );
        assert_eq!(SegmentationQuality::Fast.resize_filter(), FilterType::Triangle);
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(ExecutionProvider::CoreMl.to_string(), "coreml");
        assert_eq!(KeyColor::Blue.to_string(), "blue");
        assert_eq!(KeyColor::Green.rgb(), [0, 255, 0]);
        #[cfg(feature = "onnx")]
        assert_eq!(BackendType::default(), BackendType::Onnx);
    }
}
