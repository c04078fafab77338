//! Tract backend implementation
//!
//! Pure Rust inference with no native runtime to install. CPU only; the
//! execution provider setting is ignored.

use crate::config::{RemovalConfig, SegmentationQuality};
use crate::error::{BgRemoverError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelInfo, ModelManager, PreprocessingConfig};
use ndarray::{Array4, Ix4};
use std::time::{Duration, Instant};
use tract_onnx::prelude::*;
use tracing::{debug, info};

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract backend for running segmentation models using pure Rust inference
#[derive(Debug)]
pub struct TractBackend {
    model: Option<TractModel>,
    model_manager: Option<ModelManager>,
    initialized: bool,
}

impl TractBackend {
    /// Create a new uninitialized Tract backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: None,
            model_manager: None,
            initialized: false,
        }
    }

    /// Create a Tract backend with a pre-configured model manager
    #[must_use]
    pub fn with_model_manager(model_manager: ModelManager) -> Self {
        Self {
            model: None,
            model_manager: Some(model_manager),
            initialized: false,
        }
    }

    fn manager(&self) -> Result<&ModelManager> {
        self.model_manager
            .as_ref()
            .ok_or_else(|| BgRemoverError::segmentation("no model attached to Tract backend"))
    }

    /// Load and initialize the model using Tract
    fn load_model(&mut self, config: &RemovalConfig) -> Result<Duration> {
        let model_load_start = Instant::now();
        let manager = self.manager()?;
        let model_data = manager.load_model()?;
        let model_info = manager.get_info()?;
        let (n, c, h, w) = model_info.input_shape;

        let tract_error =
            |stage: &str, e: TractError| BgRemoverError::segmentation(format!("{stage}: {e}"));

        // Pin the input fact so models exported with dynamic axes still plan
        let inference_model = onnx()
            .model_for_read(&mut std::io::Cursor::new(model_data))
            .map_err(|e| tract_error("failed to load ONNX model", e))?
            .with_input_fact(0, f32::fact([n, c, h, w]).into())
            .map_err(|e| tract_error("failed to set input shape", e))?;

        let typed = match config.quality {
            SegmentationQuality::Accurate => inference_model
                .into_optimized()
                .map_err(|e| tract_error("failed to optimize model", e))?,
            SegmentationQuality::Fast => inference_model
                .into_typed()
                .and_then(TypedModel::into_decluttered)
                .map_err(|e| tract_error("failed to type model", e))?,
        };

        let model = typed
            .into_runnable()
            .map_err(|e| tract_error("failed to create runnable model", e))?;

        let size_mb = model_info.size_bytes as f64 / (1024.0 * 1024.0);
        info!(
            model = %model_info.name,
            size_mb = %format!("{size_mb:.2}"),
            quality = ?config.quality,
            "Tract model ready"
        );

        self.model = Some(model);
        self.initialized = true;
        Ok(model_load_start.elapsed())
    }
}

impl Default for TractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for TractBackend {
    fn initialize(&mut self, config: &RemovalConfig) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }

        let model_load_time = self.load_model(config)?;
        Ok(Some(model_load_time))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| BgRemoverError::segmentation("Tract model not initialized"))?;

        debug!(input_shape = ?input.shape(), "running Tract inference");
        let inference_start = Instant::now();

        let input_tensor = Tensor::from(input.clone());
        let outputs = model
            .run(tvec![input_tensor.into()])
            .map_err(|e| BgRemoverError::segmentation(format!("Tract inference failed: {e}")))?;

        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| BgRemoverError::segmentation("model produced no output tensors"))?
            .into_arc_tensor();

        let output_view = output_tensor.to_array_view::<f32>().map_err(|e| {
            BgRemoverError::segmentation(format!("failed to convert output tensor: {e}"))
        })?;
        let rank = output_view.ndim();
        let output = output_view
            .to_owned()
            .into_dimensionality::<Ix4>()
            .map_err(|_| {
                BgRemoverError::segmentation(format!("expected 4D output tensor, got {rank}D"))
            })?;

        debug!(
            output_shape = ?output.shape(),
            elapsed_ms = inference_start.elapsed().as_secs_f64() * 1000.0,
            "Tract inference complete"
        );
        Ok(output)
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.model_manager
            .as_ref()
            .and_then(|manager| manager.get_info().ok())
            .map_or((1, 3, 1024, 1024), |info| info.input_shape)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        self.model_manager
            .as_ref()
            .and_then(|manager| manager.get_info().ok())
            .map_or((1, 1, 1024, 1024), |info| info.output_shape)
    }

    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(self.manager()?.preprocessing_config().clone())
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        self.manager()?.get_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelSource;
    use tempfile::TempDir;

    #[test]
    fn test_tract_backend_creation() {
        let backend = TractBackend::new();

        assert!(!backend.is_initialized());
        assert_eq!(backend.input_shape(), (1, 3, 1024, 1024));
        assert_eq!(backend.output_shape(), (1, 1, 1024, 1024));
        assert!(backend.get_model_info().is_err());
        assert!(backend.get_preprocessing_config().is_err());
    }

    #[test]
    fn test_invalid_model_bytes_fail_initialization() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("model.onnx");
        std::fs::write(&model, b"definitely not protobuf").unwrap();
        let manager = ModelManager::from_source(&ModelSource::External(model)).unwrap();

        let mut backend = TractBackend::with_model_manager(manager);
        let err = backend.initialize(&RemovalConfig::default()).unwrap_err();
        assert!(matches!(err, BgRemoverError::SegmentationFailed(_)));
        assert!(!backend.is_initialized());
    }

    #[test]
    fn test_infer_before_initialize_fails() {
        let mut backend = TractBackend::new();
        let input = Array4::<f32>::zeros((1, 3, 4, 4));
        assert!(backend.infer(&input).is_err());
    }
}
