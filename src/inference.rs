//! Inference backend abstraction

use crate::models::{ModelInfo, PreprocessingConfig};
use crate::{config::RemovalConfig, error::Result};
use ndarray::Array4;
use std::time::Duration;

/// Tensor-level view of a segmentation model
///
/// Implementations take an NCHW `f32` image tensor and return an NCHW
/// single-channel confidence tensor. All failures surface as
/// `SegmentationFailed`.
pub trait InferenceBackend {
    /// Load the model and prepare the runtime
    ///
    /// Returns the load time on first call and `None` when already initialized.
    ///
    /// # Errors
    /// - Model file cannot be read or parsed
    /// - Runtime session creation failures
    fn initialize(&mut self, config: &RemovalConfig) -> Result<Option<Duration>>;

    /// Run inference on the input tensor
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Missing or non-4D output tensor
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Get the expected input shape for this backend
    fn input_shape(&self) -> (usize, usize, usize, usize);

    /// Get the expected output shape for this backend
    fn output_shape(&self) -> (usize, usize, usize, usize);

    /// Get preprocessing configuration for this backend
    ///
    /// # Errors
    /// - No model attached to the backend
    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig>;

    /// Get model information for this backend
    ///
    /// # Errors
    /// - No model attached to the backend
    /// - Model metadata unavailable
    fn get_model_info(&self) -> Result<ModelInfo>;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}
