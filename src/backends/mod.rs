//! Inference engines behind the model segmenter
//!
//! - ONNX Runtime backend (CPU, CUDA, `CoreML`)
//! - Tract backend (pure Rust, CPU only)

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "tract")]
pub mod tract;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;

#[cfg(feature = "tract")]
pub use self::tract::TractBackend;

use crate::config::BackendType;
use crate::error::{BgRemoverError, Result};
use crate::inference::InferenceBackend;
use crate::models::ModelManager;

/// Creates inference backends for a resolved model
pub trait BackendFactory {
    /// Create a backend instance of the specified type with the given model manager
    ///
    /// # Errors
    /// - `SegmentationFailed` when the backend was not compiled in
    fn create_backend(
        &self,
        backend_type: BackendType,
        model_manager: ModelManager,
    ) -> Result<Box<dyn InferenceBackend>>;

    /// List available backend types
    fn available_backends(&self) -> Vec<BackendType>;
}

/// Factory for the backends enabled by crate features
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(
        &self,
        backend_type: BackendType,
        model_manager: ModelManager,
    ) -> Result<Box<dyn InferenceBackend>> {
        match backend_type {
            #[cfg(feature = "onnx")]
            BackendType::Onnx => Ok(Box::new(OnnxBackend::with_model_manager(model_manager))),
            #[cfg(feature = "tract")]
            BackendType::Tract => Ok(Box::new(TractBackend::with_model_manager(model_manager))),
            #[allow(unreachable_patterns)]
            other => {
                drop(model_manager);
                Err(BgRemoverError::segmentation(format!(
                    "{other} backend is not available in this build"
                )))
            },
        }
    }

    fn available_backends(&self) -> Vec<BackendType> {
        [
            cfg!(feature = "onnx").then_some(BackendType::Onnx),
            cfg!(feature = "tract").then_some(BackendType::Tract),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_backends_match_features() {
        let backends = DefaultBackendFactory.available_backends();
        assert_eq!(backends.contains(&BackendType::Onnx), cfg!(feature = "onnx"));
        assert_eq!(backends.contains(&BackendType::Tract), cfg!(feature = "tract"));
        assert_eq!(
            backends.len(),
            usize::from(cfg!(feature = "onnx")) + usize::from(cfg!(feature = "tract"))
        );
    }

    #[cfg(feature = "tract")]
    #[test]
    fn test_factory_creates_uninitialized_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let model = dir.path().join("model.onnx");
        std::fs::write(&model, b"not really onnx").unwrap();
        let manager =
            ModelManager::from_source(&crate::models::ModelSource::External(model)).unwrap();

        let backend = DefaultBackendFactory
            .create_backend(BackendType::Tract, manager)
            .unwrap();
        assert!(!backend.is_initialized());
        assert_eq!(backend.input_shape(), (1, 3, 1024, 1024));
    }
}
