//! ONNX Runtime backend
//!
//! Runs the segmentation model through `ort` with a CPU, CUDA or `CoreML`
//! execution provider. Provider availability is checked at session creation;
//! an unavailable accelerator falls back to CPU with a warning.

use crate::config::{ExecutionProvider, RemovalConfig, SegmentationQuality};
use crate::error::{BgRemoverError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelInfo, ModelManager, PreprocessingConfig};
use ndarray::Array4;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
    ExecutionProvider as OrtExecutionProvider, ExecutionProviderDispatch,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// ONNX Runtime backend for running segmentation models
#[derive(Debug)]
pub struct OnnxBackend {
    session: Option<Session>,
    model_manager: Option<ModelManager>,
    initialized: bool,
}

/// Replace `0` (auto) thread counts with concrete values
fn resolve_threads(intra: usize, inter: usize) -> (usize, usize) {
    let intra = if intra > 0 {
        intra
    } else {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4)
    };
    let inter = if inter > 0 { inter } else { (intra / 4).max(1) };
    (intra, inter)
}

fn ort_error(context: &str, e: impl std::fmt::Display) -> BgRemoverError {
    BgRemoverError::segmentation(format!("{context}: {e}"))
}

impl OnnxBackend {
    /// List ONNX Runtime execution providers with availability status
    #[must_use]
    pub fn list_providers() -> Vec<(ExecutionProvider, bool)> {
        vec![
            (ExecutionProvider::Cpu, true),
            (
                ExecutionProvider::Cuda,
                OrtExecutionProvider::is_available(&CUDAExecutionProvider::default())
                    .unwrap_or(false),
            ),
            (
                ExecutionProvider::CoreMl,
                OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                    .unwrap_or(false),
            ),
        ]
    }

    /// Create a new uninitialized ONNX backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: None,
            model_manager: None,
            initialized: false,
        }
    }

    /// Create an ONNX backend with a pre-configured model manager
    #[must_use]
    pub fn with_model_manager(model_manager: ModelManager) -> Self {
        Self {
            session: None,
            model_manager: Some(model_manager),
            initialized: false,
        }
    }

    fn manager(&self) -> Result<&ModelManager> {
        self.model_manager
            .as_ref()
            .ok_or_else(|| BgRemoverError::segmentation("no model attached to ONNX backend"))
    }

    /// Providers to register for the requested execution provider, best first
    fn providers_for(requested: ExecutionProvider) -> Vec<ExecutionProviderDispatch> {
        let cuda_available =
            OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false);
        let coreml_available =
            OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                .unwrap_or(false);

        let mut providers = Vec::new();
        match requested {
            ExecutionProvider::Auto => {
                if cuda_available {
                    providers.push(CUDAExecutionProvider::default().build());
                }
                if coreml_available {
                    providers.push(CoreMLExecutionProvider::default().with_subgraphs(true).build());
                }
                if providers.is_empty() {
                    debug!("no hardware acceleration available, using CPU");
                }
            },
            ExecutionProvider::Cuda => {
                if cuda_available {
                    providers.push(CUDAExecutionProvider::default().build());
                } else {
                    warn!("CUDA requested but not available, falling back to CPU");
                }
            },
            ExecutionProvider::CoreMl => {
                if coreml_available {
                    providers.push(CoreMLExecutionProvider::default().with_subgraphs(true).build());
                } else {
                    warn!("CoreML requested but not available, falling back to CPU");
                }
            },
            ExecutionProvider::Cpu => {},
        }
        providers.push(CPUExecutionProvider::default().build());
        providers
    }

    fn load_model(&mut self, config: &RemovalConfig) -> Result<Duration> {
        let model_load_start = Instant::now();
        let manager = self.manager()?;
        let model_data = manager.load_model()?;
        let model_info = manager.get_info()?;

        let optimization = match config.quality {
            SegmentationQuality::Accurate => GraphOptimizationLevel::Level3,
            SegmentationQuality::Fast => GraphOptimizationLevel::Level1,
        };

        let (intra_threads, inter_threads) =
            resolve_threads(config.intra_threads, config.inter_threads);

        let session = Session::builder()
            .map_err(|e| ort_error("failed to create session builder", e))?
            .with_optimization_level(optimization)
            .map_err(|e| ort_error("failed to set optimization level", e))?
            .with_execution_providers(Self::providers_for(config.execution_provider))
            .map_err(|e| ort_error("failed to register execution providers", e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| ort_error("failed to set intra threads", e))?
            .with_inter_threads(inter_threads)
            .map_err(|e| ort_error("failed to set inter threads", e))?
            .commit_from_memory(&model_data)
            .map_err(|e| ort_error("failed to create session from model data", e))?;

        let size_mb = model_info.size_bytes as f64 / (1024.0 * 1024.0);
        info!(
            model = %model_info.name,
            size_mb = %format!("{size_mb:.2}"),
            provider = %config.execution_provider,
            quality = ?config.quality,
            intra_threads,
            inter_threads,
            "ONNX Runtime session created"
        );

        self.session = Some(session);
        self.initialized = true;
        Ok(model_load_start.elapsed())
    }
}

impl Default for OnnxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for OnnxBackend {
    fn initialize(&mut self, config: &RemovalConfig) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }

        let model_load_time = self.load_model(config)?;
        Ok(Some(model_load_time))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(BgRemoverError::segmentation("ONNX backend not initialized"));
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| BgRemoverError::segmentation("ONNX session not initialized"))?;

        let inference_start = Instant::now();
        debug!(input_shape = ?input.dim(), "running ONNX inference");

        let input_value =
            Value::from_array(input.clone()).map_err(|e| ort_error("failed to convert input tensor", e))?;

        // Positional inputs/outputs so models with arbitrary tensor names work
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| ort_error("ONNX inference failed", e))?;

        let output_tensor = match outputs.keys().next() {
            Some(first_key) => outputs
                .get(first_key)
                .ok_or_else(|| BgRemoverError::segmentation("first output tensor not found"))?
                .try_extract_array::<f32>()
                .map_err(|e| ort_error("failed to extract output tensor", e))?,
            None => return Err(BgRemoverError::segmentation("model produced no output tensors")),
        };

        let output = output_tensor
            .to_owned()
            .into_dimensionality::<ndarray::Ix4>()
            .map_err(|_| {
                BgRemoverError::segmentation(format!(
                    "expected 4D output tensor, got {}D",
                    output_tensor.ndim()
                ))
            })?;

        debug!(
            output_shape = ?output.dim(),
            elapsed_ms = inference_start.elapsed().as_secs_f64() * 1000.0,
            "ONNX inference complete"
        );
        Ok(output)
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

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
