//! Mock backends for testing inference without model files

use crate::{
    config::RemovalConfig,
    error::{BgRemoverError, Result},
    inference::InferenceBackend,
    models::{ModelInfo, PreprocessingConfig},
};
use ndarray::Array4;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Output shape the mock produces instead of a soft disc
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockOutput {
    /// Soft circular foreground centred in the frame
    Disc,
    /// Constant confidence everywhere
    Constant(f32),
    /// A tensor with the wrong channel count
    WrongChannels,
}

/// Mock inference backend
#[derive(Debug, Clone)]
pub struct MockBackend {
    initialized: bool,
    model_info: ModelInfo,
    preprocessing_config: PreprocessingConfig,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    should_fail_init: bool,
    should_fail_inference: bool,
    output: MockOutput,
}

impl MockBackend {
    /// Create a new mock backend with a 320x320 model
    #[must_use]
    pub fn new() -> Self {
        Self::with_input_size(320, 320)
    }

    #[must_use]
    pub fn with_input_size(height: usize, width: usize) -> Self {
        Self {
            initialized: false,
            model_info: ModelInfo {
                name: "mock-segmenter".to_string(),
                path: PathBuf::from("mock.onnx"),
                size_bytes: 1024 * 1024,
                input_shape: (1, 3, height, width),
                output_shape: (1, 1, height, width),
            },
            preprocessing_config: PreprocessingConfig {
                target_size: [height as u32, width as u32],
                ..PreprocessingConfig::default()
            },
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail_init: false,
            should_fail_inference: false,
            output: MockOutput::Disc,
        }
    }

    /// Create a mock backend that will fail during initialization
    #[must_use]
    pub fn new_failing_init() -> Self {
        let mut backend = Self::new();
        backend.should_fail_init = true;
        backend
    }

    /// Create a mock backend that will fail during inference
    #[must_use]
    pub fn new_failing_inference() -> Self {
        let mut backend = Self::new();
        backend.should_fail_inference = true;
        backend
    }

    #[must_use]
    pub fn with_output(mut self, output: MockOutput) -> Self {
        self.output = output;
        self
    }

    /// Shared handle to the call history
    #[must_use]
    pub fn history_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.call_history)
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }

    fn generate_mock_output(&self) -> Array4<f32> {
        let (_, _, height, width) = self.model_info.output_shape;
        match self.output {
            MockOutput::Constant(value) => Array4::from_elem((1, 1, height, width), value),
            MockOutput::WrongChannels => Array4::zeros((1, 2, height, width)),
            MockOutput::Disc => {
                let center_x = width as f32 / 2.0;
                let center_y = height as f32 / 2.0;
                let radius = (width.min(height) as f32 / 3.0).max(1.0);
                Array4::from_shape_fn((1, 1, height, width), |(_, _, y, x)| {
                    let dx = x as f32 - center_x;
                    let dy = y as f32 - center_y;
                    let distance = (dx * dx + dy * dy).sqrt();
                    ((radius - distance) / radius).clamp(0.0, 1.0)
                })
            },
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self, _config: &RemovalConfig) -> Result<Option<Duration>> {
        self.record_call("initialize");

        if self.should_fail_init {
            return Err(BgRemoverError::segmentation(
                "mock backend initialization failed",
            ));
        }
        if self.initialized {
            return Ok(None);
        }

        self.initialized = true;
        Ok(Some(Duration::from_millis(5)))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        self.record_call("infer");

        if !self.initialized {
            return Err(BgRemoverError::segmentation("mock backend not initialized"));
        }
        if self.should_fail_inference {
            return Err(BgRemoverError::segmentation("mock backend inference failed"));
        }

        let (_, c, h, w) = self.model_info.input_shape;
        if input.dim() != (1, c, h, w) {
            return Err(BgRemoverError::segmentation(format!(
                "mock backend expected input {:?}, got {:?}",
                (1, c, h, w),
                input.dim()
            )));
        }

        Ok(self.generate_mock_output())
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.model_info.input_shape
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        self.model_info.output_shape
    }

    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        self.record_call("get_preprocessing_config");
        Ok(self.preprocessing_config.clone())
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        Ok(self.model_info.clone())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
