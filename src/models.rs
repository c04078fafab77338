//! Segmentation model location and metadata
//!
//! A model is a single ONNX file. It may sit next to a `HuggingFace`-style
//! `preprocessor_config.json` describing the expected input size and
//! normalisation; without one the defaults of the bundled person model apply.

use crate::error::{BgRemoverError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File names tried, in order, when a model directory is given
pub const MODEL_FILE_CANDIDATES: [&str; 2] = ["model.onnx", "model_fp32.onnx"];

/// Optional metadata file next to the model
pub const PREPROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";

/// Sub-directory of the user cache holding the default model
pub const DEFAULT_MODEL_ID: &str = "person-segmentation";

const DEFAULT_INPUT_SIZE: u32 = 1024;
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Where the segmentation model is loaded from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelSource {
    /// `.onnx` file or directory containing one
    External(PathBuf),
    /// `<cache>/bgremover/models/person-segmentation/`
    #[default]
    Default,
}

impl ModelSource {
    /// Get a display name for tracing and logging
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::External(path) => format!("external:{}", path.display()),
            Self::Default => format!("default:{DEFAULT_MODEL_ID}"),
        }
    }
}

/// Input preparation expected by a model
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Model input size as `[height, width]`
    pub target_size: [u32; 2],
    /// Per-channel mean in the 0-1 range
    pub normalization_mean: [f32; 3],
    /// Per-channel standard deviation in the 0-1 range
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_size: [DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE],
            normalization_mean: IMAGENET_MEAN,
            normalization_std: IMAGENET_STD,
        }
    }
}

/// Model information and metadata
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub input_shape: (usize, usize, usize, usize), // NCHW format
    pub output_shape: (usize, usize, usize, usize),
}

#[derive(Debug, Deserialize)]
struct PreprocessorFile {
    size: Option<SizeSpec>,
    image_mean: Option<Vec<f64>>,
    image_std: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeSpec {
    Explicit { height: u32, width: u32 },
    ShortestEdge { shortest_edge: u32 },
    Square(u32),
}

impl SizeSpec {
    fn to_target_size(&self) -> [u32; 2] {
        match *self {
            Self::Explicit { height, width } => [height, width],
            Self::ShortestEdge { shortest_edge } => [shortest_edge, shortest_edge],
            Self::Square(side) => [side, side],
        }
    }
}

/// Resolved model file plus its preprocessing metadata
#[derive(Debug, Clone)]
pub struct ModelManager {
    model_path: PathBuf,
    preprocessing: PreprocessingConfig,
}

impl ModelManager {
    /// Resolve a model source to an existing model file
    ///
    /// # Errors
    /// - `SegmentationFailed` when no model file exists at the searched location
    /// - `SegmentationFailed` when `preprocessor_config.json` is present but malformed
    pub fn from_source(source: &ModelSource) -> Result<Self> {
        let location = match source {
            ModelSource::External(path) => path.clone(),
            ModelSource::Default => Self::default_model_dir().ok_or_else(|| {
                BgRemoverError::segmentation("failed to determine the user cache directory")
            })?,
        };

        let model_path = Self::resolve_model_file(&location)?;
        let preprocessing = match model_path.parent() {
            Some(dir) => Self::read_preprocessing_config(dir)?,
            None => PreprocessingConfig::default(),
        };

        tracing::debug!(
            model = %model_path.display(),
            target_size = ?preprocessing.target_size,
            "resolved segmentation model"
        );

        Ok(Self {
            model_path,
            preprocessing,
        })
    }

    /// Default model directory under the user cache, if the platform has one
    #[must_use]
    pub fn default_model_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|cache| {
            cache
                .join("bgremover")
                .join("models")
                .join(DEFAULT_MODEL_ID)
        })
    }

    fn resolve_model_file(location: &Path) -> Result<PathBuf> {
        if location.is_file() {
            return Ok(location.to_path_buf());
        }

        if location.is_dir() {
            if let Some(found) = MODEL_FILE_CANDIDATES
                .iter()
                .map(|name| location.join(name))
                .find(|candidate| candidate.is_file())
            {
                return Ok(found);
            }
        }

        Err(BgRemoverError::segmentation(format!(
            "segmentation model not found at '{}' (expected a .onnx file or a directory containing {})",
            location.display(),
            MODEL_FILE_CANDIDATES.join(" or ")
        )))
    }

    fn read_preprocessing_config(dir: &Path) -> Result<PreprocessingConfig> {
        let path = dir.join(PREPROCESSOR_CONFIG_FILE);
        if !path.is_file() {
            return Ok(PreprocessingConfig::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            BgRemoverError::segmentation(format!("failed to read '{}': {e}", path.display()))
        })?;
        parse_preprocessor_config(&content).map_err(|reason| {
            BgRemoverError::segmentation(format!("invalid '{}': {reason}", path.display()))
        })
    }

    /// Read the whole model file into memory
    ///
    /// # Errors
    /// - `SegmentationFailed` on any I/O error
    pub fn load_model(&self) -> Result<Vec<u8>> {
        fs::read(&self.model_path).map_err(|e| {
            BgRemoverError::segmentation(format!(
                "failed to read model '{}': {e}",
                self.model_path.display()
            ))
        })
    }

    /// Describe the resolved model
    ///
    /// # Errors
    /// - `SegmentationFailed` if the model file metadata cannot be read
    pub fn get_info(&self) -> Result<ModelInfo> {
        let size_bytes = fs::metadata(&self.model_path)
            .map_err(|e| {
                BgRemoverError::segmentation(format!(
                    "failed to stat model '{}': {e}",
                    self.model_path.display()
                ))
            })?
            .len();

        let name = self
            .model_path
            .file_stem()
            .map_or_else(|| "model".to_string(), |s| s.to_string_lossy().into_owned());
        let [height, width] = self.preprocessing.target_size;

        Ok(ModelInfo {
            name,
            path: self.model_path.clone(),
            size_bytes,
            input_shape: (1, 3, height as usize, width as usize),
            output_shape: (1, 1, height as usize, width as usize),
        })
    }

    #[must_use]
    pub fn preprocessing_config(&self) -> &PreprocessingConfig {
        &self.preprocessing
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

/// Parse a `preprocessor_config.json` body
///
/// Mean/std given in the 0-255 range are rescaled to 0-1.
fn parse_preprocessor_config(content: &str) -> std::result::Result<PreprocessingConfig, String> {
    let file: PreprocessorFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let defaults = PreprocessingConfig::default();

    let target_size = file
        .size
        .as_ref()
        .map_or(defaults.target_size, SizeSpec::to_target_size);
    if target_size.contains(&0) {
        return Err("size must be non-zero".to_string());
    }

    let normalization_mean = match file.image_mean {
        Some(values) => channel_triplet("image_mean", &values)?,
        None => defaults.normalization_mean,
    };
    let normalization_std = match file.image_std {
        Some(values) => channel_triplet("image_std", &values)?,
        None => defaults.normalization_std,
    };
    if normalization_std.iter().any(|s| *s <= 0.0) {
        return Err("image_std values must be positive".to_string());
    }

    Ok(PreprocessingConfig {
        target_size,
        normalization_mean,
        normalization_std,
    })
}

fn channel_triplet(key: &str, values: &[f64]) -> std::result::Result<[f32; 3], String> {
    let [a, b, c] = match values {
        [single] => [*single; 3],
        [a, b, c, ..] => [*a, *b, *c],
        _ => return Err(format!("{key} must have 1 or 3 values")),
    };
    let scale = if a > 1.0 || b > 1.0 || c > 1.0 {
        255.0
    } else {
        1.0
    };
    Ok([(a / scale) as f32, (b / scale) as f32, (c / scale) as f32])
}
