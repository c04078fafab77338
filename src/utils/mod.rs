//! Shared helpers used across the pipeline

pub mod path;
pub mod preprocessing;

pub use path::expand_tilde;
pub use preprocessing::{ImagePreprocessor, Letterbox, PreprocessingOptions};
