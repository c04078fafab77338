//! Error types for background removal operations

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemoverError>;

/// Every way a single removal run can fail
///
/// The set is closed: each pipeline stage maps its own failures onto exactly
/// one variant, and the CLI turns any of them into exit status 1.
#[derive(Error, Debug)]
pub enum BgRemoverError {
    /// Wrong argument count or an out-of-range option value
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The input path does not exist
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The input exists but is not a decodable image
    #[error("failed to decode image '{}': {reason}", path.display())]
    ImageDecodeFailed { path: PathBuf, reason: String },

    /// Model missing, backend initialisation or inference failure
    #[error("segmentation failed: {0}")]
    SegmentationFailed(String),

    /// Mask could not be applied to the source image
    #[error("compositing failed: {0}")]
    CompositeFailed(String),

    /// Encoding or writing the output PNG failed
    #[error("failed to save '{}': {reason}", path.display())]
    SaveFailed { path: PathBuf, reason: String },
}

impl BgRemoverError {
    /// Create a new invalid arguments error
    pub fn invalid_arguments<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new file not found error
    pub fn file_not_found<P: AsRef<Path>>(path: P) -> Self {
        Self::FileNotFound(path.as_ref().to_path_buf())
    }

    /// Create a new decode error for `path`
    pub fn decode<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::ImageDecodeFailed {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::SegmentationFailed(msg.into())
    }

    /// Create a new compositing error
    pub fn composite<S: Into<String>>(msg: S) -> Self {
        Self::CompositeFailed(msg.into())
    }

    /// Create a new save error for `path`
    pub fn save<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::SaveFailed {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a save error from an I/O failure, naming the operation
    pub fn save_io<P: AsRef<Path>>(operation: &str, path: P, error: &std::io::Error) -> Self {
        Self::save(path, format!("failed to {operation}: {error}"))
    }

    /// Process exit status for this error
    ///
    /// Every failure kind exits with 1.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = BgRemoverError::invalid_arguments("expected 2 arguments");
        assert!(matches!(err, BgRemoverError::InvalidArguments(_)));

        let err = BgRemoverError::file_not_found("/nope.png");
        assert!(matches!(err, BgRemoverError::FileNotFound(ref p) if p == Path::new("/nope.png")));

        let err = BgRemoverError::decode("a.png", "bad header");
        assert!(matches!(err, BgRemoverError::ImageDecodeFailed { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = BgRemoverError::file_not_found("/tmp/missing.jpg");
        assert_eq!(err.to_string(), "file not found: /tmp/missing.jpg");

        let err = BgRemoverError::save("/out/x.png", "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to save '/out/x.png': permission denied"
        );

        let err = BgRemoverError::segmentation("no output tensor");
        assert!(err.to_string().contains("no output tensor"));
    }

    #[test]
    fn test_save_io_names_operation() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = BgRemoverError::save_io("create temporary file", "/out.png", &io);
        let text = err.to_string();
        assert!(text.contains("create temporary file"));
        assert!(text.contains("denied"));
    }

    #[test]
    fn test_every_variant_exits_with_one() {
        let errors = [
            BgRemoverError::invalid_arguments("x"),
            BgRemoverError::file_not_found("x"),
            BgRemoverError::decode("x", "y"),
            BgRemoverError::segmentation("x"),
            BgRemoverError::composite("x"),
            BgRemoverError::save("x", "y"),
        ];
        for err in &errors {
            assert_eq!(err.exit_code(), 1, "{err}");
        }
    }
}
