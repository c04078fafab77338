//! Progress reporting service
//!
//! Keeps user-facing status lines out of the pipeline itself. The CLI plugs in
//! [`ConsoleProgressReporter`]; library users get [`NoOpProgressReporter`] by
//! default.

use crate::types::ProcessingTimings;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

/// Progress stages during background removal processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Loading and decoding input image
    ImageLoading,
    /// Computing the foreground mask
    Segmentation,
    /// Applying mask to create result image
    Compositing,
    /// Saving result to file
    FileSaving,
    /// Processing completed
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::ImageLoading => "Loading input image",
            ProcessingStage::Segmentation => "Segmenting person",
            ProcessingStage::Compositing => "Removing background",
            ProcessingStage::FileSaving => "Saving result",
            ProcessingStage::Completed => "Processing completed",
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
        }
    }
}

/// Trait for reporting progress during background removal operations
pub trait ProgressReporter: Send + Sync {
    /// An input file is about to be processed
    fn report_start(&self, input: &Path);

    /// The input was decoded
    fn report_image_info(&self, width: u32, height: u32);

    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report processing completion with final timings
    fn report_completion(&self, output: Option<&Path>, timings: &ProcessingTimings);

    /// Report an error during processing
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_start(&self, _input: &Path) {}

    fn report_image_info(&self, _width: u32, _height: u32) {}

    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _output: Option<&Path>, _timings: &ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Prints the status lines the CLI promises on stdout
///
/// Stage transitions and timings go to the tracing log instead.
pub struct ConsoleProgressReporter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleProgressReporter {
    /// Reporter writing to stdout
    #[must_use]
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Reporter writing to an arbitrary sink
    #[must_use]
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn line(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            // A closed stdout must not abort the run
            let _ = writeln!(out, "{text}").and_then(|()| out.flush());
        }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_start(&self, input: &Path) {
        self.line(&format!("Processing: {}", input.display()));
    }

    fn report_image_info(&self, width: u32, height: u32) {
        self.line(&format!("Image size: {width} x {height}"));
    }

    fn report_progress(&self, update: ProgressUpdate) {
        tracing::info!(
            stage = ?update.stage,
            elapsed_ms = update.elapsed_ms,
            "{}",
            update.description
        );
    }

    fn report_completion(&self, output: Option<&Path>, timings: &ProcessingTimings) {
        tracing::info!(timings = %timings.summary(), "background removal completed");
        if let Some(output) = output {
            self.line(&format!("Done: {}", output.display()));
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        // The CLI prints the error itself
        tracing::debug!(stage = ?stage, "{error}");
    }
}
