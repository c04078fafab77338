//! The removal pipeline: load, segment, composite, save

use crate::compositor::MaskCompositor;
use crate::config::RemovalConfig;
use crate::error::Result;
use crate::segmentation::{segmenter_for, Segmenter};
use crate::services::{
    ImageIOService, NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate,
};
use crate::types::{ProcessingTimings, RemovalResult};
use image::{DynamicImage, GenericImageView};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, span, Level};

/// Runs one image at a time through segmentation and compositing
pub struct BackgroundRemover {
    segmenter: Box<dyn Segmenter>,
    reporter: Box<dyn ProgressReporter>,
}

impl BackgroundRemover {
    /// Create a remover with the segmenter selected by `config`
    ///
    /// # Errors
    /// - `InvalidArguments` when `config` fails validation
    pub fn new(config: &RemovalConfig) -> Result<Self> {
        Ok(Self::with_segmenter(segmenter_for(config)?))
    }

    /// Create a remover around any segmenter
    #[must_use]
    pub fn with_segmenter(segmenter: Box<dyn Segmenter>) -> Self {
        Self {
            segmenter,
            reporter: Box::new(NoOpProgressReporter),
        }
    }

    /// Replace the progress reporter
    #[must_use]
    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Remove the background from an already decoded image
    ///
    /// # Errors
    /// - `SegmentationFailed` from the segmenter
    /// - `CompositeFailed` when the mask cannot be applied
    #[instrument(
        skip(self, image),
        fields(
            segmenter = %self.segmenter.describe(),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::new();
        let original_dimensions = image.dimensions();

        self.reporter.report_progress(ProgressUpdate::new(
            ProcessingStage::Segmentation,
            total_start,
        ));
        let segment_start = Instant::now();
        let mask = self.segmenter.segment(image).inspect_err(|e| {
            self.reporter
                .report_error(ProcessingStage::Segmentation, &e.to_string());
        })?;
        timings.segmentation = segment_start.elapsed();
        timings.model_load = self.segmenter.model_load_time();

        let stats = mask.statistics();
        debug!(
            mask_dimensions = ?mask.dimensions(),
            foreground_ratio = stats.foreground_ratio,
            "mask generated"
        );

        self.reporter.report_progress(ProgressUpdate::new(
            ProcessingStage::Compositing,
            total_start,
        ));
        let composite_start = Instant::now();
        let composite = {
            let _span = span!(Level::DEBUG, "compositing").entered();
            MaskCompositor::composite(image, &mask).inspect_err(|e| {
                self.reporter
                    .report_error(ProcessingStage::Compositing, &e.to_string());
            })?
        };
        timings.compositing = composite_start.elapsed();
        timings.total = total_start.elapsed();

        Ok(RemovalResult::new(
            composite,
            mask,
            original_dimensions,
            timings,
        ))
    }

    /// Load `input`, remove its background and write the PNG to `output`
    ///
    /// # Errors
    /// - `FileNotFound` / `ImageDecodeFailed` while loading
    /// - `SegmentationFailed` / `CompositeFailed` while processing
    /// - `SaveFailed` while writing; no partial file is left at `output`
    pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        input: P,
        output: Q,
    ) -> Result<RemovalResult> {
        let (input, output) = (input.as_ref(), output.as_ref());
        let total_start = Instant::now();

        self.reporter.report_progress(ProgressUpdate::new(
            ProcessingStage::ImageLoading,
            total_start,
        ));
        let decode_start = Instant::now();
        let image = ImageIOService::load_image(input).inspect_err(|e| {
            self.reporter
                .report_error(ProcessingStage::ImageLoading, &e.to_string());
        })?;
        let image_decode = decode_start.elapsed();

        let (width, height) = image.dimensions();
        self.reporter.report_start(input);
        self.reporter.report_image_info(width, height);

        let mut result = self.process_image(&image)?;
        result.timings.image_decode = image_decode;

        self.reporter.report_progress(ProgressUpdate::new(
            ProcessingStage::FileSaving,
            total_start,
        ));
        let encode_start = Instant::now();
        ImageIOService::save_png(&result.image, output).inspect_err(|e| {
            self.reporter
                .report_error(ProcessingStage::FileSaving, &e.to_string());
        })?;
        result.timings.image_encode = Some(encode_start.elapsed());
        result.timings.total = total_start.elapsed();

        info!(
            input = %input.display(),
            output = %output.display(),
            width,
            height,
            "background removed"
        );
        self.reporter.report_progress(ProgressUpdate::new(
            ProcessingStage::Completed,
            total_start,
        ));
        self.reporter
            .report_completion(Some(output), &result.timings);
        Ok(result)
    }
}
