//! Conversion of parsed CLI arguments into a [`RemovalConfig`]

use crate::cli::main_impl::{Cli, CliBackend, CliExecutionProvider, CliKeyColor, CliLogFormat};
use crate::config::{
    BackendType, ExecutionProvider, KeyColor, RemovalConfig, SegmentationQuality,
    DEFAULT_TOLERANCE,
};
use crate::error::Result;
use crate::models::ModelSource;
use crate::tracing_config::TracingFormat;
use crate::utils::expand_tilde;

impl From<CliBackend> for BackendType {
    fn from(backend: CliBackend) -> Self {
        match backend {
            CliBackend::Onnx => Self::Onnx,
            CliBackend::Tract => Self::Tract,
        }
    }
}

impl From<CliExecutionProvider> for ExecutionProvider {
    fn from(provider: CliExecutionProvider) -> Self {
        match provider {
            CliExecutionProvider::Auto => Self::Auto,
            CliExecutionProvider::Cpu => Self::Cpu,
            CliExecutionProvider::Cuda => Self::Cuda,
            CliExecutionProvider::Coreml => Self::CoreMl,
        }
    }
}

impl From<CliKeyColor> for KeyColor {
    fn from(color: CliKeyColor) -> Self {
        match color {
            CliKeyColor::White => Self::White,
            CliKeyColor::Black => Self::Black,
            CliKeyColor::Green => Self::Green,
            CliKeyColor::Blue => Self::Blue,
        }
    }
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => Self::Console,
            CliLogFormat::Compact => Self::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Self::Json,
        }
    }
}

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build and validate a [`RemovalConfig`] from CLI arguments
    ///
    /// The CLI always segments with [`SegmentationQuality::Accurate`].
    pub(crate) fn from_cli(cli: &Cli) -> Result<RemovalConfig> {
        let mut builder = RemovalConfig::builder()
            .execution_provider(cli.execution_provider.into())
            .intra_threads(cli.threads)
            .quality(SegmentationQuality::Accurate);

        if let Some(backend) = cli.backend {
            builder = builder.backend(backend.into());
        }

        if let Some(model) = &cli.model {
            builder = builder.model(ModelSource::External(expand_tilde(model)));
        }

        if let Some(color) = cli.color_key {
            builder = builder.color_key(color.into(), cli.tolerance.unwrap_or(DEFAULT_TOLERANCE));
        }

        builder.build()
    }
}
