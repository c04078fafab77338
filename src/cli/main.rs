//! `bgremover <INPUT> <OUTPUT>`
//!
//! Parses arguments, runs the removal pipeline once and maps the outcome to a
//! process exit code.

use super::config::CliConfigBuilder;
use crate::error::BgRemoverError;
use crate::processor::BackgroundRemover;
use crate::services::ConsoleProgressReporter;
use crate::tracing_config::init_cli_tracing;
use crate::utils::expand_tilde;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

/// Exit status for every failure, argument errors included
pub const EXIT_FAILURE: u8 = 1;

/// Remove the background behind a person and save the result as a transparent PNG
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremover")]
pub struct Cli {
    /// Input image (PNG, JPEG, GIF, BMP, TIFF or WebP)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output PNG path; replaced if it exists
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Segmentation model: an .onnx file or a directory containing model.onnx
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Inference backend [default: onnx when available, otherwise tract]
    #[arg(short, long, value_enum)]
    pub backend: Option<CliBackend>,

    /// ONNX Runtime execution provider
    #[arg(short, long, value_enum, default_value_t = CliExecutionProvider::Auto)]
    pub execution_provider: CliExecutionProvider,

    /// Number of inference threads (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// Treat pixels close to this backdrop colour as background instead of running a model
    #[arg(long, value_enum, value_name = "COLOR")]
    pub color_key: Option<CliKeyColor>,

    /// Colour-key tolerance, 0-100 [default: 30]
    #[arg(long, requires = "color_key")]
    pub tolerance: Option<u8>,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format on stderr
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliBackend {
    Onnx,
    Tract,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliExecutionProvider {
    Auto,
    Cpu,
    Cuda,
    Coreml,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliKeyColor {
    White,
    Black,
    Green,
    Blue,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Usage text printed for malformed invocations
#[must_use]
pub fn usage_text() -> String {
    let mut command = Cli::command();
    format!(
        "{}\n\nFor more information, try '--help'.",
        command.render_usage()
    )
}

/// Run the tool with the given argument list (program name first)
pub fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => return handle_parse_error(&e),
    };

    if let Err(e) = init_cli_tracing(cli.verbose, cli.log_format.into()) {
        eprintln!("Warning: logging disabled: {e:#}");
    }

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        },
    }
}

fn handle_parse_error(e: &clap::Error) -> ExitCode {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = e.print();
            ExitCode::SUCCESS
        },
        _ => {
            let rendered = e.render().to_string();
            let reason = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string();
            eprintln!("Error: {}", BgRemoverError::invalid_arguments(reason));
            println!("{}", usage_text());
            ExitCode::from(EXIT_FAILURE)
        },
    }
}

fn execute(cli: &Cli) -> crate::Result<()> {
    let input = expand_tilde(&cli.input);
    let output = expand_tilde(&cli.output);
    let config = CliConfigBuilder::from_cli(cli)?;

    debug!(
        input = %input.display(),
        output = %output.display(),
        backend = %config.backend,
        provider = %config.execution_provider,
        "starting background removal"
    );

    let mut remover = BackgroundRemover::new(&config)?
        .with_reporter(Box::new(ConsoleProgressReporter::stdout()));
    let result = remover.process_file(&input, &output)?;

    info!(timings = %result.timings.summary(), "finished");
    Ok(())
}
