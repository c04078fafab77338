//! `bgremover` command-line tool
//!
//! Removes the background behind a person in a photo and writes a
//! transparent PNG. See `bgremover --help`.

use std::process::ExitCode;

fn main() -> ExitCode {
    bgremover::cli::run(std::env::args_os())
}
