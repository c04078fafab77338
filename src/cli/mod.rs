//! Command-line front end for `bgremover`
//!
//! Only available with the `cli` feature.

mod config;
#[path = "main.rs"]
mod main_impl;

pub use main_impl::{
    run, usage_text, Cli, CliBackend, CliExecutionProvider, CliKeyColor, CliLogFormat,
    EXIT_FAILURE,
};
