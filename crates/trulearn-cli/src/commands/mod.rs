pub mod compare;
pub mod generate;
pub mod init;
pub mod practice;
pub mod submit;
pub mod summarize;
pub mod upload;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;

/// How reports are printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tables for the terminal
    Text,
    Json,
    #[value(alias = "md")]
    Markdown,
}

/// Read a reference text file passed on the command line.
pub(crate) fn read_reference(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| {
        std::fs::read_to_string(p)
            .with_context(|| format!("failed to read reference text: {}", p.display()))
    })
    .transpose()
}
