//! # Statecraft Development Tools
//!
//! Command-line tools for development:
//! - Scenario and config validation
//! - Offline simulation with JSON output

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod simulate;
pub mod validate;

use std::path::Path;

use statecraft_core::error::GameError;
use thiserror::Error;

/// Error type for tool commands.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Failed to read a data file.
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        /// File that could not be read.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// A data file was malformed or rejected by the engine.
    #[error(transparent)]
    Game(#[from] GameError),
    /// Output could not be serialised.
    #[error("Failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Read a data file and run `parse` over it, tagging failures with the path.
pub(crate) fn load<T>(
    path: &Path,
    parse: impl FnOnce(&str) -> statecraft_core::error::Result<T>,
) -> Result<T, ToolError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ToolError::ReadError {
        path: path.display().to_string(),
        source,
    })?;
    parse(&contents).map_err(|e| match e {
        GameError::DataParseError { message, .. } => ToolError::Game(GameError::DataParseError {
            path: path.display().to_string(),
            message,
        }),
        other => ToolError::Game(other),
    })
}
