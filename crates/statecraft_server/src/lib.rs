//! # Statecraft Server
//!
//! Headless host for a single game.
//!
//! Owns a [`GameEngine`] behind a [`Scheduler`], paces ticks with tokio
//! timers and publishes every tick's outcome on a broadcast channel.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod scheduler;

use std::path::{Path, PathBuf};

use statecraft_core::prelude::*;
use thiserror::Error;

pub use scheduler::{Scheduler, SchedulerEvent, TickOutcome};

/// Error type for host setup.
#[derive(Error, Debug)]
pub enum ServerError {
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
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// RON engine configuration; defaults apply when absent.
    pub config_path: Option<PathBuf>,
    /// RON scenario to load into the engine.
    pub scenario_path: Option<PathBuf>,
    /// Capacity of the event channel. Slow subscribers skip events beyond this.
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            scenario_path: None,
            event_capacity: scheduler::DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Read a file, tagging IO failures with the path.
fn read_file(path: &Path) -> std::result::Result<String, ServerError> {
    std::fs::read_to_string(path).map_err(|source| ServerError::ReadError {
        path: path.display().to_string(),
        source,
    })
}

/// Parse an engine configuration file.
pub fn load_engine_config(path: &Path) -> std::result::Result<EngineConfig, ServerError> {
    let contents = read_file(path)?;
    EngineConfig::from_ron_str(&contents).map_err(|e| with_path(e, path))
}

/// Parse a scenario file.
pub fn load_scenario(path: &Path) -> std::result::Result<Scenario, ServerError> {
    let contents = read_file(path)?;
    Scenario::from_ron_str(&contents).map_err(|e| with_path(e, path))
}

/// Build an engine from the configured files.
pub fn build_engine(config: &ServerConfig) -> std::result::Result<GameEngine, ServerError> {
    let engine_config = match &config.config_path {
        Some(path) => load_engine_config(path)?,
        None => EngineConfig::default(),
    };
    let mut engine = GameEngine::new(engine_config);
    if let Some(path) = &config.scenario_path {
        load_scenario(path)?.apply(&mut engine)?;
    }
    Ok(engine)
}

fn with_path(error: GameError, path: &Path) -> ServerError {
    match error {
        GameError::DataParseError { message, .. } => ServerError::Game(GameError::DataParseError {
            path: path.display().to_string(),
            message,
        }),
        other => ServerError::Game(other),
    }
}
