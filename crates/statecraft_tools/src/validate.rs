//! Data validation utilities.
//!
//! A scenario is valid when it parses and applies cleanly to a fresh engine.

use std::path::{Path, PathBuf};

use serde::Serialize;
use statecraft_core::prelude::*;

use crate::{load, ToolError};

/// What a valid scenario contains once applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSummary {
    /// Scenario name.
    pub name: String,
    /// Segments in the engine after applying.
    pub segments: usize,
    /// Research fields registered.
    pub fields: usize,
    /// Projects under way.
    pub projects: usize,
    /// Diplomatic relations.
    pub relations: usize,
}

/// Load an engine config, or the defaults when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> std::result::Result<EngineConfig, ToolError> {
    match path {
        Some(path) => load(path, EngineConfig::from_ron_str),
        None => Ok(EngineConfig::default()),
    }
}

/// Validate one scenario file.
///
/// # Errors
///
/// Returns the first read, parse or validation failure.
pub fn validate_scenario_file(
    scenario: &Path,
    config: Option<&Path>,
) -> std::result::Result<ScenarioSummary, ToolError> {
    let config = load_config(config)?;
    let parsed = load(scenario, Scenario::from_ron_str)?;
    let mut engine = GameEngine::new(config);
    parsed.apply(&mut engine)?;
    tracing::debug!(scenario = %scenario.display(), "scenario applied");

    Ok(ScenarioSummary {
        name: parsed.name,
        segments: engine.population().segments().len(),
        fields: parsed.fields.len(),
        projects: engine.research().active_projects().len(),
        relations: engine.diplomacy().relations().len(),
    })
}

/// Validate every RON file under a data directory.
///
/// Files under `config/` are parsed as engine configs; files under
/// `scenarios/` are validated as scenarios against the default config.
/// Returns the number of files checked.
///
/// # Errors
///
/// Returns the first failure encountered, in file name order.
pub fn validate_data_directory(path: &Path) -> std::result::Result<usize, ToolError> {
    let mut checked = 0;
    for file in ron_files(&path.join("config"))? {
        load(&file, EngineConfig::from_ron_str)?;
        tracing::info!("ok: {}", file.display());
        checked += 1;
    }
    for file in ron_files(&path.join("scenarios"))? {
        validate_scenario_file(&file, None)?;
        tracing::info!("ok: {}", file.display());
        checked += 1;
    }
    Ok(checked)
}

/// RON files directly inside `dir`, sorted. A missing directory has none.
fn ron_files(dir: &Path) -> std::result::Result<Vec<PathBuf>, ToolError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| ToolError::ReadError {
        path: dir.display().to_string(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"(
        name: "pair",
        fields: [(id: "physics", name: "physics")],
        relations: [(a: "player", b: "borealis", trust: 60.0)],
    )"#;

    #[test]
    fn test_valid_scenario_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.ron");
        std::fs::write(&path, SCENARIO).unwrap();

        let summary = validate_scenario_file(&path, None).unwrap();
        assert_eq!(summary.name, "pair");
        assert_eq!(summary.fields, 1);
        assert_eq!(summary.relations, 1);
        assert_eq!(summary.projects, 0);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ron");
        std::fs::write(
            &path,
            r#"(relations: [(a: "player", b: "borealis", trust: 140.0)])"#,
        )
        .unwrap();

        let err = validate_scenario_file(&path, None).unwrap_err();
        assert!(matches!(err, ToolError::Game(ref e) if e.is_validation()));
    }

    #[test]
    fn test_unknown_prerequisite_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orphan.ron");
        std::fs::write(
            &path,
            r#"(
                fields: [(id: "fusion", name: "fusion", requirements: ["physics"])],
                projects: [(id: "p", name: "p", field: "fusion", progress: 0.0, researchers: 1, cost: {})],
            )"#,
        )
        .unwrap();

        assert!(validate_scenario_file(&path, None).is_err());
    }

    #[test]
    fn test_data_directory_walk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("config")).unwrap();
        std::fs::create_dir(dir.path().join("scenarios")).unwrap();
        std::fs::write(dir.path().join("config/engine.ron"), "(tick_interval_ms: 500)").unwrap();
        std::fs::write(dir.path().join("scenarios/pair.ron"), SCENARIO).unwrap();
        std::fs::write(dir.path().join("scenarios/notes.txt"), "ignored").unwrap();

        assert_eq!(validate_data_directory(dir.path()).unwrap(), 2);

        std::fs::write(dir.path().join("scenarios/zz.ron"), "(segments: 3)").unwrap();
        assert!(validate_data_directory(dir.path()).is_err());
    }

    #[test]
    fn test_empty_directory_checks_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(validate_data_directory(dir.path()).unwrap(), 0);
    }
}
