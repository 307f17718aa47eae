//! Bulk team loading
//!
//! Reads worker capability definitions (TOML files: role, description,
//! expertise, tool whitelist) from a directory and registers one agent per
//! valid definition. Scratch files are skipped by name pattern, and a
//! definition that fails to parse is reported in the returned report
//! rather than failing the whole load.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::agent::AgentSpec;
use crate::error::OrchestrationError;
use crate::manager::AgentManager;

/// Filename fragments that mark a file as not a live definition
pub const EXCLUDED_PATTERNS: &[&str] = &["template-", "draft-", "test-", "rca-", "README"];

/// What happened during a team load
#[derive(Debug, Default)]
pub struct TeamReport {
    /// Roles registered, in filename order
    pub loaded: Vec<String>,
    /// Files skipped by name pattern
    pub skipped: Vec<String>,
    /// Files that failed to parse or register, with the reason
    pub invalid: Vec<(String, String)>,
}

impl TeamReport {
    /// True when every definition file became a registered agent
    pub fn is_complete(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Parse a single capability-definition file
pub fn parse_definition(path: &Path) -> Result<AgentSpec, OrchestrationError> {
    let text = fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|e| OrchestrationError::InvalidDefinition {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load every agent definition in `dir` into the manager
///
/// Files are visited in filename order, so registration order (and with it
/// routing fairness) is deterministic for a given directory.
pub fn load_team(manager: &AgentManager, dir: &Path) -> Result<TeamReport, OrchestrationError> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    entries.sort();

    let mut report = TeamReport::default();
    for path in entries {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if EXCLUDED_PATTERNS.iter().any(|p| filename.contains(p)) {
            debug!(file = %filename, "Skipping non-definition file");
            report.skipped.push(filename);
            continue;
        }

        let spec = match parse_definition(&path) {
            Ok(spec) => spec,
            Err(err) => {
                warn!(file = %filename, error = %err, "Invalid team definition");
                report.invalid.push((filename, err.to_string()));
                continue;
            }
        };

        match manager.register(spec) {
            Ok(handle) => report.loaded.push(handle.role().to_string()),
            Err(err) => {
                warn!(file = %filename, error = %err, "Could not register agent");
                report.invalid.push((filename, err.to_string()));
            }
        }
    }

    info!(
        loaded = report.loaded.len(),
        skipped = report.skipped.len(),
        invalid = report.invalid.len(),
        "Team loaded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_channel;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn create_manager() -> AgentManager {
        let (tx, _rx) = event_channel();
        AgentManager::new(tx)
    }

    #[test]
    fn test_loads_valid_definitions_in_filename_order() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "01-writer.toml",
            r#"
role = "writer"
description = "Drafts prose"
expertise = ["prose"]
allowed_tools = "any"
"#,
        );
        write(
            dir.path(),
            "02-reviewer.toml",
            r#"
role = "reviewer"
expertise = ["review", "security"]
allowed_tools = { only = ["read"] }
"#,
        );

        let manager = create_manager();
        let report = load_team(&manager, dir.path()).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.loaded, vec!["writer", "reviewer"]);
        assert_eq!(manager.roles(), vec!["writer", "reviewer"]);
        assert!(manager.get_agent("reviewer").is_some());
    }

    #[test]
    fn test_skips_scratch_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "writer.toml", "role = \"writer\"\n");
        write(dir.path(), "template-agent.toml", "role = \"ignored\"\n");
        write(dir.path(), "draft-reviewer.toml", "role = \"ignored\"\n");
        write(dir.path(), "notes.md", "not a definition");

        let manager = create_manager();
        let report = load_team(&manager, dir.path()).unwrap();

        assert_eq!(report.loaded, vec!["writer"]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(manager.agent_count(), 1);
    }

    #[test]
    fn test_invalid_definition_does_not_fail_the_batch() {
        let dir = tempdir().unwrap();
        write(dir.path(), "broken.toml", "this is not toml = = =");
        write(dir.path(), "writer.toml", "role = \"writer\"\n");

        let manager = create_manager();
        let report = load_team(&manager, dir.path()).unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.loaded, vec!["writer"]);
        assert_eq!(report.invalid.len(), 1);
        assert!(report.invalid[0].0.contains("broken"));
    }

    #[test]
    fn test_duplicate_role_is_reported() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.toml", "role = \"writer\"\n");
        write(dir.path(), "b.toml", "role = \"writer\"\n");

        let manager = create_manager();
        let report = load_team(&manager, dir.path()).unwrap();

        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(manager.agent_count(), 1);
    }

    #[test]
    fn test_parse_definition_names_the_file() {
        let dir = tempdir().unwrap();
        write(dir.path(), "bad.toml", "role = 5");

        let err = parse_definition(&dir.path().join("bad.toml")).unwrap_err();
        let OrchestrationError::InvalidDefinition { path, .. } = err else {
            panic!("expected an invalid-definition error");
        };
        assert!(path.contains("bad.toml"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let manager = create_manager();
        let result = load_team(&manager, Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(OrchestrationError::Io(_))));
    }
}
