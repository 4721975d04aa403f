//! Workspace configuration (§10.4): search paths, command-line variables,
//! and search-order defaults, loaded from `robotcode.toml` with JSON/JSONC
//! override support.
//!
//! Discovery walks up from a starting directory looking for `robotcode.toml`
//! or `robotcode.json`/`robotcode.jsonc`, the way the teacher's
//! `UnifiedConfig` loader locates `maki.yaml`/`maki.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RobotCodeError;
use crate::result::Result;

const CONFIG_FILE_NAMES: &[&str] = &["robotcode.toml", "robotcode.json", "robotcode.jsonc"];

/// Workspace-level configuration for the semantic engine.
///
/// All fields are optional on disk; [`RobotCodeConfig::default`] provides
/// the engine's built-in behaviour when no config file is found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotCodeConfig {
    /// Additional directories searched for libraries and resources, beyond
    /// the importing file's own directory (the "python-like search path"
    /// of §4.3).
    pub search_paths: Vec<PathBuf>,

    /// Command-line variable definitions (`-v name:value` equivalents),
    /// consulted at variable-resolution tier 4 (§4.7).
    pub variables: HashMap<String, String>,

    /// Library names to search implicitly, in order, when a keyword call
    /// has no explicit owner and no resource defines it (§4.5). Defaults
    /// to `["BuiltIn"]` when empty.
    pub default_libraries: Vec<String>,
}

impl RobotCodeConfig {
    /// Walks up from `start` looking for a config file, parsing the first
    /// one found. Returns the engine defaults if none exists anywhere
    /// between `start` and the filesystem root.
    pub fn discover(start: &Path) -> Result<Self> {
        for dir in start.ancestors() {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Self::load(&candidate);
                }
            }
        }
        Ok(Self::default())
    }

    /// Loads and parses a config file, dispatching on extension. `.json`
    /// and `.jsonc` are both parsed with `json5` so comments and trailing
    /// commas are tolerated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| RobotCodeError::io(path, source))?;
        let ext = path.extension().and_then(|e| e.to_str());
        match ext {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| RobotCodeError::config(format!("invalid robotcode.toml: {e}"))),
            Some("json") | Some("jsonc") => json5::from_str(&content)
                .map_err(|e| RobotCodeError::config(format!("invalid {}: {e}", path.display()))),
            _ => Err(RobotCodeError::config(format!(
                "unsupported config extension: {}",
                path.display()
            ))),
        }
    }

    /// The libraries searched implicitly at step 5 of keyword resolution
    /// (§4.5), falling back to just `BuiltIn` when unconfigured.
    pub fn search_order(&self) -> Vec<String> {
        if self.default_libraries.is_empty() {
            vec![crate::semantic::entities::BUILTIN_LIBRARY_NAME.to_string()]
        } else {
            self.default_libraries.clone()
        }
    }

    /// Builds tier-4 variable definitions (§4.7) from `variables`. Bare
    /// names are wrapped in `${...}` so `-v ENV:test` and `-v ${ENV}:test`
    /// resolve the same way.
    pub fn command_line_variable_definitions(
        &self,
        source: &Path,
    ) -> Vec<crate::semantic::entities::VariableDefinition> {
        self.variables
            .iter()
            .map(|(name, value)| {
                let var_name = if name.starts_with('$') { name.clone() } else { format!("${{{name}}}") };
                crate::semantic::entities::VariableDefinition::new(
                    var_name,
                    crate::diagnostics::Range::zero(),
                    source.to_path_buf(),
                    crate::semantic::entities::VariableKind::CommandLine,
                )
                .with_value(value.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn discover_returns_default_when_nothing_found() {
        let dir = tempdir().unwrap();
        let config = RobotCodeConfig::discover(dir.path()).unwrap();
        assert_eq!(config, RobotCodeConfig::default());
    }

    #[test]
    fn discover_finds_toml_in_ancestor_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join("robotcode.toml"),
            "search_paths = [\"lib\"]\ndefault_libraries = [\"BuiltIn\", \"Collections\"]\n",
        )
        .unwrap();

        let config = RobotCodeConfig::discover(&nested).unwrap();
        assert_eq!(config.search_paths, vec![PathBuf::from("lib")]);
        assert_eq!(config.search_order(), vec!["BuiltIn", "Collections"]);
    }

    #[test]
    fn load_jsonc_tolerates_comments_and_trailing_commas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("robotcode.jsonc");
        fs::write(
            &path,
            r#"{
                // command-line variables
                "variables": { "ENV": "test", },
            }"#,
        )
        .unwrap();

        let config = RobotCodeConfig::load(&path).unwrap();
        assert_eq!(config.variables.get("ENV"), Some(&"test".to_string()));
    }

    #[test]
    fn default_search_order_is_builtin_only() {
        let config = RobotCodeConfig::default();
        assert_eq!(config.search_order(), vec!["BuiltIn"]);
    }

    #[test]
    fn command_line_variable_definitions_wraps_bare_names() {
        let mut config = RobotCodeConfig::default();
        config.variables.insert("ENV".to_string(), "staging".to_string());
        let defs = config.command_line_variable_definitions(Path::new("t.robot"));
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "${ENV}");
        assert_eq!(defs[0].value.as_deref(), Some("staging"));
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("robotcode.yaml");
        fs::write(&path, "search_paths: []").unwrap();
        assert!(RobotCodeConfig::load(&path).is_err());
    }
}
