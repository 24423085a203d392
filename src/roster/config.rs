// SPDX-License-Identifier: MIT

//! Roster configuration
//!
//! Values come from, in increasing priority: defaults, a YAML file,
//! `ROSTER_*` environment variables (after `.env` is loaded), CLI flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::storage::DEFAULT_STORAGE_KEY;
use super::error::RosterError;

pub const ENV_DATA_DIR: &str = "ROSTER_DATA_DIR";
pub const ENV_STORAGE_KEY: &str = "ROSTER_STORAGE_KEY";
pub const ENV_STRICT_FIELDS: &str = "ROSTER_STRICT_FIELDS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Directory holding the storage files
    pub data_dir: PathBuf,
    /// Key the roster is stored under
    pub storage_key: String,
    /// Require an integer age and ISO dates
    pub strict_fields: bool,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".roster"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            strict_fields: false,
        }
    }
}

impl RosterConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    /// Parse a YAML config file; missing keys keep their defaults
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, RosterError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| RosterError::config(format!("{}: {}", path.display(), e)))?;
        Self::parse_yaml(&content)
    }

    pub fn parse_yaml(content: &str) -> Result<Self, RosterError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| RosterError::config(e.to_string()))
    }

    /// Override fields from variables returned by `lookup`
    pub fn merge_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup(ENV_STORAGE_KEY).filter(|v| !v.is_empty()) {
            self.storage_key = key;
        }
        if let Some(raw) = lookup(ENV_STRICT_FIELDS) {
            match parse_flag(&raw) {
                Some(strict) => self.strict_fields = strict,
                None => log::warn!("Ignoring {}={:?}: expected true/false", ENV_STRICT_FIELDS, raw),
            }
        }
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RosterConfig::default();
        assert_eq!(config.data_dir, PathBuf::from(".roster"));
        assert_eq!(config.storage_key, "workers");
        assert!(!config.strict_fields);
    }

    #[test]
    fn test_env_overrides() {
        let config = RosterConfig::default().merge_env(env(&[
            (ENV_DATA_DIR, "/var/lib/roster"),
            (ENV_STORAGE_KEY, "crew"),
            (ENV_STRICT_FIELDS, "Yes"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/roster"));
        assert_eq!(config.storage_key, "crew");
        assert!(config.strict_fields);
    }

    #[test]
    fn test_bad_flag_is_ignored() {
        let config = RosterConfig::default().merge_env(env(&[(ENV_STRICT_FIELDS, "maybe")]));
        assert!(!config.strict_fields);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
            storage_key: crew
            strict_fields: true
        "#;
        let config = RosterConfig::parse_yaml(yaml).unwrap();
        assert_eq!(config.storage_key, "crew");
        assert!(config.strict_fields);
        assert_eq!(config.data_dir, PathBuf::from(".roster"));

        assert_eq!(RosterConfig::parse_yaml("").unwrap(), RosterConfig::default());
    }

    #[test]
    fn test_invalid_yaml_returns_error() {
        let yaml = r#"
            strict_fields:
              - not a bool
        "#;
        assert!(RosterConfig::parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.yaml");
        std::fs::write(&path, "data_dir: /tmp/crew\n").unwrap();

        let config = RosterConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/crew"));
        assert!(RosterConfig::from_yaml_file(dir.path().join("missing.yaml")).is_err());
    }
}
