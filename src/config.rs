//! Interpreter settings, optionally loaded from a YAML file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("max_call_depth must be at least 1")]
    ZeroCallDepth,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Nested function calls allowed before a Recursion Error is raised.
    pub max_call_depth: usize,
    /// Name shown in tracebacks and syntax errors.
    pub file_name: String,
    /// Print the value of each top-level statement in the REPL.
    pub echo_results: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: 256,
            file_name: "<stdin>".to_string(),
            echo_results: false,
        }
    }
}

impl Config {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(source)?;
        if config.max_call_depth == 0 {
            return Err(ConfigError::ZeroCallDepth);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_yaml_str("max_call_depth: 64\n").expect("config should parse");
        assert_eq!(config.max_call_depth, 64);
        assert_eq!(config.file_name, "<stdin>");
        assert!(!config.echo_results);
    }

    #[test]
    fn rejects_unknown_fields_and_zero_depth() {
        assert!(matches!(
            Config::from_yaml_str("max_depth: 3\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_yaml_str("max_call_depth: 0\n"),
            Err(ConfigError::ZeroCallDepth)
        ));
    }
}
