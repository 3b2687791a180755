//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine settings
//! from YAML files.

use std::fs;
use std::path::Path;

use chrono_tz::Tz;

use crate::error::{EngineError, EngineResult};

use super::types::EngineSettings;

/// Loads and provides access to engine settings.
///
/// # Directory Structure
///
/// ```text
/// config/
/// └── engine.yaml   # Tenant id and zone
/// ```
///
/// # Example
///
/// ```
/// use loan_due_date_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::from_yaml_str(
///     "tenant:\n  id: diku\n  timezone: America/New_York\n",
/// )?;
/// assert_eq!(loader.timezone(), chrono_tz::America::New_York);
/// # Ok::<(), loan_due_date_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    settings: EngineSettings,
}

impl ConfigLoader {
    /// Loads `engine.yaml` from the specified directory.
    ///
    /// Returns `ConfigNotFound` when the file cannot be read and
    /// `ConfigParseError` when it is not valid YAML, misses a required field
    /// or names an unknown zone.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let settings_path = path.as_ref().join("engine.yaml");
        let path_str = settings_path.display().to_string();

        let content = fs::read_to_string(&settings_path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        Self::parse(&content, path_str)
    }

    /// Parses settings from YAML text.
    pub fn from_yaml_str(content: &str) -> EngineResult<Self> {
        Self::parse(content, "<inline>".to_string())
    }

    fn parse(content: &str, path: String) -> EngineResult<Self> {
        let settings = serde_yaml::from_str::<EngineSettings>(content).map_err(|e| {
            EngineError::ConfigParseError {
                path,
                message: e.to_string(),
            }
        })?;
        Ok(Self { settings })
    }

    /// Returns the loaded settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The tenant zone.
    pub fn timezone(&self) -> Tz {
        self.settings.tenant.timezone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::London;

    fn config_path() -> &'static str {
        concat!(env!("CARGO_MANIFEST_DIR"), "/config")
    }

    #[test]
    fn test_load_valid_config() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.settings().tenant.id, "diku");
        assert_eq!(loader.timezone(), London);
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("engine.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }

    #[test]
    fn test_unknown_timezone_is_parse_error() {
        let result = ConfigLoader::from_yaml_str("tenant:\n  id: diku\n  timezone: Mars/Olympus\n");

        match result {
            Err(EngineError::ConfigParseError { path, .. }) => assert_eq!(path, "<inline>"),
            _ => panic!("Expected ConfigParseError"),
        }
    }

    #[test]
    fn test_missing_tenant_is_parse_error() {
        let result = ConfigLoader::from_yaml_str("other: true\n");
        assert!(matches!(result, Err(EngineError::ConfigParseError { .. })));
    }
}
