use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::EngineConfig;
use crate::error::{ErrorCode, PipelineError, Result};

/// Locates, reads and layers engine configuration.
///
/// Order of precedence, lowest first: built-in defaults, the TOML file,
/// then `PATTERNFLOW_*` environment variables. `PROJECT` only fills a
/// project the file leaves unset.
pub struct ConfigLoader {
    explicit_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            explicit_path: None,
        }
    }

    /// Use this file instead of the per-user default; it must exist
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// `<config dir>/patternflow/config.toml` for the current user
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "patternflow", "patternflow")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn load(&self) -> Result<EngineConfig> {
        let mut config = match &self.explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(PipelineError::config_with_code(
                        ErrorCode::CONFIG_NOT_FOUND,
                        format!("config file {} not found", path.display()),
                    ));
                }
                Self::read_file(path)?
            }
            None => match Self::default_path().filter(|path| path.exists()) {
                Some(path) => Self::read_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    EngineConfig::default()
                }
            },
        };

        config.merge_env_vars();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<EngineConfig> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            PipelineError::config_with_code(
                ErrorCode::CONFIG_PARSE_ERROR,
                format!("failed to parse {}", path.display()),
            )
            .with_source(e)
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
drs_basepath = "/g/data/drstree"
tool_root = "/opt/ctools"
search_path_subdir = "lib/python"
"#,
        )
        .unwrap();

        let config = ConfigLoader::new().with_path(&path).load().unwrap();
        assert_eq!(config.drs_basepath, "/g/data/drstree");
        assert_eq!(config.search_path_subdir, "lib/python");
        assert_eq!(config.tool_env_var, "CWSL_CTOOLS");
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigLoader::new()
            .with_path("/no/such/patternflow.toml")
            .load()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "simulate = \"often\"").unwrap();

        let err = ConfigLoader::new().with_path(&path).load().unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
        assert!(std::error::Error::source(&err).is_some());
    }
}
