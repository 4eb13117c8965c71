//! Engine configuration: base paths, tool location, user identity and the
//! simulate flag, passed explicitly into every step.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ErrorCode, PipelineError, Result};

pub mod loader;

pub use loader::ConfigLoader;

static VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid variable regex")
});

pub const DEFAULT_PROJECT: &str = "no_project_set";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root of the published Data Reference Syntax tree
    pub drs_basepath: String,
    /// Root of quality-controlled processed data
    pub authoritative_basepath: String,
    /// Root for a user's own outputs; see [`EngineConfig::user_basepath`]
    pub user_basepath: Option<String>,
    /// Directory holding the external processing tools; may reference
    /// environment variables as `$VAR` or `${VAR}`
    pub tool_root: Option<String>,
    pub simulate: bool,
    /// Exported in every script with the resolved tool root
    pub tool_env_var: String,
    /// Search path variable extended with `<tool_root>/<search_path_subdir>`
    pub search_path_var: String,
    pub search_path_subdir: String,
    /// Defaults to the login name
    pub user: Option<String>,
    /// Falls back to the `PROJECT` environment variable, then [`DEFAULT_PROJECT`]
    pub project: Option<String>,
    pub log_level: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drs_basepath: String::new(),
            authoritative_basepath: String::new(),
            user_basepath: None,
            tool_root: None,
            simulate: false,
            tool_env_var: "CWSL_CTOOLS".to_string(),
            search_path_var: "PYTHONPATH".to_string(),
            search_path_subdir: "pythonlib".to_string(),
            user: None,
            project: None,
            log_level: Some("info".to_string()),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool_root(mut self, tool_root: impl Into<String>) -> Self {
        self.tool_root = Some(tool_root.into());
        self
    }

    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    pub fn user(&self) -> String {
        self.user.clone().unwrap_or_else(whoami::username)
    }

    pub fn project(&self) -> &str {
        self.project.as_deref().unwrap_or(DEFAULT_PROJECT)
    }

    /// The configured user base path, else `/local/<project>/<user>/`.
    ///
    /// Derived on each call so that it follows the project and user in effect
    /// after every override has been applied.
    pub fn user_basepath(&self) -> String {
        match &self.user_basepath {
            Some(path) => path.clone(),
            None => format!("/local/{}/{}/", self.project(), self.user()),
        }
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_vars_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable source
    pub fn merge_vars_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tool_root) = lookup("PATTERNFLOW_TOOL_ROOT") {
            self.tool_root = Some(tool_root);
        }

        if let Some(log_level) = lookup("PATTERNFLOW_LOG_LEVEL") {
            self.log_level = Some(log_level);
        }

        if let Some(simulate) = lookup("PATTERNFLOW_SIMULATE") {
            if let Ok(value) = simulate.parse::<bool>() {
                self.simulate = value;
            }
        }

        if self.project.is_none() {
            self.project = lookup("PROJECT").filter(|project| !project.is_empty());
        }
    }

    /// The tool root with variables expanded. It must be set and must exist.
    pub fn resolve_tool_root(&self) -> Result<PathBuf> {
        let raw = self
            .tool_root
            .as_deref()
            .filter(|root| !root.is_empty())
            .ok_or_else(|| {
                PipelineError::config_with_code(
                    ErrorCode::CONFIG_TOOL_ROOT_UNSET,
                    "tool_root is not set",
                )
            })?;

        let expanded = expand_vars(raw, |name| std::env::var(name).ok());
        let path = PathBuf::from(&expanded);
        if !path.exists() {
            return Err(PipelineError::config_with_code(
                ErrorCode::CONFIG_TOOL_ROOT_MISSING,
                format!("tool_root '{expanded}' does not exist"),
            ));
        }
        Ok(path)
    }
}

/// Replace `$VAR` and `${VAR}` with their values; unknown variables are left as written
pub fn expand_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    VAR_REGEX
        .replace_all(input, |caps: &regex::Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
