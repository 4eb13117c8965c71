//! Named path layouts and Data Reference Syntax presets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::core::Constraint;
use crate::error::{PipelineError, Result};

const DRS_DIRECTORY: &str = "%mip%/%product%/%institute%/%model%/%experiment%/%frequency%/%realm%/%variable%/%ensemble%/";

const DEFAULT_FILENAME: &str = "%variable%_%mip_table%_%model%_%experiment%_%ensemble%_%timestart_info%-%timeend_info%-%anomaly_info%-%timeagg_info%_%levelbottom_info%-%leveltop_info%-%levelagg_info%_%lonwest_info%-%loneast_info%-%lonagg_info%_%latsouth_info%-%latnorth_info%-%latagg_info%_%grid_info%_%extra_info%.%suffix%";

/// Where generated outputs are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Drstree,
    Authoritative,
    User,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drstree => "drstree",
            Self::Authoritative => "authoritative",
            Self::User => "user",
        }
    }

    /// The configured base path for this destination
    pub fn base_path(&self, config: &EngineConfig) -> String {
        match self {
            Self::Drstree => config.drs_basepath.clone(),
            Self::Authoritative => config.authoritative_basepath.clone(),
            Self::User => config.user_basepath(),
        }
    }
}

impl FromStr for Destination {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "drstree" => Ok(Self::Drstree),
            "authoritative" => Ok(Self::Authoritative),
            "user" => Ok(Self::User),
            other => Err(PipelineError::PatternNotFound {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// The general-purpose processed-data layout; `%..._info%` fields may be
    /// left unconstrained
    Default,
    /// Files as published, only valid in the DRS tree
    Downloaded,
    CdatLiteCatalogue,
    TimesliceChange,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Downloaded => "downloaded",
            Self::CdatLiteCatalogue => "cdat_lite_catalogue",
            Self::TimesliceChange => "timeslice_change",
        }
    }

    /// The layout relative to a destination base path
    pub fn relative_pattern(&self) -> String {
        match self {
            Self::Default => format!("{DRS_DIRECTORY}{DEFAULT_FILENAME}"),
            Self::Downloaded => format!(
                "{DRS_DIRECTORY}%variable%_%mip_table%_%model%_%experiment%_%ensemble%_%origstart%-%origend%.nc"
            ),
            Self::CdatLiteCatalogue => format!(
                "{DRS_DIRECTORY}%variable%_%mip_table%_%model%_%experiment%_%ensemble%_cdat-lite-6-0rc2-py2.7.%suffix%"
            ),
            Self::TimesliceChange => "%mip%/%product%/%grid%/%institute%/%model%/%experiment%/%frequency%/%realm%/%variable%/%ensemble%/%variable%_%mip_table%_%model%_%experiment%_%ensemble%_%fut_start%-%fut_end%_%change_type%-wrt_%hist_start%-%hist_end%_%seas_agg%_%grid%.nc".to_string(),
        }
    }

    fn drs_only(&self) -> bool {
        matches!(self, Self::Downloaded)
    }
}

impl FromStr for Layout {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(Self::Default),
            "downloaded" => Ok(Self::Downloaded),
            "cdat_lite_catalogue" => Ok(Self::CdatLiteCatalogue),
            "timeslice_change" => Ok(Self::TimesliceChange),
            other => Err(PipelineError::PatternNotFound {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the full output template for a destination and layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternGenerator {
    destination: Destination,
    layout: Layout,
    base_path: String,
}

impl PatternGenerator {
    pub fn new(destination: Destination, layout: Layout, config: &EngineConfig) -> Result<Self> {
        if layout.drs_only() && destination != Destination::Drstree {
            return Err(PipelineError::BadCombination {
                destination: destination.to_string(),
                layout: layout.to_string(),
            });
        }

        Ok(Self {
            destination,
            layout,
            base_path: destination.base_path(config),
        })
    }

    /// Parse both names first, then check the combination
    pub fn from_names(destination: &str, layout: &str, config: &EngineConfig) -> Result<Self> {
        Self::new(destination.parse()?, layout.parse()?, config)
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn pattern(&self) -> String {
        Path::new(&self.base_path)
            .join(self.layout.relative_pattern())
            .to_string_lossy()
            .to_string()
    }
}

/// Published dataset layouts with their fixed restrictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrsPreset {
    Cmip5Gcm,
    Cmip3Gcm,
    CordexRcm,
}

impl DrsPreset {
    pub fn relative_pattern(&self) -> &'static str {
        match self {
            Self::Cmip5Gcm | Self::Cmip3Gcm => {
                "%mip%/%product%/%institute%/%model%/%experiment%/%frequency%/%realm%/%variable%/%ensemble%/%variable%_%mip_table%_%model%_%experiment%_%ensemble%_%time_span%.nc"
            }
            Self::CordexRcm => {
                "%mip%/%product%/%domain%/%institute%/%model%/%experiment%/%ensemble%/%RCMName%/%RCMVersionID%/%frequency%/%variable%/%variable%_%domain%_%model%_%experiment%_%ensemble%_%RCMName%_%RCMVersionID%_%frequency%_%time_span%.nc"
            }
        }
    }

    /// The preset's template under the configured DRS base path
    pub fn pattern(&self, config: &EngineConfig) -> String {
        Path::new(&config.drs_basepath)
            .join(self.relative_pattern())
            .to_string_lossy()
            .to_string()
    }

    pub fn default_constraints(&self) -> Vec<Constraint> {
        match self {
            Self::Cmip5Gcm => vec![
                Constraint::single("mip", "CMIP5"),
                Constraint::single("product", "GCM"),
            ],
            Self::Cmip3Gcm => vec![
                Constraint::single("mip", "CMIP3"),
                Constraint::single("product", "GCM"),
            ],
            Self::CordexRcm => vec![Constraint::single("product", "RCM")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PathTemplate;

    fn config() -> EngineConfig {
        EngineConfig {
            drs_basepath: "/g/data/drstree".to_string(),
            authoritative_basepath: "/g/data/auth".to_string(),
            user_basepath: Some("/local/proj/me/".to_string()),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_default_layout_under_user_path() {
        let generator = PatternGenerator::from_names("user", "default", &config()).unwrap();
        let pattern = generator.pattern();
        assert!(pattern.starts_with("/local/proj/me/%mip%/%product%/"));
        assert!(pattern.ends_with("_%grid_info%_%extra_info%.%suffix%"));
    }

    #[test]
    fn test_downloaded_requires_drstree() {
        assert!(PatternGenerator::from_names("drstree", "downloaded", &config()).is_ok());
        let err = PatternGenerator::from_names("user", "downloaded", &config()).unwrap_err();
        assert!(matches!(err, PipelineError::BadCombination { .. }));
    }

    #[test]
    fn test_unknown_names() {
        let err = PatternGenerator::from_names("user", "monthly", &config()).unwrap_err();
        assert!(matches!(err, PipelineError::PatternNotFound { ref name } if name == "monthly"));
        let err = PatternGenerator::from_names("scratch", "default", &config()).unwrap_err();
        assert!(matches!(err, PipelineError::PatternNotFound { ref name } if name == "scratch"));
    }

    #[test]
    fn test_timeslice_change_repeats_grid() {
        let generator = PatternGenerator::from_names("authoritative", "timeslice_change", &config()).unwrap();
        let template = PathTemplate::new(generator.pattern());
        assert!(template.has_field("grid"));
        assert!(template.has_field("change_type"));
        assert!(template.matcher().is_ok());
    }

    #[test]
    fn test_presets() {
        let cmip5 = DrsPreset::Cmip5Gcm;
        assert_eq!(
            cmip5.pattern(&config()),
            format!("/g/data/drstree/{}", cmip5.relative_pattern())
        );
        assert!(cmip5
            .default_constraints()
            .contains(&Constraint::single("product", "GCM")));
        assert_eq!(
            DrsPreset::CordexRcm.default_constraints(),
            vec![Constraint::single("product", "RCM")]
        );
    }
}
