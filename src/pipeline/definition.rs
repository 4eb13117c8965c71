use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::core::Constraint;
use crate::engine::{KeywordArg, PositionalArg, Rename};
use crate::error::{PipelineError, Result};
use crate::patterns::{Destination, DrsPreset, Layout};

/// One value or a list of values for an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValues {
    One(String),
    Many(Vec<String>),
}

impl ConstraintValues {
    fn into_constraint(self, key: &str) -> Constraint {
        match self {
            Self::One(value) => Constraint::single(key, value),
            Self::Many(values) => Constraint::new(key, values),
        }
    }
}

pub type ConstraintMap = BTreeMap<String, ConstraintValues>;

pub(crate) fn to_constraints(map: &ConstraintMap) -> Vec<Constraint> {
    map.iter()
        .map(|(key, values)| values.clone().into_constraint(key))
        .collect()
}

/// Files already on disk, described by a template or a DRS preset
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetDefinition {
    pub pattern: Option<String>,
    pub preset: Option<DrsPreset>,
    pub constraints: ConstraintMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    pub destination: Destination,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    /// Names of datasets or earlier steps
    pub inputs: Vec<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub output_layout: Option<OutputLayout>,
    pub command: String,
    #[serde(default)]
    pub constraints: ConstraintMap,
    #[serde(default)]
    pub rename: Vec<Rename>,
    #[serde(default)]
    pub keyword_args: Vec<KeywordArg>,
    #[serde(default)]
    pub positional_args: Vec<PositionalArg>,
    #[serde(default)]
    pub kw_string: Option<String>,
    #[serde(default)]
    pub merge_output: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub annotate: bool,
}

/// A whole pipeline as written in YAML.
///
/// ```yaml
/// datasets:
///   rain:
///     pattern: /data/%model%/%variable%.nc
///     constraints:
///       variable: pr
/// steps:
///   - name: seasonal
///     inputs: [rain]
///     output: /out/%model%_%variable%_%season%.nc
///     command: seasonal_mean
///     constraints:
///       season: [DJF, JJA]
///     positional_args:
///       - value: { attribute: season }
///         position: 0
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default)]
    pub datasets: BTreeMap<String, DatasetDefinition>,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl PipelineDefinition {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::pipeline(format!("failed to parse pipeline definition: {e}")))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| PipelineError::pipeline(format!("failed to parse {}: {e}", path.display())))
    }

    /// Check names and references without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        let mut known: HashSet<&str> = HashSet::new();

        for (name, dataset) in &self.datasets {
            match (&dataset.pattern, &dataset.preset) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(PipelineError::pipeline(format!(
                        "dataset '{name}' needs exactly one of 'pattern' or 'preset'"
                    )))
                }
            }
            known.insert(name);
        }

        for step in &self.steps {
            if known.contains(step.name.as_str()) {
                return Err(PipelineError::pipeline(format!(
                    "name '{}' is used more than once",
                    step.name
                )));
            }
            if step.inputs.is_empty() {
                return Err(PipelineError::pipeline(format!(
                    "step '{}' has no inputs",
                    step.name
                )));
            }
            if let Some(missing) = step.inputs.iter().find(|input| !known.contains(input.as_str())) {
                return Err(PipelineError::pipeline(format!(
                    "step '{}' refers to unknown or later input '{}'",
                    step.name, missing
                )));
            }
            if step.output.is_some() == step.output_layout.is_some() {
                return Err(PipelineError::pipeline(format!(
                    "step '{}' needs exactly one of 'output' or 'output_layout'",
                    step.name
                )));
            }
            known.insert(&step.name);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PositionalValue;

    const EXAMPLE: &str = r#"
datasets:
  rain:
    pattern: /data/%model%/%variable%.nc
    constraints:
      variable: pr
      model: [ACCESS1-0, CSIRO-Mk3-6-0]
  gcm:
    preset: cmip5_gcm
steps:
  - name: seasonal
    inputs: [rain]
    output: /out/%model%_%variable%_%season%.nc
    command: seasonal_mean
    constraints:
      season: [DJF, JJA]
    rename:
      - { name: season_src, source: variable, input: 0 }
    keyword_args:
      - { name: season, attribute: season }
    positional_args:
      - value: { raw: --input }
        position: 0
    modules: [cdo]
    annotate: true
  - name: regrid
    inputs: [seasonal]
    output_layout: { destination: user, layout: default }
    command: regrid
"#;

    #[test]
    fn test_parse_example() {
        let definition = PipelineDefinition::from_yaml_str(EXAMPLE).unwrap();
        assert_eq!(definition.datasets.len(), 2);
        assert_eq!(definition.datasets["gcm"].preset, Some(DrsPreset::Cmip5Gcm));
        assert_eq!(
            to_constraints(&definition.datasets["rain"].constraints),
            vec![
                Constraint::new("model", ["ACCESS1-0", "CSIRO-Mk3-6-0"]),
                Constraint::single("variable", "pr"),
            ]
        );

        let seasonal = &definition.steps[0];
        assert_eq!(seasonal.rename[0].input, 0);
        assert_eq!(seasonal.positional_args[0].value, PositionalValue::Raw("--input".to_string()));
        assert!(seasonal.annotate);
        assert_eq!(
            definition.steps[1].output_layout,
            Some(OutputLayout {
                destination: Destination::User,
                layout: Layout::Default,
            })
        );
        definition.validate().unwrap();
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let mut definition = PipelineDefinition::from_yaml_str(EXAMPLE).unwrap();
        definition.steps.swap(0, 1);
        let err = definition.validate().unwrap_err();
        assert!(err.to_string().contains("unknown or later input 'seasonal'"));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut definition = PipelineDefinition::from_yaml_str(EXAMPLE).unwrap();
        definition.steps[1].name = "rain".to_string();
        assert!(matches!(definition.validate(), Err(PipelineError::Pipeline { .. })));
    }

    #[test]
    fn test_step_needs_one_output() {
        let mut definition = PipelineDefinition::from_yaml_str(EXAMPLE).unwrap();
        definition.steps[0].output = None;
        assert!(definition.validate().is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        let err = PipelineDefinition::from_yaml_str("steps: {oops").unwrap_err();
        assert!(matches!(err, PipelineError::Pipeline { .. }));
    }
}
