use serde::Serialize;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info};

use super::definition::{to_constraints, DatasetDefinition, PipelineDefinition, StepDefinition};
use crate::config::EngineConfig;
use crate::core::ConstraintSet;
use crate::dataset::{DataSet, PatternDataSet};
use crate::engine::ProcessUnit;
use crate::error::{PipelineError, Result};
use crate::patterns::PatternGenerator;
use crate::subprocess::SubprocessManager;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    pub output_pattern: String,
    pub commands: usize,
    pub outputs: usize,
    pub simulated: bool,
    pub script: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    pub fn total_commands(&self) -> usize {
        self.steps.iter().map(|step| step.commands).sum()
    }
}

/// Runs the steps of a [`PipelineDefinition`] in order.
pub struct PipelineRunner {
    config: EngineConfig,
    subprocess: SubprocessManager,
}

impl PipelineRunner {
    pub fn new(config: EngineConfig, subprocess: SubprocessManager) -> Self {
        Self { config, subprocess }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate, scan every dataset, then execute each step.
    ///
    /// Each step's output is registered under the step name so later steps
    /// can consume it.
    pub fn run(&self, definition: &PipelineDefinition) -> Result<PipelineReport> {
        definition.validate()?;

        let mut registry: HashMap<String, Rc<dyn DataSet>> = HashMap::new();
        for (name, dataset) in &definition.datasets {
            let scanned = self.open_dataset(name, dataset)?;
            registry.insert(name.clone(), scanned);
        }

        let mut report = PipelineReport::default();
        for step in &definition.steps {
            let (output, step_report) = self.run_step(step, &registry)?;
            registry.insert(step.name.clone(), output);
            report.steps.push(step_report);
        }

        info!(
            "Pipeline finished: {} steps, {} commands",
            report.steps.len(),
            report.total_commands()
        );
        Ok(report)
    }

    fn open_dataset(&self, name: &str, definition: &DatasetDefinition) -> Result<Rc<dyn DataSet>> {
        let mut restrictions = ConstraintSet::new();
        let pattern = match (&definition.pattern, definition.preset) {
            (Some(pattern), _) => pattern.clone(),
            (None, Some(preset)) => {
                for constraint in preset.default_constraints() {
                    restrictions.overwrite(constraint);
                }
                preset.pattern(&self.config)
            }
            (None, None) => {
                return Err(PipelineError::pipeline(format!(
                    "dataset '{name}' has no pattern"
                )))
            }
        };
        for constraint in to_constraints(&definition.constraints) {
            restrictions.overwrite(constraint);
        }

        debug!("Scanning dataset '{}' with pattern {}", name, pattern);
        let dataset = PatternDataSet::new(&pattern, restrictions)?;
        info!("Dataset '{}' has {} files", name, dataset.len());
        Ok(Rc::new(dataset))
    }

    fn output_pattern(&self, step: &StepDefinition) -> Result<String> {
        match (&step.output, step.output_layout) {
            (Some(pattern), _) => Ok(pattern.clone()),
            (None, Some(layout)) => {
                Ok(PatternGenerator::new(layout.destination, layout.layout, &self.config)?.pattern())
            }
            (None, None) => Err(PipelineError::pipeline(format!(
                "step '{}' has no output",
                step.name
            ))),
        }
    }

    fn run_step(
        &self,
        step: &StepDefinition,
        registry: &HashMap<String, Rc<dyn DataSet>>,
    ) -> Result<(Rc<dyn DataSet>, StepReport)> {
        let inputs = step
            .inputs
            .iter()
            .map(|name| {
                registry
                    .get(name)
                    .cloned()
                    .ok_or_else(|| PipelineError::pipeline(format!("unknown input '{name}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        let output_pattern = self.output_pattern(step)?;

        info!("Running step '{}'", step.name);
        let mut builder = ProcessUnit::builder(inputs, &output_pattern, &step.command)
            .extra_constraints(to_constraints(&step.constraints))
            .merge_output(step.merge_output.iter().cloned())
            .required_modules(step.modules.iter().cloned())
            .annotate(step.annotate);
        for rename in &step.rename {
            builder = builder.rename(&rename.name, &rename.source, rename.input);
        }
        for keyword in &step.keyword_args {
            builder = builder.keyword_arg(&keyword.name, &keyword.attribute);
        }
        for positional in &step.positional_args {
            builder = builder.positional(positional.clone());
        }
        if let Some(template) = &step.kw_string {
            builder = builder.kw_string(template);
        }

        let mut unit = builder.build()?;
        let output = unit.execute(&self.config, &self.subprocess)?;

        let step_report = StepReport {
            name: step.name.clone(),
            output_pattern,
            commands: unit.command_count(),
            outputs: output.files().len(),
            simulated: unit.last_outcome().is_some_and(|outcome| outcome.simulated),
            script: unit.script().unwrap_or_default().to_string(),
        };
        Ok((output, step_report))
    }
}
