use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, info};

use super::argument_creator::{ArgumentCreator, ArgumentSet};
use super::bindings::{apply_keyword_args, apply_positional_args, render_kw_string, KeywordArg, PositionalArg};
use crate::config::EngineConfig;
use crate::core::{Constraint, ConstraintSet, PathTemplate};
use crate::dataset::{DataSet, FileCreator};
use crate::error::{PipelineError, Result};
use crate::scheduler::{annotation, ExecutionOutcome, Scheduler};
use crate::subprocess::SubprocessManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitState {
    Constructed,
    ConstraintsResolved,
    Executed,
}

/// Publish input attribute `source` of input `input` as output attribute `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub input: usize,
}

/// Configures one processing step. Output constraints are resolved by
/// [`ProcessUnitBuilder::build`].
pub struct ProcessUnitBuilder {
    inputs: Vec<Rc<dyn DataSet>>,
    output_pattern: String,
    command: String,
    renames: Vec<Rename>,
    extras: Vec<Constraint>,
    keyword_args: Vec<KeywordArg>,
    positional_args: Vec<PositionalArg>,
    kw_string: Option<String>,
    merge_output: Vec<String>,
    required_modules: Vec<String>,
    annotate: bool,
}

impl ProcessUnitBuilder {
    pub fn state(&self) -> UnitState {
        UnitState::Constructed
    }

    pub fn rename(mut self, name: impl Into<String>, source: impl Into<String>, input: usize) -> Self {
        self.renames.push(Rename {
            name: name.into(),
            source: source.into(),
            input,
        });
        self
    }

    pub fn extra_constraint(mut self, constraint: Constraint) -> Self {
        self.extras.push(constraint);
        self
    }

    pub fn extra_constraints<I>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = Constraint>,
    {
        self.extras.extend(constraints);
        self
    }

    pub fn keyword_arg(mut self, name: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.keyword_args.push(KeywordArg::new(name, attribute));
        self
    }

    pub fn positional(mut self, arg: PositionalArg) -> Self {
        self.positional_args.push(arg);
        self
    }

    pub fn kw_string(mut self, template: impl Into<String>) -> Self {
        self.kw_string = Some(template.into());
        self
    }

    pub fn merge_output<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merge_output.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn required_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_modules.extend(modules.into_iter().map(Into::into));
        self
    }

    pub fn annotate(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Resolve the output constraints and create the output [`FileCreator`].
    ///
    /// Renames are applied first, then extra constraints fill fields that are
    /// still empty, then any remaining field takes the union of the values
    /// the inputs have for it.
    pub fn build(self) -> Result<ProcessUnit> {
        let template = PathTemplate::new(&self.output_pattern);
        let mut constraints = template.empty_constraints();

        self.apply_renames(&template, &mut constraints)?;
        self.apply_extras(&template, &mut constraints)?;
        self.fill_from_inputs(&mut constraints);

        debug!("Final output constraints are: {}", constraints);
        let output = Rc::new(FileCreator::new(&self.output_pattern, constraints)?);

        Ok(ProcessUnit {
            inputs: self.inputs,
            command: self.command,
            keyword_args: self.keyword_args,
            positional_args: self.positional_args,
            kw_string: self.kw_string,
            merge_output: self.merge_output,
            required_modules: self.required_modules,
            annotate: self.annotate,
            output,
            state: UnitState::ConstraintsResolved,
            last_outcome: None,
            command_count: 0,
        })
    }

    fn apply_renames(&self, template: &PathTemplate, constraints: &mut ConstraintSet) -> Result<()> {
        for rename in &self.renames {
            if !template.has_field(&rename.name) {
                return Err(PipelineError::ExtraConstraint {
                    constraint: Constraint::empty(rename.name.clone()),
                    template: template.to_string(),
                });
            }

            let input = self.inputs.get(rename.input).ok_or_else(|| {
                PipelineError::constraint_not_found(
                    &rename.source,
                    format!("rename refers to input {} but there are {} inputs", rename.input, self.inputs.len()),
                )
            })?;

            let found = input.get_constraint(&rename.source)?;
            constraints.overwrite(found.renamed(rename.name.clone()));
            input.alias(&rename.source, &rename.name)?;
            debug!("Renamed input {} attribute '{}' to '{}'", rename.input, rename.source, rename.name);
        }
        Ok(())
    }

    fn apply_extras(&self, template: &PathTemplate, constraints: &mut ConstraintSet) -> Result<()> {
        let mut extras = ConstraintSet::new();
        for extra in &self.extras {
            if extra.is_empty() {
                return Err(PipelineError::EmptyOverwrite {
                    constraint: extra.clone(),
                });
            }
            if !template.has_field(extra.key()) {
                return Err(PipelineError::ExtraConstraint {
                    constraint: extra.clone(),
                    template: template.to_string(),
                });
            }
            extras.merge(extra.clone());
        }

        for extra in extras {
            let still_empty = constraints.get(extra.key()).is_some_and(Constraint::is_empty);
            if still_empty {
                constraints.overwrite(extra);
            }
        }
        Ok(())
    }

    fn fill_from_inputs(&self, constraints: &mut ConstraintSet) {
        for key in constraints.empty_keys() {
            for input in &self.inputs {
                if let Ok(found) = input.get_constraint(&key) {
                    constraints.merge(found.renamed(key.clone()));
                }
            }
        }
    }
}

/// One processing step: a command run once per matched combination of
/// input and output files.
pub struct ProcessUnit {
    inputs: Vec<Rc<dyn DataSet>>,
    command: String,
    keyword_args: Vec<KeywordArg>,
    positional_args: Vec<PositionalArg>,
    kw_string: Option<String>,
    merge_output: Vec<String>,
    required_modules: Vec<String>,
    annotate: bool,
    output: Rc<FileCreator>,
    state: UnitState,
    last_outcome: Option<ExecutionOutcome>,
    command_count: usize,
}

impl ProcessUnit {
    pub fn builder(
        inputs: Vec<Rc<dyn DataSet>>,
        output_pattern: impl Into<String>,
        command: impl Into<String>,
    ) -> ProcessUnitBuilder {
        ProcessUnitBuilder {
            inputs,
            output_pattern: output_pattern.into(),
            command: command.into(),
            renames: Vec::new(),
            extras: Vec::new(),
            keyword_args: Vec::new(),
            positional_args: Vec::new(),
            kw_string: None,
            merge_output: Vec::new(),
            required_modules: Vec::new(),
            annotate: false,
        }
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    /// The step's output dataset, available before execution
    pub fn output(&self) -> Rc<FileCreator> {
        Rc::clone(&self.output)
    }

    pub fn last_outcome(&self) -> Option<&ExecutionOutcome> {
        self.last_outcome.as_ref()
    }

    /// The most recently submitted script
    pub fn script(&self) -> Option<&str> {
        self.last_outcome.as_ref().map(|outcome| outcome.script.as_str())
    }

    /// Commands scheduled by the last execution
    pub fn command_count(&self) -> usize {
        self.command_count
    }

    /// Build the full argument list for one matched combination
    pub fn build_command(&self, set: &ArgumentSet) -> Result<Vec<String>> {
        let mut command = vec![self.command.clone()];
        command.extend(set.input_paths());
        command.extend(set.output_paths());

        apply_keyword_args(&mut command, &self.keyword_args, &set.attributes)?;
        apply_positional_args(&mut command, &self.positional_args, &set.attributes)?;
        if let Some(template) = &self.kw_string {
            command.push(render_kw_string(template, &set.attributes)?);
        }

        Ok(command)
    }

    /// Schedule one command per matched combination and submit the script.
    ///
    /// The tool root is checked before anything is matched or scheduled.
    pub fn execute(&mut self, config: &EngineConfig, subprocess: &SubprocessManager) -> Result<Rc<FileCreator>> {
        let tool_root = config.resolve_tool_root()?;
        let tool_root_str = tool_root.to_string_lossy().to_string();
        let search_dir = tool_root.join(&config.search_path_subdir);

        let mut scheduler = Scheduler::new(subprocess.clone());
        scheduler.add_module_deps(&self.required_modules);
        scheduler.add_environment_variable(&config.tool_env_var, &tool_root_str);
        scheduler.add_search_path(&config.search_path_var, &search_dir.to_string_lossy());

        let matcher = ArgumentCreator::new(
            self.inputs.clone(),
            Rc::clone(&self.output),
            self.merge_output.clone(),
        )?;

        let mut count = 0;
        for set in matcher {
            let set = set?;
            let command = self.build_command(&set)?;
            let note = self.annotate.then(|| annotation::build_annotation(&command));
            scheduler.add_cmd(command, &set.output_paths(), note.as_deref());
            count += 1;
        }

        info!("Scheduled {} commands for '{}'", count, self.command);
        let outcome = scheduler.submit(config.simulate)?;

        self.command_count = count;
        self.last_outcome = Some(outcome);
        self.state = UnitState::Executed;
        Ok(Rc::clone(&self.output))
    }
}
