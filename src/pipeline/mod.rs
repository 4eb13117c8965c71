//! Multi-step pipelines declared in YAML.

pub mod definition;
pub mod runner;

pub use definition::{
    ConstraintMap, ConstraintValues, DatasetDefinition, OutputLayout, PipelineDefinition, StepDefinition,
};
pub use runner::{PipelineReport, PipelineRunner, StepReport};
