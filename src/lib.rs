//! # patternflow
//!
//! Declarative processing pipelines over files described by path templates.
//!
//! A template such as `/data/%model%/%variable%_%season%.nc` describes a set
//! of files whose attributes are the `%field%` values. Existing files are
//! discovered by scanning; outputs are synthesized from the attribute values
//! of matched inputs, and every matched combination becomes one command in a
//! generated shell script.
//!
//! ## Modules
//!
//! - `core` - Constraints, file metadata and path templates
//! - `dataset` - Scanned datasets and output file creators
//! - `engine` - Input/output matching and per-step command construction
//! - `scheduler` - Batch-script assembly and submission
//! - `patterns` - Named output layouts and DRS presets
//! - `pipeline` - YAML pipeline definitions and the step runner
//! - `config` - Engine configuration
//! - `subprocess` - Process execution behind a mockable runner
//! - `error` - Error type and codes
pub mod config;
pub mod core;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod patterns;
pub mod pipeline;
pub mod scheduler;
pub mod subprocess;

pub use error::{PipelineError, Result};
