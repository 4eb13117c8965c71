use thiserror::Error;

use crate::core::Constraint;
use crate::subprocess::ProcessError;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The unified error type for the constraint engine, scheduler and pipeline runner.
///
/// Every variant renders its numeric code first so that a failure copied out of a
/// terminal can be looked up with [`describe_error_code`].
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[E{code:04}] Constraint not found: '{key}' ({context})", code = ErrorCode::CONSTRAINT_NOT_FOUND)]
    ConstraintNotFound { key: String, context: String },

    #[error("[E{code:04}] {constraint} is empty but must contain values ({context})", code = ErrorCode::CONSTRAINT_EMPTY)]
    EmptyConstraint {
        constraint: Constraint,
        context: String,
    },

    #[error("[E{code:04}] {constraint} is not found in the pattern '{template}'", code = ErrorCode::CONSTRAINT_EXTRA)]
    ExtraConstraint {
        constraint: Constraint,
        template: String,
    },

    #[error("[E{code:04}] {constraint} is being used to overwrite an output field", code = ErrorCode::CONSTRAINT_EMPTY_OVERWRITE)]
    EmptyOverwrite { constraint: Constraint },

    #[error("[E{code:04}] Malformed constraint string '{input}': {reason}", code = ErrorCode::CONSTRAINT_INVALID_STRING)]
    InvalidConstraintString { input: String, reason: String },

    #[error("[E{code:04}] Malformed path template '{template}': {reason}", code = ErrorCode::TEMPLATE_INVALID)]
    InvalidTemplate { template: String, reason: String },

    #[error("[E{code:04}] File '{path}' was found but does not match the pattern '{template}'", code = ErrorCode::PATTERN_MISMATCH)]
    PatternMismatch { path: String, template: String },

    #[error("[E{code:04}] No path layout named '{name}'", code = ErrorCode::PATTERN_NOT_FOUND)]
    PatternNotFound { name: String },

    #[error("[E{code:04}] Layout '{layout}' cannot be used with destination '{destination}'", code = ErrorCode::PATTERN_BAD_COMBINATION)]
    BadCombination { destination: String, layout: String },

    #[error("[E{code:04}] Batch script failed with exit code {}:\n{output}", display_exit_code(.exit_code), code = ErrorCode::EXEC_BAD_RETURN)]
    BadReturn {
        exit_code: Option<i32>,
        output: String,
    },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Process error: {0}", code = ErrorCode::EXEC_PROCESS)]
    Process(#[from] ProcessError),

    #[error("[E{code:04}] IO error: {0}", code = ErrorCode::EXEC_IO)]
    Io(#[from] std::io::Error),

    #[error("[E{code:04}] Invalid pipeline: {message}", code = ErrorCode::PIPELINE_INVALID)]
    Pipeline { message: String },
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown".to_string(),
    }
}

impl PipelineError {
    /// Create a constraint-not-found error for a key
    pub fn constraint_not_found(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ConstraintNotFound {
            key: key.into(),
            context: context.into(),
        }
    }

    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a pipeline definition error
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline {
            message: message.into(),
        }
    }

    /// Add a source error to a configuration error. Other variants are returned unchanged.
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        if let Self::Config { source: src, .. } = &mut self {
            *src = Some(source.into());
        }
        self
    }

    /// Get the numeric error code
    pub fn code(&self) -> u16 {
        match self {
            Self::ConstraintNotFound { .. } => ErrorCode::CONSTRAINT_NOT_FOUND,
            Self::EmptyConstraint { .. } => ErrorCode::CONSTRAINT_EMPTY,
            Self::ExtraConstraint { .. } => ErrorCode::CONSTRAINT_EXTRA,
            Self::EmptyOverwrite { .. } => ErrorCode::CONSTRAINT_EMPTY_OVERWRITE,
            Self::InvalidConstraintString { .. } => ErrorCode::CONSTRAINT_INVALID_STRING,
            Self::InvalidTemplate { .. } => ErrorCode::TEMPLATE_INVALID,
            Self::PatternMismatch { .. } => ErrorCode::PATTERN_MISMATCH,
            Self::PatternNotFound { .. } => ErrorCode::PATTERN_NOT_FOUND,
            Self::BadCombination { .. } => ErrorCode::PATTERN_BAD_COMBINATION,
            Self::BadReturn { .. } => ErrorCode::EXEC_BAD_RETURN,
            Self::Config { code, .. } => *code,
            Self::Process(_) => ErrorCode::EXEC_PROCESS,
            Self::Io(_) => ErrorCode::EXEC_IO,
            Self::Pipeline { .. } => ErrorCode::PIPELINE_INVALID,
        }
    }
}
