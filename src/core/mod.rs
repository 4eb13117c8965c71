//! Core value types with pure functions
//!
//! This module contains the value types the rest of the engine is built from.
//! Following the "functional core, imperative shell" pattern, everything here:
//! - Takes inputs and returns outputs
//! - Has no side effects
//! - Doesn't touch the file system or spawn processes
//! - Is easily testable without mocks

pub mod constraint;
pub mod metafile;
pub mod product;
pub mod template;

pub use constraint::{parse_constraint_string, Constraint, ConstraintSet};
pub use metafile::{Attributes, MetaFile};
pub use product::AttributeProduct;
pub use template::{PathTemplate, TemplateMatcher};
