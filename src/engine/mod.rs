//! Matching input files to output files and turning each match into a command.

pub mod argument_creator;
pub mod bindings;
pub mod process_unit;

pub use argument_creator::{ArgumentCreator, ArgumentSet};
pub use bindings::{KeywordArg, PositionalArg, PositionalValue};
pub use process_unit::{ProcessUnit, ProcessUnitBuilder, Rename, UnitState};
