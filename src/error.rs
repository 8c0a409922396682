//! Fatal input failures.
//!
//! Only problems that prevent the input from being read as a table at all
//! surface here. Row-level defects are tallied in [`crate::context::RunContext`]
//! and never abort a run.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("Input contains no header row")]
    EmptyInput,
    #[error("Input is missing required column(s): {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },
    #[error("Columns '{first}' and '{second}' both map to canonical field '{field}'")]
    DuplicateColumn {
        field: String,
        first: String,
        second: String,
    },
    #[error("Row {row} is not valid delimited data: {message}")]
    MalformedRow { row: usize, message: String },
    #[error("Row {row} cannot be decoded as {encoding}")]
    Decode { row: usize, encoding: String },
}
