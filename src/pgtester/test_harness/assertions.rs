//! Result comparison
//!
//! Observed rows are compared with expected rows position by position. Within a
//! row every observed column must exist in the expectation and satisfy its
//! [`MatchMode`](super::spec::MatchMode).

use super::spec::{ExpectedRow, ExpectedRowSet, ExpectedValue};
use crate::pgtester::pg::result::quoted;
use crate::pgtester::pg::{Row, RowSet};
use serde::Serialize;
use std::fmt;

/// Outcome of one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Match,
    Mismatch(String),
    ExecutionError(String),
}

impl ComparisonOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, ComparisonOutcome::Match)
    }

    /// Failure description, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            ComparisonOutcome::Match => None,
            ComparisonOutcome::Mismatch(reason) | ComparisonOutcome::ExecutionError(reason) => {
                Some(reason)
            }
        }
    }
}

impl fmt::Display for ComparisonOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOutcome::Match => f.write_str("match"),
            ComparisonOutcome::Mismatch(reason) => write!(f, "mismatch: {}", reason),
            ComparisonOutcome::ExecutionError(cause) => write!(f, "error: {}", cause),
        }
    }
}

fn column_list(columns: &[&str]) -> String {
    format!("[{}]", columns.join(", "))
}

fn compare_value(column: &str, observed: &str, expected: &ExpectedValue) -> Result<(), String> {
    if expected.matches(observed) {
        return Ok(());
    }
    if expected.is_pattern() {
        Err(format!(
            "column {} value ({}) does not match with regular expression ({})",
            quoted(column),
            quoted(observed),
            quoted(expected.text())
        ))
    } else {
        Err(format!(
            "column {} differs between row ({}) and compared row ({})",
            quoted(column),
            quoted(observed),
            quoted(expected.text())
        ))
    }
}

/// Compare one observed row with its expectation
pub fn compare_row(observed: &Row, expected: &ExpectedRow) -> ComparisonOutcome {
    if observed.len() != expected.len() {
        return ComparisonOutcome::Mismatch(format!(
            "column count differs between row {} and compared row {}",
            column_list(&observed.columns()),
            column_list(&expected.columns())
        ));
    }

    for (column, value) in observed.iter() {
        let Some(expected_value) = expected.get(column) else {
            return ComparisonOutcome::Mismatch(format!(
                "column {} not in compared row",
                quoted(column)
            ));
        };
        if let Err(reason) = compare_value(column, value, expected_value) {
            return ComparisonOutcome::Mismatch(reason);
        }
    }

    ComparisonOutcome::Match
}

/// Compare all observed rows with the expected rows, in order
///
/// The first mismatching row decides the outcome.
pub fn compare_row_set(observed: &RowSet, expected: &ExpectedRowSet) -> ComparisonOutcome {
    if observed.len() != expected.len() {
        return ComparisonOutcome::Mismatch(format!(
            "different result count: got {} row(s) {}, expected {} row(s) {}",
            observed.len(),
            observed,
            expected.len(),
            expected
        ));
    }

    for (i, (row, expected_row)) in observed.iter().zip(expected.rows()).enumerate() {
        if let ComparisonOutcome::Mismatch(reason) = compare_row(row, expected_row) {
            return ComparisonOutcome::Mismatch(format!("different result at row {}: {}", i, reason));
        }
    }

    ComparisonOutcome::Match
}
