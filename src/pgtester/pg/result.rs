//! Canonical result rows
//!
//! A [`Row`] maps column names to canonical strings; a [`RowSet`] keeps rows in
//! the order the server returned them.

use super::error::{PgError, PgResult};
use super::value::CellValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One result row, column name to canonical value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row(BTreeMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from column names and the cells of one result row
    pub fn from_cells(columns: &[String], cells: &[CellValue]) -> PgResult<Self> {
        if columns.len() != cells.len() {
            return Err(PgError::Decode {
                column: columns.join(", "),
                message: format!(
                    "{} column(s) described but {} value(s) returned",
                    columns.len(),
                    cells.len()
                ),
            });
        }
        Ok(columns
            .iter()
            .zip(cells)
            .map(|(col, cell)| (col.clone(), cell.canonical()))
            .collect())
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("{}: {}", quoted(k), quoted(v)))
            .collect();
        write!(f, "{{ {} }}", pairs.join(", "))
    }
}

/// Ordered rows of one query execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowSet(Vec<Row>);

impl RowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: Row) {
        self.0.push(row);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.0.iter()
    }
}

impl From<Vec<Row>> for RowSet {
    fn from(rows: Vec<Row>) -> Self {
        Self(rows)
    }
}

impl FromIterator<Row> for RowSet {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for RowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("[ ]");
        }
        let rows: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "[ {} ]", rows.join(", "))
    }
}

/// Single-quote a name or value for diagnostics
pub fn quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "\\'"))
}
