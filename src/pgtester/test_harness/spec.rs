//! Test specification model
//!
//! Defines the YAML document format. One document describes one test group:
//! - `dsn`: connection parameters
//! - `retries` / `delay`: reconnect policy
//! - `debug`: verbose logging while the group runs
//! - `tests`: queries and the rows they must return

use super::error::{TestHarnessError, TestHarnessResult};
use crate::pgtester::pg::value::yaml_kind;
use crate::pgtester::pg::{CellValue, ConnectionParameters, RetryPolicy, RowSet};
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// How an expected value is compared with an observed one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Equal text, or a full regex match when the text compiles as a pattern
    #[default]
    Auto,
    /// Equal text only
    Literal,
    /// Full regex match; the pattern must compile
    Pattern,
}

/// One expected column value
#[derive(Debug, Clone)]
pub struct ExpectedValue {
    text: String,
    mode: MatchMode,
    regex: Option<Regex>,
}

impl ExpectedValue {
    pub fn auto(text: impl Into<String>) -> Self {
        let text = text.into();
        let regex = compile_anchored(&text).ok();
        Self {
            text,
            mode: MatchMode::Auto,
            regex,
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: MatchMode::Literal,
            regex: None,
        }
    }

    pub fn pattern(text: impl Into<String>) -> Result<Self, regex::Error> {
        let text = text.into();
        let regex = compile_anchored(&text)?;
        Ok(Self {
            text,
            mode: MatchMode::Pattern,
            regex: Some(regex),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Whether the value is compared as a regular expression
    pub fn is_pattern(&self) -> bool {
        self.regex.is_some()
    }

    /// Whether `observed` satisfies this expectation
    pub fn matches(&self, observed: &str) -> bool {
        match self.mode {
            MatchMode::Literal => observed == self.text,
            MatchMode::Pattern => self.regex.as_ref().is_some_and(|re| re.is_match(observed)),
            MatchMode::Auto => {
                observed == self.text
                    || self.regex.as_ref().is_some_and(|re| re.is_match(observed))
            }
        }
    }
}

impl PartialEq for ExpectedValue {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.mode == other.mode
    }
}

impl fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// The raw text is checked first: wrapping it could turn an invalid pattern
// into a valid one.
fn compile_anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)?;
    Regex::new(&format!("^(?:{})$", pattern))
}

fn canonical_scalar(value: &serde_yaml::Value) -> Result<String, String> {
    CellValue::from_yaml(value).map(|cell| cell.canonical())
}

impl<'de> Deserialize<'de> for ExpectedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        let serde_yaml::Value::Mapping(map) = &value else {
            return canonical_scalar(&value)
                .map(ExpectedValue::auto)
                .map_err(de::Error::custom);
        };

        if map.len() != 1 {
            return Err(de::Error::custom(
                "an expected value mapping must have exactly one key, 'literal' or 'pattern'",
            ));
        }
        let Some((key, inner)) = map.iter().next() else {
            return Err(de::Error::custom("empty expected value mapping"));
        };
        let text = canonical_scalar(inner).map_err(de::Error::custom)?;
        match key.as_str() {
            Some("literal") => Ok(ExpectedValue::literal(text)),
            Some("pattern") => ExpectedValue::pattern(&text)
                .map_err(|e| de::Error::custom(format!("invalid pattern '{}': {}", text, e))),
            Some(other) => Err(de::Error::custom(format!(
                "unknown match mode '{}', expected 'literal' or 'pattern'",
                other
            ))),
            None => Err(de::Error::custom(format!(
                "match mode must be a string, got {}",
                yaml_kind(key)
            ))),
        }
    }
}

/// Expected values of one row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ExpectedRow(BTreeMap<String, ExpectedValue>);

impl ExpectedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: ExpectedValue) -> Self {
        self.0.insert(column.into(), value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&ExpectedValue> {
        self.0.get(column)
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

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExpectedValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for ExpectedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("'{}': '{}'", k, v))
            .collect();
        write!(f, "{{ {} }}", pairs.join(", "))
    }
}

/// Ordered expected rows of one test
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedRowSet(Vec<ExpectedRow>);

impl ExpectedRowSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn rows(&self) -> &[ExpectedRow] {
        &self.0
    }

    /// Expect exactly the given observed rows
    pub fn from_observed(rows: &RowSet) -> Self {
        rows.iter()
            .map(|row| {
                ExpectedRow(
                    row.iter()
                        .map(|(k, v)| (k.to_string(), ExpectedValue::auto(v)))
                        .collect(),
                )
            })
            .collect()
    }
}

impl From<Vec<ExpectedRow>> for ExpectedRowSet {
    fn from(rows: Vec<ExpectedRow>) -> Self {
        Self(rows)
    }
}

impl FromIterator<ExpectedRow> for ExpectedRowSet {
    fn from_iter<I: IntoIterator<Item = ExpectedRow>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ExpectedRowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("[ ]");
        }
        let rows: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        write!(f, "[ {} ]", rows.join(", "))
    }
}

// `results:` with no rows may be written as null
impl<'de> Deserialize<'de> for ExpectedRowSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(
            Option::<Vec<ExpectedRow>>::deserialize(deserializer)?.unwrap_or_default(),
        ))
    }
}

/// A single query and the rows it is expected to return
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TestDefinition {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub query: String,

    /// Expected rows, in order
    #[serde(default)]
    pub results: ExpectedRowSet,

    /// Score an error as success and a match as failure
    #[serde(default)]
    pub reverse: bool,
}

impl TestDefinition {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_results(mut self, results: impl Into<ExpectedRowSet>) -> Self {
        self.results = results.into();
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Fill a blank name from the query and a blank query from the name
    pub fn validate(&mut self) -> TestHarnessResult<()> {
        let name_blank = self.name.trim().is_empty();
        let query_blank = self.query.trim().is_empty();
        match (name_blank, query_blank) {
            (true, true) => Err(TestHarnessError::ValidationError {
                message: "a defined test is missing the query and name arguments".to_string(),
            }),
            (true, false) => {
                self.name = self.query.clone();
                Ok(())
            }
            (false, true) => {
                self.query = self.name.clone();
                Ok(())
            }
            (false, false) => Ok(()),
        }
    }

    /// Error count added when the test errors or mismatches
    pub fn increase_on_error(&self) -> u32 {
        if self.reverse {
            0
        } else {
            1
        }
    }

    /// Error count added when the test matches
    pub fn increase_on_success(&self) -> u32 {
        1 - self.increase_on_error()
    }

    pub fn msg_on_error(&self) -> &'static str {
        if self.reverse {
            "expected error"
        } else {
            "unexpected error"
        }
    }

    pub fn msg_on_success(&self) -> &'static str {
        if self.reverse {
            "unexpected success"
        } else {
            "success as expected"
        }
    }
}

/// One YAML document as written
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupDocument {
    #[serde(default)]
    pub dsn: ConnectionParameters,

    #[serde(default)]
    pub retries: u32,

    /// Wait between reconnect attempts
    #[serde(default, deserialize_with = "deserialize_delay")]
    pub delay: Option<Duration>,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub tests: Vec<TestDefinition>,
}

impl GroupDocument {
    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str, source: &str) -> TestHarnessResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| TestHarnessError::from(e).with_source(source))
    }

    /// Validate and attach the document's origin
    pub fn into_group(self, source: &str, index: usize) -> TestHarnessResult<TestGroup> {
        self.dsn
            .validate()
            .map_err(|message| TestHarnessError::ConfigError {
                message: format!("document {}: {}", index, message),
                source_name: source.to_string(),
            })?;

        let delay = match self.delay {
            Some(d) if !d.is_zero() => d,
            _ => RetryPolicy::DEFAULT_DELAY,
        };

        Ok(TestGroup {
            source: source.to_string(),
            index,
            connection: self.dsn,
            retry: RetryPolicy::new(self.retries, delay),
            tests: self.tests,
            debug: self.debug,
        })
    }
}

/// `delay: 500ms` / `delay: 2s` / `delay: 3` (seconds)
fn deserialize_delay<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::Number(n)) => n
            .as_u64()
            .map(|secs| Some(Duration::from_secs(secs)))
            .ok_or_else(|| de::Error::custom(format!("invalid delay {}", n))),
        Some(serde_yaml::Value::String(s)) => humantime::parse_duration(s.trim())
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid delay '{}': {}", s, e))),
        Some(other) => Err(de::Error::custom(format!(
            "delay must be a duration, got {}",
            yaml_kind(&other)
        ))),
    }
}

/// Connection settings and ordered tests from one document
#[derive(Debug, Clone, PartialEq)]
pub struct TestGroup {
    /// File path, or `(stdin)`
    pub source: String,
    /// Position among the non-empty documents of the source
    pub index: usize,
    pub connection: ConnectionParameters,
    pub retry: RetryPolicy,
    pub tests: Vec<TestDefinition>,
    pub debug: bool,
}

impl TestGroup {
    pub fn name(&self) -> String {
        format!("{} ({})", self.source, self.index)
    }
}
