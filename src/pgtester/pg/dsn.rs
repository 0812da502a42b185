//! Connection parameters and the keyword/value connection string builder
//!
//! PostgreSQL accepts connection strings of the form
//! `host='db' port='5432' user='postgres'`. Every value is wrapped in single
//! quotes and embedded single quotes are escaped with a backslash.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Parameters that are never written to the log in clear text
const SECRET_KEYS: &[&str] = &["password"];

/// Named connection parameters (`host`, `port`, `user`, `dbname`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionParameters(BTreeMap<String, String>);

impl ConnectionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check that no parameter name is blank and that the driver accepts
    /// every keyword and value (`sslmode` is one of `disable`, `prefer`, `require`)
    pub fn validate(&self) -> Result<(), String> {
        if self.0.keys().any(|k| k.trim().is_empty()) {
            return Err("connection parameter with an empty name".to_string());
        }
        self.to_dsn()
            .parse::<tokio_postgres::Config>()
            .map(|_| ())
            .map_err(|e| format!("invalid connection parameters {}: {}", self, e))
    }

    /// Driver-ready connection string, `key='value'` pairs joined by spaces
    pub fn to_dsn(&self) -> String {
        self.render(false)
    }

    /// Same as [`to_dsn`](Self::to_dsn) with secrets replaced, for logging
    pub fn to_masked_dsn(&self) -> String {
        self.render(true)
    }

    fn render(&self, mask: bool) -> String {
        self.0
            .iter()
            .map(|(key, value)| {
                if mask && SECRET_KEYS.contains(&key.as_str()) {
                    format!("{}='*****'", key)
                } else {
                    format!("{}={}", key, connect_string_value(value))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_masked_dsn())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConnectionParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Quote a value for use in a connection string
///
/// Only single quotes are altered (`'` becomes `\'`).
pub fn connect_string_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', "\\'"))
}

// YAML users write `port: 5432`, so any scalar is accepted and stringified.
impl<'de> Deserialize<'de> for ConnectionParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<BTreeMap<String, serde_yaml::Value>>::deserialize(deserializer)?;
        let mut params = BTreeMap::new();
        for (key, value) in raw.unwrap_or_default() {
            let text = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Null => String::new(),
                other => {
                    return Err(de::Error::custom(format!(
                        "dsn parameter '{}' must be a scalar, got {:?}",
                        key, other
                    )))
                }
            };
            params.insert(key, text);
        }
        Ok(Self(params))
    }
}
