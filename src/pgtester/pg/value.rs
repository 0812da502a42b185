//! Database cell values and their canonical string form
//!
//! Every value that takes part in a comparison, whether it was read from the
//! server or written as an expectation in a test document, is reduced to a
//! string by [`CellValue::canonical`]. Both sides therefore live in the same
//! representation space.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::time::Duration;
use tokio_postgres::types::{FromSql, Type};

/// Literal used for SQL NULL
pub const NULL_LITERAL: &str = "nil";

/// A dynamically typed value read from a result set or a test document
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Decimal(Decimal),
    Duration { negative: bool, value: Duration },
    Timestamp(Temporal),
    Bytes(Vec<u8>),
    NumericArray(Vec<Option<f64>>),
    Null,
    /// A server type without a canonical form; carries the type name
    Unknown(String),
}

/// Date and time flavours PostgreSQL can return
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Temporal {
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::Date(d) => write!(f, "{}", d),
            Temporal::Time(t) => write!(f, "{}", t),
            Temporal::Timestamp(ts) => write!(f, "{}", ts),
            Temporal::TimestampTz(ts) => write!(f, "{}", ts),
        }
    }
}

impl CellValue {
    /// The canonical string form used for every comparison
    ///
    /// Never fails: types without a known form render as a diagnostic string.
    pub fn canonical(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Unsigned(u) => u.to_string(),
            CellValue::Float(f) => format_fixed(*f),
            CellValue::Decimal(d) => d.to_string(),
            CellValue::Duration { negative, value } => {
                let rendered = if value.is_zero() {
                    "0s".to_string()
                } else {
                    humantime::format_duration(*value).to_string()
                };
                if *negative && !value.is_zero() {
                    format!("-{}", rendered)
                } else {
                    rendered
                }
            }
            CellValue::Timestamp(t) => t.to_string(),
            CellValue::Bytes(bytes) => format!(
                "[{}]",
                bytes
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
            CellValue::NumericArray(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(|item| match item {
                        Some(f) => format_fixed(*f),
                        None => NULL_LITERAL.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            CellValue::Null => NULL_LITERAL.to_string(),
            CellValue::Unknown(type_name) => format!("unknown datatype {}", type_name),
        }
    }

    /// Convert a scalar from a test document into a cell value
    ///
    /// Sequences are accepted when every element is a number (or null) and
    /// become a numeric array.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self, String> {
        match value {
            serde_yaml::Value::Null => Ok(CellValue::Null),
            serde_yaml::Value::Bool(b) => Ok(CellValue::Bool(*b)),
            serde_yaml::Value::String(s) => Ok(CellValue::Text(s.clone())),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(CellValue::Integer(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(CellValue::Unsigned(u))
                } else if let Some(f) = n.as_f64() {
                    Ok(CellValue::Float(f))
                } else {
                    Err(format!("unsupported number {}", n))
                }
            }
            serde_yaml::Value::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    serde_yaml::Value::Null => Ok(None),
                    serde_yaml::Value::Number(n) => n
                        .as_f64()
                        .map(Some)
                        .ok_or_else(|| format!("unsupported number {}", n)),
                    other => Err(format!(
                        "array elements must be numbers, got {}",
                        yaml_kind(other)
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(CellValue::NumericArray),
            serde_yaml::Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
            serde_yaml::Value::Mapping(_) => {
                Err("a mapping cannot be used as a column value".to_string())
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Fixed-point with six decimals, never scientific notation
pub fn format_fixed(value: f64) -> String {
    format!("{:.6}", value)
}

pub(crate) fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "boolean",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}

/// Binary form of a PostgreSQL `interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgInterval {
    pub microseconds: i64,
    pub days: i32,
    pub months: i32,
}

const MICROS_PER_DAY: i128 = 86_400_000_000;
// Same convention as PostgreSQL's justify_days
const DAYS_PER_MONTH: i128 = 30;

impl PgInterval {
    /// Fold months and days into one signed span
    pub fn to_cell(self) -> CellValue {
        let total = i128::from(self.microseconds)
            + i128::from(self.days) * MICROS_PER_DAY
            + i128::from(self.months) * DAYS_PER_MONTH * MICROS_PER_DAY;
        let magnitude = total.unsigned_abs();
        let secs = u64::try_from(magnitude / 1_000_000).unwrap_or(u64::MAX);
        let micros = (magnitude % 1_000_000) as u32;
        CellValue::Duration {
            negative: total < 0,
            value: Duration::new(secs, micros * 1_000),
        }
    }
}

impl<'a> FromSql<'a> for PgInterval {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        if raw.len() != 16 {
            return Err(format!("invalid interval length {}", raw.len()).into());
        }
        let mut micros = [0u8; 8];
        let mut days = [0u8; 4];
        let mut months = [0u8; 4];
        micros.copy_from_slice(&raw[0..8]);
        days.copy_from_slice(&raw[8..12]);
        months.copy_from_slice(&raw[12..16]);
        Ok(PgInterval {
            microseconds: i64::from_be_bytes(micros),
            days: i32::from_be_bytes(days),
            months: i32::from_be_bytes(months),
        })
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;
const NUMERIC_DIGIT_BASE_WIDTH: usize = 4;

/// A PostgreSQL `numeric` in the text form the server prints
///
/// Covers what [`Decimal`] cannot hold: `NaN`, `Infinity`, `-Infinity` and
/// values beyond 28 significant digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgNumeric(pub String);

impl PgNumeric {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lossy float form, used for numeric arrays
    pub fn to_f64(&self) -> Option<f64> {
        self.0.parse().ok()
    }
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        if raw.len() < 8 {
            return Err(format!("invalid numeric length {}", raw.len()).into());
        }
        let word = |at: usize| u16::from_be_bytes([raw[at], raw[at + 1]]);
        let ndigits = usize::from(word(0));
        let weight = i32::from(word(2) as i16);
        let sign = word(4);
        let dscale = usize::from(word(6));

        match sign {
            NUMERIC_NAN => return Ok(PgNumeric("NaN".to_string())),
            NUMERIC_PINF => return Ok(PgNumeric("Infinity".to_string())),
            NUMERIC_NINF => return Ok(PgNumeric("-Infinity".to_string())),
            NUMERIC_POS | NUMERIC_NEG => {}
            other => return Err(format!("invalid numeric sign 0x{:04x}", other).into()),
        }
        if raw.len() != 8 + ndigits * 2 {
            return Err(format!(
                "numeric with {} digit group(s) has length {}",
                ndigits,
                raw.len()
            )
            .into());
        }

        // base-10000 digit groups, the first one worth 10000^weight
        let digits: Vec<u16> = raw[8..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        let group = |pos: i32| -> u16 {
            usize::try_from(pos)
                .ok()
                .and_then(|p| digits.get(p).copied())
                .unwrap_or(0)
        };

        let mut text = String::new();
        if sign == NUMERIC_NEG {
            text.push('-');
        }
        if weight < 0 {
            text.push('0');
        } else {
            text.push_str(&group(0).to_string());
            for pos in 1..=weight {
                text.push_str(&format!("{:04}", group(pos)));
            }
        }
        if dscale > 0 {
            let mut fraction = String::with_capacity(dscale + NUMERIC_DIGIT_BASE_WIDTH);
            let mut pos = weight + 1;
            while fraction.len() < dscale {
                fraction.push_str(&format!("{:04}", group(pos)));
                pos += 1;
            }
            fraction.truncate(dscale);
            text.push('.');
            text.push_str(&fraction);
        }
        Ok(PgNumeric(text))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}
