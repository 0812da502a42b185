//! Unit tests for wire-level decoding of server values
//!
//! Tests cover:
//! - `numeric` text form, including NaN, infinities and values beyond `Decimal`
//! - Infinite dates and timestamps
//! - Malformed bytes staying decode errors

use pgtester::pgtester::pg::{decode_unrepresentable, CellValue, PgNumeric};
use rust_decimal::Decimal;
use tokio_postgres::types::{FromSql, Type};

/// Binary `numeric`: header words followed by base-10000 digit groups
fn numeric(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.extend_from_slice(&(digits.len() as u16).to_be_bytes());
    raw.extend_from_slice(&weight.to_be_bytes());
    raw.extend_from_slice(&sign.to_be_bytes());
    raw.extend_from_slice(&dscale.to_be_bytes());
    for digit in digits {
        raw.extend_from_slice(&digit.to_be_bytes());
    }
    raw
}

fn numeric_text(raw: &[u8]) -> String {
    PgNumeric::from_sql(&Type::NUMERIC, raw).unwrap().0
}

fn text(value: &str) -> Option<CellValue> {
    Some(CellValue::Text(value.to_string()))
}

// =============================================================================
// numeric
// =============================================================================

#[test]
fn test_numeric_text_form() {
    assert_eq!(numeric_text(&numeric(0, 0x0000, 2, &[12, 5000])), "12.50");
    assert_eq!(numeric_text(&numeric(0, 0x4000, 0, &[7])), "-7");
    assert_eq!(numeric_text(&numeric(-1, 0x0000, 2, &[500])), "0.05");
    assert_eq!(numeric_text(&numeric(-2, 0x0000, 5, &[1000])), "0.00001");
    assert_eq!(numeric_text(&numeric(1, 0x0000, 0, &[1, 0])), "10000");
    assert_eq!(numeric_text(&numeric(0, 0x0000, 3, &[])), "0.000");
}

#[test]
fn test_numeric_special_values() {
    assert_eq!(numeric_text(&numeric(0, 0xC000, 0, &[])), "NaN");
    assert_eq!(numeric_text(&numeric(0, 0xD000, 0, &[])), "Infinity");
    assert_eq!(numeric_text(&numeric(0, 0xF000, 0, &[])), "-Infinity");
}

#[test]
fn test_numeric_beyond_decimal_range_falls_back_to_text() {
    // 10^40
    let raw = numeric(10, 0x0000, 0, &[1]);
    let expected = format!("1{}", "0".repeat(40));

    assert!(Decimal::from_sql(&Type::NUMERIC, &raw).is_err());
    assert_eq!(decode_unrepresentable(&Type::NUMERIC, &raw), text(&expected));
}

#[test]
fn test_numeric_nan_falls_back_to_text() {
    let raw = numeric(0, 0xC000, 0, &[]);
    assert!(Decimal::from_sql(&Type::NUMERIC, &raw).is_err());
    assert_eq!(decode_unrepresentable(&Type::NUMERIC, &raw), text("NaN"));
}

#[test]
fn test_numeric_array_elements_become_floats() {
    assert_eq!(PgNumeric("12.50".to_string()).to_f64(), Some(12.5));
    assert!(PgNumeric("NaN".to_string()).to_f64().unwrap().is_nan());
    assert_eq!(PgNumeric("-Infinity".to_string()).to_f64(), Some(f64::NEG_INFINITY));
}

#[test]
fn test_malformed_numeric_is_not_recovered() {
    assert_eq!(decode_unrepresentable(&Type::NUMERIC, &[0, 1]), None);
    // declares two digit groups but carries one
    let mut short = numeric(0, 0x0000, 0, &[1, 2]);
    short.truncate(10);
    assert_eq!(decode_unrepresentable(&Type::NUMERIC, &short), None);
    assert_eq!(decode_unrepresentable(&Type::NUMERIC, &numeric(0, 0x1234, 0, &[])), None);
}

// =============================================================================
// Dates and timestamps
// =============================================================================

#[test]
fn test_infinite_timestamps() {
    for ty in [Type::TIMESTAMP, Type::TIMESTAMPTZ] {
        assert_eq!(decode_unrepresentable(&ty, &i64::MAX.to_be_bytes()), text("infinity"));
        assert_eq!(decode_unrepresentable(&ty, &i64::MIN.to_be_bytes()), text("-infinity"));
    }
}

#[test]
fn test_infinite_dates() {
    assert_eq!(decode_unrepresentable(&Type::DATE, &i32::MAX.to_be_bytes()), text("infinity"));
    assert_eq!(decode_unrepresentable(&Type::DATE, &i32::MIN.to_be_bytes()), text("-infinity"));
}

#[test]
fn test_finite_out_of_range_date_is_unknown() {
    let raw = (i32::MAX - 1).to_be_bytes();
    assert_eq!(
        decode_unrepresentable(&Type::DATE, &raw),
        Some(CellValue::Unknown("date".to_string()))
    );
}

#[test]
fn test_wrong_width_is_not_recovered() {
    assert_eq!(decode_unrepresentable(&Type::TIMESTAMP, &[0, 0, 0, 1]), None);
    assert_eq!(decode_unrepresentable(&Type::DATE, &i64::MAX.to_be_bytes()), None);
    assert_eq!(decode_unrepresentable(&Type::INT4, &1i32.to_be_bytes()), None);
}
