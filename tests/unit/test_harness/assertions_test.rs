//! Unit tests for row and row set comparison
//!
//! Tests cover:
//! - Reflexivity and key-order independence
//! - Column count and column name mismatches
//! - Regex alternation, literal fallback, explicit modes
//! - Row count and positional mismatches

use pgtester::pgtester::pg::{Row, RowSet};
use pgtester::pgtester::test_harness::assertions::{compare_row, compare_row_set};
use pgtester::pgtester::test_harness::spec::{ExpectedRow, ExpectedRowSet, ExpectedValue};
use pgtester::pgtester::test_harness::ComparisonOutcome;

fn expect(pairs: &[(&str, &str)]) -> ExpectedRow {
    pairs
        .iter()
        .fold(ExpectedRow::new(), |row, (k, v)| row.with(*k, ExpectedValue::auto(*v)))
}

fn sample_sets() -> Vec<RowSet> {
    vec![
        RowSet::new(),
        vec![Row::new().with("total", "3")].into(),
        vec![
            Row::new().with("id", "1").with("name", "a|b"),
            Row::new().with("id", "2").with("name", "(unbalanced"),
            Row::new().with("id", "3").with("name", "[1.000000,nil]"),
        ]
        .into(),
        vec![Row::new().with("price", "1.500000").with("tags", "nil")].into(),
    ]
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_row_set_comparison_is_reflexive() {
    for set in sample_sets() {
        let expected = ExpectedRowSet::from_observed(&set);
        assert_eq!(
            compare_row_set(&set, &expected),
            ComparisonOutcome::Match,
            "{}",
            set
        );
    }
}

#[test]
fn test_row_comparison_ignores_key_order() {
    let observed = Row::new().with("b", "2").with("a", "1").with("c", "x");
    let expected = ExpectedRow::new()
        .with("c", ExpectedValue::auto("x"))
        .with("a", ExpectedValue::auto("1"))
        .with("b", ExpectedValue::auto("2"));
    assert!(compare_row(&observed, &expected).is_match());
}

// =============================================================================
// Row comparison
// =============================================================================

#[test]
fn test_count_query_scenario() {
    let observed = Row::new().with("total", "3");
    assert!(compare_row(&observed, &expect(&[("total", "3")])).is_match());
}

#[test]
fn test_alternation_scenario() {
    let expected = expect(&[("n", "3|4")]);
    assert!(compare_row(&Row::new().with("n", "4"), &expected).is_match());

    let outcome = compare_row(&Row::new().with("n", "5"), &expected);
    assert_eq!(
        outcome.reason(),
        Some("column 'n' value ('5') does not match with regular expression ('3|4')")
    );
}

#[test]
fn test_column_count_mismatch_names_both_sets() {
    let observed = Row::new().with("a", "1").with("b", "2");
    let outcome = compare_row(&observed, &expect(&[("a", "1")]));
    let reason = outcome.reason().unwrap();
    assert!(reason.contains("column count differs"));
    assert!(reason.contains("[a, b]"));
    assert!(reason.contains("[a]"));
}

#[test]
fn test_missing_column() {
    let observed = Row::new().with("a", "1");
    let outcome = compare_row(&observed, &expect(&[("b", "1")]));
    assert_eq!(outcome.reason(), Some("column 'a' not in compared row"));
}

#[test]
fn test_uncompilable_expected_value_compares_literally() {
    let expected = expect(&[("f", "max(")]);
    assert!(compare_row(&Row::new().with("f", "max("), &expected).is_match());

    let outcome = compare_row(&Row::new().with("f", "max"), &expected);
    assert_eq!(
        outcome.reason(),
        Some("column 'f' differs between row ('max') and compared row ('max(')")
    );
}

#[test]
fn test_explicit_modes() {
    let literal = ExpectedRow::new().with("v", ExpectedValue::literal("a.c"));
    assert!(compare_row(&Row::new().with("v", "a.c"), &literal).is_match());
    assert!(!compare_row(&Row::new().with("v", "abc"), &literal).is_match());

    let pattern = ExpectedRow::new().with("v", ExpectedValue::pattern("a.c").unwrap());
    assert!(compare_row(&Row::new().with("v", "abc"), &pattern).is_match());
}

// =============================================================================
// Row set comparison
// =============================================================================

#[test]
fn test_row_count_mismatch_shows_both_sets() {
    let observed: RowSet = vec![Row::new().with("n", "1"), Row::new().with("n", "2")].into();
    let expected: ExpectedRowSet = vec![expect(&[("n", "1")])].into();
    let outcome = compare_row_set(&observed, &expected);
    let reason = outcome.reason().unwrap();
    assert!(reason.starts_with("different result count"));
    assert!(reason.contains("[ { 'n': '1' }, { 'n': '2' } ]"));
    assert!(reason.contains("[ { 'n': '1' } ]"));
}

#[test]
fn test_first_mismatching_row_is_reported() {
    let observed: RowSet = vec![
        Row::new().with("n", "1"),
        Row::new().with("n", "9"),
        Row::new().with("n", "8"),
    ]
    .into();
    let expected: ExpectedRowSet = vec![
        expect(&[("n", "1")]),
        expect(&[("n", "2")]),
        expect(&[("n", "3")]),
    ]
    .into();
    let reason = compare_row_set(&observed, &expected).reason().unwrap().to_string();
    assert!(reason.starts_with("different result at row 1:"), "{}", reason);
}

#[test]
fn test_rows_are_compared_by_position() {
    let observed: RowSet = vec![Row::new().with("n", "2"), Row::new().with("n", "1")].into();
    let expected: ExpectedRowSet = vec![expect(&[("n", "1")]), expect(&[("n", "2")])].into();
    assert!(!compare_row_set(&observed, &expected).is_match());
}
