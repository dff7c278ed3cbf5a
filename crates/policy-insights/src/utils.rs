//! Shared utilities for the policy analysis pipeline.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::cmp::Ordering;

// =============================================================================
// Column Access Utilities
// =============================================================================

/// Read a column as owned optional strings, casting non-string columns.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series();
    let series = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(String::from))
        .collect())
}

/// Whether the DataFrame has a column with this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Column names as owned strings, in file order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

/// Keep the rows whose mask entry is true.
pub fn filter_rows(df: &DataFrame, keep: Vec<bool>) -> PolarsResult<DataFrame> {
    let mask = Series::new("keep".into(), keep);
    df.filter(mask.bool()?)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Common error/missing value markers in data.
pub const ERROR_MARKERS: [&str; 9] = [
    "error", "unknown", "n/a", "na", "nan", "null", "missing", "none", "#n/a",
];

/// Clean a string for numeric parsing by removing formatting characters.
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is an error/missing value marker.
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Whether a cell counts as missing: null or blank.
pub fn is_missing(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => v.trim().is_empty(),
    }
}

/// Try to parse a string as a numeric value (f64).
///
/// Handles common formatting like currency symbols and thousands separators.
/// Blank cells and error markers yield `None`.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    if is_error_marker(s) {
        return None;
    }
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Common boolean true representations.
pub const BOOLEAN_TRUE_VALUES: [&str; 5] = ["true", "yes", "1", "t", "y"];

/// Common boolean false representations.
pub const BOOLEAN_FALSE_VALUES: [&str; 5] = ["false", "no", "0", "f", "n"];

/// Check if a string represents a boolean true value.
pub fn is_boolean_true(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    BOOLEAN_TRUE_VALUES.iter().any(|&v| v == lower) || lower == "1.0"
}

/// Check if a string represents a boolean false value.
pub fn is_boolean_false(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    BOOLEAN_FALSE_VALUES.iter().any(|&v| v == lower) || lower == "0.0"
}

/// Parse a flag cell. `None` for blanks and anything unrecognized.
pub fn parse_flag(s: &str) -> Option<bool> {
    if is_boolean_true(s) {
        Some(true)
    } else if is_boolean_false(s) {
        Some(false)
    } else {
        None
    }
}

/// Parse a date or datetime cell into a date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.date())
}

// =============================================================================
// Spelling Utilities
// =============================================================================

/// Trim and collapse runs of whitespace to a single space.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key under which spelling variants of the same value are grouped.
pub fn spelling_key(s: &str) -> String {
    normalize_whitespace(s).to_lowercase()
}

/// Whether every word (split on spaces and hyphens) starts upper-case and
/// continues lower-case, e.g. "Semi-Annual", "United Kingdom".
pub fn is_title_case(s: &str) -> bool {
    let mut saw_letter = false;
    let mut word_start = true;
    for c in s.chars() {
        if c.is_whitespace() || c == '-' {
            word_start = true;
            continue;
        }
        if c.is_alphabetic() {
            saw_letter = true;
            let ok = if word_start { c.is_uppercase() } else { c.is_lowercase() };
            if !ok {
                return false;
            }
        }
        word_start = false;
    }
    saw_letter
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Linear-interpolated quantile of already sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sort floats ascending (NaN-free input).
pub fn sorted_floats(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values
}

/// Order two group labels, numerically when both parse as numbers.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

// =============================================================================
// Formatting Utilities
// =============================================================================

/// Format an integer with thousands separators ("12,345").
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Percentage of `part` in `whole`; zero when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Truncate a string to max characters with ellipsis.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_numeric_string() {
        assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
        assert_eq!(clean_numeric_string("  42%  "), "42");
        assert_eq!(clean_numeric_string("€100"), "100");
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string("$1,234.56"), Some(1234.56));
        assert_eq!(parse_numeric_string("-100"), Some(-100.0));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("N/A"), None);
        assert_eq!(parse_numeric_string("hello"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("FALSE"), Some(false));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("0.0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_flag(""), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2021-03-04"),
            NaiveDate::from_ymd_opt(2021, 3, 4)
        );
        assert_eq!(
            parse_date("2021-03-04 10:00:00"),
            NaiveDate::from_ymd_opt(2021, 3, 4)
        );
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_spelling_helpers() {
        assert_eq!(normalize_whitespace("  semi   annual "), "semi annual");
        assert_eq!(spelling_key(" MONTHLY "), "monthly");
        assert!(is_title_case("Monthly"));
        assert!(is_title_case("Semi-Annual"));
        assert!(is_title_case("United Kingdom"));
        assert!(!is_title_case("MONTHLY"));
        assert!(!is_title_case("monthly"));
        assert!(!is_title_case("123"));
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_compare_labels_numeric_aware() {
        assert_eq!(compare_labels("2", "10"), Ordering::Less);
        assert_eq!(compare_labels("Annual", "Monthly"), Ordering::Less);
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_filter_rows() {
        let df = df![
            "customer_id" => ["C1", "C2", "C3"],
        ]
        .unwrap();
        let filtered = filter_rows(&df, vec![true, false, true]).unwrap();
        assert_eq!(filtered.height(), 2);
        assert_eq!(
            string_values(&filtered, "customer_id").unwrap(),
            vec![Some("C1".to_string()), Some("C3".to_string())]
        );
    }

    #[test]
    fn test_string_values_casts_numbers() {
        let df = df![
            "tenure_months" => [12i64, 24],
        ]
        .unwrap();
        assert_eq!(
            string_values(&df, "tenure_months").unwrap(),
            vec![Some("12".to_string()), Some("24".to_string())]
        );
    }
}
