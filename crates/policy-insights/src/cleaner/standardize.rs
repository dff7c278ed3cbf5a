//! Column-level standardization: numbers, flags, and categorical spellings.

use crate::utils::{
    is_title_case, normalize_whitespace, parse_flag, parse_numeric_string, spelling_key,
};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Map each spelling key of a categorical column to its canonical spelling.
///
/// A configured allowed value wins when it matches case-insensitively.
/// Otherwise a Title-Case variant is preferred, then the most frequent
/// variant, with ties going to the lexicographically smallest.
pub fn canonical_spellings(
    values: &[Option<String>],
    allowed: Option<&[String]>,
) -> HashMap<String, String> {
    let mut variants: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for value in values.iter().flatten() {
        let normalized = normalize_whitespace(value);
        if normalized.is_empty() {
            continue;
        }
        *variants
            .entry(normalized.to_lowercase())
            .or_default()
            .entry(normalized)
            .or_insert(0) += 1;
    }

    variants
        .into_iter()
        .map(|(key, spellings)| {
            let canonical = pick_canonical(&key, &spellings, allowed);
            (key, canonical)
        })
        .collect()
}

fn pick_canonical(
    key: &str,
    spellings: &BTreeMap<String, usize>,
    allowed: Option<&[String]>,
) -> String {
    if let Some(value) = allowed
        .unwrap_or_default()
        .iter()
        .find(|a| spelling_key(a) == key)
    {
        return value.clone();
    }

    if let Some(title) = spellings.keys().find(|s| is_title_case(s)) {
        return title.clone();
    }

    let mut best: Option<(&String, usize)> = None;
    for (spelling, count) in spellings {
        if best.is_none_or(|(_, top)| *count > top) {
            best = Some((spelling, *count));
        }
    }
    best.map(|(s, _)| s.clone())
        .unwrap_or_else(|| key.to_string())
}

/// Rewrite a categorical column to canonical spellings. Missing cells stay
/// `None`. Returns the values and the number of cells rewritten.
pub fn standardize_categorical(
    values: &[Option<String>],
    allowed: Option<&[String]>,
) -> (Vec<Option<String>>, usize) {
    let canonical = canonical_spellings(values, allowed);
    let mut fixes = 0;

    let standardized = values
        .iter()
        .map(|value| {
            let value = value.as_deref()?;
            let key = spelling_key(value);
            let target = canonical.get(&key)?;
            if target != value {
                fixes += 1;
            }
            Some(target.clone())
        })
        .collect();

    (standardized, fixes)
}

/// Parse every cell of a numeric column; unparseable cells become `None`.
pub fn parse_numbers(values: &[Option<String>]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| v.as_deref().and_then(parse_numeric_string))
        .collect()
}

/// Parse every cell of a flag column; unrecognized cells become `None`.
pub fn parse_flags(values: &[Option<String>]) -> Vec<Option<bool>> {
    values
        .iter()
        .map(|v| v.as_deref().and_then(parse_flag))
        .collect()
}

/// Build an Int64 series when every value is integral, Float64 otherwise.
pub fn numeric_series(name: &str, values: &[Option<f64>]) -> Series {
    let integral = values
        .iter()
        .flatten()
        .all(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64);

    if integral {
        let ints: Vec<Option<i64>> = values.iter().map(|v| v.map(|x| x as i64)).collect();
        Series::new(name.into(), ints)
    } else {
        Series::new(name.into(), values.to_vec())
    }
}
