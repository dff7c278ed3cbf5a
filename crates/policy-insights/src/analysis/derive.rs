//! Derived columns used by the churn breakdown and the price chart.

use crate::config::PipelineConfig;
use crate::utils::{has_column, parse_numeric_string, string_values};
use anyhow::Result;
use polars::prelude::*;

pub const AGE_GROUP: &str = "age_group";
pub const TENURE_GROUP: &str = "tenure_group";
pub const PRICE_PER_COVERAGE: &str = "price_per_coverage";

/// Upper bounds (inclusive) of the age bands; the lower edge is 17 exclusive.
const AGE_BANDS: [(f64, &str); 6] = [
    (30.0, "18-30"),
    (40.0, "31-40"),
    (50.0, "41-50"),
    (60.0, "51-60"),
    (70.0, "61-70"),
    (120.0, "71+"),
];

/// Upper bounds (exclusive) of the tenure bands in months.
const TENURE_BANDS: [(f64, &str); 11] = [
    (12.0, "0-1yr"),
    (24.0, "1-2yr"),
    (36.0, "2-3yr"),
    (48.0, "3-4yr"),
    (60.0, "4-5yr"),
    (72.0, "5-6yr"),
    (84.0, "6-7yr"),
    (96.0, "7-8yr"),
    (108.0, "8-9yr"),
    (120.0, "9-10yr"),
    (9999.0, "10yr+"),
];

/// Age band for an age in years; `None` outside (17, 120].
pub fn age_group(age: f64) -> Option<&'static str> {
    if age <= 17.0 {
        return None;
    }
    AGE_BANDS
        .iter()
        .find(|(upper, _)| age <= *upper)
        .map(|(_, label)| *label)
}

/// Tenure band for a tenure in months; `None` outside [0, 9999).
pub fn tenure_group(months: f64) -> Option<&'static str> {
    if months < 0.0 {
        return None;
    }
    TENURE_BANDS
        .iter()
        .find(|(upper, _)| months < *upper)
        .map(|(_, label)| *label)
}

/// Premium per unit of coverage, scaled by 1000. `None` for zero coverage.
pub fn price_per_coverage(premium: f64, coverage: f64) -> Option<f64> {
    if coverage > 0.0 {
        Some(premium / coverage * 1000.0)
    } else {
        None
    }
}

/// Numeric view of a column, or `None` when the column is absent.
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>> {
    if !has_column(df, name) {
        return Ok(None);
    }
    Ok(Some(
        string_values(df, name)?
            .iter()
            .map(|v| v.as_deref().and_then(parse_numeric_string))
            .collect(),
    ))
}

/// Append `age_group`, `tenure_group` and `price_per_coverage`.
pub fn add_derived_columns(df: DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    let mut df = df;
    let cols = &config.columns;

    if let Some(ages) = numeric_column(&df, &cols.age)? {
        let groups: Vec<Option<&str>> = ages.iter().map(|a| a.and_then(age_group)).collect();
        df.with_column(Series::new(AGE_GROUP.into(), groups))?;
    }

    if let Some(tenure) = numeric_column(&df, &cols.tenure)? {
        let groups: Vec<Option<&str>> = tenure.iter().map(|t| t.and_then(tenure_group)).collect();
        df.with_column(Series::new(TENURE_GROUP.into(), groups))?;
    }

    if let (Some(premium), Some(coverage)) = (
        numeric_column(&df, &cols.premium)?,
        numeric_column(&df, &cols.coverage)?,
    ) {
        let ratio: Vec<Option<f64>> = premium
            .iter()
            .zip(&coverage)
            .map(|(p, c)| match (p, c) {
                (Some(p), Some(c)) => price_per_coverage(*p, *c),
                _ => None,
            })
            .collect();
        df.with_column(Series::new(PRICE_PER_COVERAGE.into(), ratio))?;
    }

    Ok(df)
}
