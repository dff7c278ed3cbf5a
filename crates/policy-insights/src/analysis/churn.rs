//! Churn rate grouping.

use crate::config::ChurnFeature;
use crate::types::{ChurnBreakdown, ChurnGroup};
use crate::utils::{compare_labels, has_column, parse_flag, string_values};
use anyhow::Result;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Churn flag per row; unparseable cells are `None`.
pub fn churn_flags(df: &DataFrame, column: &str) -> Result<Vec<Option<bool>>> {
    Ok(string_values(df, column)?
        .iter()
        .map(|v| v.as_deref().and_then(parse_flag))
        .collect())
}

/// Group rows by value and count churn per group.
///
/// Rows with a missing value or missing churn flag are left out, so no group
/// is ever empty. Groups come back sorted by churn rate, highest first, with
/// ties ordered by value.
pub fn group_churn(values: &[Option<String>], churn: &[Option<bool>]) -> Vec<ChurnGroup> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (value, flag) in values.iter().zip(churn) {
        let (Some(value), Some(flag)) = (value.as_deref(), flag) else {
            continue;
        };
        let entry = counts.entry(value).or_insert((0, 0));
        entry.0 += 1;
        if *flag {
            entry.1 += 1;
        }
    }

    let mut groups: Vec<ChurnGroup> = counts
        .into_iter()
        .map(|(value, (total, churned))| ChurnGroup {
            value: value.to_string(),
            total,
            churned,
        })
        .collect();
    sort_by_rate(&mut groups);
    groups
}

/// Highest churn rate first; ties by value, numerically when possible.
pub fn sort_by_rate(groups: &mut [ChurnGroup]) {
    groups.sort_by(|a, b| {
        // Compare churned_a / total_a against churned_b / total_b exactly
        let lhs = b.churned * a.total;
        let rhs = a.churned * b.total;
        lhs.cmp(&rhs)
            .then_with(|| compare_labels(&a.value, &b.value))
    });
}

/// Churn breakdown for one configured feature. A feature whose column is
/// absent yields an empty breakdown.
pub fn feature_breakdown(
    df: &DataFrame,
    feature: &ChurnFeature,
    churn: &[Option<bool>],
) -> Result<ChurnBreakdown> {
    let groups = if has_column(df, &feature.column) {
        group_churn(&string_values(df, &feature.column)?, churn)
    } else {
        Vec::new()
    };

    Ok(ChurnBreakdown {
        feature: feature.column.clone(),
        title: feature.title.clone(),
        groups,
    })
}

/// Label of a tenure bucket starting at `start` months.
pub fn tenure_bucket_label(start: u64, width: u64) -> String {
    let end = start.saturating_add(width);
    if width % 12 == 0 {
        format!("{}-{}yr", start / 12, end / 12)
    } else {
        format!("{}-{}mo", start, end)
    }
}

/// Churn per fixed-width tenure bucket, in tenure order. Empty buckets are
/// omitted.
pub fn tenure_buckets(
    tenure: &[Option<f64>],
    churn: &[Option<bool>],
    width_months: u32,
) -> Vec<ChurnGroup> {
    let width = u64::from(width_months.max(1));
    let mut buckets: BTreeMap<u64, (usize, usize)> = BTreeMap::new();

    for (months, flag) in tenure.iter().zip(churn) {
        let (Some(months), Some(flag)) = (months, flag) else {
            continue;
        };
        if !months.is_finite() || *months < 0.0 {
            continue;
        }
        let start = ((*months / width as f64).floor() as u64).saturating_mul(width);
        let entry = buckets.entry(start).or_insert((0, 0));
        entry.0 += 1;
        if *flag {
            entry.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(start, (total, churned))| ChurnGroup {
            value: tenure_bucket_label(start, width),
            total,
            churned,
        })
        .collect()
}
