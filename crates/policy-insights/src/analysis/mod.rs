//! Exploratory analysis of the standardized dataset.
//!
//! Works on text or typed columns alike, so it can run on the in-memory
//! frame or on a standardized CSV read back from disk.

mod churn;
mod derive;
mod price;
mod report;

pub use churn::{churn_flags, feature_breakdown, group_churn, tenure_bucket_label, tenure_buckets};
pub use derive::{
    AGE_GROUP, PRICE_PER_COVERAGE, TENURE_GROUP, add_derived_columns, age_group,
    price_per_coverage, tenure_group,
};
pub use price::{PriceSample, group_ratios, summarize};
pub use report::{render_churn_report, render_group_table, render_price_table};

use crate::config::PipelineConfig;
use crate::types::AnalysisSummary;
use crate::utils::{has_column, string_values};
use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Statistics plus the raw samples the charts are drawn from.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub summary: AnalysisSummary,
    pub price_samples: Vec<PriceSample>,
}

/// Compute churn breakdowns, tenure buckets and price-per-coverage.
pub fn analyze(df: DataFrame, config: &PipelineConfig) -> Result<Analysis> {
    let cols = &config.columns;
    let df = add_derived_columns(df, config)?;
    let churn = churn_flags(&df, &cols.churn)?;

    let policies = churn.iter().filter(|f| f.is_some()).count();
    let churned = churn.iter().filter(|f| **f == Some(true)).count();
    let overall_churn_rate = if policies == 0 {
        0.0
    } else {
        churned as f64 / policies as f64
    };
    info!(
        "Analyzing {} policies ({} churned, {:.1}%)",
        policies,
        churned,
        overall_churn_rate * 100.0
    );

    let breakdowns = config
        .churn_features()
        .map(|feature| feature_breakdown(&df, feature, &churn))
        .collect::<Result<Vec<_>>>()?;
    for breakdown in breakdowns.iter().filter(|b| b.is_empty()) {
        debug!("No data for churn feature '{}'", breakdown.feature);
    }

    let tenure = derive::numeric_column(&df, &cols.tenure)?.unwrap_or_default();
    let tenure_buckets = tenure_buckets(&tenure, &churn, config.tenure_bin_months);

    let grouped = |column: &str| -> Result<_> {
        if has_column(&df, column) {
            Ok(group_churn(&string_values(&df, column)?, &churn))
        } else {
            Ok(Vec::new())
        }
    };
    let payment_frequency = grouped(&cols.payment_frequency)?;
    let acquisition_channel = grouped(&cols.acquisition_channel)?;

    let price_samples = match (
        has_column(&df, &cols.product_type),
        derive::numeric_column(&df, PRICE_PER_COVERAGE)?,
    ) {
        (true, Some(ratios)) => group_ratios(
            &string_values(&df, &cols.product_type)?,
            &ratios,
            &config.product_type_order,
        ),
        _ => Vec::new(),
    };
    let price_per_coverage = price_samples.iter().filter_map(summarize).collect();

    Ok(Analysis {
        summary: AnalysisSummary {
            policies,
            churned,
            overall_churn_rate,
            breakdowns,
            tenure_buckets,
            payment_frequency,
            acquisition_channel,
            price_per_coverage,
            charts: Vec::new(),
        },
        price_samples,
    })
}
