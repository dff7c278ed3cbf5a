//! Schema validation for the raw policy file.

use crate::config::PipelineConfig;
use crate::error::{AnalysisError, Result};
use crate::utils::{has_column, is_missing, parse_numeric_string, string_values};
use polars::prelude::*;
use tracing::debug;

/// Confirm the required columns exist and the numeric ones hold numbers.
///
/// Runs before anything is written, so a failure leaves no output files.
pub fn validate_schema(df: &DataFrame, config: &PipelineConfig) -> Result<()> {
    let missing: Vec<String> = config
        .required_columns()
        .into_iter()
        .filter(|col| !has_column(df, col))
        .collect();

    if !missing.is_empty() {
        return Err(AnalysisError::missing_columns(missing));
    }

    for col in config.required_numeric_columns() {
        let values = string_values(df, &col)?;
        let present = values.iter().filter(|v| !is_missing(v.as_deref())).count();
        let numeric = values
            .iter()
            .flatten()
            .filter(|v| parse_numeric_string(v).is_some())
            .count();

        if present > 0 && numeric == 0 {
            return Err(AnalysisError::Schema {
                reason: format!(
                    "column '{}' must be numeric but none of its {} values parse as numbers",
                    col, present
                ),
                missing_columns: Vec::new(),
            });
        }
    }

    debug!("Schema validated: {} columns", df.width());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_frame() -> DataFrame {
        df![
            "customer_id" => ["C1"],
            "product_type" => ["Term"],
            "tenure_months" => ["12"],
            "payment_frequency" => ["Monthly"],
            "churned" => ["False"],
            "premium" => ["100"],
            "coverage_amount" => ["50000"],
        ]
        .unwrap()
    }

    #[test]
    fn test_valid_schema() {
        assert!(validate_schema(&valid_frame(), &PipelineConfig::default()).is_ok());
    }

    #[test]
    fn test_missing_required_column() {
        let df = valid_frame().drop("churned").unwrap();
        let err = validate_schema(&df, &PipelineConfig::default()).unwrap_err();

        match err {
            AnalysisError::Schema { missing_columns, .. } => {
                assert_eq!(missing_columns, vec!["churned".to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_required_column() {
        let mut df = valid_frame();
        df.replace("premium", Series::new("premium".into(), ["expensive"]))
            .unwrap();
        let err = validate_schema(&df, &PipelineConfig::default()).unwrap_err();
        assert!(err.is_schema_error());
        assert!(err.to_string().contains("premium"));
    }

    #[test]
    fn test_empty_frame_reports_every_required_column() {
        let err = validate_schema(&DataFrame::empty(), &PipelineConfig::default()).unwrap_err();
        match err {
            AnalysisError::Schema { missing_columns, .. } => assert_eq!(missing_columns.len(), 7),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
