//! Data cleaning module for standardizing the policy dataset.
//!
//! This module provides functionality for:
//! - Trimming text and turning blank cells into nulls
//! - Dropping rows without a churn flag, customer id, or usable required numbers
//! - Typing numeric and flag columns
//! - Canonicalizing categorical spellings and filling missing ones
//! - Resolving per-customer demographics and collapsing repeated customers

mod demographics;
mod sanitizers;
mod standardize;

pub use demographics::{CONFLICT_LABEL, Resolved, resolve, resolve_by_customer};
pub use standardize::canonical_spellings;

use crate::config::PipelineConfig;
use crate::error::{AnalysisError, Result};
use crate::types::{AnomalyCategory, AnomalyWarning, CleaningSummary, ReportSection};
use crate::utils::{filter_rows, format_thousands, has_column, string_values};
use polars::prelude::*;
use standardize::{numeric_series, parse_flags, parse_numbers, standardize_categorical};
use std::collections::HashSet;
use tracing::{debug, info};

/// Output of the cleaning stage.
#[derive(Debug, Clone)]
pub struct CleanedData {
    pub data: DataFrame,
    pub summary: CleaningSummary,
    /// Findings that only show up while cleaning (demographic conflicts).
    pub warnings: Vec<AnomalyWarning>,
}

/// Data cleaner for the policy dataset.
pub struct DataCleaner<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DataCleaner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Standardize a schema-validated raw dataset.
    ///
    /// This includes:
    /// 1. Sanitizing text cells
    /// 2. Canonicalizing categorical spellings
    /// 3. Resolving gender and country per customer over every raw row
    /// 4. Dropping rows that cannot be analyzed
    /// 5. Typing numeric and flag columns
    /// 6. Filling missing categoricals with the unknown label
    /// 7. Keeping the first row of every customer
    pub fn clean(&self, df: DataFrame) -> Result<CleanedData> {
        let mut summary = CleaningSummary {
            rows_before: df.height(),
            columns_before: df.width(),
            ..CleaningSummary::default()
        };
        let mut warnings = Vec::new();

        info!("Cleaning {} rows...", format_thousands(df.height()));

        let (df, sanitized) = sanitizers::sanitize_text_columns(df)
            .map_err(|e| AnalysisError::from_anyhow(e, "Sanitizing text cells"))?;
        if sanitized > 0 {
            summary.actions.push(format!(
                "Trimmed whitespace or quotes in {} cells",
                format_thousands(sanitized)
            ));
        }

        // Demographics are resolved before any row is dropped, so a dropped
        // row still counts toward its customer's gender and country.
        let df = self.standardize_categoricals(df, &mut summary)?;
        let df = self.resolve_demographics(df)?;
        let df = self.drop_unusable_rows(df, &mut summary)?;
        let df = self.type_columns(df)?;
        let df = self.fill_unknown(df, &mut summary)?;
        let df = self.dedupe_customers(df, &mut summary)?;
        self.record_conflicts(&df, &mut summary, &mut warnings)?;

        summary.rows_after = df.height();
        summary.columns_after = df.width();
        summary.customers = df.height();

        info!(
            "Cleaning complete: {} -> {} rows, {} customers",
            summary.rows_before, summary.rows_after, summary.customers
        );

        Ok(CleanedData {
            data: df,
            summary,
            warnings,
        })
    }

    fn drop_unusable_rows(&self, df: DataFrame, summary: &mut CleaningSummary) -> Result<DataFrame> {
        let cols = &self.config.columns;
        let height = df.height();

        let churn = parse_flags(&string_values(&df, &cols.churn)?);
        if height > 0 && churn.iter().all(Option::is_none) {
            return Err(AnalysisError::DataIntegrity(format!(
                "no row has a usable '{}' flag",
                cols.churn
            )));
        }

        let ids = string_values(&df, &cols.customer_id)?;
        let numbers = self
            .config
            .required_numeric_columns()
            .iter()
            .map(|col| Ok(parse_numbers(&string_values(&df, col)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut keep = vec![true; height];
        for (i, keep_row) in keep.iter_mut().enumerate() {
            if churn[i].is_none() {
                summary.rows_missing_churn += 1;
                *keep_row = false;
            } else if ids[i].is_none() {
                summary.rows_missing_customer_id += 1;
                *keep_row = false;
            } else if numbers.iter().any(|col| col[i].is_none()) {
                summary.rows_missing_numeric += 1;
                *keep_row = false;
            } else if numbers.iter().any(|col| col[i].is_some_and(|v| v < 0.0)) {
                summary.rows_negative_numeric += 1;
                *keep_row = false;
            }
        }

        let df = filter_rows(&df, keep)?;
        if height > 0 && df.height() == 0 {
            return Err(AnalysisError::DataIntegrity(format!(
                "all {} rows were dropped for missing or negative {}",
                height,
                self.config.required_numeric_columns().join(" / ")
            )));
        }

        for (count, reason) in [
            (summary.rows_missing_churn, format!("a missing '{}' flag", cols.churn)),
            (summary.rows_missing_customer_id, format!("a blank '{}'", cols.customer_id)),
            (summary.rows_missing_numeric, "missing required numbers".to_string()),
            (summary.rows_negative_numeric, "negative required numbers".to_string()),
        ] {
            if count > 0 {
                summary
                    .actions
                    .push(format!("Dropped {} rows with {}", format_thousands(count), reason));
                debug!("Dropped {} rows with {}", count, reason);
            }
        }

        Ok(df)
    }

    fn type_columns(&self, df: DataFrame) -> Result<DataFrame> {
        let mut df = df;

        for col in self.config.numeric_columns() {
            if !has_column(&df, &col) {
                continue;
            }
            let values = parse_numbers(&string_values(&df, &col)?);
            df.replace(&col, numeric_series(&col, &values))?;
        }

        let mut flag_columns = self.config.boolean_columns.clone();
        if !flag_columns.contains(&self.config.columns.churn) {
            flag_columns.push(self.config.columns.churn.clone());
        }
        for col in &flag_columns {
            if !has_column(&df, col) {
                continue;
            }
            let values = parse_flags(&string_values(&df, col)?);
            df.replace(col, Series::new(col.as_str().into(), values))?;
        }

        debug!("Typed numeric and flag columns");
        Ok(df)
    }

    fn standardize_categoricals(
        &self,
        df: DataFrame,
        summary: &mut CleaningSummary,
    ) -> Result<DataFrame> {
        let mut df = df;

        for col in &self.config.categorical_columns {
            if !has_column(&df, col) {
                continue;
            }
            let allowed = self.config.allowed_values.get(col).map(Vec::as_slice);
            let (values, fixes) = standardize_categorical(&string_values(&df, col)?, allowed);
            if fixes > 0 {
                summary.spelling_fixes += fixes;
                summary.actions.push(format!(
                    "Rewrote {} '{}' values to their canonical spelling",
                    format_thousands(fixes),
                    col
                ));
            }
            df.replace(col, Series::new(col.as_str().into(), values))?;
        }

        Ok(df)
    }

    /// Add `<field>_std` and `<gender|country>_conflict` columns resolved
    /// across all of each customer's rows.
    fn resolve_demographics(&self, df: DataFrame) -> Result<DataFrame> {
        let mut df = df;
        let cols = &self.config.columns;
        let ids = string_values(&df, &cols.customer_id)?;

        for (field, short) in [(&cols.gender, "gender"), (&cols.country, "country")] {
            if !has_column(&df, field) {
                continue;
            }
            let values = string_values(&df, field)?;
            let resolved = resolve_by_customer(&ids, &values);

            let mut standardized = Vec::with_capacity(ids.len());
            let mut conflict = Vec::with_capacity(ids.len());
            for id in &ids {
                let outcome = id.as_deref().and_then(|id| resolved.get(id));
                standardized.push(
                    outcome
                        .map(|r| r.label(&self.config.unknown_label))
                        .unwrap_or(&self.config.unknown_label)
                        .to_string(),
                );
                conflict.push(outcome.is_some_and(Resolved::is_conflict));
            }

            let std_name = format!("{}_std", field);
            let conflict_name = format!("{}_conflict", short);
            df.with_column(Series::new(std_name.as_str().into(), standardized))?;
            df.with_column(Series::new(conflict_name.as_str().into(), conflict))?;
        }

        Ok(df)
    }

    /// Count conflicting customers among those kept. Runs after
    /// deduplication, so each conflict flag belongs to one customer.
    fn record_conflicts(
        &self,
        df: &DataFrame,
        summary: &mut CleaningSummary,
        warnings: &mut Vec<AnomalyWarning>,
    ) -> Result<()> {
        let cols = &self.config.columns;

        for (field, short) in [(&cols.gender, "gender"), (&cols.country, "country")] {
            let conflict_name = format!("{}_conflict", short);
            if !has_column(df, &conflict_name) {
                continue;
            }
            let conflicted = parse_flags(&string_values(df, &conflict_name)?)
                .into_iter()
                .filter(|flag| *flag == Some(true))
                .count();
            if short == "gender" {
                summary.gender_conflicts = conflicted;
            } else {
                summary.country_conflicts = conflicted;
            }
            summary.actions.push(format!(
                "Resolved '{}' per customer into '{}_std' ({} conflicting customers)",
                field,
                field,
                format_thousands(conflicted)
            ));

            if conflicted > 0 {
                warnings.push(AnomalyWarning::new(
                    AnomalyCategory::DemographicConflict,
                    Some(field),
                    conflicted,
                    format!(
                        "{} customers have conflicting '{}' values across rows",
                        conflicted, field
                    ),
                ));
            }
        }

        Ok(())
    }

    fn fill_unknown(&self, df: DataFrame, summary: &mut CleaningSummary) -> Result<DataFrame> {
        let mut df = df;
        let unknown = &self.config.unknown_label;

        for col in &self.config.categorical_columns {
            if !has_column(&df, col) {
                continue;
            }
            let values = string_values(&df, col)?;
            let missing = values.iter().filter(|v| v.is_none()).count();
            if missing == 0 {
                continue;
            }
            let filled: Vec<String> = values
                .into_iter()
                .map(|v| v.unwrap_or_else(|| unknown.clone()))
                .collect();
            df.replace(col, Series::new(col.as_str().into(), filled))?;

            summary.unknown_filled.insert(col.clone(), missing);
            summary.actions.push(format!(
                "Filled {} missing '{}' values with '{}'",
                format_thousands(missing),
                col,
                unknown
            ));
        }

        Ok(df)
    }

    fn dedupe_customers(&self, df: DataFrame, summary: &mut CleaningSummary) -> Result<DataFrame> {
        let ids = string_values(&df, &self.config.columns.customer_id)?;
        let mut seen = HashSet::with_capacity(ids.len());
        let keep: Vec<bool> = ids.iter().map(|id| seen.insert(id.clone())).collect();

        let before = df.height();
        let df = filter_rows(&df, keep)?;
        summary.duplicate_customers_removed = before - df.height();

        if summary.duplicate_customers_removed > 0 {
            summary.actions.push(format!(
                "Kept the first row of each customer, removing {} repeated rows",
                format_thousands(summary.duplicate_customers_removed)
            ));
        }
        Ok(df)
    }
}

/// Quality report section describing what the cleaner changed.
pub fn cleaning_section(summary: &CleaningSummary) -> ReportSection {
    let mut section = ReportSection::new("CLEANING ACTIONS");
    section.line(format!(
        "  Rows:      {} -> {} ({} removed)",
        format_thousands(summary.rows_before),
        format_thousands(summary.rows_after),
        format_thousands(summary.rows_removed())
    ));
    section.line(format!(
        "  Columns:   {} -> {}",
        summary.columns_before, summary.columns_after
    ));
    section.line(format!("  Customers: {}", format_thousands(summary.customers)));
    section.line("");

    if summary.actions.is_empty() {
        section.line("  No changes were needed.");
    }
    for action in &summary.actions {
        section.line(format!("  - {}", action));
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw_frame() -> DataFrame {
        df![
            "customer_id" => ["C1", "C1", "C2", "C3", "C4", "C5"],
            "product_type" => ["term", "Term", "WHOLE", "Universal", "Term", "Term"],
            "tenure_months" => ["12", "12", "30", "", "5", "7"],
            "payment_frequency" => ["Monthly", "MONTHLY", "Annual", "Annual", "Monthly", "Quarterly"],
            "churned" => ["True", "True", "False", "False", "maybe", "False"],
            "premium" => ["100", "100", "250.5", "80", "90", "-5"],
            "coverage_amount" => ["100000", "100000", "200000", "50000", "75000", "80000"],
            "customer_gender" => [Some("Female"), Some("Male"), None, Some("Male"), Some("Male"), Some("Female")],
            "country" => [Some("UK"), Some("UK"), Some("US"), None, Some("US"), Some("UK")],
        ]
        .unwrap()
    }

    #[test]
    fn test_clean_drops_and_dedupes() {
        let config = PipelineConfig::default();
        let cleaned = DataCleaner::new(&config).clean(raw_frame()).unwrap();
        let summary = &cleaned.summary;

        assert_eq!(summary.rows_before, 6);
        assert_eq!(summary.rows_missing_numeric, 1);
        assert_eq!(summary.rows_missing_churn, 1);
        assert_eq!(summary.rows_negative_numeric, 1);
        assert_eq!(summary.duplicate_customers_removed, 1);
        assert_eq!(summary.rows_after, 2);
        assert_eq!(
            string_values(&cleaned.data, "customer_id").unwrap(),
            vec![Some("C1".to_string()), Some("C2".to_string())]
        );
    }

    #[test]
    fn test_clean_types_and_canonicalizes() {
        let config = PipelineConfig::default();
        let cleaned = DataCleaner::new(&config).clean(raw_frame()).unwrap();
        let df = &cleaned.data;

        assert_eq!(df.column("tenure_months").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("premium").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("churned").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(
            string_values(df, "product_type").unwrap(),
            vec![Some("Term".to_string()), Some("Whole".to_string())]
        );
        assert_eq!(
            string_values(df, "payment_frequency").unwrap(),
            vec![Some("Monthly".to_string()), Some("Annual".to_string())]
        );
        assert!(cleaned.summary.spelling_fixes >= 2);
    }

    #[test]
    fn test_clean_resolves_demographics() {
        let config = PipelineConfig::default();
        let cleaned = DataCleaner::new(&config).clean(raw_frame()).unwrap();
        let df = &cleaned.data;

        // C1 has one Female and one Male row
        assert_eq!(
            string_values(df, "customer_gender_std").unwrap(),
            vec![Some("Conflict".to_string()), Some("Unknown".to_string())]
        );
        assert_eq!(
            string_values(df, "customer_gender").unwrap(),
            vec![Some("Female".to_string()), Some("Unknown".to_string())]
        );
        assert_eq!(
            string_values(df, "country_std").unwrap(),
            vec![Some("UK".to_string()), Some("US".to_string())]
        );
        assert_eq!(cleaned.summary.gender_conflicts, 1);
        assert_eq!(cleaned.summary.country_conflicts, 0);
        assert_eq!(cleaned.warnings.len(), 1);
        assert_eq!(
            cleaned.warnings[0].category,
            AnomalyCategory::DemographicConflict
        );
    }

    #[test]
    fn test_dropped_row_still_counts_toward_demographics() {
        // C1's Female row is dropped for its blank tenure
        let df = df![
            "customer_id" => ["C1", "C1", "C2"],
            "product_type" => ["Term", "Term", "Whole"],
            "tenure_months" => ["", "12", "30"],
            "payment_frequency" => ["Monthly", "Monthly", "Annual"],
            "churned" => ["True", "True", "False"],
            "premium" => ["100", "100", "250"],
            "coverage_amount" => ["100000", "100000", "200000"],
            "customer_gender" => ["Female", "Male", "Male"],
            "country" => ["UK", "UK", "US"],
        ]
        .unwrap();
        let config = PipelineConfig::default();
        let cleaned = DataCleaner::new(&config).clean(df).unwrap();

        assert_eq!(cleaned.summary.rows_missing_numeric, 1);
        assert_eq!(
            string_values(&cleaned.data, "customer_gender_std").unwrap(),
            vec![Some("Conflict".to_string()), Some("Male".to_string())]
        );
        assert_eq!(
            parse_flags(&string_values(&cleaned.data, "gender_conflict").unwrap()),
            vec![Some(true), Some(false)]
        );
        assert_eq!(cleaned.summary.gender_conflicts, 1);
        assert_eq!(cleaned.summary.country_conflicts, 0);
        assert_eq!(cleaned.warnings.len(), 1);
    }

    #[test]
    fn test_no_usable_churn_flags() {
        let df = df![
            "customer_id" => ["C1", "C2"],
            "product_type" => ["Term", "Term"],
            "tenure_months" => ["1", "2"],
            "payment_frequency" => ["Monthly", "Monthly"],
            "churned" => [None::<&str>, Some("?")],
            "premium" => ["1", "2"],
            "coverage_amount" => ["10", "20"],
        ]
        .unwrap();
        let config = PipelineConfig::default();
        let err = DataCleaner::new(&config).clean(df).unwrap_err();
        assert_eq!(err.error_code(), "DATA_INTEGRITY_ERROR");
    }

    #[test]
    fn test_every_row_dropped_is_integrity_error() {
        let df = df![
            "customer_id" => ["C1"],
            "product_type" => ["Term"],
            "tenure_months" => ["-1"],
            "payment_frequency" => ["Monthly"],
            "churned" => ["False"],
            "premium" => ["1"],
            "coverage_amount" => ["10"],
        ]
        .unwrap();
        let config = PipelineConfig::default();
        let err = DataCleaner::new(&config).clean(df).unwrap_err();
        assert_eq!(err.error_code(), "DATA_INTEGRITY_ERROR");
    }

    #[test]
    fn test_header_only_input() {
        let df = df![
            "customer_id" => Vec::<String>::new(),
            "product_type" => Vec::<String>::new(),
            "tenure_months" => Vec::<String>::new(),
            "payment_frequency" => Vec::<String>::new(),
            "churned" => Vec::<String>::new(),
            "premium" => Vec::<String>::new(),
            "coverage_amount" => Vec::<String>::new(),
        ]
        .unwrap();
        let config = PipelineConfig::default();
        let cleaned = DataCleaner::new(&config).clean(df).unwrap();
        assert_eq!(cleaned.data.height(), 0);
        assert_eq!(cleaned.summary.rows_removed(), 0);
    }

    #[test]
    fn test_cleaning_section() {
        let summary = CleaningSummary {
            rows_before: 10,
            rows_after: 8,
            actions: vec!["Dropped 2 rows with missing required numbers".to_string()],
            ..CleaningSummary::default()
        };
        let section = cleaning_section(&summary);
        assert_eq!(section.title, "CLEANING ACTIONS");
        assert!(section.lines[0].contains("(2 removed)"));
        assert!(section.lines.iter().any(|l| l.contains("Dropped 2 rows")));
    }
}
