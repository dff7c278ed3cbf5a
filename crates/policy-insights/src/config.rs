//! Configuration types for the policy analysis pipeline.
//!
//! The column roles, the churn feature list and the fill policy are all
//! configuration: the defaults match the layout of the policy export this
//! tool was written for, and a JSON file passed with `--config` can override
//! any subset of them.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Names of the columns that carry a fixed meaning in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRoles {
    pub customer_id: String,
    pub policy_id: String,
    pub product_type: String,
    pub tenure: String,
    pub payment_frequency: String,
    pub churn: String,
    pub premium: String,
    pub coverage: String,
    pub age: String,
    pub gender: String,
    pub country: String,
    pub acquisition_channel: String,
    pub churn_reason: String,
    pub policy_start_date: String,
    pub policy_end_date: String,
    pub discount_applied: String,
    pub discount_rate: String,
    pub agent_id: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            customer_id: "customer_id".to_string(),
            policy_id: "policy_id".to_string(),
            product_type: "product_type".to_string(),
            tenure: "tenure_months".to_string(),
            payment_frequency: "payment_frequency".to_string(),
            churn: "churned".to_string(),
            premium: "premium".to_string(),
            coverage: "coverage_amount".to_string(),
            age: "customer_age".to_string(),
            gender: "customer_gender".to_string(),
            country: "country".to_string(),
            acquisition_channel: "acquisition_channel".to_string(),
            churn_reason: "churn_reason".to_string(),
            policy_start_date: "policy_start_date".to_string(),
            policy_end_date: "policy_end_date".to_string(),
            discount_applied: "discount_applied".to_string(),
            discount_rate: "discount_rate".to_string(),
            agent_id: "agent_id".to_string(),
        }
    }
}

/// A single feature in the churn breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnFeature {
    /// Column to group by (may be a derived column such as `age_group`).
    pub column: String,
    /// Heading printed above the table.
    pub title: String,
}

impl ChurnFeature {
    pub fn new(column: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            title: title.into(),
        }
    }
}

/// A titled group of churn features in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSection {
    pub title: String,
    pub subtitle: String,
    pub features: Vec<ChurnFeature>,
}

/// Names of the files written by a run, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFiles {
    pub standardized_csv: String,
    pub quality_report: String,
    pub churn_report: String,
    pub tenure_chart: String,
    pub payment_chart: String,
    pub price_chart: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            standardized_csv: "policies_standardized.csv".to_string(),
            quality_report: "sanity_checks_report.txt".to_string(),
            churn_report: "churn_rate_report.txt".to_string(),
            tenure_chart: "tenure_churn_histogram.png".to_string(),
            payment_chart: "risky_payment.png".to_string(),
            price_chart: "price_per_coverage_plot.png".to_string(),
        }
    }
}

impl OutputFiles {
    /// All configured file names, paired with the field they come from.
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("standardized_csv", &self.standardized_csv),
            ("quality_report", &self.quality_report),
            ("churn_report", &self.churn_report),
            ("tenure_chart", &self.tenure_chart),
            ("payment_chart", &self.payment_chart),
            ("price_chart", &self.price_chart),
        ]
    }
}

/// Configuration for the analysis pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use policy_insights::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .input_path("data/policies.csv")
///     .output_dir("out")
///     .tenure_bin_months(6)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw policy CSV.
    /// Default: "policies.csv"
    pub input_path: PathBuf,

    /// Directory every output file is written to.
    /// Default: "." (the working directory)
    pub output_dir: PathBuf,

    /// Output file names.
    pub files: OutputFiles,

    /// Columns with a fixed meaning.
    pub columns: ColumnRoles,

    /// Numeric columns that are parsed but may stay empty.
    pub optional_numeric_columns: Vec<String>,

    /// Text columns whose spelling is canonicalized and whose missing values
    /// become [`PipelineConfig::unknown_label`].
    pub categorical_columns: Vec<String>,

    /// Flag columns rewritten as canonical `true` / `false`.
    pub boolean_columns: Vec<String>,

    /// Recognized labels per column; anything else is reported as invalid.
    pub allowed_values: BTreeMap<String, Vec<String>>,

    /// Churn breakdown sections in report order.
    pub churn_sections: Vec<FeatureSection>,

    /// Width of a tenure histogram bucket in months.
    /// Default: 12
    pub tenure_bin_months: u32,

    /// Preferred order of product types in the price-per-coverage chart.
    pub product_type_order: Vec<String>,

    /// Label used for missing categorical values.
    /// Default: "Unknown"
    pub unknown_label: String,

    /// Whether to render PNG charts.
    /// Default: true
    pub render_charts: bool,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_churn_sections() -> Vec<FeatureSection> {
    let section = |title: &str, subtitle: &str, features: &[(&str, &str)]| FeatureSection {
        title: title.to_string(),
        subtitle: subtitle.to_string(),
        features: features
            .iter()
            .map(|(column, title)| ChurnFeature::new(*column, *title))
            .collect(),
    };

    vec![
        section(
            "POLICY CHARACTERISTICS",
            "How the policy structure relates to churn",
            &[
                ("product_type", "Product Type"),
                ("payment_frequency", "Payment Frequency"),
                ("acquisition_channel", "Acquisition Channel"),
            ],
        ),
        section(
            "CUSTOMER BEHAVIOR SIGNALS",
            "Activity and engagement indicators",
            &[
                ("late_payment_count", "Late Payment Count"),
                ("customer_service_calls", "Customer Service Calls"),
                ("beneficiary_updated", "Beneficiary Updated"),
            ],
        ),
        section(
            "CUSTOMER DEMOGRAPHICS",
            "Who the customer is",
            &[
                ("age_group", "Age Group"),
                ("customer_gender_std", "Gender (standardized)"),
                ("marital_status", "Marital Status"),
                ("income_band", "Income Band"),
                ("country_std", "Country (standardized)"),
            ],
        ),
        section(
            "ADD-ONS AND DISCOUNTS",
            "Whether riders or discounts affect retention",
            &[
                ("discount_applied", "Discount Applied"),
                ("has_rider", "Has Rider"),
                ("critical_illness_rider", "Critical Illness Rider"),
                ("disability_rider", "Disability Rider"),
            ],
        ),
        section(
            "NUMERIC POLICY CHARACTERISTICS",
            "Policy age, size, and financial signals",
            &[
                ("tenure_group", "Tenure Group"),
                ("num_dependents", "Number of Dependents"),
            ],
        ),
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut allowed_values = BTreeMap::new();
        allowed_values.insert(
            "payment_frequency".to_string(),
            strings(&["Monthly", "Quarterly", "Semi-Annual", "Annual"]),
        );
        allowed_values.insert(
            "product_type".to_string(),
            strings(&["Term", "Whole", "Universal"]),
        );

        Self {
            input_path: PathBuf::from("policies.csv"),
            output_dir: PathBuf::from("."),
            files: OutputFiles::default(),
            columns: ColumnRoles::default(),
            optional_numeric_columns: strings(&[
                "customer_age",
                "num_dependents",
                "renewal_count",
                "num_riders",
                "late_payment_count",
                "customer_service_calls",
                "premium_change_pct",
                "discount_rate",
            ]),
            categorical_columns: strings(&[
                "customer_gender",
                "marital_status",
                "product_type",
                "payment_frequency",
                "acquisition_channel",
                "country",
                "income_band",
            ]),
            boolean_columns: strings(&[
                "churned",
                "discount_applied",
                "beneficiary_updated",
                "has_rider",
                "critical_illness_rider",
                "disability_rider",
            ]),
            allowed_values,
            churn_sections: default_churn_sections(),
            tenure_bin_months: 12,
            product_type_order: strings(&["Term", "Whole", "Universal"]),
            unknown_label: "Unknown".to_string(),
            render_charts: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Fields not present in the file
    /// keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Io(e).with_context(format!("Reading config {}", path.display()))
        })?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Columns that must be present in the raw input.
    pub fn required_columns(&self) -> Vec<String> {
        let c = &self.columns;
        vec![
            c.customer_id.clone(),
            c.product_type.clone(),
            c.tenure.clone(),
            c.payment_frequency.clone(),
            c.churn.clone(),
            c.premium.clone(),
            c.coverage.clone(),
        ]
    }

    /// Numeric columns whose missing values drop the row.
    pub fn required_numeric_columns(&self) -> Vec<String> {
        vec![
            self.columns.tenure.clone(),
            self.columns.premium.clone(),
            self.columns.coverage.clone(),
        ]
    }

    /// Every column parsed as a number, required ones first.
    pub fn numeric_columns(&self) -> Vec<String> {
        let mut columns = self.required_numeric_columns();
        for col in &self.optional_numeric_columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
        columns
    }

    /// All churn features in report order.
    pub fn churn_features(&self) -> impl Iterator<Item = &ChurnFeature> {
        self.churn_sections.iter().flat_map(|s| s.features.iter())
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn standardized_path(&self) -> PathBuf {
        self.output_path(&self.files.standardized_csv)
    }

    pub fn quality_report_path(&self) -> PathBuf {
        self.output_path(&self.files.quality_report)
    }

    pub fn churn_report_path(&self) -> PathBuf {
        self.output_path(&self.files.churn_report)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.tenure_bin_months == 0 {
            return Err(ConfigValidationError::InvalidBinWidth(self.tenure_bin_months));
        }

        let mut seen = Vec::new();
        for (field, name) in self.files.entries() {
            if name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyFileName(field.to_string()));
            }
            if seen.contains(&name) {
                return Err(ConfigValidationError::DuplicateOutputFile(name.to_string()));
            }
            seen.push(name);
        }

        if self.churn_features().next().is_none() {
            return Err(ConfigValidationError::NoChurnFeatures);
        }

        if self.unknown_label.trim().is_empty() {
            return Err(ConfigValidationError::EmptyUnknownLabel);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid tenure bin width: {0} (must be at least 1 month)")]
    InvalidBinWidth(u32),

    #[error("Output file name for '{0}' is empty")]
    EmptyFileName(String),

    #[error("Output file '{0}' is configured more than once")]
    DuplicateOutputFile(String),

    #[error("No churn features configured")]
    NoChurnFeatures,

    #[error("The label for missing categorical values is empty")]
    EmptyUnknownLabel,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    input_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    files: Option<OutputFiles>,
    columns: Option<ColumnRoles>,
    optional_numeric_columns: Option<Vec<String>>,
    categorical_columns: Option<Vec<String>>,
    boolean_columns: Option<Vec<String>>,
    allowed_values: Option<BTreeMap<String, Vec<String>>>,
    churn_sections: Option<Vec<FeatureSection>>,
    tenure_bin_months: Option<u32>,
    product_type_order: Option<Vec<String>>,
    unknown_label: Option<String>,
    render_charts: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the raw CSV to read.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Set the directory outputs are written to.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn files(mut self, files: OutputFiles) -> Self {
        self.files = Some(files);
        self
    }

    pub fn columns(mut self, columns: ColumnRoles) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn optional_numeric_columns(mut self, columns: Vec<String>) -> Self {
        self.optional_numeric_columns = Some(columns);
        self
    }

    pub fn categorical_columns(mut self, columns: Vec<String>) -> Self {
        self.categorical_columns = Some(columns);
        self
    }

    pub fn boolean_columns(mut self, columns: Vec<String>) -> Self {
        self.boolean_columns = Some(columns);
        self
    }

    /// Replace the recognized labels for one column.
    pub fn allowed_values(mut self, column: impl Into<String>, values: Vec<String>) -> Self {
        self.allowed_values
            .get_or_insert_with(|| PipelineConfig::default().allowed_values)
            .insert(column.into(), values);
        self
    }

    pub fn churn_sections(mut self, sections: Vec<FeatureSection>) -> Self {
        self.churn_sections = Some(sections);
        self
    }

    /// Set the tenure histogram bucket width in months.
    pub fn tenure_bin_months(mut self, months: u32) -> Self {
        self.tenure_bin_months = Some(months);
        self
    }

    pub fn product_type_order(mut self, order: Vec<String>) -> Self {
        self.product_type_order = Some(order);
        self
    }

    pub fn unknown_label(mut self, label: impl Into<String>) -> Self {
        self.unknown_label = Some(label.into());
        self
    }

    /// Enable or disable PNG chart rendering.
    pub fn render_charts(mut self, render: bool) -> Self {
        self.render_charts = Some(render);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            input_path: self.input_path.unwrap_or(defaults.input_path),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            files: self.files.unwrap_or(defaults.files),
            columns: self.columns.unwrap_or(defaults.columns),
            optional_numeric_columns: self
                .optional_numeric_columns
                .unwrap_or(defaults.optional_numeric_columns),
            categorical_columns: self
                .categorical_columns
                .unwrap_or(defaults.categorical_columns),
            boolean_columns: self.boolean_columns.unwrap_or(defaults.boolean_columns),
            allowed_values: self.allowed_values.unwrap_or(defaults.allowed_values),
            churn_sections: self.churn_sections.unwrap_or(defaults.churn_sections),
            tenure_bin_months: self.tenure_bin_months.unwrap_or(defaults.tenure_bin_months),
            product_type_order: self
                .product_type_order
                .unwrap_or(defaults.product_type_order),
            unknown_label: self.unknown_label.unwrap_or(defaults.unknown_label),
            render_charts: self.render_charts.unwrap_or(defaults.render_charts),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.input_path, PathBuf::from("policies.csv"));
        assert_eq!(config.tenure_bin_months, 12);
        assert!(config.render_charts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_feature_list_has_at_least_fifteen_features() {
        let config = PipelineConfig::default();
        assert!(config.churn_features().count() >= 15);
    }

    #[test]
    fn test_required_columns() {
        let required = PipelineConfig::default().required_columns();
        for col in [
            "customer_id",
            "product_type",
            "tenure_months",
            "payment_frequency",
            "churned",
            "premium",
            "coverage_amount",
        ] {
            assert!(required.contains(&col.to_string()), "missing {col}");
        }
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .input_path("data/raw.csv")
            .output_dir("out")
            .tenure_bin_months(6)
            .render_charts(false)
            .allowed_values("payment_frequency", vec!["Monthly".to_string()])
            .build()
            .unwrap();

        assert_eq!(config.input_path, PathBuf::from("data/raw.csv"));
        assert_eq!(config.standardized_path(), PathBuf::from("out/policies_standardized.csv"));
        assert_eq!(config.tenure_bin_months, 6);
        assert!(!config.render_charts);
        assert_eq!(
            config.allowed_values.get("payment_frequency"),
            Some(&vec!["Monthly".to_string()])
        );
        // Untouched entries keep their defaults
        assert!(config.allowed_values.contains_key("product_type"));
    }

    #[test]
    fn test_validation_invalid_bin_width() {
        let result = PipelineConfig::builder().tenure_bin_months(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidBinWidth(0)
        ));
    }

    #[test]
    fn test_validation_duplicate_output_file() {
        let files = OutputFiles {
            churn_report: "report.txt".to_string(),
            quality_report: "report.txt".to_string(),
            ..OutputFiles::default()
        };
        let result = PipelineConfig::builder().files(files).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DuplicateOutputFile(_)
        ));
    }

    #[test]
    fn test_validation_no_features() {
        let result = PipelineConfig::builder().churn_sections(Vec::new()).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NoChurnFeatures
        ));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "output_dir": "reports",
            "tenure_bin_months": 24,
            "columns": { "churn": "is_churned" }
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert_eq!(config.tenure_bin_months, 24);
        assert_eq!(config.columns.churn, "is_churned");
        assert_eq!(config.columns.premium, "premium");
        assert_eq!(config.files.churn_report, "churn_rate_report.txt");
    }

    #[test]
    fn test_from_json_file_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "tenure_bin_months": 0 }"#).unwrap();

        let err = PipelineConfig::from_json_file(&path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
