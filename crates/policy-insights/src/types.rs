//! Report and summary types shared by the pipeline stages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Data quality findings
// ============================================================================

/// Kinds of non-fatal data-quality findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyCategory {
    /// Empty cells in a column.
    MissingValues,
    /// Rows that repeat another row exactly.
    DuplicateRows,
    /// Customer identifiers appearing on more than one row.
    DuplicateCustomers,
    /// Policy identifiers appearing on more than one row.
    DuplicatePolicies,
    /// Values outside their semantic range or contradicting another column.
    ImpossibleValue,
    /// Values outside the IQR fences.
    Outlier,
    /// Categorical values differing only in case or whitespace.
    InconsistentSpelling,
    /// Categorical values outside the recognized label set.
    InvalidCategory,
    /// Numeric cells that could not be parsed.
    InvalidNumber,
    /// Flag cells that are neither true nor false.
    InvalidFlag,
    /// Customers whose demographic fields disagree across rows.
    DemographicConflict,
}

impl AnomalyCategory {
    /// Returns a human-readable name for the category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MissingValues => "Missing values",
            Self::DuplicateRows => "Duplicate rows",
            Self::DuplicateCustomers => "Duplicate customers",
            Self::DuplicatePolicies => "Duplicate policies",
            Self::ImpossibleValue => "Impossible value",
            Self::Outlier => "Outliers",
            Self::InconsistentSpelling => "Inconsistent spelling",
            Self::InvalidCategory => "Invalid category",
            Self::InvalidNumber => "Invalid number",
            Self::InvalidFlag => "Invalid flag",
            Self::DemographicConflict => "Demographic conflict",
        }
    }
}

/// A non-fatal data-quality issue. Recorded in the quality report; never
/// interrupts the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyWarning {
    pub category: AnomalyCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Number of affected cells or rows.
    pub count: usize,
    pub message: String,
}

impl AnomalyWarning {
    pub fn new(
        category: AnomalyCategory,
        column: Option<&str>,
        count: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            column: column.map(String::from),
            count,
            message: message.into(),
        }
    }
}

/// One titled block of the quality report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub lines: Vec<String>,
}

impl ReportSection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// The write-once data-quality report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    /// Name of the inspected file, shown in the header.
    pub source: String,
    pub sections: Vec<ReportSection>,
    pub warnings: Vec<AnomalyWarning>,
}

impl QualityReport {
    /// Number of warnings per category.
    pub fn warning_counts(&self) -> BTreeMap<AnomalyCategory, usize> {
        let mut counts = BTreeMap::new();
        for warning in &self.warnings {
            *counts.entry(warning.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn has_warning(&self, category: AnomalyCategory) -> bool {
        self.warnings.iter().any(|w| w.category == category)
    }
}

// ============================================================================
// Cleaning results
// ============================================================================

/// What the cleaning stage did to the dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    /// Rows dropped because a required numeric value was missing or unparseable.
    pub rows_missing_numeric: usize,
    /// Rows dropped because a required numeric value was negative.
    pub rows_negative_numeric: usize,
    /// Rows dropped because the churn flag was missing or unparseable.
    pub rows_missing_churn: usize,
    /// Rows dropped because the customer identifier was blank.
    pub rows_missing_customer_id: usize,
    /// Rows removed by collapsing repeated customer identifiers.
    pub duplicate_customers_removed: usize,
    /// Cells rewritten to their canonical spelling.
    pub spelling_fixes: usize,
    /// Missing categorical cells filled with the unknown label, per column.
    pub unknown_filled: BTreeMap<String, usize>,
    pub customers: usize,
    pub gender_conflicts: usize,
    pub country_conflicts: usize,
    /// Human-readable log of the cleaning actions.
    pub actions: Vec<String>,
}

impl CleaningSummary {
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

// ============================================================================
// Analysis results
// ============================================================================

/// Churn counts for one feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnGroup {
    pub value: String,
    pub total: usize,
    pub churned: usize,
}

impl ChurnGroup {
    /// Churned / total, in `[0, 1]`. Groups are never built empty.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.churned as f64 / self.total as f64
        }
    }
}

/// Churn rate per value of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnBreakdown {
    pub feature: String,
    pub title: String,
    pub groups: Vec<ChurnGroup>,
}

impl ChurnBreakdown {
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.total).sum()
    }

    pub fn churned(&self) -> usize {
        self.groups.iter().map(|g| g.churned).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, value: &str) -> Option<&ChurnGroup> {
        self.groups.iter().find(|g| g.value == value)
    }
}

/// Premium / coverage distribution for one product type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCoverageStats {
    pub product_type: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
}

/// What happened to one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ChartStatus {
    Rendered,
    Skipped(String),
    Failed(String),
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOutcome {
    pub file: String,
    pub status: ChartStatus,
}

impl ChartOutcome {
    /// One line for the report's chart section.
    pub fn describe(&self) -> String {
        match &self.status {
            ChartStatus::Rendered => format!("{}: saved", self.file),
            ChartStatus::Skipped(reason) => format!("{}: skipped ({})", self.file, reason),
            ChartStatus::Failed(reason) => format!("{}: not rendered ({})", self.file, reason),
            ChartStatus::Disabled => format!("{}: disabled", self.file),
        }
    }
}

/// Everything the analysis stage computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub policies: usize,
    pub churned: usize,
    /// Churned / policies in `[0, 1]`.
    pub overall_churn_rate: f64,
    pub breakdowns: Vec<ChurnBreakdown>,
    pub tenure_buckets: Vec<ChurnGroup>,
    pub payment_frequency: Vec<ChurnGroup>,
    pub acquisition_channel: Vec<ChurnGroup>,
    pub price_per_coverage: Vec<PriceCoverageStats>,
    pub charts: Vec<ChartOutcome>,
}

/// Result of a full pipeline run, printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub input_file: String,
    pub outputs: Vec<String>,
    pub duration_ms: u64,
    pub cleaning: CleaningSummary,
    pub anomalies: Vec<AnomalyWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.analysis_error.is_none()
    }
}
