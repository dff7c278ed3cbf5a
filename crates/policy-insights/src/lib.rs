//! Policy Insights
//!
//! Data-quality checks, standardization and churn analysis for insurance
//! policy datasets, built on Polars.
//!
//! # Overview
//!
//! A run is a linear batch job over one CSV:
//!
//! - **Quality checks**: schema validation, then anomaly detection (missing
//!   values, duplicates, impossible values, outliers, spelling variants)
//!   written to a plain-text report
//! - **Cleaning**: canonical spellings, typed columns, unusable rows dropped,
//!   conflicting demographics resolved, one row per customer
//! - **Analysis**: churn rate per feature value, tenure buckets,
//!   price-per-coverage by product type, and three PNG charts
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use policy_insights::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .input_path("policies.csv")
//!     .output_dir("out")
//!     .build()?;
//!
//! let summary = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("{} rows standardized", summary.cleaning.rows_after);
//! ```
//!
//! # Configuration
//!
//! Column roles, churn feature sections, allowed categorical labels and
//! output file names all live in [`PipelineConfig`], which can also be read
//! from JSON with [`PipelineConfig::from_json_file`].

pub mod analysis;
pub mod charts;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod quality;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CleanedData, DataCleaner};
pub use config::{
    ChurnFeature, ColumnRoles, ConfigValidationError, FeatureSection, OutputFiles,
    PipelineConfig, PipelineConfigBuilder,
};
pub use error::{AnalysisError, Result as AnalysisResult, ResultExt};
pub use loader::{load_csv, write_csv};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage, ProgressReporter,
    ProgressUpdate,
};
pub use quality::{DataQualityAnalyzer, render_quality_report, validate_schema};
pub use types::{
    AnalysisSummary, AnomalyCategory, AnomalyWarning, ChartOutcome, ChartStatus, ChurnBreakdown,
    ChurnGroup, CleaningSummary, PriceCoverageStats, QualityReport, ReportSection, RunSummary,
};
