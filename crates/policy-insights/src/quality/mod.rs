//! Data quality analysis module.
//!
//! Validates the raw schema, runs the anomaly checks, and renders the
//! plain-text quality report.

mod analyzer;
mod report;
mod schema;

pub use analyzer::DataQualityAnalyzer;
pub use report::render_quality_report;
pub use schema::validate_schema;
