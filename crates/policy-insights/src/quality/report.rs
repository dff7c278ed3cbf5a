//! Plain-text rendering of the quality report.

use crate::types::QualityReport;
use std::fmt::Write;

const RULE_WIDTH: usize = 80;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Render the report as numbered sections followed by a warning summary.
///
/// Output carries no timestamps, so the same input always renders the same
/// text.
pub fn render_quality_report(report: &QualityReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "DATA QUALITY CHECKS: {}", report.source);
    let _ = writeln!(out, "{}", rule());

    for (i, section) in report.sections.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", rule());
        let _ = writeln!(out, "{}. {}", i + 1, section.title);
        let _ = writeln!(out, "{}", rule());
        for line in &section.lines {
            let _ = writeln!(out, "{}", line);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "WARNING SUMMARY");
    let _ = writeln!(out, "{}", rule());
    if report.warnings.is_empty() {
        let _ = writeln!(out, "  No anomalies detected.");
    }
    for (category, count) in report.warning_counts() {
        let _ = writeln!(out, "  {:<28} {}", category.display_name(), count);
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "  - {}", warning.message);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "CHECKS COMPLETE");
    let _ = writeln!(out, "{}", rule());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnomalyCategory, AnomalyWarning, ReportSection};

    #[test]
    fn test_render_numbers_sections() {
        let mut shape = ReportSection::new("SHAPE");
        shape.line("  Rows:    2");
        let report = QualityReport {
            source: "policies.csv".to_string(),
            sections: vec![shape, ReportSection::new("DUPLICATES")],
            warnings: vec![AnomalyWarning::new(
                AnomalyCategory::DuplicateCustomers,
                Some("customer_id"),
                1,
                "1 customer ids appear on more than one row",
            )],
        };

        let text = render_quality_report(&report);
        assert!(text.starts_with(&"=".repeat(80)));
        assert!(text.contains("DATA QUALITY CHECKS: policies.csv"));
        assert!(text.contains("1. SHAPE\n"));
        assert!(text.contains("2. DUPLICATES\n"));
        assert!(text.contains("Duplicate customers"));
        assert!(text.contains("  - 1 customer ids appear on more than one row"));
        assert!(text.trim_end().ends_with(&"=".repeat(80)));
    }

    #[test]
    fn test_render_without_warnings() {
        let text = render_quality_report(&QualityReport::default());
        assert!(text.contains("No anomalies detected."));
    }
}
