//! Plain-text churn report and terminal tables.

use crate::config::PipelineConfig;
use crate::types::{AnalysisSummary, ChurnBreakdown, ChurnGroup, PriceCoverageStats};
use crate::utils::{format_thousands, truncate_str};
use std::fmt::Write;

const RULE_WIDTH: usize = 65;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Percentage-point difference from the overall rate, signed.
fn vs_average(rate: f64, overall: f64) -> String {
    let diff = (rate - overall) * 100.0;
    let sign = if diff >= 0.0 { "+" } else { "" };
    format!("{}{:>5.1}%", sign, diff)
}

fn write_breakdown(out: &mut String, breakdown: &ChurnBreakdown, overall: f64) {
    let _ = writeln!(out, "  {}", breakdown.title);
    let _ = writeln!(out, "  {}", "-".repeat(60));

    if breakdown.is_empty() {
        let _ = writeln!(out, "  (no data for '{}')", breakdown.feature);
        let _ = writeln!(out);
        return;
    }

    let _ = writeln!(
        out,
        "  {:<22} {:>6}  {:>8}  {:>7}  {:>7}",
        "Value", "Total", "Churned", "Churn%", "vs avg"
    );
    let _ = writeln!(out, "  {}", "·".repeat(52));
    for group in &breakdown.groups {
        let _ = writeln!(
            out,
            "  {:<22} {:>6}  {:>8}  {:>6.1}%  {}",
            truncate_str(&group.value, 22),
            format_thousands(group.total),
            format_thousands(group.churned),
            group.rate() * 100.0,
            vs_average(group.rate(), overall)
        );
    }
    let _ = writeln!(out, "  {}", "·".repeat(52));
    let _ = writeln!(
        out,
        "  {:<22} {:>6}  {:>8}",
        "TOTAL",
        format_thousands(breakdown.total()),
        format_thousands(breakdown.churned())
    );
    let _ = writeln!(out);
}

/// Render the churn report: overall numbers, one table per configured
/// feature grouped into sections, then the chart outcomes.
pub fn render_churn_report(analysis: &AnalysisSummary, config: &PipelineConfig) -> String {
    let mut out = String::new();
    let overall = analysis.overall_churn_rate;

    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "CHURN RATE ANALYSIS");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Dataset:       {} policies",
        format_thousands(analysis.policies)
    );
    let _ = writeln!(
        out,
        "Total churned: {}  ({:.1}% overall churn rate)",
        format_thousands(analysis.churned),
        overall * 100.0
    );
    let _ = writeln!(out);

    let mut breakdowns = analysis.breakdowns.iter();
    for (i, section) in config.churn_sections.iter().enumerate() {
        let _ = writeln!(out, "{}", rule());
        let _ = writeln!(out, "SECTION {}: {}", i + 1, section.title);
        let _ = writeln!(out, "{}", section.subtitle);
        let _ = writeln!(out, "{}", rule());
        let _ = writeln!(out);

        for feature in &section.features {
            // Breakdowns are computed in feature order
            match breakdowns.next() {
                Some(breakdown) if breakdown.feature == feature.column => {
                    write_breakdown(&mut out, breakdown, overall)
                }
                _ => {
                    let _ = writeln!(out, "  {}", feature.title);
                    let _ = writeln!(out, "  (no data for '{}')", feature.column);
                    let _ = writeln!(out);
                }
            }
        }
    }

    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "CHARTS");
    let _ = writeln!(out, "{}", rule());
    if analysis.charts.is_empty() {
        let _ = writeln!(out, "  No charts requested.");
    }
    for chart in &analysis.charts {
        let _ = writeln!(out, "  {}", chart.describe());
    }
    out
}

/// Terminal table of churn by group with deviation from the overall rate.
pub fn render_group_table(title: &str, groups: &[ChurnGroup], overall: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  (overall avg: {:.1}%)",
        title,
        overall * 100.0
    );
    let _ = writeln!(out, "{}", "-".repeat(58));
    let _ = writeln!(
        out,
        "  {:<20} {:>7} {:>8} {:>8} {:>8}",
        "Value", "Total", "Churned", "Churn%", "vs avg"
    );
    let _ = writeln!(out, "{}", "-".repeat(58));
    if groups.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for group in groups {
        let _ = writeln!(
            out,
            "  {:<20} {:>7} {:>8} {:>7.1}% {:>8}",
            truncate_str(&group.value, 20),
            format_thousands(group.total),
            format_thousands(group.churned),
            group.rate() * 100.0,
            vs_average(group.rate(), overall)
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(58));
    out
}

/// Terminal table of price per coverage (x 0.001) by product type.
pub fn render_price_table(stats: &[PriceCoverageStats]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Price-per-Coverage by Product Type  (premium per 1,000 of coverage)");
    let _ = writeln!(out, "{}", "-".repeat(58));
    let _ = writeln!(
        out,
        "  {:<14} {:>7} {:>8} {:>8} {:>8} {:>8}",
        "Product", "Count", "Mean", "Median", "Q1", "Q3"
    );
    let _ = writeln!(out, "{}", "-".repeat(58));
    if stats.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for s in stats {
        let _ = writeln!(
            out,
            "  {:<14} {:>7} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
            truncate_str(&s.product_type, 14),
            format_thousands(s.count),
            s.mean,
            s.median,
            s.q1,
            s.q3
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(58));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChartOutcome, ChartStatus};

    fn summary() -> AnalysisSummary {
        AnalysisSummary {
            policies: 10,
            churned: 4,
            overall_churn_rate: 0.4,
            breakdowns: vec![ChurnBreakdown {
                feature: "product_type".to_string(),
                title: "Product Type".to_string(),
                groups: vec![
                    ChurnGroup { value: "Term".to_string(), total: 6, churned: 3 },
                    ChurnGroup { value: "Whole".to_string(), total: 4, churned: 1 },
                ],
            }],
            charts: vec![ChartOutcome {
                file: "risky_payment.png".to_string(),
                status: ChartStatus::Skipped("no data".to_string()),
            }],
            ..AnalysisSummary::default()
        }
    }

    #[test]
    fn test_vs_average() {
        assert_eq!(vs_average(0.5, 0.4), "+ 10.0%");
        assert_eq!(vs_average(0.25, 0.4), "-15.0%");
    }

    #[test]
    fn test_churn_report_layout() {
        let report = render_churn_report(&summary(), &PipelineConfig::default());

        assert!(report.contains("Dataset:       10 policies"));
        assert!(report.contains("Total churned: 4  (40.0% overall churn rate)"));
        assert!(report.contains("SECTION 1: POLICY CHARACTERISTICS"));
        assert!(report.contains("SECTION 5: NUMERIC POLICY CHARACTERISTICS"));
        assert!(report.contains("  Term                        6         3    50.0%  + 10.0%"));
        assert!(report.contains("(no data for 'payment_frequency')"));
        assert!(report.contains("risky_payment.png: skipped (no data)"));
    }

    #[test]
    fn test_group_table() {
        let groups = vec![ChurnGroup { value: "Agent".to_string(), total: 5, churned: 0 }];
        let table = render_group_table("Acquisition Channel", &groups, 0.2);
        assert!(table.contains("overall avg: 20.0%"));
        assert!(table.contains("0.0%"));
    }

    #[test]
    fn test_price_table_empty() {
        assert!(render_price_table(&[]).contains("(no data)"));
    }
}
