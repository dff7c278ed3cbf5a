//! Anomaly detection over the raw dataset, before any cleaning.

use crate::cleaner::canonical_spellings;
use crate::config::PipelineConfig;
use crate::types::{AnomalyCategory, AnomalyWarning, QualityReport, ReportSection};
use crate::utils::{
    column_names, format_thousands, is_missing, normalize_whitespace, parse_date, parse_flag,
    parse_numeric_string, percent, quantile, sorted_floats, spelling_key, string_values,
    truncate_str,
};
use anyhow::Result;
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Number of repeated customer ids listed in the duplicates section.
const TOP_DUPLICATES: usize = 10;

/// Raw text columns, read once and shared by every check.
struct RawColumns {
    names: Vec<String>,
    values: HashMap<String, Vec<Option<String>>>,
    height: usize,
}

impl RawColumns {
    fn load(df: &DataFrame) -> Result<Self> {
        let names = column_names(df);
        let mut values = HashMap::with_capacity(names.len());
        for name in &names {
            values.insert(name.clone(), string_values(df, name)?);
        }
        Ok(Self {
            names,
            values,
            height: df.height(),
        })
    }

    fn get(&self, name: &str) -> Option<&Vec<Option<String>>> {
        self.values.get(name)
    }

    fn numbers(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.get(name).map(|values| {
            values
                .iter()
                .map(|v| v.as_deref().and_then(parse_numeric_string))
                .collect()
        })
    }

    fn flags(&self, name: &str) -> Option<Vec<Option<bool>>> {
        self.get(name)
            .map(|values| values.iter().map(|v| v.as_deref().and_then(parse_flag)).collect())
    }

    fn missing_mask(&self, name: &str) -> Option<Vec<bool>> {
        self.get(name)
            .map(|values| values.iter().map(|v| is_missing(v.as_deref())).collect())
    }
}

/// Column type as inferred from its raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InferredKind {
    Integer,
    Decimal,
    Boolean,
    Date,
    Text,
    Empty,
}

impl InferredKind {
    fn display_name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Text => "text",
            Self::Empty => "empty",
        }
    }

    fn infer(values: &[Option<String>]) -> Self {
        let present: Vec<&str> = values
            .iter()
            .filter_map(|v| v.as_deref())
            .filter(|v| !v.trim().is_empty())
            .collect();

        if present.is_empty() {
            return Self::Empty;
        }
        let numbers: Vec<Option<f64>> = present.iter().map(|v| parse_numeric_string(v)).collect();
        if numbers.iter().all(|n| n.is_some_and(|x| x.fract() == 0.0)) {
            return Self::Integer;
        }
        if numbers.iter().all(Option::is_some) {
            return Self::Decimal;
        }
        if present.iter().all(|v| parse_flag(v).is_some()) {
            return Self::Boolean;
        }
        if present.iter().all(|v| parse_date(v).is_some()) {
            return Self::Date;
        }
        Self::Text
    }
}

/// Runs the data-quality checks over the raw dataset.
///
/// Every finding is non-fatal: it lands in a report section and, when it
/// points at a real problem, as an [`AnomalyWarning`].
pub struct DataQualityAnalyzer<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DataQualityAnalyzer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Inspect the raw dataset and build the quality report.
    pub fn analyze(&self, df: &DataFrame, source: &str) -> Result<QualityReport> {
        let raw = RawColumns::load(df)?;
        let mut report = QualityReport {
            source: source.to_string(),
            ..QualityReport::default()
        };

        self.check_shape(&raw, &mut report);
        self.check_types(&raw, &mut report);
        self.check_categorical_distribution(&raw, &mut report);
        self.check_missing_values(&raw, &mut report);
        self.check_duplicates(&raw, &mut report);
        self.check_impossible_values(&raw, &mut report);
        self.check_outliers(&raw, &mut report);
        self.check_spelling(&raw, &mut report);
        self.check_invalid_values(&raw, &mut report);

        debug!(
            "Quality checks found {} warnings across {} sections",
            report.warnings.len(),
            report.sections.len()
        );
        Ok(report)
    }

    fn check_shape(&self, raw: &RawColumns, report: &mut QualityReport) {
        let mut section = ReportSection::new("SHAPE");
        section.line(format!("  Rows:    {}", format_thousands(raw.height)));
        section.line(format!("  Columns: {}", format_thousands(raw.names.len())));
        report.sections.push(section);
    }

    fn check_types(&self, raw: &RawColumns, report: &mut QualityReport) {
        let mut section = ReportSection::new("INFERRED COLUMN TYPES");
        let kinds: Vec<(&String, InferredKind)> = raw
            .names
            .iter()
            .filter_map(|name| raw.get(name).map(|v| (name, InferredKind::infer(v))))
            .collect();

        let mut totals: BTreeMap<&'static str, usize> = BTreeMap::new();
        for (_, kind) in &kinds {
            *totals.entry(kind.display_name()).or_insert(0) += 1;
        }
        for (kind, count) in &totals {
            section.line(format!("  {:<10} {}", kind, count));
        }
        section.line("");
        for (name, kind) in &kinds {
            section.line(format!("  {:<30} {}", name, kind.display_name()));
        }
        report.sections.push(section);
    }

    fn check_categorical_distribution(&self, raw: &RawColumns, report: &mut QualityReport) {
        let mut section = ReportSection::new("CATEGORICAL DISTRIBUTION");

        for col in &self.config.categorical_columns {
            let Some(values) = raw.get(col) else {
                continue;
            };
            section.line(format!("  {}:", col));
            push_value_counts(&mut section, values.iter().map(|v| v.as_deref()));
            section.line("");
        }

        let churn_reason = &self.config.columns.churn_reason;
        if let (Some(reasons), Some(flags)) =
            (raw.get(churn_reason), raw.flags(&self.config.columns.churn))
        {
            section.line(format!("  {} (churned policies only):", churn_reason));
            push_value_counts(
                &mut section,
                reasons
                    .iter()
                    .zip(&flags)
                    .filter(|(_, flag)| **flag == Some(true))
                    .map(|(reason, _)| reason.as_deref()),
            );
        }

        if section.lines.is_empty() {
            section.line("  No categorical columns present.");
        }
        report.sections.push(section);
    }

    /// Columns whose blanks follow from another column, with the reason.
    fn missing_justifications(&self, raw: &RawColumns) -> HashMap<String, String> {
        let cols = &self.config.columns;
        let mut justified = HashMap::new();

        if let Some(flags) = raw.flags(&cols.churn) {
            let not_churned: Vec<bool> = flags.iter().map(|f| *f == Some(false)).collect();
            for col in [&cols.policy_end_date, &cols.churn_reason] {
                if raw.missing_mask(col).as_ref() == Some(&not_churned) {
                    justified.insert(col.clone(), format!("only where {} = false", cols.churn));
                }
            }
        }

        if let Some(flags) = raw.flags(&cols.discount_applied) {
            let no_discount: Vec<bool> = flags.iter().map(|f| *f == Some(false)).collect();
            if raw.missing_mask(&cols.discount_rate).as_ref() == Some(&no_discount) {
                justified.insert(
                    cols.discount_rate.clone(),
                    format!("only where {} = false", cols.discount_applied),
                );
            }
        }

        if let Some(channels) = raw.get(&cols.acquisition_channel) {
            let not_agent: Vec<bool> = channels.iter().map(|c| !is_agent(c.as_deref())).collect();
            if raw.missing_mask(&cols.agent_id).as_ref() == Some(&not_agent) {
                justified.insert(
                    cols.agent_id.clone(),
                    format!("only where {} != Agent", cols.acquisition_channel),
                );
            }
        }

        justified
    }

    fn check_missing_values(&self, raw: &RawColumns, report: &mut QualityReport) {
        let mut section = ReportSection::new("MISSING VALUES");
        let justified = self.missing_justifications(raw);
        let mut any = false;

        section.line(format!(
            "  {:<30} {:>8}  {:>7}   Justification",
            "Column", "Missing", "%"
        ));
        for name in &raw.names {
            let Some(mask) = raw.missing_mask(name) else {
                continue;
            };
            let missing = mask.iter().filter(|m| **m).count();
            if missing == 0 {
                continue;
            }
            any = true;
            let pct = percent(missing, raw.height);
            let reason = justified.get(name).map(String::as_str).unwrap_or("");
            section.line(format!(
                "  {:<30} {:>8}  {:>6.2}%   {}",
                name,
                format_thousands(missing),
                pct,
                reason
            ));

            if reason.is_empty() {
                report.warnings.push(AnomalyWarning::new(
                    AnomalyCategory::MissingValues,
                    Some(name),
                    missing,
                    format!("{} missing values in '{}' ({:.2}%)", missing, name, pct),
                ));
            }
        }

        if !any {
            section.lines.clear();
            section.line("  No missing values.");
        }
        report.sections.push(section);
    }

    fn check_duplicates(&self, raw: &RawColumns, report: &mut QualityReport) {
        let mut section = ReportSection::new("DUPLICATES");

        let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(raw.height);
        let mut full_row_dupes = 0;
        for i in 0..raw.height {
            let row: Vec<Option<&str>> = raw
                .names
                .iter()
                .map(|name| raw.get(name).and_then(|v| v[i].as_deref()))
                .collect();
            if !seen.insert(row) {
                full_row_dupes += 1;
            }
        }
        section.line(format!(
            "  Full-row duplicates: {}",
            format_thousands(full_row_dupes)
        ));
        if full_row_dupes > 0 {
            report.warnings.push(AnomalyWarning::new(
                AnomalyCategory::DuplicateRows,
                None,
                full_row_dupes,
                format!("{} rows repeat an earlier row exactly", full_row_dupes),
            ));
        }

        let policy_col = &self.config.columns.policy_id;
        if let Some(ids) = raw.get(policy_col) {
            let repeated = repeated_ids(ids);
            let extra: usize = repeated.iter().map(|(_, n)| n - 1).sum();
            section.line(format!(
                "  Duplicate {}: {}",
                policy_col,
                format_thousands(extra)
            ));
            if !repeated.is_empty() {
                report.warnings.push(AnomalyWarning::new(
                    AnomalyCategory::DuplicatePolicies,
                    Some(policy_col),
                    repeated.len(),
                    format!("{} policy ids appear on more than one row", repeated.len()),
                ));
            }
        }

        let customer_col = &self.config.columns.customer_id;
        if let Some(ids) = raw.get(customer_col) {
            let repeated = repeated_ids(ids);
            let rows: usize = repeated.iter().map(|(_, n)| n).sum();
            section.line(format!(
                "  Customers with multiple rows: {} ({} rows)",
                format_thousands(repeated.len()),
                format_thousands(rows)
            ));
            for (id, count) in repeated.iter().take(TOP_DUPLICATES) {
                section.line(format!("    {:<20} {} rows", truncate_str(id, 20), count));
            }
            if !repeated.is_empty() {
                report.warnings.push(AnomalyWarning::new(
                    AnomalyCategory::DuplicateCustomers,
                    Some(customer_col),
                    repeated.len(),
                    format!(
                        "{} customer ids appear on more than one row",
                        repeated.len()
                    ),
                ));
            }
        }

        report.sections.push(section);
    }

    fn check_impossible_values(&self, raw: &RawColumns, report: &mut QualityReport) {
        let cols = &self.config.columns;
        let mut section = ReportSection::new("IMPOSSIBLE VALUES");
        let mut findings: Vec<(Option<String>, usize, String)> = Vec::new();

        let range_checks: [(&str, fn(f64) -> bool, &str); 11] = [
            (cols.age.as_str(), |v| !(18.0..=120.0).contains(&v), "not in [18, 120]"),
            ("num_dependents", |v| v < 0.0, "< 0"),
            (cols.coverage.as_str(), |v| v <= 0.0, "<= 0"),
            (cols.premium.as_str(), |v| v <= 0.0, "<= 0"),
            (cols.tenure.as_str(), |v| v < 0.0, "< 0"),
            ("renewal_count", |v| v < 0.0, "< 0"),
            ("num_riders", |v| v < 0.0, "< 0"),
            ("late_payment_count", |v| v < 0.0, "< 0"),
            ("customer_service_calls", |v| v < 0.0, "< 0"),
            ("premium_change_pct", |v| !(-1.0..=1.0).contains(&v), "not in [-1, 1]"),
            (cols.discount_rate.as_str(), |v| !(0.0..=1.0).contains(&v), "not in [0, 1]"),
        ];

        for (col, is_impossible, label) in range_checks {
            let Some(numbers) = raw.numbers(col) else {
                continue;
            };
            let n = numbers.iter().flatten().filter(|v| is_impossible(**v)).count();
            if n > 0 {
                findings.push((Some(col.to_string()), n, format!("{} {}", col, label)));
            }
        }

        if let (Some(starts), Some(ends)) = (
            raw.get(&cols.policy_start_date),
            raw.get(&cols.policy_end_date),
        ) {
            let n = starts
                .iter()
                .zip(ends)
                .filter(|(s, e)| {
                    match (
                        s.as_deref().and_then(parse_date),
                        e.as_deref().and_then(parse_date),
                    ) {
                        (Some(start), Some(end)) => end < start,
                        _ => false,
                    }
                })
                .count();
            if n > 0 {
                findings.push((
                    Some(cols.policy_end_date.clone()),
                    n,
                    format!("{} before {}", cols.policy_end_date, cols.policy_start_date),
                ));
            }
        }

        if let (Some(flags), Some(ends)) = (raw.flags(&cols.churn), raw.get(&cols.policy_end_date))
        {
            let has_end: Vec<bool> = ends
                .iter()
                .map(|e| e.as_deref().and_then(parse_date).is_some())
                .collect();
            push_inconsistency(
                &mut findings,
                &cols.policy_end_date,
                flags.iter().zip(&has_end).filter(|(f, e)| **f == Some(true) && !**e).count(),
                format!("{} = true but {} missing", cols.churn, cols.policy_end_date),
            );
            push_inconsistency(
                &mut findings,
                &cols.policy_end_date,
                flags.iter().zip(&has_end).filter(|(f, e)| **f == Some(false) && **e).count(),
                format!("{} present but {} = false", cols.policy_end_date, cols.churn),
            );
        }

        if let (Some(flags), Some(rate_missing)) = (
            raw.flags(&cols.discount_applied),
            raw.missing_mask(&cols.discount_rate),
        ) {
            push_inconsistency(
                &mut findings,
                &cols.discount_rate,
                flags.iter().zip(&rate_missing).filter(|(f, m)| **f == Some(true) && **m).count(),
                format!("{} = true but {} missing", cols.discount_applied, cols.discount_rate),
            );
            push_inconsistency(
                &mut findings,
                &cols.discount_rate,
                flags.iter().zip(&rate_missing).filter(|(f, m)| **f == Some(false) && !**m).count(),
                format!("{} present but {} = false", cols.discount_rate, cols.discount_applied),
            );
        }

        if let (Some(channels), Some(agent_missing)) = (
            raw.get(&cols.acquisition_channel),
            raw.missing_mask(&cols.agent_id),
        ) {
            let agent: Vec<bool> = channels.iter().map(|c| is_agent(c.as_deref())).collect();
            push_inconsistency(
                &mut findings,
                &cols.agent_id,
                agent.iter().zip(&agent_missing).filter(|(a, m)| **a && **m).count(),
                format!("{} = Agent but {} missing", cols.acquisition_channel, cols.agent_id),
            );
            push_inconsistency(
                &mut findings,
                &cols.agent_id,
                agent.iter().zip(&agent_missing).filter(|(a, m)| !**a && !**m).count(),
                format!("{} present but {} != Agent", cols.agent_id, cols.acquisition_channel),
            );
        }

        if findings.is_empty() {
            section.line("  No impossible values detected.");
        }
        for (column, count, label) in findings {
            section.line(format!("  {}: {}", label, format_thousands(count)));
            report.warnings.push(AnomalyWarning::new(
                AnomalyCategory::ImpossibleValue,
                column.as_deref(),
                count,
                format!("{} rows with {}", count, label),
            ));
        }
        report.sections.push(section);
    }

    fn check_outliers(&self, raw: &RawColumns, report: &mut QualityReport) {
        let mut section = ReportSection::new("OUTLIERS (IQR METHOD)");
        section.line(format!(
            "  {:<28} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8} {:>6}",
            "Column", "Q1", "Q3", "IQR", "Lower", "Upper", "Outliers", "%"
        ));

        for col in self.config.numeric_columns() {
            let Some(numbers) = raw.numbers(&col) else {
                continue;
            };
            let sorted = sorted_floats(numbers.into_iter().flatten().collect());
            let (Some(q1), Some(q3)) = (quantile(&sorted, 0.25), quantile(&sorted, 0.75)) else {
                continue;
            };
            let iqr = q3 - q1;
            if iqr == 0.0 {
                continue;
            }
            let lower = q1 - 1.5 * iqr;
            let upper = q3 + 1.5 * iqr;
            let n_out = sorted.iter().filter(|v| **v < lower || **v > upper).count();
            let pct = percent(n_out, sorted.len());
            let flag = if n_out > 0 { "  <--" } else { "" };

            section.line(format!(
                "  {:<28} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>8} {:>5.1}%{}",
                col,
                q1,
                q3,
                iqr,
                lower,
                upper,
                format_thousands(n_out),
                pct,
                flag
            ));

            if n_out > 0 {
                report.warnings.push(AnomalyWarning::new(
                    AnomalyCategory::Outlier,
                    Some(&col),
                    n_out,
                    format!(
                        "{} values in '{}' outside [{:.2}, {:.2}]",
                        n_out, col, lower, upper
                    ),
                ));
            }
        }
        report.sections.push(section);
    }

    fn check_spelling(&self, raw: &RawColumns, report: &mut QualityReport) {
        let mut section = ReportSection::new("SPELLING VARIANTS");

        for col in &self.config.categorical_columns {
            let Some(values) = raw.get(col) else {
                continue;
            };
            let allowed = self.config.allowed_values.get(col).map(Vec::as_slice);
            let canonical = canonical_spellings(values, allowed);

            let mut variants: BTreeMap<String, BTreeMap<&str, usize>> = BTreeMap::new();
            for value in values.iter().flatten() {
                if value.trim().is_empty() {
                    continue;
                }
                *variants
                    .entry(spelling_key(value))
                    .or_default()
                    .entry(value.as_str())
                    .or_insert(0) += 1;
            }

            for (key, spellings) in &variants {
                if spellings.len() < 2 {
                    continue;
                }
                let target = canonical.get(key).map(String::as_str).unwrap_or(key.as_str());
                let rewritten: usize = spellings
                    .iter()
                    .filter(|(s, _)| **s != target)
                    .map(|(_, n)| n)
                    .sum();
                let listed: Vec<String> = spellings
                    .iter()
                    .map(|(s, n)| format!("'{}' ({})", s, n))
                    .collect();
                section.line(format!(
                    "  {}: {} -> '{}'",
                    col,
                    listed.join(", "),
                    target
                ));
                report.warnings.push(AnomalyWarning::new(
                    AnomalyCategory::InconsistentSpelling,
                    Some(col),
                    rewritten,
                    format!(
                        "'{}' is spelled {} ways in '{}'",
                        target,
                        spellings.len(),
                        col
                    ),
                ));
            }
        }

        if section.lines.is_empty() {
            section.line("  No spelling variants detected.");
        }
        report.sections.push(section);
    }

    fn check_invalid_values(&self, raw: &RawColumns, report: &mut QualityReport) {
        let mut section = ReportSection::new("INVALID VALUES");

        for (col, allowed) in &self.config.allowed_values {
            let Some(values) = raw.get(col) else {
                continue;
            };
            let keys: HashSet<String> = allowed.iter().map(|a| spelling_key(a)).collect();
            let mut invalid: BTreeMap<String, usize> = BTreeMap::new();
            for value in values.iter().flatten() {
                if value.trim().is_empty() || keys.contains(&spelling_key(value)) {
                    continue;
                }
                *invalid.entry(normalize_whitespace(value)).or_insert(0) += 1;
            }
            if invalid.is_empty() {
                continue;
            }
            let count: usize = invalid.values().sum();
            let listed: Vec<String> = invalid
                .iter()
                .map(|(v, n)| format!("'{}' ({})", v, n))
                .collect();
            section.line(format!(
                "  {}: {} not in [{}]",
                col,
                listed.join(", "),
                allowed.join(", ")
            ));
            report.warnings.push(AnomalyWarning::new(
                AnomalyCategory::InvalidCategory,
                Some(col),
                count,
                format!("{} values in '{}' are not recognized labels", count, col),
            ));
        }

        for col in self.config.numeric_columns() {
            let Some(values) = raw.get(&col) else {
                continue;
            };
            let bad = values
                .iter()
                .flatten()
                .filter(|v| !v.trim().is_empty() && parse_numeric_string(v).is_none())
                .count();
            if bad > 0 {
                section.line(format!("  {}: {} non-numeric values", col, bad));
                report.warnings.push(AnomalyWarning::new(
                    AnomalyCategory::InvalidNumber,
                    Some(&col),
                    bad,
                    format!("{} values in '{}' are not numbers", bad, col),
                ));
            }
        }

        for col in &self.config.boolean_columns {
            let Some(values) = raw.get(col) else {
                continue;
            };
            let bad = values
                .iter()
                .flatten()
                .filter(|v| !v.trim().is_empty() && parse_flag(v).is_none())
                .count();
            if bad > 0 {
                section.line(format!("  {}: {} values are neither true nor false", col, bad));
                report.warnings.push(AnomalyWarning::new(
                    AnomalyCategory::InvalidFlag,
                    Some(col),
                    bad,
                    format!("{} values in '{}' are not flags", bad, col),
                ));
            }
        }

        if section.lines.is_empty() {
            section.line("  No invalid values detected.");
        }
        report.sections.push(section);
    }
}

fn is_agent(channel: Option<&str>) -> bool {
    channel.is_some_and(|c| spelling_key(c) == "agent")
}

fn push_inconsistency(
    findings: &mut Vec<(Option<String>, usize, String)>,
    column: &str,
    count: usize,
    label: String,
) {
    if count > 0 {
        findings.push((Some(column.to_string()), count, label));
    }
}

/// Ids seen on more than one row, most repeated first.
fn repeated_ids(ids: &[Option<String>]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for id in ids.iter().flatten() {
        let id = id.trim();
        if !id.is_empty() {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    let mut repeated: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, n)| (id.to_string(), n))
        .collect();
    repeated.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    repeated
}

/// Append "value  count  pct" lines, most frequent first.
fn push_value_counts<'v>(section: &mut ReportSection, values: impl Iterator<Item = Option<&'v str>>) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0;
    for value in values {
        total += 1;
        let label = match value {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => "<missing>".to_string(),
        };
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut ordered: Vec<(String, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (value, count) in ordered {
        section.line(format!(
            "    {:<30} {:>8}  {:>6.2}%",
            truncate_str(&value, 30),
            format_thousands(count),
            percent(count, total)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(df: &DataFrame) -> QualityReport {
        let config = PipelineConfig::default();
        DataQualityAnalyzer::new(&config)
            .analyze(df, "policies.csv")
            .unwrap()
    }

    fn warnings_for(report: &QualityReport, category: AnomalyCategory) -> Vec<&AnomalyWarning> {
        report
            .warnings
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    #[test]
    fn test_infer_kind() {
        let values = |v: &[&str]| v.iter().map(|s| Some(s.to_string())).collect::<Vec<_>>();
        assert_eq!(InferredKind::infer(&values(&["1", "2"])), InferredKind::Integer);
        assert_eq!(InferredKind::infer(&values(&["1.5", "2"])), InferredKind::Decimal);
        assert_eq!(InferredKind::infer(&values(&["True", "False"])), InferredKind::Boolean);
        assert_eq!(InferredKind::infer(&values(&["2020-01-01"])), InferredKind::Date);
        assert_eq!(InferredKind::infer(&values(&["Term", "1"])), InferredKind::Text);
        assert_eq!(InferredKind::infer(&[None]), InferredKind::Empty);
    }

    #[test]
    fn test_missing_values_warned() {
        let df = df![
            "customer_id" => ["C1", "C2", "C3"],
            "country" => [Some("UK"), None, Some(" ")],
        ]
        .unwrap();
        let report = analyze(&df);

        let missing = warnings_for(&report, AnomalyCategory::MissingValues);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].column.as_deref(), Some("country"));
        assert_eq!(missing[0].count, 2);
    }

    #[test]
    fn test_structurally_missing_end_date_is_justified() {
        let df = df![
            "customer_id" => ["C1", "C2"],
            "churned" => ["True", "False"],
            "policy_end_date" => [Some("2022-01-01"), None],
        ]
        .unwrap();
        let report = analyze(&df);

        assert!(warnings_for(&report, AnomalyCategory::MissingValues).is_empty());
        let section = report
            .sections
            .iter()
            .find(|s| s.title == "MISSING VALUES")
            .unwrap();
        assert!(section.lines.iter().any(|l| l.contains("only where churned = false")));
    }

    #[test]
    fn test_duplicate_customers() {
        let df = df![
            "customer_id" => ["C1", "C1", "C2", "C1"],
            "policy_id" => ["P1", "P2", "P3", "P4"],
        ]
        .unwrap();
        let report = analyze(&df);

        let dupes = warnings_for(&report, AnomalyCategory::DuplicateCustomers);
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].count, 1);
        assert!(!report.has_warning(AnomalyCategory::DuplicatePolicies));
        assert!(!report.has_warning(AnomalyCategory::DuplicateRows));
    }

    #[test]
    fn test_full_row_duplicates() {
        let df = df![
            "customer_id" => ["C1", "C1"],
            "premium" => ["10", "10"],
        ]
        .unwrap();
        let report = analyze(&df);
        assert_eq!(warnings_for(&report, AnomalyCategory::DuplicateRows)[0].count, 1);
    }

    #[test]
    fn test_impossible_values() {
        let df = df![
            "customer_id" => ["C1", "C2", "C3"],
            "customer_age" => ["17", "40", "130"],
            "premium" => ["0", "100", "200"],
            "churned" => ["True", "False", "False"],
            "policy_end_date" => [None, Some("2021-01-01"), None],
        ]
        .unwrap();
        let report = analyze(&df);
        let impossible = warnings_for(&report, AnomalyCategory::ImpossibleValue);

        let count_for = |needle: &str| {
            impossible
                .iter()
                .find(|w| w.message.contains(needle))
                .map(|w| w.count)
        };
        assert_eq!(count_for("customer_age not in [18, 120]"), Some(2));
        assert_eq!(count_for("premium <= 0"), Some(1));
        assert_eq!(count_for("churned = true but policy_end_date missing"), Some(1));
        assert_eq!(count_for("policy_end_date present but churned = false"), Some(1));
    }

    #[test]
    fn test_outliers_skip_zero_iqr() {
        let df = df![
            "tenure_months" => ["10", "10", "10", "10", "500"],
            "premium" => ["10", "11", "12", "13", "1000"],
        ]
        .unwrap();
        let report = analyze(&df);
        let outliers = warnings_for(&report, AnomalyCategory::Outlier);

        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].column.as_deref(), Some("premium"));
        assert_eq!(outliers[0].count, 1);
    }

    #[test]
    fn test_spelling_variants_reported() {
        let df = df![
            "customer_id" => ["C1", "C1", "C2"],
            "payment_frequency" => ["Monthly", "MONTHLY", " monthly "],
        ]
        .unwrap();
        let report = analyze(&df);
        let spelling = warnings_for(&report, AnomalyCategory::InconsistentSpelling);

        assert_eq!(spelling.len(), 1);
        assert_eq!(spelling[0].count, 2);
        assert!(spelling[0].message.contains("'Monthly'"));
    }

    #[test]
    fn test_invalid_categories_and_numbers() {
        let df = df![
            "customer_id" => ["C1", "C2", "C3"],
            "payment_frequency" => ["Monthly", "Weekly", "weekly"],
            "premium" => ["100", "abc", ""],
            "churned" => ["True", "maybe", "False"],
        ]
        .unwrap();
        let report = analyze(&df);

        let invalid = warnings_for(&report, AnomalyCategory::InvalidCategory);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].count, 2);
        assert_eq!(warnings_for(&report, AnomalyCategory::InvalidNumber)[0].count, 1);
        assert_eq!(warnings_for(&report, AnomalyCategory::InvalidFlag)[0].count, 1);
    }

    #[test]
    fn test_empty_dataset_has_all_sections() {
        let df = df![
            "customer_id" => Vec::<String>::new(),
            "churned" => Vec::<String>::new(),
        ]
        .unwrap();
        let report = analyze(&df);
        assert_eq!(report.sections.len(), 9);
        assert!(report.warnings.is_empty());
    }
}
