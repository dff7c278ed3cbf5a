//! Data sanitization functions for cleaning values.

use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Trim text cells, strip wrapping quotes, and turn blank cells into nulls.
///
/// Returns the sanitized frame and the number of cells that changed.
pub(crate) fn sanitize_text_columns(df: DataFrame) -> Result<(DataFrame, usize)> {
    let mut df = df;
    let column_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut changed = 0;
    for col_name in &column_names {
        let series = df.column(col_name)?.as_materialized_series();
        if series.dtype() != &DataType::String {
            continue;
        }

        let str_series = series.str()?;
        let mut cleaned_values: Vec<Option<String>> = Vec::with_capacity(str_series.len());
        let mut column_changed = 0;

        for opt_val in str_series.into_iter() {
            match opt_val {
                Some(val) => {
                    let cleaned = strip_wrapping_quotes(val);
                    if cleaned != val {
                        column_changed += 1;
                    }
                    if cleaned.is_empty() {
                        cleaned_values.push(None);
                    } else {
                        cleaned_values.push(Some(cleaned));
                    }
                }
                None => cleaned_values.push(None),
            }
        }

        if column_changed > 0 {
            changed += column_changed;
            let cleaned_series = Series::new(col_name.as_str().into(), cleaned_values);
            df.replace(col_name, cleaned_series)?;
        }
    }

    debug!("Sanitized {} text cells", changed);
    Ok((df, changed))
}

/// Remove surrounding whitespace and any quotes wrapped around the whole
/// value ("\"Monthly\"" -> "Monthly").
pub(crate) fn strip_wrapping_quotes(value: &str) -> String {
    let mut cleaned = value.trim();

    // Bounded so a pathological cell cannot loop forever
    for _ in 0..10 {
        let unwrapped = ['"', '\'']
            .iter()
            .find(|q| cleaned.len() >= 2 && cleaned.starts_with(**q) && cleaned.ends_with(**q))
            .map(|_| cleaned[1..cleaned.len() - 1].trim());

        match unwrapped {
            Some(inner) => cleaned = inner,
            None => break,
        }
    }

    cleaned.to_string()
}
