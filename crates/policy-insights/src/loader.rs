//! CSV input and output.
//!
//! Every column is read as text; typing is the cleaning stage's job, so a
//! stray "N/A" in a numeric column becomes a reported anomaly instead of a
//! parse failure.

use crate::error::{AnalysisError, Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Load a CSV with a header row, all columns as strings.
///
/// A file with no content at all yields an empty DataFrame so that schema
/// validation reports the absent columns.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(AnalysisError::InputNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .context(format!("Reading {}", path.display()))?;
    if content.trim().is_empty() {
        debug!("{} is empty", path.display());
        return Ok(DataFrame::empty());
    }

    // Malformed quoting is a parse error, never rewritten
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .into_reader_with_file_handle(Cursor::new(content))
        .finish()
        .context(format!("Parsing {}", path.display()))?;

    info!("Loaded {}: {:?}", path.display(), df.shape());
    Ok(df)
}

/// Write a DataFrame as CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).context(format!("Creating {}", path.display()))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .context(format!("Writing {}", path.display()))?;

    info!("Dataset saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::string_values;

    #[test]
    fn test_load_reads_everything_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policies.csv");
        std::fs::write(&path, "customer_id,premium,churned\nC1,120.5,True\nC2,,False\n").unwrap();

        let df = load_csv(&path).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("premium").unwrap().dtype(), &DataType::String);
        assert_eq!(
            string_values(&df, "churned").unwrap(),
            vec![Some("True".to_string()), Some("False".to_string())]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_csv(&dir.path().join("absent.csv")).unwrap_err();
        assert_eq!(err.error_code(), "INPUT_NOT_FOUND");
    }

    #[test]
    fn test_load_empty_file_has_no_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policies.csv");
        std::fs::write(&path, "").unwrap();

        let df = load_csv(&path).unwrap();
        assert_eq!(df.width(), 0);
    }

    #[test]
    fn test_load_keeps_escaped_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policies.csv");
        std::fs::write(&path, "customer_id,churn_reason\nC1,\"said \"\"too dear\"\"\"\n").unwrap();

        let df = load_csv(&path).unwrap();
        assert_eq!(
            string_values(&df, "churn_reason").unwrap(),
            vec![Some("said \"too dear\"".to_string())]
        );
    }

    #[test]
    fn test_load_ragged_row_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policies.csv");
        std::fs::write(&path, "customer_id,churned\nC1,True,extra,fields\n").unwrap();

        let err = load_csv(&path).unwrap_err();
        assert_eq!(err.error_code(), "POLARS_ERROR");
        assert!(err.to_string().contains("policies.csv"));
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut df = df![
            "customer_id" => ["C1", "C2"],
            "tenure_months" => [3i64, 40],
        ]
        .unwrap();

        write_csv(&mut df, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("customer_id,tenure_months\n"));
        assert!(written.contains("C2,40"));
    }
}
