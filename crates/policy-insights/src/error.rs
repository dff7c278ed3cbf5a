//! Error types for the policy analysis pipeline.
//!
//! Fatal conditions (`Schema`, `DataIntegrity`) abort the run with a
//! human-readable message. Non-fatal data-quality findings never surface as
//! errors; they are collected as [`crate::types::AnomalyWarning`]s and
//! written to the quality report instead.
//!
//! Errors are serializable so the CLI can emit them in `--json` mode.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Required columns are absent or unusable.
    #[error("Schema error: {reason}")]
    Schema {
        reason: String,
        missing_columns: Vec<String>,
    },

    /// The dataset cannot support the analysis (e.g. no usable churn flags).
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// The input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A chart could not be drawn.
    #[error("Failed to render chart '{chart}': {reason}")]
    Render { chart: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Build a schema error for a set of absent columns.
    pub fn missing_columns(missing: Vec<String>) -> Self {
        AnalysisError::Schema {
            reason: format!("required columns missing: {}", missing.join(", ")),
            missing_columns: missing,
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::DataIntegrity(_) => "DATA_INTEGRITY_ERROR",
            Self::InputNotFound(_) => "INPUT_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Render { .. } => "RENDER_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error must abort the whole run.
    ///
    /// Only chart rendering failures are tolerated; the analysis stage
    /// notes them in the churn report and carries on.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Render { .. } => false,
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => true,
        }
    }

    /// Recover a typed error from an internal `anyhow` chain and attach
    /// context. Errors of unknown origin are kept as their message.
    pub fn from_anyhow(err: anyhow::Error, context: impl Into<String>) -> Self {
        let err = match err.downcast::<AnalysisError>() {
            Ok(e) => return e.with_context(context),
            Err(e) => e,
        };
        let err = match err.downcast::<polars::error::PolarsError>() {
            Ok(e) => return AnalysisError::Polars(e).with_context(context),
            Err(e) => e,
        };
        match err.downcast::<std::io::Error>() {
            Ok(e) => AnalysisError::Io(e).with_context(context),
            Err(e) => AnalysisError::Io(std::io::Error::other(format!("{:#}", e)))
                .with_context(context),
        }
    }

    /// Check if this error is a schema violation.
    pub fn is_schema_error(&self) -> bool {
        match self {
            Self::Schema { .. } => true,
            Self::WithContext { source, .. } => source.is_schema_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Io(e).with_context(context))
    }
}
