//! The batch pipeline: quality checks and cleaning, then churn analysis.

use crate::analysis::{analyze, render_churn_report};
use crate::charts::render_charts;
use crate::cleaner::{CleanedData, DataCleaner, cleaning_section};
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{AnalysisError, Result, ResultExt};
use crate::loader::{load_csv, write_csv};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::quality::{DataQualityAnalyzer, render_quality_report, validate_schema};
use crate::types::{AnalysisSummary, ChartStatus, RunSummary};
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Runs both stages over one input file.
///
/// The cleaning stage must finish before anything is written, so a schema
/// or integrity failure leaves the output directory untouched. Once the
/// standardized CSV and quality report exist they are kept even if the
/// analysis stage fails.
///
/// # Example
///
/// ```rust,ignore
/// use policy_insights::{Pipeline, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .input_path("data/policies.csv")
///     .output_dir("out")
///     .build()?;
///
/// let summary = Pipeline::builder()
///     .config(config)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// A pipeline can be handed to a worker thread
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline.
    ///
    /// Fatal errors (missing input, schema, data integrity, I/O during
    /// cleaning) are returned as `Err`. An analysis failure is recorded in
    /// [`RunSummary::analysis_error`] instead.
    pub fn run(&self) -> Result<RunSummary> {
        match self.run_internal() {
            Ok(summary) => {
                match &summary.analysis_error {
                    None => self.report_progress(ProgressUpdate::complete("Pipeline completed")),
                    Some(e) => self.report_progress(ProgressUpdate::failed(e.clone())),
                }
                Ok(summary)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let config = &self.config;
        let input = &config.input_path;

        info!("Starting policy analysis of {}", input.display());
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            0.0,
            format!("Reading {}", input.display()),
        ));
        let raw = load_csv(input)?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::QualityChecks,
            0.0,
            "Validating schema...",
        ));
        validate_schema(&raw, config)?;

        let source = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        let mut report = DataQualityAnalyzer::new(config)
            .analyze(&raw, &source)
            .map_err(|e| AnalysisError::from_anyhow(e, "Quality checks"))?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::QualityChecks,
            1.0,
            format!("{} anomalies found", report.warnings.len()),
        ));

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Cleaning,
            0.0,
            "Standardizing dataset...",
        ));
        let CleanedData {
            mut data,
            summary: cleaning,
            warnings,
        } = DataCleaner::new(config).clean(raw)?;
        report.sections.push(cleaning_section(&cleaning));
        report.warnings.extend(warnings);

        std::fs::create_dir_all(&config.output_dir)
            .context(format!("Creating {}", config.output_dir.display()))?;

        let standardized = config.standardized_path();
        write_csv(&mut data, &standardized)?;

        let quality_path = config.quality_report_path();
        std::fs::write(&quality_path, render_quality_report(&report))
            .context(format!("Writing {}", quality_path.display()))?;
        info!("Quality report saved: {}", quality_path.display());

        let mut outputs = vec![
            standardized.display().to_string(),
            quality_path.display().to_string(),
        ];
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Cleaning,
            1.0,
            format!("{} rows standardized", cleaning.rows_after),
        ));

        let (analysis, analysis_error) = match self.run_analysis(&standardized, &mut outputs) {
            Ok(summary) => (Some(summary), None),
            Err(e) => {
                error!("Analysis failed: {}", e);
                (None, Some(e.to_string()))
            }
        };

        Ok(RunSummary {
            generated_at: Local::now().to_rfc3339(),
            input_file: input.display().to_string(),
            outputs,
            duration_ms: start_time.elapsed().as_millis() as u64,
            cleaning,
            anomalies: report.warnings,
            analysis,
            analysis_error,
        })
    }

    /// Analyze the standardized CSV as written, render charts and write the
    /// churn report.
    fn run_analysis(&self, standardized: &Path, outputs: &mut Vec<String>) -> Result<AnalysisSummary> {
        let config = &self.config;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Analysis,
            0.0,
            "Computing churn rates...",
        ));
        let df = load_csv(standardized).context("Reloading standardized dataset")?;
        let mut analysis =
            analyze(df, config).map_err(|e| AnalysisError::from_anyhow(e, "Analysis"))?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Charts,
            0.0,
            "Rendering charts...",
        ));
        render_charts(&mut analysis, config);
        outputs.extend(
            analysis
                .summary
                .charts
                .iter()
                .filter(|chart| chart.status == ChartStatus::Rendered)
                .map(|chart| config.output_path(&chart.file).display().to_string()),
        );

        let churn_path = config.churn_report_path();
        std::fs::write(&churn_path, render_churn_report(&analysis.summary, config))
            .context(format!("Writing {}", churn_path.display()))?;
        info!("Churn report saved: {}", churn_path.display());
        outputs.push(churn_path.display().to_string());

        Ok(analysis.summary)
    }
}

/// Builder for creating a [`Pipeline`] instance.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a custom progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline. Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}
