//! CLI entry point for the policy analysis pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use policy_insights::analysis::{render_group_table, render_price_table};
use policy_insights::{AnalysisError, Pipeline, PipelineConfig, RunSummary};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Data-quality checks and churn analysis for insurance policy datasets",
    long_about = "Reads a policy CSV, writes a standardized copy plus a data-quality \
                  report, then reports churn rates per feature and price-per-coverage \
                  by product type, with PNG charts.\n\n\
                  EXAMPLES:\n  \
                  # Read ./policies.csv and write outputs next to it\n  \
                  policy-insights\n\n  \
                  # Explicit paths, no charts\n  \
                  policy-insights -i data/policies.csv -o out/ --no-charts\n\n  \
                  # Custom column roles and churn features\n  \
                  policy-insights --config columns.json --json"
)]
struct Args {
    /// Path to the raw policy CSV [default: policies.csv]
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory for the standardized CSV, reports and charts [default: .]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON file with pipeline configuration overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the summary)
    #[arg(short, long)]
    quiet: bool,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,

    /// Print the run summary as JSON instead of the human-readable summary
    ///
    /// Disables all logs so stdout only carries the JSON document.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;
    let mut builder = Pipeline::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    match pipeline.run() {
        Ok(summary) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_human_readable_summary(&summary);
            }
            match summary.analysis_error {
                None => Ok(()),
                Some(e) => Err(anyhow!("Analysis failed: {}", e)),
            }
        }
        Err(e) => {
            if args.json {
                print_json_error(&e)?;
            }
            error!("Pipeline failed: {}", e);
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

/// Defaults, then the `--config` file, then individual flags.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if args.no_charts {
        config.render_charts = false;
    }
    Ok(config)
}

fn print_json_error(error: &AnalysisError) -> Result<()> {
    let body = serde_json::json!({ "success": false, "error": error });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Print a human-readable summary of the run.
///
/// This is the default output when `--json` is not given.
fn print_human_readable_summary(summary: &RunSummary) {
    let cleaning = &summary.cleaning;

    println!();
    println!("{}", "=".repeat(80));
    println!("POLICY ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        summary.input_file, cleaning.rows_before, cleaning.columns_before
    );
    println!(
        "Output: {} rows x {} columns ({} customers)",
        cleaning.rows_after, cleaning.columns_after, cleaning.customers
    );
    println!("Duration: {}ms", summary.duration_ms);
    println!();

    println!("Cleaning:");
    for action in &cleaning.actions {
        println!("  - {}", action);
    }
    println!();

    println!("Anomalies: {} recorded in the quality report", summary.anomalies.len());
    println!();

    if let Some(analysis) = &summary.analysis {
        println!(
            "Churn: {} of {} policies ({:.1}%)",
            analysis.churned,
            analysis.policies,
            analysis.overall_churn_rate * 100.0
        );
        println!();
        print!(
            "{}",
            render_group_table(
                "Churn by Acquisition Channel",
                &analysis.acquisition_channel,
                analysis.overall_churn_rate
            )
        );
        println!();
        print!("{}", render_price_table(&analysis.price_per_coverage));
        println!();

        println!("Charts:");
        for chart in &analysis.charts {
            println!("  - {}", chart.describe());
        }
        println!();
    }

    if let Some(error) = &summary.analysis_error {
        println!("Analysis failed: {}", error);
        println!();
    }

    println!("Files written:");
    for output in &summary.outputs {
        println!("  {}", output);
    }
    println!();
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
