//! PNG charts drawn with plotters.
//!
//! A chart that cannot be drawn (no data, missing fonts, unwritable path)
//! never fails the run: the outcome is recorded and shown in the churn
//! report instead.

use crate::analysis::{Analysis, PriceSample};
use crate::config::PipelineConfig;
use crate::error::AnalysisError;
use crate::types::{ChartOutcome, ChartStatus, ChurnGroup};
use anyhow::Result;
use plotters::prelude::*;
use std::path::Path;
use tracing::{info, warn};

const ABOVE_COLOR: RGBColor = RGBColor(0xE8, 0xD1, 0x80);
const BELOW_COLOR: RGBColor = RGBColor(0xC5, 0xD4, 0xB0);
const PRODUCT_COLORS: [RGBColor; 3] = [
    RGBColor(0xC5, 0xD4, 0xB0),
    RGBColor(0xE8, 0xD1, 0x80),
    RGBColor(0xB0, 0xC4, 0xD4),
];
const TEXT_COLOR: RGBColor = RGBColor(0x33, 0x33, 0x33);

/// Render the tenure, payment-frequency and price charts and record what
/// happened to each in the analysis summary.
pub fn render_charts(analysis: &mut Analysis, config: &PipelineConfig) {
    let summary = &analysis.summary;
    let overall = summary.overall_churn_rate;
    let files = &config.files;

    let tenure_title = if config.tenure_bin_months % 12 == 0 {
        format!(
            "Churn Rate by Tenure ({}-year buckets)",
            config.tenure_bin_months / 12
        )
    } else {
        format!(
            "Churn Rate by Tenure ({}-month buckets)",
            config.tenure_bin_months
        )
    };

    let charts = vec![
        chart_outcome(
            config,
            &files.tenure_chart,
            summary.tenure_buckets.is_empty(),
            |path| {
                draw_churn_bars(
                    path,
                    (1200, 600),
                    &tenure_title,
                    "Tenure",
                    &summary.tenure_buckets,
                    overall,
                )
            },
        ),
        chart_outcome(
            config,
            &files.payment_chart,
            summary.payment_frequency.is_empty(),
            |path| {
                draw_churn_bars(
                    path,
                    (700, 500),
                    "Payment Frequency: Churn Rate",
                    "Payment Frequency",
                    &summary.payment_frequency,
                    overall,
                )
            },
        ),
        chart_outcome(
            config,
            &files.price_chart,
            analysis.price_samples.is_empty(),
            |path| draw_price_boxplot(path, &analysis.price_samples),
        ),
    ];

    analysis.summary.charts = charts;
}

fn chart_outcome(
    config: &PipelineConfig,
    file: &str,
    no_data: bool,
    draw: impl FnOnce(&Path) -> Result<()>,
) -> ChartOutcome {
    let status = if !config.render_charts {
        ChartStatus::Disabled
    } else if no_data {
        info!("Skipping {}: no data", file);
        ChartStatus::Skipped("no data".to_string())
    } else {
        let path = config.output_path(file);
        match draw(path.as_path()) {
            Ok(()) => {
                info!("Chart saved: {}", path.display());
                ChartStatus::Rendered
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(
                    "{}",
                    AnalysisError::Render {
                        chart: file.to_string(),
                        reason: reason.clone(),
                    }
                );
                ChartStatus::Failed(reason)
            }
        }
    };

    ChartOutcome {
        file: file.to_string(),
        status,
    }
}

/// Bar chart of churn rate per group, coloured above/below the overall
/// average, with the average drawn as a horizontal line.
pub fn draw_churn_bars(
    path: &Path,
    size: (u32, u32),
    title: &str,
    x_desc: &str,
    groups: &[ChurnGroup],
    overall: f64,
) -> Result<()> {
    let labels: Vec<&str> = groups.iter().map(|g| g.value.as_str()).collect();
    let rates: Vec<f64> = groups.iter().map(|g| g.rate() * 100.0).collect();
    let average = overall * 100.0;
    let n = groups.len() as u32;
    let y_max = (rates.iter().copied().fold(average, f64::max) * 1.25).max(1.0);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_desc(x_desc)
        .y_desc("Churn Rate (%)")
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => labels
                .get(*i as usize)
                .map(|l| l.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .y_label_formatter(&|y| format!("{:.0}", y))
        .draw()?;

    let bar = |i: usize, rate: f64, color: RGBColor| {
        let mut rect = Rectangle::new(
            [
                (SegmentValue::Exact(i as u32), 0.0),
                (SegmentValue::Exact(i as u32 + 1), rate),
            ],
            color.filled(),
        );
        rect.set_margin(0, 0, 6, 6);
        rect
    };

    chart
        .draw_series(
            rates
                .iter()
                .enumerate()
                .filter(|(_, rate)| **rate > average)
                .map(|(i, rate)| bar(i, *rate, ABOVE_COLOR)),
        )?
        .label("Above average")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], ABOVE_COLOR.filled()));

    chart
        .draw_series(
            rates
                .iter()
                .enumerate()
                .filter(|(_, rate)| **rate <= average)
                .map(|(i, rate)| bar(i, *rate, BELOW_COLOR)),
        )?
        .label("Below average")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], BELOW_COLOR.filled()));

    chart.draw_series(rates.iter().enumerate().map(|(i, rate)| {
        Text::new(
            format!("{:.1}%", rate),
            (SegmentValue::CenterOf(i as u32), rate + y_max * 0.03),
            ("sans-serif", 14).into_font().color(&TEXT_COLOR),
        )
    }))?;

    chart
        .draw_series(LineSeries::new(
            vec![
                (SegmentValue::Exact(0), average),
                (SegmentValue::Exact(n), average),
            ],
            BLACK.stroke_width(2),
        ))?
        .label(format!("Overall avg: {:.1}%", average))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 12, y)], BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Box plot of price per coverage (x 0.001) per product type, with the mean
/// marked as a dot.
pub fn draw_price_boxplot(path: &Path, samples: &[PriceSample]) -> Result<()> {
    let labels: Vec<String> = samples.iter().map(|s| s.product_type.clone()).collect();
    let y_max = samples
        .iter()
        .flat_map(|s| s.ratios.iter().copied())
        .fold(0.0f64, f64::max)
        * 1.1;
    let y_max = if y_max > 0.0 { y_max as f32 } else { 1.0 };

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Price-per-Coverage by Product Type", ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(labels[..].into_segmented(), 0f32..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Premium per Unit of Coverage (x 0.001)")
        .y_label_formatter(&|y| format!("{:.2}", y))
        .draw()?;

    for (i, sample) in samples.iter().enumerate() {
        let color = PRODUCT_COLORS[i % PRODUCT_COLORS.len()];
        let quartiles = Quartiles::new(sample.ratios.as_slice());
        chart.draw_series(std::iter::once(
            Boxplot::new_vertical(SegmentValue::CenterOf(&labels[i]), &quartiles)
                .width(40)
                .whisker_width(0.5)
                .style(color.stroke_width(2)),
        ))?;

        let mean = sample.ratios.iter().sum::<f64>() / sample.ratios.len().max(1) as f64;
        chart.draw_series(std::iter::once(Circle::new(
            (SegmentValue::CenterOf(&labels[i]), mean as f32),
            4,
            TEXT_COLOR.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalysisSummary;

    fn analysis() -> Analysis {
        Analysis {
            summary: AnalysisSummary::default(),
            price_samples: Vec::new(),
        }
    }

    #[test]
    fn test_disabled_charts() {
        let config = PipelineConfig::builder().render_charts(false).build().unwrap();
        let mut analysis = analysis();
        render_charts(&mut analysis, &config);

        assert_eq!(analysis.summary.charts.len(), 3);
        assert!(
            analysis
                .summary
                .charts
                .iter()
                .all(|c| c.status == ChartStatus::Disabled)
        );
    }

    #[test]
    fn test_empty_data_skips_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .output_dir(dir.path())
            .build()
            .unwrap();
        let mut analysis = analysis();
        render_charts(&mut analysis, &config);

        let files: Vec<&str> = analysis.summary.charts.iter().map(|c| c.file.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "tenure_churn_histogram.png",
                "risky_payment.png",
                "price_per_coverage_plot.png"
            ]
        );
        assert!(
            analysis
                .summary
                .charts
                .iter()
                .all(|c| c.status == ChartStatus::Skipped("no data".to_string()))
        );
        assert!(!dir.path().join("risky_payment.png").exists());
    }

    fn group(value: &str, total: usize, churned: usize) -> ChurnGroup {
        ChurnGroup {
            value: value.to_string(),
            total,
            churned,
        }
    }

    fn sample(product_type: &str, ratios: &[f64]) -> PriceSample {
        PriceSample {
            product_type: product_type.to_string(),
            ratios: ratios.to_vec(),
        }
    }

    /// Drawing needs system fonts, so a `Failed` outcome is accepted as long
    /// as nothing else went wrong.
    fn assert_drawn_or_failed(dir: &Path, analysis: &Analysis) {
        assert_eq!(analysis.summary.charts.len(), 3);
        for chart in &analysis.summary.charts {
            match &chart.status {
                ChartStatus::Rendered => {
                    assert!(dir.join(&chart.file).exists(), "{} missing", chart.file)
                }
                ChartStatus::Failed(reason) => assert!(!reason.is_empty()),
                other => panic!("{} was {:?}", chart.file, other),
            }
        }
    }

    #[test]
    fn test_render_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .output_dir(dir.path())
            .build()
            .unwrap();
        let mut analysis = analysis();
        analysis.summary.overall_churn_rate = 0.4;
        analysis.summary.tenure_buckets = vec![
            group("0-1yr", 10, 6),
            group("1-2yr", 8, 3),
            group("2-3yr", 5, 1),
        ];
        analysis.summary.payment_frequency = vec![
            group("Monthly", 12, 7),
            group("Quarterly", 6, 2),
            group("Annual", 5, 1),
        ];
        analysis.price_samples = vec![
            sample("Term", &[1.2, 1.0, 0.9, 1.5]),
            sample("Whole", &[3.6, 4.5, 3.9]),
            sample("Universal", &[2.1, 2.4]),
        ];

        render_charts(&mut analysis, &config);
        assert_drawn_or_failed(dir.path(), &analysis);
    }

    #[test]
    fn test_render_zero_churn_and_single_price() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .output_dir(dir.path())
            .build()
            .unwrap();
        let mut analysis = analysis();
        analysis.summary.tenure_buckets = vec![group("0-1yr", 3, 0), group("1-2yr", 2, 0)];
        analysis.summary.payment_frequency = vec![group("Annual", 5, 0)];
        analysis.price_samples = vec![sample("Term", &[1.0])];

        render_charts(&mut analysis, &config);
        assert_drawn_or_failed(dir.path(), &analysis);
    }
}
