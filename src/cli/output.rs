//! Output formatting utilities

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::helpers::{format_rate, smart_round};
use crate::cli::viz;
use crate::cli::OutputFormat;
use crate::entities::density::DensityCurve;
use crate::entities::report::ConcentrationReport;
use crate::entities::threshold::ThresholdBuckets;

/// Determine the effective output format based on context
///
/// `Auto` means styled output on a terminal; otherwise TSV for lists and
/// YAML for everything else.
pub fn effective_format(format: OutputFormat, is_list: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if console::Term::stdout().is_term() {
                OutputFormat::Human
            } else if is_list {
                OutputFormat::Tsv
            } else {
                OutputFormat::Yaml
            }
        }
        other => other,
    }
}

/// Serialize as YAML or JSON
pub fn to_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).into_diagnostic(),
        _ => serde_yml::to_string(value).into_diagnostic(),
    }
}

fn delimiter(format: OutputFormat) -> u8 {
    if format == OutputFormat::Tsv {
        b'\t'
    } else {
        b','
    }
}

fn write_delimited<I>(format: OutputFormat, header: &[&str], rows: I) -> Result<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter(format))
        .from_writer(Vec::new());
    wtr.write_record(header).into_diagnostic()?;
    for row in rows {
        wtr.write_record(&row).into_diagnostic()?;
    }
    let bytes = wtr.into_inner().into_diagnostic()?;
    String::from_utf8(bytes).into_diagnostic()
}

/// Density curves as `series, application_rate, x, y` rows
pub fn report_to_delimited(report: &ConcentrationReport, format: OutputFormat) -> Result<String> {
    let curve_rows = |series: &str, rate: Option<f64>, curve: &DensityCurve| {
        let series = series.to_string();
        let rate = rate.map(|r| r.to_string()).unwrap_or_default();
        curve
            .x
            .iter()
            .zip(&curve.y)
            .map(|(x, y)| vec![series.clone(), rate.clone(), x.to_string(), y.to_string()])
            .collect::<Vec<_>>()
    };

    let mut rows = curve_rows("feedstock", None, &report.distributions.feedstock);
    rows.extend(curve_rows("soil", None, &report.distributions.soil));
    for rate in &report.concentrations {
        rows.extend(curve_rows(
            "concentration",
            Some(rate.application_rate),
            &rate.curve,
        ));
    }

    write_delimited(format, &["series", "application_rate", "x", "y"], rows)
}

pub fn thresholds_to_delimited(buckets: &ThresholdBuckets, format: OutputFormat) -> Result<String> {
    let rows = buckets.iter().map(|e| {
        vec![
            e.extraction_method.to_string(),
            e.agency.clone(),
            e.threshold.to_string(),
        ]
    });
    write_delimited(format, &["extraction_method", "agency", "threshold"], rows)
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Rate (t/ha)")]
    rate: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std Dev")]
    std_dev: String,
    #[tabled(rename = "P5")]
    p5: String,
    #[tabled(rename = "Median")]
    p50: String,
    #[tabled(rename = "P95")]
    p95: String,
}

#[derive(Tabled)]
struct ExceedanceRow {
    #[tabled(rename = "Rate (t/ha)")]
    rate: String,
    #[tabled(rename = "Agency")]
    agency: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Limit (mg/kg)")]
    threshold: String,
    #[tabled(rename = "Above")]
    percent_above: String,
}

#[derive(Tabled)]
struct ThresholdRow {
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Agency")]
    agency: String,
    #[tabled(rename = "Limit (mg/kg)")]
    threshold: String,
}

/// Styled threshold table
pub fn render_thresholds(element: &str, buckets: &ThresholdBuckets) -> String {
    if buckets.is_empty() {
        return format!("No thresholds found for {}", style(element).cyan());
    }

    let rows: Vec<ThresholdRow> = buckets
        .iter()
        .map(|e| ThresholdRow {
            method: e.extraction_method.to_string(),
            agency: e.agency.clone(),
            threshold: smart_round(e.threshold),
        })
        .collect();

    format!(
        "{} {}\n{}",
        style("Thresholds for").bold(),
        style(element).cyan(),
        Table::new(rows).with(Style::rounded())
    )
}

/// Print a report in the requested format
pub fn print_report(report: &ConcentrationReport, format: OutputFormat, plot: bool) -> Result<()> {
    let format = effective_format(format, false);
    let out = match format {
        OutputFormat::Yaml | OutputFormat::Json => to_structured(report, format)?,
        OutputFormat::Csv | OutputFormat::Tsv => report_to_delimited(report, format)?,
        OutputFormat::Human | OutputFormat::Auto => render_report(report, plot),
    };

    print!("{}", out);
    if !out.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Styled report: header, summary table, exceedances and optional plots
pub fn render_report(report: &ConcentrationReport, plot: bool) -> String {
    let mut out = Vec::new();

    out.push(style("─".repeat(60)).dim().to_string());
    out.push(format!(
        "{}: {}",
        style("Element").bold(),
        style(&report.element).cyan()
    ));
    out.push(format!(
        "{}: {}",
        style("Feedstock").bold(),
        style(report.feedstock_type).yellow()
    ));
    out.push(format!("{}: {}", style("Mode").bold(), report.mode));
    out.push(format!("{}: {}", style("Samples").bold(), report.sample_count));
    out.push(style("─".repeat(60)).dim().to_string());
    out.push(String::new());

    let summary_rows: Vec<SummaryRow> = report
        .concentrations
        .iter()
        .map(|c| SummaryRow {
            rate: format_rate(c.application_rate),
            mean: smart_round(c.summary.mean),
            std_dev: smart_round(c.summary.std_dev),
            p5: smart_round(c.summary.p5),
            p50: smart_round(c.summary.p50),
            p95: smart_round(c.summary.p95),
        })
        .collect();
    out.push(format!(
        "{}",
        style("Soil concentration after application (mg/kg):").bold()
    ));
    out.push(Table::new(summary_rows).with(Style::rounded()).to_string());

    let exceedance_rows: Vec<ExceedanceRow> = report
        .concentrations
        .iter()
        .flat_map(|c| {
            c.exceedances.iter().map(move |e| ExceedanceRow {
                rate: format_rate(c.application_rate),
                agency: e.agency.clone(),
                method: e.extraction_method.to_string(),
                threshold: smart_round(e.threshold),
                percent_above: format!("{:.1}%", e.percent_above),
            })
        })
        .collect();

    if !exceedance_rows.is_empty() {
        out.push(String::new());
        out.push(format!(
            "{}",
            style("Share of outcomes above each limit:").bold()
        ));
        out.push(Table::new(exceedance_rows).with(Style::rounded()).to_string());
    } else if report.thresholds.as_ref().is_some_and(|t| t.is_empty()) {
        out.push(String::new());
        out.push(format!("No thresholds found for {}", report.element));
    }

    if plot {
        out.push(String::new());
        out.push(render_plots(report));
    }

    out.join("\n")
}

fn render_plots(report: &ConcentrationReport) -> String {
    let mut out = Vec::new();
    let strictest = report
        .thresholds
        .as_ref()
        .and_then(|t| t.strictest())
        .map(|e| e.threshold);

    for (label, curve) in [
        ("Feedstock concentration", &report.distributions.feedstock),
        ("Background soil concentration", &report.distributions.soil),
    ] {
        if let Some(domain) = curve.domain() {
            out.push(format!("{}", style(label).bold()));
            out.push(viz::render_density_curve(
                curve,
                domain,
                viz::PLOT_WIDTH,
                viz::PLOT_HEIGHT,
                None,
            ));
            out.push(String::new());
        }
    }

    // One x scale for every rate so the shift is visible
    let domain = report
        .concentrations
        .iter()
        .filter_map(|c| c.curve.domain())
        .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)));

    if let Some(domain) = domain {
        for c in &report.concentrations {
            out.push(format!(
                "{} {} t/ha",
                style("Application rate").bold(),
                format_rate(c.application_rate)
            ));
            out.push(viz::render_density_curve(
                &c.curve,
                domain,
                viz::PLOT_WIDTH,
                viz::PLOT_HEIGHT,
                strictest,
            ));
            if let Some(limit) = strictest {
                out.push(viz::render_range_bar(&c.summary, limit));
            }
            out.push(String::new());
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::threshold::{ExtractionMethod, ThresholdEntry};

    fn buckets() -> ThresholdBuckets {
        ThresholdBuckets {
            total: vec![ThresholdEntry {
                agency: "EPA, Region 9".to_string(),
                extraction_method: ExtractionMethod::Total,
                threshold: 1400.0,
            }],
            aqua_regia: vec![],
            other_strong_acid: vec![ThresholdEntry {
                agency: "Lab".to_string(),
                extraction_method: ExtractionMethod::OtherStrongAcid,
                threshold: 30.0,
            }],
        }
    }

    #[test]
    fn test_explicit_format_kept() {
        assert_eq!(effective_format(OutputFormat::Json, true), OutputFormat::Json);
        assert_eq!(effective_format(OutputFormat::Csv, false), OutputFormat::Csv);
    }

    #[test]
    fn test_thresholds_csv_quotes_commas() {
        let csv = thresholds_to_delimited(&buckets(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "extraction_method,agency,threshold");
        assert_eq!(lines[1], "total,\"EPA, Region 9\",1400");
        assert_eq!(lines[2], "other strong acid,Lab,30");
    }

    #[test]
    fn test_thresholds_tsv() {
        let tsv = thresholds_to_delimited(&buckets(), OutputFormat::Tsv).unwrap();
        assert!(tsv.lines().nth(1).unwrap().contains('\t'));
    }

    #[test]
    fn test_structured_json_keys() {
        let json = to_structured(&buckets(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Total"][0]["threshold"], 1400.0);
        assert!(value["Aqua_regia"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_render_thresholds_empty() {
        let text = render_thresholds("Hg", &ThresholdBuckets::default());
        assert!(text.contains("No thresholds found"));
    }
}
