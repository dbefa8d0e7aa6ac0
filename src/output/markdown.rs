//! Markdown summary generation
//!
//! This module renders the per-scraper pipeline reports of a run as a
//! human-readable markdown summary.

use crate::output::OutputResult;
use crate::pipeline::PipelineReport;
use std::fs;
use std::path::Path;

/// Writes the markdown summary of a run to `output_path`
pub fn generate_markdown_summary(
    reports: &[PipelineReport],
    config_hash: Option<&str>,
    output_path: &Path,
) -> OutputResult<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, format_markdown_summary(reports, config_hash))?;
    Ok(())
}

/// Formats the reports of a run as markdown
pub fn format_markdown_summary(reports: &[PipelineReport], config_hash: Option<&str>) -> String {
    let mut md = String::new();

    md.push_str("# Scrape-Pipeline Run Summary\n\n");

    md.push_str("## Run Information\n\n");
    if let Some(started) = reports.iter().map(|r| r.started_at).min() {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = reports.iter().filter_map(|r| r.finished_at).max() {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    let cancelled = reports.iter().any(|r| r.cancelled);
    md.push_str(&format!(
        "- **Status**: {}\n",
        if cancelled { "cancelled" } else { "completed" }
    ));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    let pages: usize = reports.iter().map(|r| r.pages).sum();
    let extracted: usize = reports.iter().map(|r| r.extracted).sum();
    let extraction_failures: usize = reports.iter().map(|r| r.extraction_failures).sum();
    let fetch_failures: usize = reports.iter().map(|r| r.fetch_failures).sum();
    let words: usize = reports.iter().map(|r| r.words).sum();

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Scrapers**: {}\n", reports.len()));
    md.push_str(&format!("- **Pages Fetched**: {}\n", pages));
    md.push_str(&format!("- **Articles Extracted**: {}\n", extracted));
    md.push_str(&format!("- **Extraction Failures**: {}\n", extraction_failures));
    md.push_str(&format!("- **Fetch Failures**: {}\n", fetch_failures));
    md.push_str(&format!("- **Total Words**: {}\n\n", words));

    if !reports.is_empty() {
        md.push_str("## Scrapers\n\n");
        md.push_str("| Scraper | Pages | Extracted | Extraction Failures | Fetch Failures | Words | Duration |\n");
        md.push_str("|---------|-------|-----------|---------------------|----------------|-------|----------|\n");

        for report in reports {
            let duration = report
                .duration()
                .map(|d| format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0))
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                report.scraper,
                report.pages,
                report.extracted,
                report.extraction_failures,
                report.fetch_failures,
                report.words,
                duration
            ));
        }
        md.push('\n');
    }

    let failing: Vec<_> = reports
        .iter()
        .filter(|r| !r.failures_by_kind.is_empty())
        .collect();
    if !failing.is_empty() {
        md.push_str("## Fetch Failures by Kind\n\n");
        md.push_str("| Scraper | Kind | Count |\n");
        md.push_str("|---------|------|-------|\n");

        for report in failing {
            for (kind, count) in &report.failures_by_kind {
                md.push_str(&format!("| {} | {} | {} |\n", report.scraper, kind, count));
            }
        }
        md.push('\n');
    }

    md
}
