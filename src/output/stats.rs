//! Run statistics for the terminal

use crate::pipeline::PipelineReport;

/// Prints per-scraper statistics to stdout
pub fn print_statistics(reports: &[PipelineReport]) {
    println!("=== Scrape Statistics ===\n");

    for report in reports {
        println!("Scraper: {}", report.scraper);
        println!("  Pages fetched: {}", report.pages);
        println!("  Articles extracted: {}", report.extracted);
        println!("  Extraction failures: {}", report.extraction_failures);
        println!("  Fetch failures: {}", report.fetch_failures);
        println!("  Words: {}", report.words);

        if !report.failures_by_kind.is_empty() {
            let mut kinds: Vec<_> = report.failures_by_kind.iter().collect();
            kinds.sort_by(|a, b| b.1.cmp(a.1));
            println!("  Failures by kind:");
            for (kind, count) in kinds {
                println!("    {}: {}", kind, count);
            }
        }

        if report.cancelled {
            println!("  (cancelled)");
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} targets produced an article)",
        success_rate(reports),
        reports.iter().map(|r| r.extracted).sum::<usize>(),
        reports.iter().map(|r| r.total_records()).sum::<usize>()
    );
}

/// Share of targets that ended in an extracted article, in percent
pub fn success_rate(reports: &[PipelineReport]) -> f64 {
    let total: usize = reports.iter().map(|r| r.total_records()).sum();
    if total == 0 {
        return 0.0;
    }
    let extracted: usize = reports.iter().map(|r| r.extracted).sum();
    (extracted as f64 / total as f64) * 100.0
}
