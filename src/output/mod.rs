//! Output formatting and display for pdfmerge.
//!
//! This module handles all user-facing output of the command-line tool:
//! - Formatted status messages
//! - Inspection and merge summaries
//! - Warning and skipped-document reports
//! - JSON reports for `--json`
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::output::OutputFormatter;
//! use pdfmerge::config::Config;
//!
//! # fn example(config: Config) {
//! let formatter = OutputFormatter::from_config(&config);
//! formatter.info("Starting merge operation");
//! formatter.success("Merge completed successfully");
//! # }
//! ```

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter};

use serde::Serialize;

use crate::error::Result;
use crate::io::{LoadStatistics, WriteStatistics};
use crate::merge::{MergeStatistics, SkippedDocument};
use crate::pdf::Warning;
use crate::validation::InspectionSummary;

/// Display the result of inspecting inputs (dry run).
pub fn display_inspection_summary(formatter: &OutputFormatter, summary: &InspectionSummary) {
    formatter.section("Inputs:");
    for report in &summary.reports {
        let line = match &report.error {
            None => {
                let mut line = format!(
                    "{} (PDF {}, {} page(s), {} objects)",
                    report.display_name(),
                    report.version.as_deref().unwrap_or("?"),
                    report.page_count,
                    report.object_count
                );
                if let Some((width, height)) = report.page_dimensions {
                    line.push_str(&format!(", {width:.0}x{height:.0} pt"));
                }
                line
            }
            Some(error) => format!("{} FAILED: {error}", report.display_name()),
        };
        formatter.list_item(report.index + 1, &line);
        for warning in &report.warnings {
            formatter.debug(&warning.to_string());
        }
    }

    if summary.documents_failed > 0 {
        formatter.warning(&format!(
            "{} document(s) cannot be merged",
            summary.documents_failed
        ));
    }
    formatter.info(&format!(
        "Inspected {} document(s): {} pages, {}, {} warning(s)",
        summary.reports.len(),
        summary.total_pages,
        summary.format_total_size(),
        summary.warning_count
    ));
}

/// Display load statistics to the user.
pub fn display_load_statistics(formatter: &OutputFormatter, stats: &LoadStatistics) {
    if stats.failure_count > 0 {
        formatter.warning(&format!(
            "{} file(s) failed to load",
            stats.failure_count
        ));
    }

    formatter.debug(&format!(
        "Read {} file(s) in {:.2}s: {}",
        stats.success_count,
        stats.total_time.as_secs_f64(),
        stats.format_total_size()
    ));
}

/// Display warnings raised during a merge, one line each.
pub fn display_warnings(formatter: &OutputFormatter, warnings: &[Warning]) {
    for warning in warnings {
        formatter.warning(&warning.to_string());
    }
}

/// Display documents left out under the skip policy.
pub fn display_skipped(formatter: &OutputFormatter, skipped: &[SkippedDocument]) {
    for document in skipped {
        let name = document
            .label
            .clone()
            .unwrap_or_else(|| format!("#{}", document.index));
        formatter.warning(&format!("Skipped {name}: {}", document.reason));
    }
}

/// Display the outcome of a completed merge.
pub fn display_merge_summary(
    formatter: &OutputFormatter,
    stats: &MergeStatistics,
    write: &WriteStatistics,
) {
    formatter.success(&format!(
        "Merged {} document(s), {} page(s) into {} ({})",
        stats.documents_merged,
        stats.total_pages,
        write.output_path.display(),
        write.format_file_size()
    ));
    formatter.detail("Objects written", &stats.objects_written.to_string());
    formatter.detail("Bookmarks", &stats.bookmarks_added.to_string());
    formatter.detail("Warnings", &stats.warnings.to_string());
    formatter.detail("Input size", &stats.format_input_size());
    formatter.detail(
        "Time",
        &format!(
            "parse {:.2}s, merge {:.2}s, write {:.2}s",
            stats.parse_time.as_secs_f64(),
            stats.merge_time.as_secs_f64(),
            write.write_time.as_secs_f64()
        ),
    );
}

/// JSON report of a completed merge.
#[derive(Debug, Serialize)]
pub struct MergeReport<'a> {
    pub output: String,
    pub statistics: &'a MergeStatistics,
    pub warnings: &'a [Warning],
    pub skipped: &'a [SkippedDocument],
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| crate::error::MergeError::serialization(format!("JSON report: {e}")))
}
