use std::fmt::Write;

use comfy_table::Cell;

use super::styling::{bright, bright_green, bright_red, bright_yellow, dim};
use super::tables::{color_coded_status_cell, create_table, header_cells};
use crate::runner::{EntryReport, EntryStatus};

/// Prints the outcome of a run to stdout.
///
/// One row per processed entry, followed by a one-line verdict. Entries
/// after a failure were never reached and are counted as not run.
pub fn print_report(reports: &[EntryReport], total: usize, failure: Option<&anyhow::Error>) {
    println!("{}", render_report(reports, total, failure));
}

fn render_report(reports: &[EntryReport], total: usize, failure: Option<&anyhow::Error>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{} {}", bright("📋"), bright("Build Report").underlined());

    if reports.is_empty() {
        let _ = writeln!(output, "{}", dim("No entries were processed."));
    } else {
        let mut table = create_table();
        table.set_header(header_cells(&["#", "Name", "Repository", "Status"]));
        for (index, report) in reports.iter().enumerate() {
            table.add_row(vec![
                Cell::new(index + 1),
                Cell::new(&report.name),
                Cell::new(&report.url),
                color_coded_status_cell(report.status),
            ]);
        }
        let _ = writeln!(output, "{table}");
    }

    let built = count_where(reports, |s| matches!(s, EntryStatus::Built));
    let skipped = count_where(reports, |s| matches!(s, EntryStatus::Skipped));
    let continued = count_where(reports, |s| {
        matches!(s, EntryStatus::FailedAndContinued { .. })
    });
    let not_run = total.saturating_sub(reports.len());

    let _ = writeln!(
        output,
        "{} built, {} skipped, {} failed and continued, {} not run",
        bright_green(built),
        dim(skipped),
        bright_yellow(continued),
        dim(not_run)
    );

    match failure {
        Some(err) => {
            let _ = write!(output, "{} {err:#}", bright_red("✗ Run failed:"));
        }
        None => {
            let _ = write!(output, "{}", bright_green("✓ All builds completed"));
        }
    }

    output
}

fn count_where(reports: &[EntryReport], wanted: impl Fn(&EntryStatus) -> bool) -> usize {
    reports.iter().filter(|r| wanted(&r.status)).count()
}
