//! Terminal output for the CLI: a page progress bar and colored status lines.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::sources::{Harvest, Termination};
use crate::utils::{PageProgress, ProgressObserver, WrittenFiles};

/// Check if stderr is a terminal.
pub fn is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different outcomes.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a styled status line to stderr.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
    }
}

/// Format a number with commas.
pub fn format_number(n: usize) -> String {
    n.to_string()
        .chars()
        .rev()
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(",")
        .chars()
        .rev()
        .collect()
}

/// Progress bar over the page budget of one harvest
pub struct PageProgressBar {
    pb: ProgressBar,
}

impl PageProgressBar {
    /// Bar sized to `max_pages`; hidden when stderr is not a terminal
    pub fn new(query: &str, max_pages: u32) -> Self {
        let pb = ProgressBar::new(u64::from(max_pages));
        if !is_terminal() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix} {bar:30.cyan/blue} page {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .progress_chars("█▓▒░ "),
        );
        pb.set_prefix(format!("\"{}\"", query));
        Self { pb }
    }

    /// Replace the bar with a one-line outcome
    pub fn finish(&self, harvest: &Harvest) {
        let msg = format!(
            "{} records from {} page(s)",
            format_number(harvest.records.len()),
            harvest.pages_fetched
        );
        if harvest.failure().is_none() {
            self.pb.finish_with_message(msg);
        } else {
            self.pb.abandon_with_message(format!("{} (incomplete)", msg));
        }
    }
}

impl ProgressObserver for PageProgressBar {
    fn on_page(&self, progress: &PageProgress) {
        if progress.is_end {
            self.pb.set_length(u64::from(progress.page_index));
        }
        self.pb.set_position(u64::from(progress.page_index));
        self.pb.set_message(format!(
            "({} records)",
            format_number(progress.cumulative_records)
        ));
    }
}

/// One-line description of why a harvest stopped
pub fn describe_termination(termination: &Termination) -> String {
    match termination {
        Termination::EndOfResults => "reached the last result page".to_string(),
        Termination::PageLimit => "stopped at the page limit".to_string(),
        Termination::Failed(failure) => failure.to_string(),
    }
}

/// Status to report for a finished harvest; stopping at the page cap is a success
pub fn outcome_status(termination: &Termination) -> Status {
    match termination {
        Termination::EndOfResults | Termination::PageLimit => Status::Success,
        Termination::Failed(_) => Status::Warning,
    }
}

/// Print the end-of-run summary; `received` counts records before deduplication
pub fn print_summary(
    harvest: &Harvest,
    received: usize,
    unique: usize,
    files: Option<&WrittenFiles>,
) {
    print_status(
        outcome_status(&harvest.termination),
        &format!(
            "{} pages, {} records, {} unique ({})",
            harvest.pages_fetched,
            format_number(received),
            format_number(unique),
            describe_termination(&harvest.termination)
        ),
    );
    if let Some(total) = harvest.total_count {
        print_status(
            Status::Info,
            &format!("{} matches reported by the API", format_number(total as usize)),
        );
    }
    if let Some(files) = files {
        eprintln!("  {} {}", "json".dimmed(), files.json_path.display());
        eprintln!("  {} {}", "csv ".dimmed(), files.csv_path.display());
    }
}
