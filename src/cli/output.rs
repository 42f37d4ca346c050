//! Styled terminal output for batchio
//!
//! Human-facing text goes to stdout with the same ✔ ✖ ⚠ ℹ vocabulary
//! everywhere. Fatal errors are left to `main`, which prints them to stderr.

use console::style;

use crate::dispatcher::{BatchReport, Comparison};
use crate::work::{WorkResult, truncate_preview};

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Only shown with `-v`
    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn table_row(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<20} {}", style(key).dim(), value);
        }
    }

    pub fn blank_line(&self) {
        if !self.quiet {
            println!();
        }
    }

    /// Summary block plus the most recent results
    pub fn batch_report(&self, report: &BatchReport, recent: usize, preview_length: usize) {
        let summary = &report.summary;
        self.header(&format!("📊 Batch summary ({})", report.strategy));
        self.table_row("Batch", &report.batch_id.to_string());
        self.table_row("Total items", &summary.total.to_string());
        self.table_row("Successful", &style(summary.successful).green().to_string());
        self.table_row(
            "Failed",
            &if summary.failed > 0 {
                style(summary.failed).red().to_string()
            } else {
                summary.failed.to_string()
            },
        );
        self.table_row(
            "Total size",
            &format!("{} bytes ({} MB)", summary.total_bytes, summary.total_megabytes),
        );
        self.table_row("Average time", &format!("{:.3}s", summary.average_elapsed));
        self.table_row("Wall time", &format!("{:.3}s", report.wall_seconds));
        self.table_row("Throughput", &format!("{:.1} items/s", report.throughput()));
        self.table_row(
            "Executors",
            &format!(
                "{} cooperative, {} thread, {} process",
                summary.executors.cooperative, summary.executors.thread, summary.executors.process
            ),
        );
        if !summary.extensions.is_empty() {
            let extensions: Vec<&str> = summary.extensions.iter().map(String::as_str).collect();
            self.table_row("Extensions", &extensions.join(", "));
        }
        if !summary.status_codes.is_empty() {
            let codes: Vec<String> = summary.status_codes.iter().map(u16::to_string).collect();
            self.table_row("Status codes", &codes.join(", "));
        }

        let recent_results = report.recent(recent);
        if !recent_results.is_empty() {
            self.header(&format!("🕒 {} most recent results", recent_results.len()));
            for result in &recent_results {
                self.result_line(result, preview_length);
            }
        }
    }

    fn result_line(&self, result: &WorkResult, preview_length: usize) {
        if self.quiet {
            return;
        }
        match &result.error {
            None => {
                println!(
                    "  {} [{}] {} ({} bytes, {:.3}s)",
                    style("✔").green(),
                    style(result.executor).cyan(),
                    result.identifier,
                    result.size,
                    result.elapsed
                );
                let preview = truncate_preview(&result.payload_preview, preview_length);
                let preview = preview.replace(['\n', '\r'], " ");
                if !preview.trim().is_empty() {
                    println!("      {}", style(preview).dim());
                }
            }
            Some(error) => println!(
                "  {} [{}] {} ({:.3}s): {}",
                style("✖").red(),
                style(result.executor).cyan(),
                result.identifier,
                result.elapsed,
                style(error).red()
            ),
        }
    }

    /// Strategy ranking, fastest first
    pub fn comparison(&self, comparison: &Comparison) {
        self.header(&format!("🏁 Strategy comparison ({} items)", comparison.items));
        for (rank, entry) in comparison.entries.iter().enumerate() {
            if self.quiet {
                break;
            }
            match (&entry.error, &entry.summary) {
                (Some(error), _) => println!(
                    "  {}  {:<12} {}",
                    style("-").dim(),
                    entry.strategy.to_string(),
                    style(error).red()
                ),
                (None, summary) => {
                    let speedup = entry
                        .speedup
                        .map(|s| format!("{s:.2}x"))
                        .unwrap_or_else(|| "n/a".to_string());
                    let (ok, failed) = summary
                        .as_ref()
                        .map(|s| (s.successful, s.failed))
                        .unwrap_or_default();
                    println!(
                        "  {}. {:<12} {:>9.3}s  speedup {:>7}  ({} ok, {} failed)",
                        rank + 1,
                        style(entry.strategy).bold(),
                        entry.wall_seconds,
                        speedup,
                        ok,
                        failed
                    );
                }
            }
        }
        if let Some(fastest) = comparison.fastest() {
            self.blank_line();
            self.success(&format!("Fastest: {} ({:.3}s)", fastest.strategy, fastest.wall_seconds));
        }
    }
}
