//! End-of-run summary table.

use colored::Colorize;

use crate::format::{format_number, format_window};
use crate::report::{ModelEntry, RunReport};

/// Fixed widths of the numeric columns.
const NUMERIC_COLS: [(&str, usize); 7] = [
    ("Default", 10),
    ("Native", 10),
    ("num_ctx", 8),
    ("Max Out", 9),
    ("Rec In", 10),
    ("Rec Out", 9),
    ("tok/s", 9),
];

fn model_column_width() -> usize {
    let term_width = terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(100);
    let fixed: usize = NUMERIC_COLS.iter().map(|(_, w)| w + 1).sum();
    term_width.saturating_sub(fixed).clamp(12, 40)
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let cut: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

/// Model column cell, shared by profiled and failed rows.
fn model_cell(entry: &ModelEntry, width: usize) -> String {
    format!("{:<width$}", truncate(entry.model(), width))
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

/// Print one row per model in request order.
pub(crate) fn print_summary(report: &RunReport) {
    let model_width = model_column_width();

    println!();
    println!("{}", "=".repeat(60));
    println!("{}", "SUMMARY".bold());
    println!("{}", "=".repeat(60));

    let mut header = format!("{:<model_width$}", "Model");
    for (name, width) in NUMERIC_COLS {
        header.push_str(&format!(" {:>width$}", name));
    }
    println!("{}", header.bold());
    println!("{}", "-".repeat(header.len()).dimmed());

    for entry in &report.entries {
        match entry {
            ModelEntry::Profiled(p) => {
                let cells = [
                    format_number(p.default_context),
                    format_number(p.native_context),
                    or_dash(p.optimal_window.map(format_window)),
                    or_dash(p.max_output.map(format_number)),
                    format_number(p.recommended_input),
                    or_dash(p.recommended_output.map(format_number)),
                    or_dash(p.average_throughput().map(|t| format!("{t:.1}"))),
                ];
                let mut row = model_cell(entry, model_width);
                for (cell, (_, width)) in cells.iter().zip(NUMERIC_COLS) {
                    row.push_str(&format!(" {:>width$}", cell));
                }
                if p.failure_reason.is_some() {
                    println!("{}", row.red());
                } else {
                    println!("{row}");
                }
            }
            ModelEntry::Failed { error, .. } => {
                println!(
                    "{} {} {}",
                    model_cell(entry, model_width),
                    "ERROR:".red().bold(),
                    error
                );
            }
        }
    }
    let profiled = report.profiles().count();
    println!(
        "{}",
        format!("{profiled} of {} models profiled", report.entries.len()).dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate("qwen2.5-coder:14b", 40), "qwen2.5-coder:14b");
        assert_eq!(truncate("hf.co/org/very-long-model-name:Q4_K_M", 12), "hf.co/org...");
    }

    #[test]
    fn failed_entries_show_their_model() {
        let mut report = RunReport::new("http://localhost:11434", false);
        report.push_error("deepseek-r1:70b-instruct-q8", "Model identifier is empty".into());
        let cell = model_cell(&report.entries[0], 16);
        assert_eq!(cell, "deepseek-r1:7...");
        assert_eq!(model_cell(&report.entries[0], 30), format!("{:<30}", "deepseek-r1:70b-instruct-q8"));
    }

    #[test]
    fn missing_values_render_as_dash() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("8K".into())), "8K");
    }
}
