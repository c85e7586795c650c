//! Progress reporting for ctxprobe.
//!
//! Defines the [`Progress`] trait that decouples the search controller from
//! the display layer. [`StdoutProgress`] prints a live, colored probe log to
//! the terminal; tests plug in a recorder instead.

use colored::Colorize;
use std::io::{self, Write};

use crate::classify::Classification;
use crate::endpoint::ModelInfo;
use crate::format::{format_number, format_window};
use crate::probe::ProbeKind;
use crate::profile::CapacityProfile;
use crate::search::{ProbeRecord, Regime, RegimeSummary, StopReason};

/// Receives search events as they happen.
pub trait Progress {
    /// A model's search is starting.
    fn model_started(&mut self, model: &str, info: Option<&ModelInfo>);

    /// A regime is about to issue its first probe.
    fn regime_started(&mut self, regime: Regime);

    /// A probe came back and was classified.
    fn probe_finished(&mut self, record: &ProbeRecord);

    /// A regime stopped.
    fn regime_finished(&mut self, summary: &RegimeSummary);

    /// A model's profile is complete.
    fn model_finished(&mut self, profile: &CapacityProfile);

    /// A model could not be searched at all.
    fn model_failed(&mut self, model: &str, error: &str);
}

/// Prints progress to stdout as probes complete.
pub struct StdoutProgress {
    probes: usize,
}

impl StdoutProgress {
    pub fn new() -> Self {
        Self { probes: 0 }
    }

    /// Total probes reported so far, across all models.
    pub fn probe_count(&self) -> usize {
        self.probes
    }
}

fn verdict_label(verdict: Classification) -> String {
    let label = verdict.label();
    match verdict {
        Classification::Ok => label.green().to_string(),
        Classification::Truncated | Classification::Plateaued => label.yellow().to_string(),
        Classification::Failed => label.red().bold().to_string(),
    }
}

impl Progress for StdoutProgress {
    fn model_started(&mut self, model: &str, info: Option<&ModelInfo>) {
        println!();
        println!("{}", "=".repeat(60).dimmed());
        println!("{} {}", "Testing:".bold(), model.cyan().bold());
        println!("{}", "=".repeat(60).dimmed());
        if let Some(info) = info {
            println!("  Family: {}", info.family.as_deref().unwrap_or("unknown"));
            println!("  Size:   {}", info.parameter_size.as_deref().unwrap_or("unknown"));
            if let Some(ctx) = info.declared_context {
                println!("  Declared context: {}", format_number(ctx));
            }
        }
    }

    fn regime_started(&mut self, regime: Regime) {
        println!();
        println!("{}", format!("[{}]", regime.title()).bold());
    }

    fn probe_finished(&mut self, record: &ProbeRecord) {
        self.probes += 1;
        let outcome = &record.outcome;
        let probe = &outcome.probe;
        let subject = match probe.kind {
            ProbeKind::Output => format!("num_predict={}", probe.output_budget),
            ProbeKind::Context => match probe.window {
                Some(w) => format!("{} ~{} tok", format_window(w), format_number(probe.requested_tokens)),
                None => format!("default ~{} tok", format_number(probe.requested_tokens)),
            },
        };

        let detail = match (outcome.failure(), probe.kind) {
            (Some(failure), _) => failure.to_string(),
            (None, ProbeKind::Context) => format!(
                "eval={} ({:.1}%), {:.2}s",
                format_number(outcome.input_tokens().unwrap_or(0)),
                outcome.utilization().unwrap_or(0.0),
                outcome.latency_secs
            ),
            (None, ProbeKind::Output) => format!(
                "{} tokens ({:.1} tok/s)",
                format_number(outcome.output_tokens().unwrap_or(0)),
                outcome.tokens_per_sec().unwrap_or(0.0)
            ),
        };

        println!(
            "  {:<28} {:<10} {}",
            subject,
            verdict_label(record.classification),
            detail.dimmed()
        );
        io::stdout().flush().ok();
    }

    fn regime_finished(&mut self, summary: &RegimeSummary) {
        let stop = match &summary.stop {
            StopReason::Exhausted => "schedule exhausted".to_string(),
            StopReason::Truncated => "truncation detected".to_string(),
            StopReason::Plateaued => "plateau reached".to_string(),
            StopReason::Failed(reason) => format!("failed ({reason})"),
            StopReason::Skipped => "skipped".to_string(),
        };
        let best = match summary.best_window {
            Some(w) => format!("{} tokens at {}", format_number(summary.best_tokens), format_window(w)),
            None => format!("{} tokens", format_number(summary.best_tokens)),
        };
        println!("  {} {}, best {}", "->".dimmed(), stop, best.bold());
    }

    fn model_finished(&mut self, profile: &CapacityProfile) {
        println!();
        println!("  Default context:   ~{} tokens", format_number(profile.default_context));
        println!("  Native context:    ~{} tokens", format_number(profile.native_context));
        match profile.optimal_window {
            Some(w) => println!("  Optimal num_ctx:   {}", format_number(u64::from(w))),
            None => println!("  Optimal num_ctx:   {}", "none".dimmed()),
        }
        println!(
            "  Recommended input: ~{} tokens",
            format_number(profile.recommended_input).green().bold()
        );
        if let (Some(max), Some(rec)) = (profile.max_output, profile.recommended_output) {
            println!("  Max output:        {} tokens", format_number(max));
            println!("  Recommended output: ~{} tokens", format_number(rec).green());
        }
        if let Some(reason) = &profile.failure_reason {
            println!("  {} {}", "no successful probes:".red(), reason);
        }
    }

    fn model_failed(&mut self, model: &str, error: &str) {
        eprintln!();
        eprintln!("{} {}: {}", "error:".red().bold(), model, error);
    }
}
