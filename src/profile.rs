//! Capacity profile aggregation.
//!
//! Folds a model's probe records and regime summaries into a single
//! [`CapacityProfile`]. Aggregation is pure and never fails: a model that
//! never completed a probe still gets a profile, with zeroed capacity and the
//! first failure reason preserved.

use chrono::Utc;
use serde::Serialize;

use crate::classify::Classification;
use crate::endpoint::ModelInfo;
use crate::search::{ProbeRecord, Regime, RegimeSummary, SearchParams, StopReason};

/// One point on the latency/throughput curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSample {
    pub window: u32,
    /// Estimated prompt size that was sent.
    pub context_size: u64,
    pub input_tokens: u64,
    pub latency_secs: f64,
    pub tokens_per_sec: f64,
}

/// Everything learned about one model.
#[derive(Debug, Clone, Serialize)]
pub struct CapacityProfile {
    pub model: String,
    pub timestamp: String,
    pub info: Option<ModelInfo>,
    /// Input tokens honored with no window override.
    pub default_context: u64,
    /// Input tokens honored under the best window override (never below `default_context`).
    pub native_context: u64,
    /// Window override that achieved `native_context`.
    pub optimal_window: Option<u32>,
    /// Best input capacity before a larger window failed outright.
    pub hardware_limit: Option<u64>,
    /// Output tokens actually generated; `None` when output discovery did not run.
    pub max_output: Option<u64>,
    pub recommended_input: u64,
    pub recommended_output: Option<u64>,
    pub performance: Vec<PerformanceSample>,
    pub regimes: Vec<RegimeSummary>,
    pub failure_reason: Option<String>,
    pub probes: Vec<ProbeRecord>,
}

impl CapacityProfile {
    /// Mean throughput over the performance curve.
    pub fn average_throughput(&self) -> Option<f64> {
        if self.performance.is_empty() {
            return None;
        }
        let total: f64 = self.performance.iter().map(|p| p.tokens_per_sec).sum();
        Some(total / self.performance.len() as f64)
    }
}

/// Input-capacity figures derived from regime summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capacity {
    pub default_context: u64,
    pub native_context: u64,
    pub optimal_window: Option<u32>,
    pub hardware_limit: Option<u64>,
}

impl Capacity {
    pub fn from_summaries(summaries: &[RegimeSummary]) -> Self {
        let find = |regime| summaries.iter().find(|s| s.regime == regime);

        let default_context = find(Regime::DefaultLimit)
            .and_then(|s| s.last_ok_tokens)
            .unwrap_or(0);

        let Some(extended) = find(Regime::ExtendedWindow) else {
            return Self {
                default_context,
                native_context: default_context,
                ..Self::default()
            };
        };

        let native_context = extended.best_tokens.max(default_context);
        let optimal_window = extended
            .best_window
            .filter(|_| extended.best_tokens > 0 && extended.best_tokens >= default_context);
        let hardware_limit = match extended.stop {
            StopReason::Failed(_) if extended.best_tokens > 0 => Some(extended.best_tokens),
            _ => None,
        };

        Self {
            default_context,
            native_context,
            optimal_window,
            hardware_limit,
        }
    }
}

/// `floor(value * margin)`.
pub fn apply_margin(value: u64, margin: f64) -> u64 {
    ((value as f64 * margin).floor() as u64).min(value)
}

fn performance_curve(records: &[ProbeRecord]) -> Vec<PerformanceSample> {
    let mut samples: Vec<PerformanceSample> = records
        .iter()
        .filter(|r| matches!(r.regime, Regime::ExtendedWindow | Regime::PerformanceSweep))
        .filter(|r| r.classification == Classification::Ok)
        .filter_map(|r| {
            let outcome = &r.outcome;
            Some(PerformanceSample {
                window: outcome.probe.window?,
                context_size: outcome.probe.requested_tokens,
                input_tokens: outcome.input_tokens()?,
                latency_secs: outcome.latency_secs,
                tokens_per_sec: outcome.tokens_per_sec().unwrap_or(0.0),
            })
        })
        .collect();
    samples.sort_by(|a, b| {
        a.window
            .cmp(&b.window)
            .then(a.context_size.cmp(&b.context_size))
    });
    samples
}

fn failure_reason(records: &[ProbeRecord]) -> Option<String> {
    if records.iter().any(|r| r.outcome.is_success()) {
        return None;
    }
    Some(
        records
            .iter()
            .find_map(|r| r.outcome.failure().map(|f| f.reason()))
            .unwrap_or_else(|| "no probes issued".to_string()),
    )
}

/// Build the profile for `model`.
///
/// The performance curve is only charted when `with_curve` is set.
pub fn aggregate(
    model: &str,
    info: Option<ModelInfo>,
    records: Vec<ProbeRecord>,
    regimes: Vec<RegimeSummary>,
    params: &SearchParams,
    with_curve: bool,
) -> CapacityProfile {
    let capacity = Capacity::from_summaries(&regimes);

    let max_output = regimes
        .iter()
        .find(|s| s.regime == Regime::OutputBudget && s.stop != StopReason::Skipped)
        .map(|s| s.best_tokens);

    let performance = if with_curve {
        performance_curve(&records)
    } else {
        Vec::new()
    };

    CapacityProfile {
        model: model.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        info,
        default_context: capacity.default_context,
        native_context: capacity.native_context,
        optimal_window: capacity.optimal_window,
        hardware_limit: capacity.hardware_limit,
        max_output,
        recommended_input: apply_margin(capacity.native_context, params.input_margin),
        recommended_output: max_output.map(|m| apply_margin(m, params.output_margin)),
        performance,
        regimes,
        failure_reason: failure_reason(&records),
        probes: records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Probe, ProbeFailure, ProbeKind, ProbeOutcome, ProbeResult};
    use std::time::Duration;

    fn summary(regime: Regime, stop: StopReason, best: u64, window: Option<u32>, last_ok: Option<u64>) -> RegimeSummary {
        RegimeSummary {
            regime,
            stop,
            best_tokens: best,
            best_window: window,
            last_ok_tokens: last_ok,
            probes: 1,
            successes: usize::from(best > 0),
        }
    }

    fn record(regime: Regime, window: Option<u32>, requested: u64, result: ProbeResult, latency: f64) -> ProbeRecord {
        let classification = match result {
            ProbeResult::Completed { .. } => Classification::Ok,
            ProbeResult::Failed { .. } => Classification::Failed,
        };
        ProbeRecord {
            regime,
            classification,
            outcome: ProbeOutcome {
                probe: Probe {
                    model: "m".into(),
                    kind: ProbeKind::Context,
                    requested_tokens: requested,
                    window,
                    output_budget: 100,
                    timeout: Duration::from_secs(1),
                },
                latency_secs: latency,
                result,
            },
        }
    }

    fn completed(input_tokens: u64) -> ProbeResult {
        ProbeResult::Completed {
            input_tokens,
            output_tokens: 10,
        }
    }

    #[test]
    fn native_never_below_default() {
        let regimes = vec![
            summary(Regime::DefaultLimit, StopReason::Exhausted, 15_990, None, Some(15_990)),
            summary(Regime::ExtendedWindow, StopReason::Plateaued, 8_000, Some(8_192), Some(8_000)),
        ];
        let capacity = Capacity::from_summaries(&regimes);
        assert_eq!(capacity.default_context, 15_990);
        assert_eq!(capacity.native_context, 15_990);
        assert_eq!(capacity.optimal_window, None);
    }

    #[test]
    fn hardware_limit_only_on_failure() {
        let failed = vec![
            summary(Regime::DefaultLimit, StopReason::Truncated, 2_048, None, Some(2_000)),
            summary(Regime::ExtendedWindow, StopReason::Failed("transport".into()), 8_180, Some(8_192), Some(8_180)),
        ];
        let capacity = Capacity::from_summaries(&failed);
        assert_eq!(capacity.hardware_limit, Some(8_180));
        assert_eq!(capacity.native_context, 8_180);
        assert_eq!(capacity.optimal_window, Some(8_192));

        let plateau = vec![summary(Regime::ExtendedWindow, StopReason::Plateaued, 31_000, Some(65_536), None)];
        assert_eq!(Capacity::from_summaries(&plateau).hardware_limit, None);
    }

    #[test]
    fn recommendations_apply_margins() {
        let params = SearchParams::default();
        let regimes = vec![
            summary(Regime::DefaultLimit, StopReason::Exhausted, 16_001, None, Some(16_001)),
            summary(Regime::ExtendedWindow, StopReason::Exhausted, 117_001, Some(131_072), Some(117_001)),
            summary(Regime::OutputBudget, StopReason::Plateaued, 3_001, Some(131_072), Some(3_001)),
        ];
        let profile = aggregate("m", None, Vec::new(), regimes, &params, false);
        assert_eq!(profile.recommended_input, 93_600); // floor(117001 * 0.8)
        assert_eq!(profile.max_output, Some(3_001));
        assert_eq!(profile.recommended_output, Some(2_700)); // floor(3001 * 0.9)
        assert!(profile.recommended_input <= profile.native_context);
    }

    #[test]
    fn apply_margin_bounds() {
        assert_eq!(apply_margin(8_180, 1.0), 8_180);
        assert_eq!(apply_margin(0, 0.8), 0);
        for value in [1, 7, 999, 8_180, 131_072] {
            assert!(apply_margin(value, 0.85) <= value);
        }
    }

    #[test]
    fn zero_success_profile_keeps_reason() {
        let params = SearchParams::default();
        let records = vec![record(
            Regime::DefaultLimit,
            None,
            1_990,
            ProbeResult::Failed {
                failure: ProbeFailure::Status {
                    code: 404,
                    body: "model not found".into(),
                },
            },
            0.1,
        )];
        let regimes = vec![
            summary(Regime::DefaultLimit, StopReason::Failed("status:404".into()), 0, None, None),
            RegimeSummary::skipped(Regime::ExtendedWindow),
        ];
        let profile = aggregate("ghost", None, records, regimes, &params, true);
        assert_eq!(profile.native_context, 0);
        assert_eq!(profile.default_context, 0);
        assert_eq!(profile.recommended_input, 0);
        assert_eq!(profile.failure_reason.as_deref(), Some("status:404"));
        assert!(profile.performance.is_empty());
    }

    #[test]
    fn empty_run_reports_no_probes() {
        let profile = aggregate("m", None, Vec::new(), Vec::new(), &SearchParams::default(), false);
        assert_eq!(profile.failure_reason.as_deref(), Some("no probes issued"));
    }

    #[test]
    fn curve_is_sorted_and_skips_default_regime() {
        let records = vec![
            record(Regime::ExtendedWindow, Some(16_384), 14_745, completed(14_700), 10.0),
            record(Regime::DefaultLimit, None, 2_000, completed(1_990), 1.0),
            record(Regime::PerformanceSweep, Some(8_192), 4_000, completed(3_990), 2.0),
            record(Regime::ExtendedWindow, Some(8_192), 7_372, completed(7_300), 4.0),
            record(
                Regime::ExtendedWindow,
                Some(32_768),
                29_491,
                ProbeResult::Failed {
                    failure: ProbeFailure::Timeout,
                },
                300.0,
            ),
        ];
        let curve = performance_curve(&records);
        let keys: Vec<(u32, u64)> = curve.iter().map(|s| (s.window, s.context_size)).collect();
        assert_eq!(keys, vec![(8_192, 4_000), (8_192, 7_372), (16_384, 14_745)]);
        assert_eq!(curve[0].tokens_per_sec, 1_995.0);
    }
}
