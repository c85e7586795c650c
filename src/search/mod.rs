//! Capacity search controller.
//!
//! Drives a bounded, forward-only sequence of probes per model across up to
//! four regimes:
//!
//! 1. **Default limit**: growing prompts with no window override; stops on the
//!    first truncation or failure.
//! 2. **Extended window**: growing window overrides with prompts filling most
//!    of each window; stops on failure, plateau, or truncation.
//! 3. **Output budget** (comprehensive runs): growing output budgets at the
//!    best window; stops once output stops growing.
//! 4. **Performance sweep** (comprehensive runs): fixed prompt sizes at the
//!    best window to chart latency and throughput.
//!
//! Within a regime the controller never goes back to a smaller value. A
//! regime that fails while no probe for the model has succeeded yet cancels
//! the rest.

mod params;
mod state;

pub use params::SearchParams;
pub use state::{ProbeRecord, Regime, RegimeSummary, SearchState, StopReason};

use anyhow::{ensure, Result};
use tracing::{debug, info, warn};

use crate::classify::Classification;
use crate::constants::OUTPUT_PROMPT;
use crate::endpoint::Endpoint;
use crate::output::Progress;
use crate::probe::{self, Probe, ProbeKind};
use crate::profile::{self, CapacityProfile};
use crate::prompt;
use crate::report::RunReport;

/// Runs capacity searches against one endpoint.
pub struct Controller<'a> {
    endpoint: &'a dyn Endpoint,
    params: SearchParams,
    progress: &'a mut dyn Progress,
}

impl<'a> Controller<'a> {
    pub fn new(endpoint: &'a dyn Endpoint, params: SearchParams, progress: &'a mut dyn Progress) -> Self {
        Self {
            endpoint,
            params,
            progress,
        }
    }

    /// Probe every model in order and collect the results.
    ///
    /// A model-level error is recorded in the report and the run moves on.
    pub async fn run(&mut self, models: &[String], comprehensive: bool) -> RunReport {
        let mut report = RunReport::new(self.endpoint.address(), comprehensive);
        for model in models {
            match self.profile_model(model, comprehensive).await {
                Ok(profile) => {
                    self.progress.model_finished(&profile);
                    report.push_profile(profile);
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(model = %model, "model search aborted: {message}");
                    self.progress.model_failed(model, &message);
                    report.push_error(model, message);
                }
            }
        }
        report.finalize();
        report
    }

    /// Run every regime for `model` and aggregate the outcomes.
    pub async fn profile_model(&mut self, model: &str, comprehensive: bool) -> Result<CapacityProfile> {
        ensure!(!model.trim().is_empty(), "Model identifier is empty");

        let info = match self.endpoint.model_info(model).await {
            Ok(info) => Some(info),
            Err(err) => {
                warn!(model = %model, "metadata lookup failed: {err:#}");
                None
            }
        };
        self.progress.model_started(model, info.as_ref());

        let mut plan = vec![Regime::DefaultLimit, Regime::ExtendedWindow];
        if comprehensive {
            plan.push(Regime::OutputBudget);
            plan.push(Regime::PerformanceSweep);
        }

        let mut records = Vec::new();
        let mut summaries: Vec<RegimeSummary> = Vec::new();
        let mut successes = 0;
        let mut halted = false;
        for regime in plan {
            if halted {
                summaries.push(RegimeSummary::skipped(regime));
                continue;
            }
            self.progress.regime_started(regime);
            let summary = match regime {
                Regime::DefaultLimit => self.discover_default(model, &mut records).await,
                Regime::ExtendedWindow => self.discover_extended(model, &mut records).await,
                Regime::OutputBudget => {
                    let window = output_window(&summaries);
                    self.discover_output(model, window, &mut records).await
                }
                Regime::PerformanceSweep => {
                    let (window, native) = sweep_window(&summaries);
                    self.sweep_performance(model, window, native, &mut records).await
                }
            };
            info!(
                model = %model,
                regime = ?summary.regime,
                stop = ?summary.stop,
                best = summary.best_tokens,
                probes = summary.probes,
                "regime finished"
            );
            self.progress.regime_finished(&summary);
            successes += summary.successes;
            // Skip the rest only when nothing has answered for this model yet.
            halted = summary.hard_failed() && successes == 0;
            summaries.push(summary);
        }

        Ok(profile::aggregate(
            model,
            info,
            records,
            summaries,
            &self.params,
            comprehensive,
        ))
    }

    /// Synthesize a prompt near `target` tokens and probe it.
    async fn context_probe(&mut self, model: &str, target: u64, window: Option<u32>) -> probe::ProbeOutcome {
        let text = prompt::synthesize(target);
        let probe = Probe {
            model: model.to_string(),
            kind: ProbeKind::Context,
            requested_tokens: prompt::estimate_tokens(&text),
            window,
            output_budget: self.params.context_probe_output,
            timeout: self.params.context_timeout,
        };
        probe::execute(self.endpoint, probe, text).await
    }

    fn record(
        &mut self,
        records: &mut Vec<ProbeRecord>,
        regime: Regime,
        classification: Classification,
        outcome: probe::ProbeOutcome,
    ) {
        let record = ProbeRecord {
            regime,
            classification,
            outcome,
        };
        self.progress.probe_finished(&record);
        records.push(record);
    }

    async fn discover_default(&mut self, model: &str, records: &mut Vec<ProbeRecord>) -> RegimeSummary {
        let mut state = SearchState::new(Regime::DefaultLimit);
        let sizes = self.params.default_sizes.clone();
        for target in sizes {
            let outcome = self.context_probe(model, target, None).await;
            // Server defaults have no plateau rule: only truncation ends this regime.
            let verdict =
                self.params
                    .thresholds
                    .classify_context(&outcome, outcome.probe.requested_tokens, None);
            state.observe(outcome.input_tokens(), None, verdict);
            let failure = outcome.failure().map(|f| f.reason());
            self.record(records, Regime::DefaultLimit, verdict, outcome);

            match verdict {
                Classification::Ok | Classification::Plateaued => {}
                Classification::Truncated => return state.finish(StopReason::Truncated),
                Classification::Failed => {
                    return state.finish(StopReason::Failed(failure.unwrap_or_default()))
                }
            }
        }
        state.finish(StopReason::Exhausted)
    }

    async fn discover_extended(&mut self, model: &str, records: &mut Vec<ProbeRecord>) -> RegimeSummary {
        let mut state = SearchState::new(Regime::ExtendedWindow);
        let windows = self.params.window_sizes.clone();
        for window in windows {
            let target = self.params.fill_target(window);
            let outcome = self.context_probe(model, target, Some(window)).await;
            let verdict = self.params.thresholds.classify_context(
                &outcome,
                outcome.probe.requested_tokens,
                state.previous_best(),
            );
            state.observe(outcome.input_tokens(), Some(window), verdict);
            debug!(
                window,
                verdict = verdict.label(),
                best = state.best_tokens(),
                streak = state.consecutive_improvements(),
                "window probe classified"
            );
            let failure = outcome.failure().map(|f| f.reason());
            self.record(records, Regime::ExtendedWindow, verdict, outcome);

            match verdict {
                Classification::Ok => {}
                Classification::Plateaued => return state.finish(StopReason::Plateaued),
                Classification::Truncated => return state.finish(StopReason::Truncated),
                Classification::Failed => {
                    return state.finish(StopReason::Failed(failure.unwrap_or_default()))
                }
            }
        }
        state.finish(StopReason::Exhausted)
    }

    async fn discover_output(
        &mut self,
        model: &str,
        window: Option<u32>,
        records: &mut Vec<ProbeRecord>,
    ) -> RegimeSummary {
        let mut state = SearchState::new(Regime::OutputBudget);
        let budgets = self.params.output_budgets.clone();
        for budget in budgets {
            let probe = Probe {
                model: model.to_string(),
                kind: ProbeKind::Output,
                requested_tokens: prompt::estimate_tokens(OUTPUT_PROMPT),
                window,
                output_budget: budget,
                timeout: self.params.output_timeout,
            };
            let outcome = probe::execute(self.endpoint, probe, OUTPUT_PROMPT.to_string()).await;
            let verdict = self
                .params
                .thresholds
                .classify_output(&outcome, budget, state.best_tokens());
            state.observe(outcome.output_tokens(), window, verdict);
            let failure = outcome.failure().map(|f| f.reason());
            self.record(records, Regime::OutputBudget, verdict, outcome);

            match verdict {
                Classification::Ok => {}
                Classification::Plateaued | Classification::Truncated => {
                    return state.finish(StopReason::Plateaued)
                }
                Classification::Failed => {
                    return state.finish(StopReason::Failed(failure.unwrap_or_default()))
                }
            }
        }
        state.finish(StopReason::Exhausted)
    }

    async fn sweep_performance(
        &mut self,
        model: &str,
        window: Option<u32>,
        native_context: u64,
        records: &mut Vec<ProbeRecord>,
    ) -> RegimeSummary {
        let mut state = SearchState::new(Regime::PerformanceSweep);
        let sizes: Vec<u64> = self
            .params
            .performance_sizes
            .iter()
            .copied()
            .filter(|&size| size <= native_context)
            .collect();
        for target in sizes {
            let outcome = self.context_probe(model, target, window).await;
            let verdict =
                self.params
                    .thresholds
                    .classify_context(&outcome, outcome.probe.requested_tokens, None);
            state.observe(outcome.input_tokens(), window, verdict);
            let failure = outcome.failure().map(|f| f.reason());
            self.record(records, Regime::PerformanceSweep, verdict, outcome);

            if verdict == Classification::Failed {
                return state.finish(StopReason::Failed(failure.unwrap_or_default()));
            }
        }
        state.finish(StopReason::Exhausted)
    }
}

/// Window for output probes: the best override, else the default-limit
/// capacity, else the server default.
fn output_window(summaries: &[RegimeSummary]) -> Option<u32> {
    let capacity = profile::Capacity::from_summaries(summaries);
    capacity
        .optimal_window
        .or_else(|| window_for(capacity.default_context))
}

/// Window and capacity bound for the performance sweep.
fn sweep_window(summaries: &[RegimeSummary]) -> (Option<u32>, u64) {
    let capacity = profile::Capacity::from_summaries(summaries);
    let window = capacity
        .optimal_window
        .or_else(|| window_for(capacity.native_context));
    (window, capacity.native_context)
}

fn window_for(tokens: u64) -> Option<u32> {
    u32::try_from(tokens).ok().filter(|&t| t > 0)
}
