//! Per-regime search bookkeeping.

use serde::Serialize;

use crate::classify::Classification;
use crate::probe::ProbeOutcome;

/// The phases a model's search runs through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Server defaults, growing prompt sizes.
    DefaultLimit,
    /// Explicit context-window overrides, growing windows.
    ExtendedWindow,
    /// Growing output budgets at the best window found.
    OutputBudget,
    /// Latency and throughput at fixed sizes under the best window.
    PerformanceSweep,
}

impl Regime {
    pub fn title(self) -> &'static str {
        match self {
            Self::DefaultLimit => "Default context limit",
            Self::ExtendedWindow => "Extended context window",
            Self::OutputBudget => "Output budget",
            Self::PerformanceSweep => "Performance sweep",
        }
    }
}

/// Why a regime ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stop", content = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// Every scheduled value was probed.
    Exhausted,
    Truncated,
    Plateaued,
    /// A probe failed; carries the failure reason code.
    Failed(String),
    /// Never ran because an earlier regime failed outright.
    Skipped,
}

/// One probe as the controller saw it.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRecord {
    pub regime: Regime,
    pub classification: Classification,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

/// What a finished regime found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegimeSummary {
    pub regime: Regime,
    #[serde(flatten)]
    pub stop: StopReason,
    /// Largest token count observed on a completed probe.
    pub best_tokens: u64,
    /// Window parameter of the probe that produced `best_tokens`.
    pub best_window: Option<u32>,
    /// Token count of the last probe classified `ok`.
    pub last_ok_tokens: Option<u64>,
    pub probes: usize,
    pub successes: usize,
}

impl RegimeSummary {
    pub fn skipped(regime: Regime) -> Self {
        Self {
            regime,
            stop: StopReason::Skipped,
            best_tokens: 0,
            best_window: None,
            last_ok_tokens: None,
            probes: 0,
            successes: 0,
        }
    }

    /// A failure before anything succeeded: later regimes are pointless.
    pub fn hard_failed(&self) -> bool {
        matches!(self.stop, StopReason::Failed(_)) && self.successes == 0
    }
}

/// Mutable best-so-far tracking for the regime in progress.
#[derive(Debug)]
pub struct SearchState {
    regime: Regime,
    best_tokens: u64,
    best_window: Option<u32>,
    consecutive_improvements: u32,
    last_ok_tokens: Option<u64>,
    probes: usize,
    successes: usize,
}

impl SearchState {
    pub fn new(regime: Regime) -> Self {
        Self {
            regime,
            best_tokens: 0,
            best_window: None,
            consecutive_improvements: 0,
            last_ok_tokens: None,
            probes: 0,
            successes: 0,
        }
    }

    pub fn best_tokens(&self) -> u64 {
        self.best_tokens
    }

    /// Best so far, or `None` before the first completed probe.
    pub fn previous_best(&self) -> Option<u64> {
        (self.successes > 0).then_some(self.best_tokens)
    }

    pub fn consecutive_improvements(&self) -> u32 {
        self.consecutive_improvements
    }

    /// Fold a classified probe into the state.
    ///
    /// `observed` is the quantity the regime measures; it is `None` for
    /// failed probes. The best never decreases.
    pub fn observe(&mut self, observed: Option<u64>, window: Option<u32>, verdict: Classification) {
        self.probes += 1;
        let Some(tokens) = observed else {
            return;
        };
        self.successes += 1;
        if tokens > self.best_tokens {
            self.best_tokens = tokens;
            self.best_window = window;
            self.consecutive_improvements += 1;
        } else {
            self.consecutive_improvements = 0;
        }
        if verdict == Classification::Ok {
            self.last_ok_tokens = Some(tokens);
        }
    }

    pub fn finish(self, stop: StopReason) -> RegimeSummary {
        RegimeSummary {
            regime: self.regime,
            stop,
            best_tokens: self.best_tokens,
            best_window: self.best_window,
            last_ok_tokens: self.last_ok_tokens,
            probes: self.probes,
            successes: self.successes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_is_monotonic() {
        let mut state = SearchState::new(Regime::ExtendedWindow);
        let mut last_best = 0;
        for (tokens, window) in [(4_090, 4_096), (8_180, 8_192), (7_000, 16_384), (8_190, 32_768)] {
            state.observe(Some(tokens), Some(window), Classification::Ok);
            assert!(state.best_tokens() >= last_best);
            last_best = state.best_tokens();
        }
        let summary = state.finish(StopReason::Exhausted);
        assert_eq!(summary.best_tokens, 8_190);
        assert_eq!(summary.best_window, Some(32_768));
        assert_eq!(summary.successes, 4);
    }

    #[test]
    fn improvements_reset_on_stall() {
        let mut state = SearchState::new(Regime::ExtendedWindow);
        state.observe(Some(100), Some(1), Classification::Ok);
        state.observe(Some(200), Some(2), Classification::Ok);
        assert_eq!(state.consecutive_improvements(), 2);
        state.observe(Some(150), Some(3), Classification::Plateaued);
        assert_eq!(state.consecutive_improvements(), 0);
    }

    #[test]
    fn failures_count_as_probes_only() {
        let mut state = SearchState::new(Regime::DefaultLimit);
        assert_eq!(state.previous_best(), None);
        state.observe(None, None, Classification::Failed);
        assert_eq!(state.previous_best(), None);
        let summary = state.finish(StopReason::Failed("transport".into()));
        assert_eq!(summary.probes, 1);
        assert!(summary.hard_failed());
    }

    #[test]
    fn last_ok_ignores_truncated_probe() {
        let mut state = SearchState::new(Regime::DefaultLimit);
        state.observe(Some(1_990), None, Classification::Ok);
        state.observe(Some(2_048), None, Classification::Truncated);
        let summary = state.finish(StopReason::Truncated);
        assert_eq!(summary.last_ok_tokens, Some(1_990));
        assert_eq!(summary.best_tokens, 2_048);
        assert!(!summary.hard_failed());
    }
}
