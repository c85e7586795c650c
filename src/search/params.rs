//! Resolved, validated search settings handed to the controller.

use std::time::Duration;

use anyhow::{ensure, Result};
use serde::Serialize;

use crate::classify::Thresholds;
use crate::constants::{
    CONTEXT_PROBE_OUTPUT_TOKENS, CONTEXT_TIMEOUT_SECS_DEFAULT, DEFAULT_LIMIT_SIZES,
    INPUT_MARGIN_DEFAULT, OUTPUT_BUDGETS, OUTPUT_MARGIN_DEFAULT, OUTPUT_TIMEOUT_SECS_DEFAULT,
    PERFORMANCE_SIZES, WINDOW_FILL_RATIO_DEFAULT, WINDOW_SIZES,
};

/// Every knob the capacity search reads.
///
/// Built from [`crate::config::Config::search_params`] (or `Default` in
/// tests) and owned by one controller, so separate runs never share state.
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams {
    pub thresholds: Thresholds,
    /// Prompt sizes for default-limit discovery.
    pub default_sizes: Vec<u64>,
    /// Window values for extended-window discovery.
    pub window_sizes: Vec<u32>,
    /// Output budgets for output-budget discovery.
    pub output_budgets: Vec<u64>,
    /// Prompt sizes for the performance sweep.
    pub performance_sizes: Vec<u64>,
    /// Prompt size as a fraction of the window under test.
    pub window_fill_ratio: f64,
    /// Output budget used by context probes.
    pub context_probe_output: u64,
    pub input_margin: f64,
    pub output_margin: f64,
    #[serde(skip)]
    pub context_timeout: Duration,
    #[serde(skip)]
    pub output_timeout: Duration,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            default_sizes: DEFAULT_LIMIT_SIZES.to_vec(),
            window_sizes: WINDOW_SIZES.to_vec(),
            output_budgets: OUTPUT_BUDGETS.to_vec(),
            performance_sizes: PERFORMANCE_SIZES.to_vec(),
            window_fill_ratio: WINDOW_FILL_RATIO_DEFAULT,
            context_probe_output: CONTEXT_PROBE_OUTPUT_TOKENS,
            input_margin: INPUT_MARGIN_DEFAULT,
            output_margin: OUTPUT_MARGIN_DEFAULT,
            context_timeout: Duration::from_secs(CONTEXT_TIMEOUT_SECS_DEFAULT),
            output_timeout: Duration::from_secs(OUTPUT_TIMEOUT_SECS_DEFAULT),
        }
    }
}

fn in_unit_interval(v: f64) -> bool {
    v > 0.0 && v <= 1.0
}

fn strictly_ascending<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

impl SearchParams {
    /// Reject settings that would break the search invariants.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            in_unit_interval(self.thresholds.truncation),
            "truncation_threshold must be in (0, 1], got {}",
            self.thresholds.truncation
        );
        ensure!(
            self.thresholds.plateau >= 1.0,
            "plateau_threshold must be >= 1, got {}",
            self.thresholds.plateau
        );
        ensure!(
            in_unit_interval(self.window_fill_ratio),
            "window_fill_ratio must be in (0, 1], got {}",
            self.window_fill_ratio
        );
        ensure!(
            in_unit_interval(self.input_margin),
            "input_margin must be in (0, 1], got {}",
            self.input_margin
        );
        ensure!(
            in_unit_interval(self.output_margin),
            "output_margin must be in (0, 1], got {}",
            self.output_margin
        );
        for (name, ok) in [
            ("default_sizes", strictly_ascending(&self.default_sizes)),
            ("window_sizes", strictly_ascending(&self.window_sizes)),
            ("output_budgets", strictly_ascending(&self.output_budgets)),
            ("performance_sizes", strictly_ascending(&self.performance_sizes)),
        ] {
            ensure!(ok, "{name} must be strictly ascending");
        }
        ensure!(!self.default_sizes.is_empty(), "default_sizes must not be empty");
        ensure!(!self.window_sizes.is_empty(), "window_sizes must not be empty");
        ensure!(
            !self.context_timeout.is_zero() && !self.output_timeout.is_zero(),
            "timeouts must be positive"
        );
        Ok(())
    }

    /// Prompt target for a window under test.
    pub fn fill_target(&self, window: u32) -> u64 {
        (window as f64 * self.window_fill_ratio).floor() as u64
    }
}
