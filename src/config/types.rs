//! Struct definitions and serde defaults for ctxprobe configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for ctxprobe, deserialized from `config.toml`.
///
/// Fields use serde defaults so ctxprobe can run with sensible defaults
/// when no config file exists.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Model probed when none is named on the command line.
    #[serde(default = "default_model")]
    pub model: String,
    /// Where the inference server lives.
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Overrides for search thresholds, schedules, margins, and timeouts.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Returns the default model identifier (`"gpt-oss:20b"`).
///
/// Used by serde's `#[serde(default)]` attribute during deserialization.
pub(super) fn default_model() -> String {
    crate::constants::DEFAULT_MODEL.to_string()
}

/// Connection details for the serving endpoint.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct EndpointConfig {
    /// Base URL of the Ollama-compatible server.
    pub base_url: Option<String>,
    /// Timeout for the model metadata lookup, in seconds.
    pub metadata_timeout_secs: Option<u64>,
}

/// Optional overrides for the capacity search.
///
/// Anything left unset falls back to the values in [`crate::constants`].
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct SearchConfig {
    /// Ratio below which observed input counts as truncated (0.0–1.0).
    pub truncation_threshold: Option<f64>,
    /// Growth ratio at or below which capacity counts as plateaued (>= 1.0).
    pub plateau_threshold: Option<f64>,
    /// Fraction of each tested window that the prompt fills.
    pub window_fill_ratio: Option<f64>,
    /// Safety margin applied to the native context.
    pub input_margin: Option<f64>,
    /// Safety margin applied to the max output.
    pub output_margin: Option<f64>,
    /// Prompt sizes for default-limit discovery.
    pub default_sizes: Option<Vec<u64>>,
    /// Window values for extended-window discovery.
    pub window_sizes: Option<Vec<u32>>,
    /// Output budgets for output-budget discovery.
    pub output_budgets: Option<Vec<u64>>,
    /// Prompt sizes for the performance sweep.
    pub performance_sizes: Option<Vec<u64>>,
    /// Output budget for context probes.
    pub context_probe_output: Option<u64>,
    /// Per-call timeout for context probes, in seconds.
    pub context_timeout_secs: Option<u64>,
    /// Per-call timeout for output probes, in seconds.
    pub output_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: EndpointConfig::default(),
            search: SearchConfig::default(),
        }
    }
}
