//! Environment variable substitution and search-parameter resolution.

use std::time::Duration;

use anyhow::Result;

use super::types::Config;
use crate::classify::Thresholds;
use crate::constants::{
    BASE_URL_ENV, CONTEXT_PROBE_OUTPUT_TOKENS, CONTEXT_TIMEOUT_SECS_DEFAULT, DEFAULT_LIMIT_SIZES,
    INPUT_MARGIN_DEFAULT, METADATA_TIMEOUT_SECS_DEFAULT, OLLAMA_DEFAULT_BASE_URL, OUTPUT_BUDGETS,
    OUTPUT_MARGIN_DEFAULT, OUTPUT_TIMEOUT_SECS_DEFAULT, PERFORMANCE_SIZES,
    PLATEAU_THRESHOLD_DEFAULT, TRUNCATION_THRESHOLD_DEFAULT, WINDOW_FILL_RATIO_DEFAULT,
    WINDOW_SIZES,
};
use crate::search::SearchParams;

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        self.model = Self::resolve_str(&self.model);
        if let Some(ref mut url) = self.endpoint.base_url {
            *url = Self::resolve_str(url);
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// Endpoint base URL: `CTXPROBE_BASE_URL` first, then config, then the local default.
    pub fn base_url(&self) -> String {
        if let Ok(val) = std::env::var(BASE_URL_ENV) {
            if !val.is_empty() {
                return val;
            }
        }
        self.endpoint
            .base_url
            .clone()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| OLLAMA_DEFAULT_BASE_URL.to_string())
    }

    /// Timeout for the metadata lookup.
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(
            self.endpoint
                .metadata_timeout_secs
                .unwrap_or(METADATA_TIMEOUT_SECS_DEFAULT),
        )
    }

    /// Build validated search parameters, filling gaps with defaults.
    pub fn search_params(&self) -> Result<SearchParams> {
        let s = &self.search;
        let params = SearchParams {
            thresholds: Thresholds {
                truncation: s.truncation_threshold.unwrap_or(TRUNCATION_THRESHOLD_DEFAULT),
                plateau: s.plateau_threshold.unwrap_or(PLATEAU_THRESHOLD_DEFAULT),
            },
            default_sizes: s
                .default_sizes
                .clone()
                .unwrap_or_else(|| DEFAULT_LIMIT_SIZES.to_vec()),
            window_sizes: s.window_sizes.clone().unwrap_or_else(|| WINDOW_SIZES.to_vec()),
            output_budgets: s
                .output_budgets
                .clone()
                .unwrap_or_else(|| OUTPUT_BUDGETS.to_vec()),
            performance_sizes: s
                .performance_sizes
                .clone()
                .unwrap_or_else(|| PERFORMANCE_SIZES.to_vec()),
            window_fill_ratio: s.window_fill_ratio.unwrap_or(WINDOW_FILL_RATIO_DEFAULT),
            context_probe_output: s.context_probe_output.unwrap_or(CONTEXT_PROBE_OUTPUT_TOKENS),
            input_margin: s.input_margin.unwrap_or(INPUT_MARGIN_DEFAULT),
            output_margin: s.output_margin.unwrap_or(OUTPUT_MARGIN_DEFAULT),
            context_timeout: Duration::from_secs(
                s.context_timeout_secs.unwrap_or(CONTEXT_TIMEOUT_SECS_DEFAULT),
            ),
            output_timeout: Duration::from_secs(
                s.output_timeout_secs.unwrap_or(OUTPUT_TIMEOUT_SECS_DEFAULT),
            ),
        };
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_placeholders_are_substituted() {
        std::env::set_var("CTXPROBE_TEST_HOST", "gpu-box");
        let resolved = Config::resolve_str("http://{env:CTXPROBE_TEST_HOST}:11434");
        assert_eq!(resolved, "http://gpu-box:11434");
        assert_eq!(Config::resolve_str("{env:CTXPROBE_TEST_UNSET_VAR}"), "");
        assert_eq!(Config::resolve_str("no placeholder {env:"), "no placeholder {env:");
    }

    #[test]
    fn empty_config_gives_default_params() {
        let params = Config::default().search_params().unwrap();
        assert_eq!(params.window_sizes, WINDOW_SIZES.to_vec());
        assert_eq!(params.thresholds, Thresholds::default());
        assert_eq!(params.context_timeout, Duration::from_secs(CONTEXT_TIMEOUT_SECS_DEFAULT));
    }

    #[test]
    fn overrides_flow_into_params() {
        let config: Config = toml::from_str(
            r#"
[search]
truncation_threshold = 0.8
output_margin = 0.75
output_budgets = [512, 1024]
context_timeout_secs = 180
"#,
        )
        .unwrap();
        let params = config.search_params().unwrap();
        assert_eq!(params.thresholds.truncation, 0.8);
        assert_eq!(params.output_margin, 0.75);
        assert_eq!(params.output_budgets, vec![512, 1024]);
        assert_eq!(params.context_timeout, Duration::from_secs(180));
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let config: Config = toml::from_str("[search]\ninput_margin = 1.5\n").unwrap();
        assert!(config.search_params().is_err());
    }
}
