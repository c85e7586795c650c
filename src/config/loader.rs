//! File loading and merging for ctxprobe configuration.

use anyhow::{Context, Result};
use std::fs;

use super::types::{default_model, Config, EndpointConfig, SearchConfig};

/// Contents written to a fresh global config file.
fn default_config_toml() -> String {
    format!(
        r#"model = "{}"

[endpoint]
base_url = "{}"

[search]
# truncation_threshold = {}
# plateau_threshold = {}
# input_margin = {}
# output_margin = {}
# window_sizes = [8192, 16384, 32768, 65536, 131072]
"#,
        default_model(),
        crate::constants::OLLAMA_DEFAULT_BASE_URL,
        crate::constants::TRUNCATION_THRESHOLD_DEFAULT,
        crate::constants::PLATEAU_THRESHOLD_DEFAULT,
        crate::constants::INPUT_MARGIN_DEFAULT,
        crate::constants::OUTPUT_MARGIN_DEFAULT,
    )
}

impl Config {
    /// Loads the global config from `~/.config/ctxprobe/config.toml`.
    ///
    /// If no config file exists, creates one with sensible defaults
    /// and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = default_config_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            let config: Config = toml::from_str(&default_toml)
                .with_context(|| "Failed to parse default config".to_string())?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    /// Look for ctxprobe.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                let contents = fs::read_to_string(&candidate)?;
                let config: Config = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config at {:?}", candidate))?;
                return Ok(Some(config));
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let (g, p) = (global.search, project.search);
        Config {
            model: if project.model != default_model() {
                project.model
            } else {
                global.model
            },
            endpoint: EndpointConfig {
                base_url: project.endpoint.base_url.or(global.endpoint.base_url),
                metadata_timeout_secs: project
                    .endpoint
                    .metadata_timeout_secs
                    .or(global.endpoint.metadata_timeout_secs),
            },
            search: SearchConfig {
                truncation_threshold: p.truncation_threshold.or(g.truncation_threshold),
                plateau_threshold: p.plateau_threshold.or(g.plateau_threshold),
                window_fill_ratio: p.window_fill_ratio.or(g.window_fill_ratio),
                input_margin: p.input_margin.or(g.input_margin),
                output_margin: p.output_margin.or(g.output_margin),
                default_sizes: p.default_sizes.or(g.default_sizes),
                window_sizes: p.window_sizes.or(g.window_sizes),
                output_budgets: p.output_budgets.or(g.output_budgets),
                performance_sizes: p.performance_sizes.or(g.performance_sizes),
                context_probe_output: p.context_probe_output.or(g.context_probe_output),
                context_timeout_secs: p.context_timeout_secs.or(g.context_timeout_secs),
                output_timeout_secs: p.output_timeout_secs.or(g.output_timeout_secs),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_parses() {
        let config: Config = toml::from_str(&default_config_toml()).unwrap();
        assert_eq!(config.model, crate::constants::DEFAULT_MODEL);
        assert_eq!(
            config.endpoint.base_url.as_deref(),
            Some(crate::constants::OLLAMA_DEFAULT_BASE_URL)
        );
        assert!(config.search.window_sizes.is_none());
    }

    #[test]
    fn project_values_win() {
        let global: Config = toml::from_str(
            r#"
model = "qwen2.5:14b"
[endpoint]
base_url = "http://gpu-box:11434"
[search]
input_margin = 0.85
plateau_threshold = 1.2
"#,
        )
        .unwrap();
        let project: Config = toml::from_str(
            r#"
[search]
input_margin = 0.9
window_sizes = [4096, 8192]
"#,
        )
        .unwrap();

        let merged = Config::merge(global, project);
        assert_eq!(merged.model, "qwen2.5:14b");
        assert_eq!(merged.endpoint.base_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(merged.search.input_margin, Some(0.9));
        assert_eq!(merged.search.plateau_threshold, Some(1.2));
        assert_eq!(merged.search.window_sizes, Some(vec![4096, 8192]));
    }
}
