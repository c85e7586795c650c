//! Installed-model discovery.

use anyhow::{Context, Result};
use serde_json::Value;

use super::OllamaClient;

impl OllamaClient {
    /// Query `/api/tags` for the names of every installed model.
    pub async fn installed_models(&self) -> Result<Vec<String>> {
        let url = self.url("/api/tags");
        let resp: Value = self
            .http()
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse model list")?;

        Ok(model_names(&resp))
    }
}

fn model_names(resp: &Value) -> Vec<String> {
    resp["models"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
