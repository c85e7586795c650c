//! Run reports.
//!
//! A [`RunReport`] holds one entry per requested model, in request order, and
//! is written as pretty-printed JSON under
//! `~/.local/share/ctxprobe/results/` unless the caller names a path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::constants::{REPORT_FILE_PREFIX, RESULTS_DIRNAME};
use crate::profile::CapacityProfile;

/// Result for a single model.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ModelEntry {
    Profiled(CapacityProfile),
    /// The search for this model could not run at all.
    Failed {
        model: String,
        error: String,
        timestamp: String,
    },
}

impl ModelEntry {
    pub fn model(&self) -> &str {
        match self {
            Self::Profiled(profile) => &profile.model,
            Self::Failed { model, .. } => model,
        }
    }
}

/// All results of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub endpoint: String,
    pub comprehensive: bool,
    pub entries: Vec<ModelEntry>,
}

impl RunReport {
    pub fn new(endpoint: &str, comprehensive: bool) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            endpoint: endpoint.to_string(),
            comprehensive,
            entries: Vec::new(),
        }
    }

    pub fn push_profile(&mut self, profile: CapacityProfile) {
        self.entries.push(ModelEntry::Profiled(profile));
    }

    pub fn push_error(&mut self, model: &str, error: String) {
        self.entries.push(ModelEntry::Failed {
            model: model.to_string(),
            error,
            timestamp: Utc::now().to_rfc3339(),
        });
    }

    /// Stamp the finish time. Entries are not added after this.
    pub fn finalize(&mut self) {
        self.finished_at = Some(Utc::now().to_rfc3339());
    }

    pub fn profiles(&self) -> impl Iterator<Item = &CapacityProfile> {
        self.entries.iter().filter_map(|e| match e {
            ModelEntry::Profiled(p) => Some(p),
            ModelEntry::Failed { .. } => None,
        })
    }

    /// Default location: `<data dir>/results/capacity_results_<YYYYmmdd_HHMMSS>.json`.
    pub fn default_path() -> Result<PathBuf> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        Ok(Config::data_dir()?
            .join(RESULTS_DIRNAME)
            .join(format!("{REPORT_FILE_PREFIX}_{stamp}.json")))
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write report to {:?}", path))?;
        Ok(())
    }
}
