//! Serving endpoint abstraction for ctxprobe.
//!
//! The engine only needs two things from an inference server: a bounded,
//! non-streaming generate call that reports token counts, and (optionally)
//! declared model metadata. [`Endpoint`] captures that seam so the search
//! controller can run against [`OllamaClient`] in production and a scripted
//! endpoint in tests.

mod listing;
mod ollama;

pub use ollama::OllamaClient;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::probe::ProbeFailure;

/// One generate call as the engine sees it.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Context-window override; `None` leaves the server default in place.
    pub window: Option<u32>,
    /// Maximum number of tokens to generate.
    pub output_budget: u64,
}

/// Token accounting reported by the server for a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Input tokens the server actually evaluated.
    pub input_tokens: u64,
    /// Output tokens the server actually generated.
    pub output_tokens: u64,
    pub text: String,
}

/// Declared model details. Shown to humans, never used to steer the search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub family: Option<String>,
    pub parameter_size: Option<String>,
    /// Context length the model advertises, when the server exposes one.
    pub declared_context: Option<u64>,
}

/// A model-serving backend that probes are issued against.
#[async_trait::async_trait]
pub trait Endpoint: Send + Sync {
    /// Human-readable address of the backend, recorded in run reports.
    fn address(&self) -> &str;

    /// Perform exactly one generate call. Implementations must not retry.
    async fn generate(&self, request: &GenerateRequest) -> Result<Generation, ProbeFailure>;

    /// Look up declared metadata for `model`.
    async fn model_info(&self, model: &str) -> Result<ModelInfo>;
}
