//! Probe records and the probe executor.
//!
//! A [`Probe`] describes one bounded generate call; [`execute`] performs it
//! against an [`Endpoint`] and returns a [`ProbeOutcome`]. Outcomes are built
//! once and never mutated, and executor failures are values, not errors: the
//! controller classifies them instead of propagating them.

use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::endpoint::{Endpoint, GenerateRequest};

/// Why a probe did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum ProbeFailure {
    /// Connection could not be established or broke mid-call.
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success status.
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },
    /// The call exceeded its time budget.
    #[error("timed out")]
    Timeout,
    /// The endpoint answered 2xx with a body we could not read.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProbeFailure {
    /// Short stable reason code recorded in profiles and reports.
    pub fn reason(&self) -> String {
        match self {
            Self::Transport(_) => "transport".to_string(),
            Self::Status { code, .. } => format!("status:{code}"),
            Self::Timeout => "timeout".to_string(),
            Self::InvalidResponse(_) => "invalid-response".to_string(),
        }
    }
}

/// What a probe is measuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Input capacity: a filler prompt of a given size.
    Context,
    /// Output capacity: a fixed prompt with a large output budget.
    Output,
}

/// A single capacity measurement request.
#[derive(Debug, Clone, Serialize)]
pub struct Probe {
    pub model: String,
    pub kind: ProbeKind,
    /// Estimated token count of the prompt actually sent.
    pub requested_tokens: u64,
    /// Context-window override under test; `None` means server default.
    pub window: Option<u32>,
    pub output_budget: u64,
    #[serde(rename = "timeout_secs", serialize_with = "serialize_secs")]
    pub timeout: Duration,
}

/// Completion status of a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeResult {
    Completed { input_tokens: u64, output_tokens: u64 },
    Failed { failure: ProbeFailure },
}

/// The observed result of one [`Probe`].
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub probe: Probe,
    /// Wall-clock seconds from request to response (or failure).
    pub latency_secs: f64,
    #[serde(flatten)]
    pub result: ProbeResult,
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, ProbeResult::Completed { .. })
    }

    /// Input tokens the server reported consuming, if the probe completed.
    pub fn input_tokens(&self) -> Option<u64> {
        match self.result {
            ProbeResult::Completed { input_tokens, .. } => Some(input_tokens),
            ProbeResult::Failed { .. } => None,
        }
    }

    /// Output tokens the server reported generating, if the probe completed.
    pub fn output_tokens(&self) -> Option<u64> {
        match self.result {
            ProbeResult::Completed { output_tokens, .. } => Some(output_tokens),
            ProbeResult::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        match &self.result {
            ProbeResult::Failed { failure } => Some(failure),
            ProbeResult::Completed { .. } => None,
        }
    }

    /// Observed input as a percentage of the requested size.
    pub fn utilization(&self) -> Option<f64> {
        let observed = self.input_tokens()?;
        if self.probe.requested_tokens == 0 {
            return None;
        }
        Some(observed as f64 / self.probe.requested_tokens as f64 * 100.0)
    }

    /// Tokens per second for the quantity this probe measures.
    pub fn tokens_per_sec(&self) -> Option<f64> {
        let tokens = match self.probe.kind {
            ProbeKind::Context => self.input_tokens()?,
            ProbeKind::Output => self.output_tokens()?,
        };
        if self.latency_secs > 0.0 {
            Some(tokens as f64 / self.latency_secs)
        } else {
            None
        }
    }
}

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Issue exactly one call for `probe` carrying `prompt`.
///
/// The call is bounded by `probe.timeout`; there is no retry.
pub async fn execute(endpoint: &dyn Endpoint, probe: Probe, prompt: String) -> ProbeOutcome {
    let request = GenerateRequest {
        model: probe.model.clone(),
        prompt,
        window: probe.window,
        output_budget: probe.output_budget,
    };

    let start = Instant::now();
    let result = match tokio::time::timeout(probe.timeout, endpoint.generate(&request)).await {
        Ok(Ok(generation)) => ProbeResult::Completed {
            input_tokens: generation.input_tokens,
            output_tokens: generation.output_tokens,
        },
        Ok(Err(failure)) => ProbeResult::Failed { failure },
        Err(_) => ProbeResult::Failed {
            failure: ProbeFailure::Timeout,
        },
    };
    let latency_secs = start.elapsed().as_secs_f64();

    match &result {
        ProbeResult::Completed {
            input_tokens,
            output_tokens,
        } => debug!(
            model = %probe.model,
            window = ?probe.window,
            requested = probe.requested_tokens,
            input_tokens,
            output_tokens,
            latency_secs,
            "probe completed"
        ),
        ProbeResult::Failed { failure } => warn!(
            model = %probe.model,
            window = ?probe.window,
            requested = probe.requested_tokens,
            reason = %failure.reason(),
            "probe failed: {failure}"
        ),
    }

    ProbeOutcome {
        probe,
        latency_secs,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Generation, ModelInfo};
    use anyhow::Result;

    struct SlowEndpoint {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl Endpoint for SlowEndpoint {
        fn address(&self) -> &str {
            "slow"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<Generation, ProbeFailure> {
            tokio::time::sleep(self.delay).await;
            Ok(Generation {
                input_tokens: request.prompt.len() as u64,
                output_tokens: request.output_budget,
                text: String::new(),
            })
        }

        async fn model_info(&self, _model: &str) -> Result<ModelInfo> {
            Ok(ModelInfo::default())
        }
    }

    struct DownEndpoint;

    #[async_trait::async_trait]
    impl Endpoint for DownEndpoint {
        fn address(&self) -> &str {
            "down"
        }

        async fn generate(&self, _request: &GenerateRequest) -> Result<Generation, ProbeFailure> {
            Err(ProbeFailure::Transport("connection refused".into()))
        }

        async fn model_info(&self, _model: &str) -> Result<ModelInfo> {
            anyhow::bail!("down")
        }
    }

    fn probe(timeout: Duration) -> Probe {
        Probe {
            model: "m1".into(),
            kind: ProbeKind::Context,
            requested_tokens: 10,
            window: Some(8192),
            output_budget: 5,
            timeout,
        }
    }

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(ProbeFailure::Transport("x".into()).reason(), "transport");
        assert_eq!(
            ProbeFailure::Status {
                code: 404,
                body: String::new()
            }
            .reason(),
            "status:404"
        );
        assert_eq!(ProbeFailure::Timeout.reason(), "timeout");
        assert_eq!(
            ProbeFailure::InvalidResponse("x".into()).reason(),
            "invalid-response"
        );
    }

    #[tokio::test]
    async fn completed_probe_carries_server_counts() {
        let endpoint = SlowEndpoint {
            delay: Duration::from_millis(1),
        };
        let outcome = execute(&endpoint, probe(Duration::from_secs(5)), "abcdefgh".into()).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.input_tokens(), Some(8));
        assert_eq!(outcome.output_tokens(), Some(5));
        assert_eq!(outcome.utilization(), Some(80.0));
        assert!(outcome.failure().is_none());
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let endpoint = SlowEndpoint {
            delay: Duration::from_millis(500),
        };
        let outcome = execute(&endpoint, probe(Duration::from_millis(20)), "x".into()).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.failure(), Some(&ProbeFailure::Timeout));
        assert!(outcome.latency_secs < 0.5);
    }

    #[tokio::test]
    async fn transport_failure_is_an_outcome() {
        let outcome = execute(&DownEndpoint, probe(Duration::from_secs(1)), "x".into()).await;
        assert_eq!(outcome.failure().map(|f| f.reason()), Some("transport".into()));
        assert_eq!(outcome.input_tokens(), None);
        assert_eq!(outcome.tokens_per_sec(), None);
    }

    #[test]
    fn outcome_serializes_flat_status() {
        let outcome = ProbeOutcome {
            probe: probe(Duration::from_secs(300)),
            latency_secs: 1.5,
            result: ProbeResult::Failed {
                failure: ProbeFailure::Status {
                    code: 500,
                    body: "oom".into(),
                },
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failure"]["kind"], "status");
        assert_eq!(json["failure"]["detail"]["code"], 500);
        assert_eq!(json["probe"]["timeout_secs"], 300.0);
        assert_eq!(json["probe"]["kind"], "context");
    }
}
