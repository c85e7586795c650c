//! Ollama HTTP client.
//!
//! Talks to `/api/generate` for probes and `/api/show` for metadata. Every
//! reqwest failure is mapped to a distinct [`ProbeFailure`] so the classifier
//! can tell a dead server from a rejected request.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Endpoint, GenerateRequest, Generation, ModelInfo};
use crate::probe::ProbeFailure;

/// Maximum number of characters of an error body kept in a failure.
const ERROR_BODY_LIMIT: usize = 200;

/// A configured connection to an Ollama server.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    metadata_timeout: Duration,
}

#[derive(Serialize)]
struct WireGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: WireOptions,
}

#[derive(Serialize)]
struct WireOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<u32>,
    num_predict: u64,
}

#[derive(Deserialize)]
struct WireGenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[derive(Deserialize, Default)]
struct WireShowResponse {
    #[serde(default)]
    details: WireDetails,
    #[serde(default)]
    model_info: Option<serde_json::Map<String, Value>>,
}

#[derive(Deserialize, Default)]
struct WireDetails {
    family: Option<String>,
    parameter_size: Option<String>,
    context_length: Option<u64>,
}

impl OllamaClient {
    /// Creates a client for the server at `base_url` (trailing slashes are ignored).
    pub fn new(base_url: &str, metadata_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            metadata_timeout,
        })
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(super) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// Maps a reqwest error onto the failure taxonomy.
fn map_error(err: reqwest::Error) -> ProbeFailure {
    if err.is_timeout() {
        ProbeFailure::Timeout
    } else if err.is_decode() {
        ProbeFailure::InvalidResponse(err.to_string())
    } else {
        ProbeFailure::Transport(err.to_string())
    }
}

/// Extracts the advertised context length from `/api/show` output.
///
/// Older servers put it in `details`; newer ones expose it as
/// `<arch>.context_length` inside `model_info`.
fn declared_context(show: &WireShowResponse) -> Option<u64> {
    show.details.context_length.or_else(|| {
        show.model_info.as_ref().and_then(|info| {
            info.iter()
                .find(|(key, _)| key.ends_with(".context_length"))
                .and_then(|(_, value)| value.as_u64())
        })
    })
}

#[async_trait::async_trait]
impl Endpoint for OllamaClient {
    fn address(&self) -> &str {
        &self.base_url
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Generation, ProbeFailure> {
        let body = WireGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            options: WireOptions {
                num_ctx: request.window,
                num_predict: request.output_budget,
            },
        };
        debug!(
            model = %request.model,
            window = ?request.window,
            output_budget = request.output_budget,
            prompt_chars = request.prompt.len(),
            "POST /api/generate"
        );

        let resp = self
            .http
            .post(self.url("/api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(map_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProbeFailure::Status {
                code: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let data: WireGenerateResponse = resp.json().await.map_err(map_error)?;
        Ok(Generation {
            input_tokens: data.prompt_eval_count,
            output_tokens: data.eval_count,
            text: data.response,
        })
    }

    async fn model_info(&self, model: &str) -> Result<ModelInfo> {
        let resp = self
            .http
            .post(self.url("/api/show"))
            .json(&serde_json::json!({ "name": model }))
            .timeout(self.metadata_timeout)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;

        let status = resp.status();
        anyhow::ensure!(
            status.is_success(),
            "Metadata lookup for {} returned HTTP {}",
            model,
            status.as_u16()
        );

        let show: WireShowResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse metadata for {}", model))?;
        Ok(ModelInfo {
            declared_context: declared_context(&show),
            family: show.details.family,
            parameter_size: show.details.parameter_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one connection with a canned HTTP response.
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            // Read until the JSON body has arrived; requests in these tests are small.
            let mut seen = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
                if seen.ends_with(b"}") {
                    break;
                }
            }
            let reply = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "m1".to_string(),
            prompt: "Summarize: test".to_string(),
            window: Some(4096),
            output_budget: 10,
        }
    }

    fn client(base: &str) -> OllamaClient {
        OllamaClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn wire_request_omits_missing_window() {
        let body = WireGenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            options: WireOptions {
                num_ctx: None,
                num_predict: 100,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 100);
        assert!(json["options"].get("num_ctx").is_none());
    }

    #[test]
    fn declared_context_prefers_details_then_model_info() {
        let show: WireShowResponse = serde_json::from_str(
            r#"{"details":{"family":"llama"},"model_info":{"llama.context_length":131072}}"#,
        )
        .unwrap();
        assert_eq!(declared_context(&show), Some(131_072));

        let show: WireShowResponse =
            serde_json::from_str(r#"{"details":{"context_length":8192}}"#).unwrap();
        assert_eq!(declared_context(&show), Some(8192));

        let show: WireShowResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(declared_context(&show), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = client("http://localhost:11434/");
        assert_eq!(c.address(), "http://localhost:11434");
        assert_eq!(c.url("/api/tags"), "http://localhost:11434/api/tags");
    }

    #[tokio::test]
    async fn generate_reads_token_counts() {
        let base = one_shot_server(
            "HTTP/1.1 200 OK",
            r#"{"response":"ok","done":true,"prompt_eval_count":4090,"eval_count":7}"#,
        )
        .await;
        let generation = client(&base).generate(&request()).await.unwrap();
        assert_eq!(generation.input_tokens, 4090);
        assert_eq!(generation.output_tokens, 7);
        assert_eq!(generation.text, "ok");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let base =
            one_shot_server("HTTP/1.1 500 Internal Server Error", r#"{"error":"oom"}"#).await;
        let err = client(&base).generate(&request()).await.unwrap_err();
        assert_eq!(err.reason(), "status:500");
        match err {
            ProbeFailure::Status { body, .. } => assert!(body.contains("oom")),
            other => panic!("unexpected failure {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_body_is_invalid_response() {
        let base = one_shot_server("HTTP/1.1 200 OK", "not json at all}").await;
        let err = client(&base).generate(&request()).await.unwrap_err();
        assert_eq!(err.reason(), "invalid-response");
    }

    #[tokio::test]
    async fn refused_connection_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client(&format!("http://{addr}"))
            .generate(&request())
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "transport");
    }
}
