// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider interface and implementations.
//!
//! The core only consumes providers through [`EmbeddingProvider`]. Three
//! implementations ship with the crate: an OpenAI-compatible HTTP client, a
//! command provider that shells out to an external process, and a dummy
//! provider for offline runs.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::{EmbeddingConfig, EmbeddingProviderType};
use crate::errors::{ProviderError, Result, SearchError};

/// Default model, matching the 1536-dimension index schema.
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: usize = 3;

/// Resolved settings for building a provider.
#[derive(Debug, Clone)]
pub struct EmbeddingProviderConfig {
    pub provider: EmbeddingProviderType,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub command: Option<String>,
    pub dimension: usize,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl EmbeddingProviderConfig {
    /// Builds provider settings from the `[embeddings]` config section,
    /// reading the API key from `OPENAI_API_KEY`.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            provider: config.provider(),
            model: config.model().to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("SEMDEX_OPENAI_BASE_URL")
                .unwrap_or_else(|_| config.base_url().to_string()),
            command: config.command.clone(),
            dimension: config.dimension(),
            timeout: Duration::from_secs(config.timeout_secs()),
            max_retries: config.max_retries(),
        }
    }
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::default(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            command: None,
            dimension: crate::store::DEFAULT_EMBEDDING_DIM,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier.
    fn model_id(&self) -> &str;

    /// Maps one bounded-length input to a fixed-dimension vector.
    fn create_embedding(&self, input: &str) -> std::result::Result<Vec<f32>, ProviderError>;
}

/// Builds the provider selected by `config`.
///
/// Missing credentials fail here, before any embedding work starts.
pub fn create_provider(config: &EmbeddingProviderConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderType::Openai => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    SearchError::Configuration(
                        "OPENAI_API_KEY is not set; export it before indexing or searching"
                            .to_string(),
                    )
                })?;
            let provider = OpenAiProvider::new(
                api_key,
                &config.base_url,
                &config.model,
                config.timeout,
                config.max_retries,
            )?;
            Ok(Arc::new(provider))
        }
        EmbeddingProviderType::Command => {
            let command = config.command.clone().ok_or_else(|| {
                SearchError::Configuration(
                    "embeddings.command is required for the command provider".to_string(),
                )
            })?;
            Ok(Arc::new(CommandProvider::new(command, config.model.clone())))
        }
        EmbeddingProviderType::Dummy => Ok(Arc::new(DummyProvider::new(config.dimension))),
    }
}

/// Blocking client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: usize,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(SearchError::Configuration(
                "embedding model name is empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| SearchError::Configuration("invalid OpenAI API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                SearchError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            max_retries: max_retries.max(1),
        })
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn is_retryable_error(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect() || err.is_body()
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl EmbeddingProvider for OpenAiProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn create_embedding(&self, input: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input,
        };

        let mut attempt = 0usize;
        loop {
            match self.client.post(&self.endpoint).json(&request).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp
                            .json()
                            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        return parsed
                            .data
                            .into_iter()
                            .next()
                            .map(|entry| entry.embedding)
                            .ok_or_else(|| {
                                ProviderError::MalformedResponse(
                                    "response contained no embeddings".to_string(),
                                )
                            });
                    }

                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if Self::should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::debug!(%status, attempt, "retrying embedding request");
                        thread::sleep(Self::retry_backoff(attempt));
                        continue;
                    }
                    return Err(ProviderError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) => {
                    if Self::is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::debug!(error = %err, attempt, "retrying embedding request");
                        thread::sleep(Self::retry_backoff(attempt));
                        continue;
                    }
                    return Err(ProviderError::Request(err.to_string()));
                }
            }
        }
    }
}

/// Command provider that shells out to an external process.
pub struct CommandProvider {
    command: String,
    model: String,
}

impl CommandProvider {
    pub fn new(command: String, model: String) -> Self {
        Self { command, model }
    }

    fn run_command(&self, texts: &[&str]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        let payload = serde_json::json!({
            "model": self.model,
            "texts": texts,
        });

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ProviderError::Command(format!("failed to spawn '{}': {}", self.command, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.to_string().as_bytes())
                .map_err(|e| ProviderError::Command(format!("failed to write payload: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ProviderError::Command(format!("failed to read output: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::Command(format!(
                "status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_command_output(stdout.trim())
    }
}

fn parse_command_output(raw: &str) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
    let malformed = |msg: &str| ProviderError::MalformedResponse(msg.to_string());

    let parsed: Value =
        serde_json::from_str(raw).map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let embeddings_value = match parsed {
        Value::Array(arr) => Value::Array(arr),
        Value::Object(ref obj) => ["embeddings", "vectors", "data"]
            .iter()
            .find_map(|key| obj.get(*key).cloned())
            .ok_or_else(|| malformed("output missing 'embeddings' field"))?,
        _ => return Err(malformed("output must be a JSON array or object")),
    };

    embeddings_value
        .as_array()
        .ok_or_else(|| malformed("embeddings must be a JSON array"))?
        .iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| malformed("embedding row must be an array"))?
                .iter()
                .map(|value| {
                    value
                        .as_f64()
                        .map(|v| v as f32)
                        .ok_or_else(|| malformed("embedding value must be a number"))
                })
                .collect()
        })
        .collect()
}

impl EmbeddingProvider for CommandProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn create_embedding(&self, input: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        self.run_command(&[input])?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("no embedding returned".to_string()))
    }
}

/// Dummy provider that returns zero vectors (for testing/fallback).
pub struct DummyProvider {
    model: String,
    dimension: usize,
}

impl DummyProvider {
    /// Creates a new dummy provider with specified dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            model: "dummy".to_string(),
            dimension,
        }
    }
}

impl EmbeddingProvider for DummyProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn create_embedding(&self, _input: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        Ok(vec![0.0; self.dimension])
    }
}
