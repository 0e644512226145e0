//! OpenAI-compatible providers for embeddings and chat completions
//!
//! One HTTP client is shared by the embedder and the LLM. The API key is
//! checked when the client is built, so a missing credential surfaces at
//! startup instead of on the first request.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{future, stream, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{ChatMessage, CompletionRequest, LlmProvider, TokenStream};

/// HTTP client for an OpenAI-compatible API
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    embed_batch_size: usize,
}

impl OpenAiClient {
    /// Create a client; fails with `ProviderUnconfigured` when no API key is set
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::ProviderUnconfigured(format!("{} is not set", config.api_key_env)))?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| Error::Config(format!("{} contains invalid characters", config.api_key_env)))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // No overall timeout on the client: streamed answers may take longer
        // than a single request is allowed to
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            embed_batch_size: config.embed_batch_size.max(1),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Embed texts in batches, preserving input order
    pub async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.embed_batch_size) {
            embeddings.extend(self.embed_batch(model, batch).await?);
        }
        Ok(embeddings)
    }

    async fn embed_batch(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest { model, input: inputs };
        let response = self
            .client
            .post(self.endpoint("embeddings"))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::provider(format!("embeddings request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::provider(format!(
                "embeddings request failed ({}): {}",
                status, body
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("failed to parse embedding response: {}", e)))?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != inputs.len() {
            return Err(Error::provider(format!(
                "backend returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }

    /// Non-streamed chat completion
    pub async fn chat(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        let response = self.send_chat(model, request, false).await?;
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::completion(format!("failed to parse completion: {}", e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Streamed chat completion over server-sent events
    pub async fn chat_stream(&self, model: &str, request: &CompletionRequest) -> Result<TokenStream> {
        let response = self.send_chat(model, request, true).await?;
        Ok(token_stream(response.bytes_stream()))
    }

    async fn send_chat(
        &self,
        model: &str,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response> {
        let body = ChatCompletionRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            stream,
        };

        let mut builder = self.client.post(self.endpoint("chat/completions")).json(&body);
        if !stream {
            builder = builder.timeout(self.timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::completion(format!("completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::completion(format!(
                "completion request failed ({}): {}",
                status, body
            )));
        }

        Ok(response)
    }

    /// Check that the API answers with these credentials
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .timeout(Duration::from_secs(5))
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }
}

/// Tokens of an OpenAI-style event stream, ending at `[DONE]`
fn token_stream<S, B, E>(bytes: S) -> TokenStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    bytes
        .eventsource()
        .take_while(|event| future::ready(!matches!(event, Ok(event) if event.data == "[DONE]")))
        .flat_map(|event| {
            let tokens = match event {
                Ok(event) => decode_event(&event.data),
                Err(e) => vec![Err(Error::completion(format!("stream interrupted: {}", e)))],
            };
            stream::iter(tokens)
        })
        // The first error is the last item
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}

/// Content deltas carried by one event
fn decode_event(data: &str) -> Vec<Result<String>> {
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(StreamChunk {
            error: Some(error), ..
        }) => vec![Err(Error::completion(error.message))],
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .filter_map(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(Ok)
            .collect(),
        Err(e) => {
            tracing::warn!("Skipping unparseable stream event: {} ({})", data, e);
            Vec::new()
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// OpenAI-compatible embedding provider
pub struct OpenAiEmbedder {
    client: Arc<OpenAiClient>,
    model: String,
}

impl OpenAiEmbedder {
    /// Create from existing client
    pub fn from_client(client: Arc<OpenAiClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed(&self.model, texts).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// OpenAI-compatible chat completion provider
pub struct OpenAiLlm {
    client: Arc<OpenAiClient>,
    model: String,
}

impl OpenAiLlm {
    /// Create from existing client
    pub fn from_client(client: Arc<OpenAiClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.client.chat(&self.model, request).await
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TokenStream> {
        self.client.chat_stream(&self.model, request).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Combined provider that shares a single client for embeddings and completions
pub struct OpenAiProvider {
    embedder: OpenAiEmbedder,
    llm: OpenAiLlm,
}

impl OpenAiProvider {
    /// Create a new combined provider
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Arc::new(OpenAiClient::new(config)?);
        Ok(Self {
            embedder: OpenAiEmbedder::from_client(Arc::clone(&client), config.embed_model.clone()),
            llm: OpenAiLlm::from_client(client, config.chat_model.clone()),
        })
    }

    /// Split into separate providers
    pub fn split(self) -> (OpenAiEmbedder, OpenAiLlm) {
        (self.embedder, self.llm)
    }
}
