//! OpenRouter API client implementation with automatic retry for transient errors.
//!
//! Works against any OpenAI-compatible chat completions endpoint. Streaming responses
//! are read as server-sent events; retries only happen before the stream is open.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use super::error::{LlmError, RetryConfig};
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenStream, TokenUsage};
use crate::config::DEFAULT_BASE_URL;

/// OpenRouter API client with automatic retry for transient errors.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry_config: RetryConfig,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client with default retry configuration.
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, DEFAULT_BASE_URL.to_string(), RetryConfig::default())
    }

    /// Create a client for a custom OpenAI-compatible endpoint.
    pub fn with_endpoint(api_key: String, base_url: String, retry_config: RetryConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            retry_config,
        }
    }

    /// Parse Retry-After header if present (seconds form only).
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    fn request_builder(&self, request: &OpenRouterRequest) -> reqwest::RequestBuilder {
        self.client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "research-agent")
            .json(request)
    }

    /// Run `op` until it succeeds, fails permanently, or the retry budget is spent.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            let error = match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            attempt,
                            elapsed = ?start.elapsed(),
                            "Request succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.retry_config.should_retry(&error, attempt) {
                if attempt > 0 {
                    tracing::error!(attempt, "Request failed after retries: {}", error);
                } else {
                    tracing::error!("Request failed (non-retryable): {}", error);
                }
                return Err(error);
            }

            let remaining = self
                .retry_config
                .max_retry_duration
                .saturating_sub(start.elapsed());
            let delay = error.suggested_delay(attempt).min(remaining);
            if delay.is_zero() {
                tracing::warn!(attempt = attempt + 1, "No retry time remaining: {}", error);
                return Err(error);
            }

            tracing::warn!(
                attempt = attempt + 1,
                kind = %error.kind,
                ?delay,
                "Retrying request: {}",
                error.message
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Execute a single batch request without retry.
    async fn execute_request(&self, request: &OpenRouterRequest) -> Result<ChatResponse, LlmError> {
        let response = self
            .request_builder(request)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), body, retry_after));
        }

        let parsed: OpenRouterResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::parse_error("No choices in response".to_string()))?;

        Ok(ChatResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
            usage: parsed
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            model: parsed.model.or_else(|| Some(request.model.clone())),
        })
    }

    /// Connect an event source and wait for the `Open` event.
    async fn open_stream(
        &self,
        request: &OpenRouterRequest,
    ) -> Result<Pin<Box<EventSource>>, LlmError> {
        let mut source = EventSource::new(self.request_builder(request))
            .map(Box::pin)
            .map_err(|e| LlmError::parse_error(format!("Request cannot be streamed: {}", e)))?;

        match source.next().await {
            Some(Ok(Event::Open)) => Ok(source),
            Some(Ok(Event::Message(_))) => Err(LlmError::parse_error(
                "Stream produced data before opening".to_string(),
            )),
            Some(Err(reqwest_eventsource::Error::InvalidStatusCode(status, response))) => {
                let retry_after = Self::parse_retry_after(response.headers());
                let body = response.text().await.unwrap_or_default();
                Err(LlmError::from_status(status.as_u16(), body, retry_after))
            }
            Some(Err(reqwest_eventsource::Error::Transport(e))) => {
                Err(LlmError::from_transport(&e))
            }
            Some(Err(e)) => Err(LlmError::network_error(format!(
                "Failed to open stream: {}",
                e
            ))),
            None => Err(LlmError::network_error(
                "Stream closed before opening".to_string(),
            )),
        }
    }

    fn build_request(
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
        stream: bool,
    ) -> OpenRouterRequest {
        OpenRouterRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
            stream,
        }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = Self::build_request(model, messages, options, false);
        tracing::debug!(model, "Sending completion request");
        let response = self.with_retry(|| self.execute_request(&request)).await?;
        Ok(response)
    }

    async fn chat_completion_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> anyhow::Result<TokenStream> {
        let request = Self::build_request(model, messages, options, true);
        tracing::debug!(model, "Opening completion stream");
        let source = self.with_retry(|| self.open_stream(&request)).await?;
        Ok(Box::pin(token_stream(source)))
    }
}

/// Turn an open event source into a stream of text increments.
fn token_stream(
    mut source: Pin<Box<EventSource>>,
) -> impl Stream<Item = anyhow::Result<String>> + Send + 'static {
    async_stream::try_stream! {
        while let Some(event) = source.next().await {
            match read_event(event)? {
                StreamStep::Text(text) => yield text,
                StreamStep::Skip => continue,
                StreamStep::Done => break,
            }
        }
    }
}

/// What one server-sent event means for the token stream.
#[derive(Debug, PartialEq, Eq)]
enum StreamStep {
    Text(String),
    Skip,
    Done,
}

fn read_event(event: Result<Event, reqwest_eventsource::Error>) -> Result<StreamStep, LlmError> {
    match event {
        Ok(Event::Open) => Ok(StreamStep::Skip),
        Ok(Event::Message(message)) => decode_data(&message.data),
        Err(reqwest_eventsource::Error::StreamEnded) => Ok(StreamStep::Done),
        Err(e) => Err(LlmError::network_error(format!("Stream interrupted: {}", e))),
    }
}

/// Decode the `data:` payload of one stream event.
fn decode_data(data: &str) -> Result<StreamStep, LlmError> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(StreamStep::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
        LlmError::parse_error(format!("Failed to parse stream chunk: {}, data: {}", e, data))
    })?;

    if let Some(error) = chunk.error {
        return Err(LlmError::network_error(format!(
            "Provider error in stream: {}",
            error
        )));
    }

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();

    if text.is_empty() {
        Ok(StreamStep::Skip)
    } else {
        Ok(StreamStep::Text(text))
    }
}

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
    #[serde(default)]
    usage: Option<OpenRouterUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// One streamed chunk (`chat.completion.chunk`).
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;

    #[test]
    fn decodes_content_deltas() {
        let data = r#"{"id":"x","choices":[{"index":0,"delta":{"content":"Hel"}}]}"#;
        assert_eq!(decode_data(data).unwrap(), StreamStep::Text("Hel".to_string()));
    }

    #[test]
    fn role_only_and_empty_deltas_are_skipped() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(decode_data(data).unwrap(), StreamStep::Skip);
        assert_eq!(decode_data(r#"{"choices":[]}"#).unwrap(), StreamStep::Skip);
    }

    #[test]
    fn done_marker_ends_the_stream() {
        assert_eq!(decode_data(" [DONE] ").unwrap(), StreamStep::Done);
    }

    #[test]
    fn malformed_and_error_chunks_fail() {
        let err = decode_data("{not json").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::ParseError);

        let err = decode_data(r#"{"error":{"message":"overloaded"}}"#).unwrap_err();
        assert!(err.message.contains("overloaded"));
    }

    #[test]
    fn request_omits_unset_options_and_batch_flag() {
        let request = OpenRouterClient::build_request(
            "openai/gpt-3.5-turbo",
            &[ChatMessage::user("hi")],
            &ChatOptions {
                temperature: Some(0.2),
                ..ChatOptions::default()
            },
            false,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["temperature"], 0.2);
        assert!(json.get("top_p").is_none());
        assert!(json.get("stream").is_none());

        let streaming = OpenRouterClient::build_request("m", &[], &ChatOptions::default(), true);
        assert_eq!(serde_json::to_value(&streaming).unwrap()["stream"], true);
    }

    #[test]
    fn retry_after_header_is_parsed() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "12".parse().unwrap());
        assert_eq!(
            OpenRouterClient::parse_retry_after(&headers),
            Some(Duration::from_secs(12))
        );
    }
}
