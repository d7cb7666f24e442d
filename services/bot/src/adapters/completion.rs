//! services/bot/src/adapters/completion.rs
//!
//! This module contains the adapter for the streaming completion API.
//! It implements the `CompletionService` port from the `core` crate by POSTing the
//! conversation to an OpenAI-compatible endpoint and decoding the Server-Sent-Event body.

use crate::config::CompletionConfig;
use async_stream::try_stream;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use career_assistant_core::domain::ChatMessage;
use career_assistant_core::ports::{CompletionError, CompletionService, IncrementStream};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Emitted when a stream finished without a single content increment.
pub const NO_CONTENT: &str =
    "⚠️ Maaf, tidak dapat memberikan respons saat ini. Coba lagi dalam beberapa saat.";

/// Upper bound on how much of an HTTP error body is kept for logging.
const ERROR_BODY_PREVIEW: usize = 200;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    model: &'a str,
    stream: bool,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct StreamFrame {
    #[serde(default)]
    choices: Vec<FrameChoice>,
}

#[derive(Deserialize)]
struct FrameChoice {
    #[serde(default)]
    delta: FrameDelta,
}

#[derive(Deserialize, Default)]
struct FrameDelta {
    #[serde(default)]
    content: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` over HTTP + SSE.
#[derive(Clone)]
pub struct SseCompletionAdapter {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl SseCompletionAdapter {
    /// Creates a new adapter. The configured timeout bounds the whole call,
    /// body streaming included.
    pub fn new(config: CompletionConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage]) -> CompletionRequest<'a> {
        CompletionRequest {
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            model: &self.config.model,
            stream: true,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        }
    }
}

#[async_trait]
impl CompletionService for SseCompletionAdapter {
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<IncrementStream, CompletionError> {
        let body = self.request_body(&messages);

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: String = text.chars().take(ERROR_BODY_PREVIEW).collect();
            warn!(status = status.as_u16(), "Completion API rejected the request.");
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body,
            });
        }

        debug!(model = %self.config.model, "Completion stream opened.");
        Ok(Box::pin(increments(response.bytes_stream())))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(e.to_string())
    } else if e.is_builder() {
        CompletionError::InvalidRequest(e.to_string())
    } else {
        CompletionError::Network(e.to_string())
    }
}

//=========================================================================================
// SSE Decoding
//=========================================================================================

/// Turns a raw SSE body into content increments.
///
/// Always yields at least one item: either content, an error, or `NO_CONTENT`.
pub fn increments<S>(body: S) -> impl Stream<Item = Result<String, CompletionError>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    try_stream! {
        let mut decoder = SseDecoder::default();
        let mut emitted = false;
        futures::pin_mut!(body);

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            for content in decoder.push(&chunk) {
                emitted = true;
                yield content;
            }
        }
        if let Some(content) = decoder.finish() {
            emitted = true;
            yield content;
        }
        if !emitted {
            debug!("Completion stream closed without content.");
            yield NO_CONTENT.to_string();
        }
    }
}

/// Splits a byte stream into lines and extracts `choices[0].delta.content` from `data:` frames.
///
/// Lines are only decoded once complete, so multi-byte characters split across
/// network chunks survive intact.
#[derive(Default)]
struct SseDecoder {
    buffer: BytesMut,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut contents = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            if let Some(content) = parse_line(&line[..pos]) {
                contents.push(content);
            }
        }
        contents
    }

    /// Handles a trailing frame that was not newline-terminated before the connection closed.
    fn finish(&mut self) -> Option<String> {
        let rest = self.buffer.split();
        parse_line(&rest)
    }
}

fn parse_line(raw: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let payload = line.trim_end().strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<StreamFrame>(payload) {
        Ok(frame) => frame
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty()),
        Err(e) => {
            debug!(error = %e, "Skipping malformed completion frame.");
            None
        }
    }
}
