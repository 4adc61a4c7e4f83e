//! OpenAI streaming chat completion adapter (spec.md §4.6, §6
//! `OPENAI_API_KEY`).

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use voice_gateway_core::{LanguageModel, Message, MessageRole, Result as CoreResult};

use crate::error::{ClientError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Bounds response length at the LLM layer to preserve turn latency
/// (spec.md §4.5).
const MAX_RESPONSE_TOKENS: u32 = 150;
const FIRST_TOKEN_TIMEOUT: Duration = Duration::from_secs(10);
const TOTAL_STREAM_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenAiLlmClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiLlmClient {
    pub fn new(http: Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(http: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    async fn open_stream(&self, messages: Vec<Message>) -> Result<impl Stream<Item = Result<String>>> {
        let request = ChatRequest {
            model: &self.model,
            stream: true,
            max_tokens: MAX_RESPONSE_TOKENS,
            messages: messages.iter().map(WireMessage::from).collect(),
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ClientError::Transport { vendor: "openai", source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status("openai", status, body));
        }

        Ok(sse_token_stream(response.bytes_stream()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(m: &'a Message) -> Self {
        let role = match m.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        WireMessage { role, content: &m.text }
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Decode an OpenAI-style SSE byte stream into a token stream, applying
/// the first-token and total-stream timeouts (spec.md §5).
fn sse_token_stream(
    mut bytes: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Unpin + Send + 'static,
) -> impl Stream<Item = Result<String>> {
    async_stream::stream! {
        let deadline = tokio::time::Instant::now() + TOTAL_STREAM_TIMEOUT;
        let mut buf = String::new();
        let mut first = true;

        loop {
            let per_chunk_timeout = if first { FIRST_TOKEN_TIMEOUT } else { deadline.saturating_duration_since(tokio::time::Instant::now()) };
            let next = match tokio::time::timeout(per_chunk_timeout, bytes.next()).await {
                Ok(next) => next,
                Err(_) => {
                    yield Err(ClientError::UpstreamTransient { vendor: "openai", status: 0 });
                    return;
                }
            };
            let Some(chunk) = next else { break };
            let chunk = match chunk {
                Ok(c) => c,
                Err(source) => {
                    yield Err(ClientError::Transport { vendor: "openai", source });
                    return;
                }
            };
            buf.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buf.find("\n\n") {
                let event = buf[..pos].to_string();
                buf = buf[pos + 2..].to_string();
                for line in event.lines() {
                    let Some(data) = line.strip_prefix("data: ") else { continue };
                    if data == "[DONE]" {
                        return;
                    }
                    match serde_json::from_str::<ChatChunk>(data) {
                        Ok(parsed) => {
                            if let Some(choice) = parsed.choices.into_iter().next() {
                                if let Some(content) = choice.delta.content {
                                    if !content.is_empty() {
                                        first = false;
                                        yield Ok(content);
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            yield Err(ClientError::Decode(e.to_string(), "openai"));
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiLlmClient {
    async fn stream(
        &self,
        messages: Vec<Message>,
    ) -> CoreResult<Pin<Box<dyn Stream<Item = CoreResult<String>> + Send>>> {
        let inner = self
            .open_stream(messages)
            .await
            .map_err(voice_gateway_core::CoreError::from)?;
        let mapped = inner.map(|item| item.map_err(voice_gateway_core::CoreError::from));
        Ok(Box::pin(mapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> OpenAiLlmClient {
        OpenAiLlmClient::with_base_url(Client::new(), "key", server.base_url())
    }

    #[tokio::test]
    async fn streams_concatenated_tokens() {
        let server = MockServer::start();
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\" there.\"}}]}\n\n\
                     data: [DONE]\n\n";
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).header("content-type", "text/event-stream").body(body);
        });

        let client = client_for(&server);
        let mut stream = client
            .stream(vec![Message::user("hello")])
            .await
            .unwrap();
        let mut out = String::new();
        while let Some(tok) = stream.next().await {
            out.push_str(&tok.unwrap());
        }
        assert_eq!(out, "Hi there.");
    }

    #[tokio::test]
    async fn permanent_failure_surfaces_as_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(400).body("bad request");
        });

        let client = client_for(&server);
        let err = match client.stream(vec![Message::user("hi")]).await {
            Err(e) => e,
            Ok(_) => panic!("expected a permanent-failure error"),
        };
        assert!(err.to_string().contains("adapter error"));
    }
}
