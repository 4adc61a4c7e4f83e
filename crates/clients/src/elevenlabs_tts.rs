//! ElevenLabs streaming text-to-speech adapter (spec.md §4.6, §6
//! `ELEVENLABS_API_KEY` / `ELEVENLABS_VOICE_ID`).

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::pin::Pin;
use std::time::Duration;

use voice_gateway_core::{Result as CoreResult, TextToSpeech};

use crate::error::{ClientError, Result};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const TTS_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

pub struct ElevenLabsTtsClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl ElevenLabsTtsClient {
    pub fn new(http: Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(http: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn open_stream(&self, text: &str, voice_id: &str) -> Result<impl Stream<Item = Result<Vec<u8>>>> {
        let request = TtsRequest {
            text,
            model_id: "eleven_turbo_v2_5",
        };

        let response = self
            .http
            .post(format!("{}/text-to-speech/{voice_id}/stream", self.base_url))
            .header("xi-api-key", &self.api_key)
            .timeout(TTS_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|source| ClientError::Transport { vendor: "elevenlabs", source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status("elevenlabs", status, body));
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(|source| ClientError::Transport { vendor: "elevenlabs", source }));
        Ok(chunks)
    }
}

#[async_trait]
impl TextToSpeech for ElevenLabsTtsClient {
    async fn stream(
        &self,
        text: &str,
        voice_id: &str,
    ) -> CoreResult<Pin<Box<dyn Stream<Item = CoreResult<Vec<u8>>> + Send>>> {
        let inner = self
            .open_stream(text, voice_id)
            .await
            .map_err(voice_gateway_core::CoreError::from)?;
        let mapped = inner.map(|item| item.map_err(voice_gateway_core::CoreError::from));
        Ok(Box::pin(mapped))
    }
}
