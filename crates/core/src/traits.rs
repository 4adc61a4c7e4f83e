//! Adapter traits for the three external services (spec.md §4.6).
//!
//! These are the only seam between the pipeline and the outside world. The
//! pipeline crate is generic over `Arc<dyn SpeechToText>`, `Arc<dyn
//! LanguageModel>`, `Arc<dyn TextToSpeech>` and never talks HTTP directly.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::Result;

/// One message in the LLM request, in role order.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            text: text.into(),
        }
    }
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Speech-to-text: one voiced-audio buffer in, one transcript out.
///
/// Implementations retry once on transport error (spec.md §7) and return an
/// empty string for "no speech detected" rather than erroring.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, pcm_16le_16k_mono: &[u8], language_hint: &str) -> Result<String>;
}

/// Streaming chat completion. Tokens are arbitrary substrings that
/// concatenate to the full response; no sentence-boundary guarantee is made
/// by the adapter (that is the `SentenceSplitter`'s job).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn stream(
        &self,
        messages: Vec<Message>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>>;
}

/// Streaming text-to-speech, invoked once per sentence (spec.md §4.6).
/// Each yielded chunk is a self-describing audio blob (MP3 frames by
/// default) ready to forward to the client unmodified.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn stream(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    struct MockStt(&'static str);

    #[async_trait]
    impl SpeechToText for MockStt {
        async fn transcribe(&self, _pcm: &[u8], _lang: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn mock_stt_roundtrip() {
        let stt = MockStt("hello");
        let out = stt.transcribe(&[], "en").await.unwrap();
        assert_eq!(out, "hello");
    }

    struct MockLlm;

    #[async_trait]
    impl LanguageModel for MockLlm {
        async fn stream(
            &self,
            _messages: Vec<Message>,
        ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
            Ok(Box::pin(stream::iter(vec![Ok("hi".to_string()), Ok(" there".to_string())])))
        }
    }

    #[tokio::test]
    async fn mock_llm_streams_tokens() {
        use futures::StreamExt;
        let llm = MockLlm;
        let mut s = llm.stream(vec![Message::user("hey")]).await.unwrap();
        let mut out = String::new();
        while let Some(tok) = s.next().await {
            out.push_str(&tok.unwrap());
        }
        assert_eq!(out, "hi there");
    }
}
