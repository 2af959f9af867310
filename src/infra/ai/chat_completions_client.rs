// Client for OpenAI-compatible `/v1/chat/completions` endpoints with
// streaming enabled (Abacus RouteLLM by default).
//
// **Environment Variables:**
// - `ABACUS_API_KEY` - Bearer token
// - `ABACUS_URL` - Endpoint override
// - `ABACUS_MODEL` - Model name

use super::sse::{SseDecoder, SseEvent};
use crate::core::ai::{AiConfig, AiError, AiMessage, AiProvider, ChatStream};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;

pub const DEFAULT_CHAT_URL: &str = "https://routellm.abacus.ai/v1/chat/completions";

pub struct ChatCompletionsClient {
    client: Client,
    api_key: String,
    url: String,
}

impl ChatCompletionsClient {
    pub fn new(api_key: String, url: String) -> Result<Self, AiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AiError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            url,
        })
    }
}

/// State threaded through `stream::unfold`.
struct Pump<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> Pump<S> {
    /// Queues deltas; returns `true` once `[DONE]` was seen.
    fn absorb(&mut self, events: Vec<SseEvent>) -> bool {
        for event in events {
            match event {
                SseEvent::Delta(text) => self.pending.push_back(text),
                SseEvent::Done => return true,
            }
        }
        false
    }
}

/// Turns a raw SSE byte stream into text deltas. Ends at `[DONE]`, at the
/// end of the body, or after the first transport error.
fn into_deltas<S, B, E>(bytes: S) -> ChatStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let pump = Pump {
        bytes: bytes.boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(pump, |mut pump| async move {
        loop {
            if let Some(text) = pump.pending.pop_front() {
                return Some((Ok(text), pump));
            }
            if pump.finished {
                return None;
            }

            match pump.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = pump.decoder.push(chunk.as_ref());
                    pump.finished = pump.absorb(events);
                }
                Some(Err(e)) => {
                    pump.finished = true;
                    return Some((Err(AiError::Stream(e.to_string())), pump));
                }
                None => {
                    let events = pump.decoder.finish();
                    pump.absorb(events);
                    pump.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl AiProvider for ChatCompletionsClient {
    async fn chat_stream(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<ChatStream, AiError> {
        let payload = json!({
            "model": config.model,
            "messages": messages,
            "temperature": config.temperature,
            "stream": true,
        });

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| AiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api { status, body });
        }

        Ok(into_deltas(response.bytes_stream()))
    }
}
