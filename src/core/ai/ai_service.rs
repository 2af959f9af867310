use super::models::{AiConfig, AiMessage};
use async_trait::async_trait;
use futures::stream::BoxStream;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Chat API error: {status} - {body}")]
    Api { status: u16, body: String },
    #[error("Stream error: {0}")]
    Stream(String),
}

/// Text deltas of a streamed answer, in arrival order.
pub type ChatStream = BoxStream<'static, Result<String, AiError>>;

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Starts a streamed chat completion.
    ///
    /// Errors that happen before the first byte (bad status, connection
    /// refused) are returned directly; errors mid-stream show up as an `Err`
    /// item and end the stream.
    async fn chat_stream(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<ChatStream, AiError>;
}

pub struct AiService<P: AiProvider> {
    provider: P,
    config: AiConfig,
}

impl<P: AiProvider> AiService<P> {
    pub fn new(provider: P, config: AiConfig) -> Self {
        Self { provider, config }
    }

    pub async fn stream(&self, messages: &[AiMessage]) -> Result<ChatStream, AiError> {
        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            "Starting chat completion"
        );
        self.provider.chat_stream(messages, &self.config).await
    }
}

/// Drains a stream into the full answer, stopping at the first error.
#[cfg(test)]
pub async fn collect_stream(mut stream: ChatStream) -> Result<String, AiError> {
    use futures::StreamExt;

    let mut answer = String::new();
    while let Some(chunk) = stream.next().await {
        answer.push_str(&chunk?);
    }
    Ok(answer)
}
