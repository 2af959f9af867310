pub mod chat_completions_client;
pub mod sse;

pub use chat_completions_client::{ChatCompletionsClient, DEFAULT_CHAT_URL};
