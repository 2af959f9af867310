pub mod ai_service;
pub mod models;

pub use ai_service::{AiError, AiProvider, AiService, ChatStream};
pub use models::{AiConfig, AiMessage};
