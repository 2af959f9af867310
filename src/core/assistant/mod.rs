pub mod assistant_service;
pub mod commands;

pub use assistant_service::{AssistantReply, AssistantService, SHEETS_DISABLED};
