// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "credentials/mod.rs"]
pub mod credentials;

#[path = "sheets/mod.rs"]
pub mod sheets;

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "assistant/mod.rs"]
pub mod assistant;
