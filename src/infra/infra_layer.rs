// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "google_sheets/mod.rs"]
pub mod google_sheets;

#[path = "config/mod.rs"]
pub mod config;

#[path = "logging/mod.rs"]
pub mod logging;

#[cfg(test)]
#[path = "sheets/mod.rs"]
pub mod sheets;
