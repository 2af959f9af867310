// This is the entry point of the Alpha Insights assistant.
//
// **Architecture Overview:**
// - `core/` = Business logic (credential handling, spreadsheets, chat)
// - `infra/` = Implementations of core traits (Google APIs, chat endpoint)
// - `chat/` = Terminal front end
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the chat loop

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "chat/chat_layer.rs"]
mod chat;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::chat::Repl;
use crate::core::ai::AiService;
use crate::core::assistant::AssistantService;
use crate::core::credentials::{diagnose, CredentialDiagnosis};
use crate::core::sheets::SheetsService;
use crate::infra::ai::ChatCompletionsClient;
use crate::infra::config::{AppConfig, ConfigError};
use crate::infra::google_sheets::GoogleSheetsClient;
use crate::infra::logging::init_logging;
use anyhow::Context;
use std::sync::Arc;
use tokio::io::BufReader;

fn credential_diagnosis(config: &AppConfig) -> CredentialDiagnosis {
    match config.raw_credentials() {
        Ok(raw) => diagnose(raw.as_ref()),
        Err(e) => CredentialDiagnosis::Invalid {
            reason: e.to_string(),
            looks_truncated_base64: false,
        },
    }
}

/// Builds the drive-backed service, or `None` when credentials are missing
/// or unusable. The assistant keeps working without spreadsheet access.
fn sheets_service(config: &AppConfig) -> Option<Arc<SheetsService<GoogleSheetsClient>>> {
    match config.service_account_key() {
        Ok(key) => {
            let client = GoogleSheetsClient::new(key);
            let source = config
                .credentials
                .as_ref()
                .map(|s| s.describe())
                .unwrap_or_default();
            tracing::info!(
                account = %client.service_account_email(),
                source = %source,
                "Loaded Google service-account credentials"
            );
            Some(Arc::new(SheetsService::new(client)))
        }
        Err(ConfigError::MissingCredentials(path)) => {
            tracing::warn!(
                default_path = %path,
                "No Google credentials configured; spreadsheet features disabled"
            );
            None
        }
        Err(e) => {
            tracing::error!("Invalid Google credentials, spreadsheet features disabled: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    init_logging(&config.log)
        .with_context(|| format!("Failed to open log file {}", config.log.file.display()))?;

    let chat_client = ChatCompletionsClient::new(config.chat.api_key.clone(), config.chat.url.clone())
        .context("Failed to build chat client")?;
    let ai_service = AiService::new(chat_client, config.chat.ai_config());
    tracing::info!(
        model = %config.chat.model,
        url = %config.chat.url,
        "Chat endpoint configured"
    );

    let assistant = AssistantService::new(ai_service, sheets_service(&config), config.max_history);
    let diagnosis = credential_diagnosis(&config);
    if !diagnosis.is_valid() {
        tracing::warn!("Credential check: {}", diagnosis);
    }

    let mut repl = Repl::new(&assistant, diagnosis);
    let mut stdout = tokio::io::stdout();
    repl.run(BufReader::new(tokio::io::stdin()), &mut stdout)
        .await
        .context("Chat loop failed")?;

    Ok(())
}
