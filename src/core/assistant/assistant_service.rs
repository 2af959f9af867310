use super::commands::{
    format_form_responses, format_sheets_context, format_spreadsheet_list, system_prompt, Command,
    NO_SPREADSHEETS,
};
use crate::core::ai::{AiError, AiMessage, AiProvider, AiService, ChatStream};
use crate::core::sheets::{
    AutoConvertOptions, ConversionSummary, ListOptions, SheetsError, SheetsProvider, SheetsService,
};
use std::sync::Arc;
use tokio::sync::RwLock;

pub const SHEETS_DISABLED: &str =
    "Integração com o Google Drive desativada: credenciais do Google indisponíveis ou inválidas.";

pub enum AssistantReply {
    /// Answered locally by a keyword command.
    Direct(String),
    /// Forwarded to the language model.
    Streamed(ChatStream),
}

/// Routes a prompt either to a spreadsheet command or to the chat model.
///
/// The spreadsheet service is optional: when credentials could not be loaded
/// the assistant still chats, it just has no drive access.
pub struct AssistantService<A: AiProvider, S: SheetsProvider> {
    ai: AiService<A>,
    sheets: Option<Arc<SheetsService<S>>>,
    max_history: usize,
    sheets_context: RwLock<Option<String>>,
}

impl<A: AiProvider, S: SheetsProvider> AssistantService<A, S> {
    pub fn new(ai: AiService<A>, sheets: Option<Arc<SheetsService<S>>>, max_history: usize) -> Self {
        Self {
            ai,
            sheets,
            max_history: max_history.max(1),
            sheets_context: RwLock::new(None),
        }
    }

    pub fn sheets_enabled(&self) -> bool {
        self.sheets.is_some()
    }

    /// `history` is the conversation so far, without `prompt`.
    pub async fn respond(
        &self,
        prompt: &str,
        history: &[AiMessage],
    ) -> Result<AssistantReply, AiError> {
        if let Some(command) = Command::detect(prompt) {
            tracing::info!(?command, "Handling keyword command");
            return Ok(AssistantReply::Direct(self.run_command(command).await));
        }

        let messages = self.build_messages(prompt, history).await;
        Ok(AssistantReply::Streamed(self.ai.stream(&messages).await?))
    }

    async fn run_command(&self, command: Command) -> String {
        let Some(sheets) = self.sheets.as_deref() else {
            return SHEETS_DISABLED.to_string();
        };

        match command {
            Command::ListSpreadsheets => list_reply(sheets).await,
            Command::FormResponses => form_responses_reply(sheets).await,
        }
    }

    /// System prompt plus the most recent `max_history` turns, ending with
    /// `prompt`.
    pub async fn build_messages(&self, prompt: &str, history: &[AiMessage]) -> Vec<AiMessage> {
        let context = self.sheets_context().await;

        let mut turns: Vec<AiMessage> = history.to_vec();
        turns.push(AiMessage::user(prompt));
        let skip = turns.len().saturating_sub(self.max_history);

        let mut messages = Vec::with_capacity(self.max_history + 1);
        messages.push(AiMessage::system(system_prompt(&context)));
        messages.extend(turns.into_iter().skip(skip));
        messages
    }

    /// The cached spreadsheet list for the system prompt. Failures and empty
    /// drives yield an empty context and are not cached.
    pub async fn sheets_context(&self) -> String {
        if let Some(cached) = self.sheets_context.read().await.as_ref() {
            return cached.clone();
        }

        match self.fetch_sheets_context().await {
            Ok((context, _)) => context,
            Err(e) => {
                tracing::warn!("Failed to load spreadsheets for context: {}", e);
                String::new()
            }
        }
    }

    /// Drops the cached context and fetches it again. Returns how many files
    /// were listed.
    pub async fn reload_sheets_context(&self) -> Result<usize, SheetsError> {
        *self.sheets_context.write().await = None;
        let (_, count) = self.fetch_sheets_context().await?;
        Ok(count)
    }

    /// Converts Excel/CSV uploads that have no native counterpart yet, then
    /// drops the cached context so the new sheets show up.
    pub async fn convert_uploads(&self) -> Result<ConversionSummary, SheetsError> {
        let sheets = self.enabled_sheets()?;
        let summary = sheets
            .auto_convert_tabular_files(&AutoConvertOptions::default())
            .await?;
        if summary.converted > 0 {
            *self.sheets_context.write().await = None;
        }
        Ok(summary)
    }

    fn enabled_sheets(&self) -> Result<&SheetsService<S>, SheetsError> {
        self.sheets
            .as_deref()
            .ok_or_else(|| SheetsError::Auth("Google Drive integration is disabled".to_string()))
    }

    async fn fetch_sheets_context(&self) -> Result<(String, usize), SheetsError> {
        let files = self.enabled_sheets()?.list_spreadsheets(&include_excel()).await?;
        let context = format_sheets_context(&files);
        if !context.is_empty() {
            *self.sheets_context.write().await = Some(context.clone());
        }
        Ok((context, files.len()))
    }
}

fn include_excel() -> ListOptions {
    ListOptions {
        include_excel: true,
        ..ListOptions::default()
    }
}

async fn list_reply<S: SheetsProvider>(sheets: &SheetsService<S>) -> String {
    match sheets.list_spreadsheets(&include_excel()).await {
        Ok(files) => format_spreadsheet_list(&files),
        Err(e) => format!("Erro ao listar planilhas: {}", e),
    }
}

/// Picks the first native sheet (or the first file at all), converting it
/// first when it is an Excel/CSV upload.
async fn form_responses_reply<S: SheetsProvider>(sheets: &SheetsService<S>) -> String {
    let files = match sheets.list_spreadsheets(&include_excel()).await {
        Ok(files) => files,
        Err(e) => return format!("Erro ao buscar respostas: {}", e),
    };

    let Some(candidate) = files
        .iter()
        .find(|f| f.is_google_sheet())
        .or_else(|| files.first())
    else {
        return NO_SPREADSHEETS.to_string();
    };

    let mut sheet_id = candidate.id.clone();
    let mut sheet_name = candidate.name.clone();

    if !candidate.is_google_sheet() {
        let title = format!("{} (convertido)", sheet_name);
        match sheets.convert_to_spreadsheet(&sheet_id, Some(&title), None).await {
            Ok(converted) => {
                sheet_id = converted.id;
                sheet_name = converted.name;
            }
            Err(e) => return format!("Falha ao converter Excel: {}", e),
        }
    }

    match sheets.get_form_responses(&sheet_id, None).await {
        Ok(responses) => format_form_responses(&sheet_name, &responses),
        Err(e) => format!("Erro ao buscar respostas: {}", e),
    }
}
