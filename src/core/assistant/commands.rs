//! Keyword triggers and the markdown replies they produce.
//!
//! Users type free text (in Portuguese); a handful of phrases short-circuit
//! the language model and go straight to the drive.

use crate::core::sheets::{FormResponse, SpreadsheetFile};

/// Files listed in the system prompt context.
const MAX_CONTEXT_FILES: usize = 20;

/// Records shown inline in a form-responses reply.
const MAX_PREVIEW_RESPONSES: usize = 3;

const LIST_TRIGGERS: [&str; 5] = [
    "liste os planilhas",
    "liste as planilhas",
    "listar planilhas",
    "mostrar planilhas",
    "planilhas disponíveis",
];

const RESPONSES_TRIGGERS: [&str; 2] = ["respostas do planilha", "respostas da planilha"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ListSpreadsheets,
    FormResponses,
}

impl Command {
    /// Detects a keyword trigger anywhere in the prompt. Listing wins when
    /// both match.
    pub fn detect(prompt: &str) -> Option<Command> {
        let prompt = prompt.trim().to_lowercase();
        if LIST_TRIGGERS.iter().any(|t| prompt.contains(t)) {
            Some(Command::ListSpreadsheets)
        } else if RESPONSES_TRIGGERS.iter().any(|t| prompt.contains(t)) {
            Some(Command::FormResponses)
        } else {
            None
        }
    }
}

pub const NO_SPREADSHEETS: &str = "Nenhuma planilha encontrada no Google Drive.";

fn excel_label(file: &SpreadsheetFile) -> &'static str {
    if file.is_google_sheet() {
        ""
    } else {
        " [Excel]"
    }
}

pub fn format_spreadsheet_list(files: &[SpreadsheetFile]) -> String {
    if files.is_empty() {
        return NO_SPREADSHEETS.to_string();
    }

    let mut reply = format!(
        "**Encontrei {} planilha(s) no Google Drive:**\n\n",
        files.len()
    );
    for (i, file) in files.iter().enumerate() {
        let modified = file
            .modified_time
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "N/A".to_string());

        reply.push_str(&format!("{}. **{}**{}\n", i + 1, file.name, excel_label(file)));
        reply.push_str(&format!("   - ID: `{}`\n", file.id));
        reply.push_str(&format!("   - Modificado: {}\n\n", modified));
    }
    reply
}

pub fn format_form_responses(sheet_name: &str, responses: &[FormResponse]) -> String {
    if responses.is_empty() {
        return format!("Nenhuma resposta encontrada na planilha '{}'.", sheet_name);
    }

    let mut reply = format!(
        "**Respostas da planilha '{}':**\n\nTotal de respostas: **{}**\n\n",
        sheet_name,
        responses.len()
    );
    for (i, response) in responses.iter().take(MAX_PREVIEW_RESPONSES).enumerate() {
        reply.push_str(&format!("**Resposta {}:**\n", i + 1));
        for (header, value) in &response.fields {
            reply.push_str(&format!("- {}: {}\n", header, value));
        }
        reply.push('\n');
    }

    if responses.len() > MAX_PREVIEW_RESPONSES {
        reply.push_str(&format!(
            "_... e mais {} resposta(s)._",
            responses.len() - MAX_PREVIEW_RESPONSES
        ));
    }
    reply
}

/// The spreadsheet list injected into the system prompt. Empty when there is
/// nothing to list.
pub fn format_sheets_context(files: &[SpreadsheetFile]) -> String {
    if files.is_empty() {
        return String::new();
    }

    let mut context = String::from("\n\n**Planilhas disponíveis no Google Drive:**\n");
    for file in files.iter().take(MAX_CONTEXT_FILES) {
        context.push_str(&format!(
            "- {}{} (ID: {})\n",
            file.name,
            excel_label(file),
            file.id
        ));
    }
    context
}

pub fn system_prompt(sheets_context: &str) -> String {
    format!(
        "Você é Alphy, o assistente de análise de dados da Alpha Insights. \
         Identifique-se como Alphy nas respostas quando fizer sentido.\n\n\
         {}\n\n\
         Você tem acesso às planilhas acima e pode ajudar o usuário a:\n\
         - Analisar dados\n\
         - Responder perguntas sobre as planilhas\n\
         - Gerar insights e relatórios\n\
         - Processar informações de planilhas\n\n\
         Seja objetivo, profissional e forneça respostas em português brasileiro.",
        sheets_context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sheets::sheets_models::{GOOGLE_SHEET_MIME, XLSX_MIME};
    use chrono::{TimeZone, Utc};

    fn file(id: &str, name: &str, mime: &str) -> SpreadsheetFile {
        SpreadsheetFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: Some(mime.to_string()),
            web_view_link: None,
            created_time: None,
            modified_time: None,
            parents: Vec::new(),
        }
    }

    fn response(pairs: &[(&str, &str)]) -> FormResponse {
        FormResponse {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_detect_list_triggers() {
        assert_eq!(
            Command::detect("Liste as planilhas disponíveis "),
            Some(Command::ListSpreadsheets)
        );
        assert_eq!(
            Command::detect("pode LISTAR PLANILHAS?"),
            Some(Command::ListSpreadsheets)
        );
    }

    #[test]
    fn test_detect_responses_trigger() {
        assert_eq!(
            Command::detect("Mostre as respostas da planilha"),
            Some(Command::FormResponses)
        );
    }

    #[test]
    fn test_detect_free_text() {
        assert_eq!(Command::detect("Receita total do mês"), None);
        assert_eq!(Command::detect(""), None);
    }

    #[test]
    fn test_format_empty_list() {
        assert_eq!(format_spreadsheet_list(&[]), NO_SPREADSHEETS);
    }

    #[test]
    fn test_format_list_labels_excel_and_dates() {
        let mut sheet = file("g1", "Vendas", GOOGLE_SHEET_MIME);
        sheet.modified_time = Some(Utc.with_ymd_and_hms(2024, 10, 19, 14, 20, 0).unwrap());
        let excel = file("x1", "Estoque.xlsx", XLSX_MIME);

        let reply = format_spreadsheet_list(&[sheet, excel]);
        assert!(reply.contains("Encontrei 2 planilha(s)"));
        assert!(reply.contains("1. **Vendas**\n"));
        assert!(reply.contains("2. **Estoque.xlsx** [Excel]"));
        assert!(reply.contains("Modificado: 2024-10-19 14:20 UTC"));
        assert!(reply.contains("Modificado: N/A"));
        assert!(reply.contains("ID: `x1`"));
    }

    #[test]
    fn test_format_responses_preview() {
        let responses: Vec<FormResponse> = (1..=5)
            .map(|i| response(&[("Nome", &format!("Pessoa {}", i))]))
            .collect();

        let reply = format_form_responses("Satisfação", &responses);
        assert!(reply.contains("Total de respostas: **5**"));
        assert!(reply.contains("- Nome: Pessoa 3"));
        assert!(!reply.contains("Pessoa 4"));
        assert!(reply.ends_with("_... e mais 2 resposta(s)._"));
    }

    #[test]
    fn test_format_no_responses() {
        assert_eq!(
            format_form_responses("Vazia", &[]),
            "Nenhuma resposta encontrada na planilha 'Vazia'."
        );
    }

    #[test]
    fn test_sheets_context_caps_files() {
        let files: Vec<SpreadsheetFile> = (0..25)
            .map(|i| file(&format!("id{}", i), &format!("Planilha {}", i), GOOGLE_SHEET_MIME))
            .collect();

        let context = format_sheets_context(&files);
        assert_eq!(context.matches("(ID:").count(), MAX_CONTEXT_FILES);
        assert!(format_sheets_context(&[]).is_empty());
    }

    #[test]
    fn test_system_prompt_embeds_context() {
        let prompt = system_prompt("- Vendas (ID: g1)");
        assert!(prompt.starts_with("Você é Alphy"));
        assert!(prompt.contains("- Vendas (ID: g1)"));
    }
}
