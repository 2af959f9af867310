// Line-based chat loop on stdin/stdout.
//
// Lines starting with `/` are local commands; everything else goes to the
// assistant. Streamed answers are written chunk by chunk as they arrive.

use crate::core::ai::{AiMessage, AiProvider};
use crate::core::assistant::{AssistantReply, AssistantService, SHEETS_DISABLED};
use crate::core::credentials::CredentialDiagnosis;
use crate::core::sheets::SheetsProvider;
use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const BANNER: &str = "Alphy, assistente de dados da Alpha Insights. \
Digite sua pergunta ou /help para ver os comandos.";

const HELP: &str = "Comandos:\n  \
/clear     limpa o histórico da conversa\n  \
/reload    recarrega a lista de planilhas\n  \
/convert   converte arquivos Excel/CSV em Planilhas Google\n  \
/diagnose  mostra o diagnóstico das credenciais do Google\n  \
/help      mostra esta lista de comandos\n  \
/quit      encerra";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Clear,
    Reload,
    Convert,
    Diagnose,
    Help,
    Quit,
}

impl SlashCommand {
    /// `None` for lines that are not commands. Unknown commands map to `Help`.
    pub fn parse(line: &str) -> Option<SlashCommand> {
        let line = line.trim();
        let name = line.strip_prefix('/')?;
        Some(match name.to_lowercase().as_str() {
            "clear" => SlashCommand::Clear,
            "reload" => SlashCommand::Reload,
            "convert" => SlashCommand::Convert,
            "diagnose" => SlashCommand::Diagnose,
            "help" => SlashCommand::Help,
            "quit" | "exit" => SlashCommand::Quit,
            _ => SlashCommand::Help,
        })
    }
}

pub struct Repl<'a, A: AiProvider, S: SheetsProvider> {
    assistant: &'a AssistantService<A, S>,
    diagnosis: CredentialDiagnosis,
    history: Vec<AiMessage>,
}

impl<'a, A: AiProvider, S: SheetsProvider> Repl<'a, A, S> {
    pub fn new(assistant: &'a AssistantService<A, S>, diagnosis: CredentialDiagnosis) -> Self {
        Self {
            assistant,
            diagnosis,
            history: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn history(&self) -> &[AiMessage] {
        &self.history
    }

    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_line(output, BANNER).await?;
        if !self.assistant.sheets_enabled() {
            write_line(output, SHEETS_DISABLED).await?;
        }

        let mut lines = input.lines();
        loop {
            output.write_all(b"\n> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match SlashCommand::parse(line) {
                Some(SlashCommand::Quit) => break,
                Some(command) => self.run_command(command, output).await?,
                None => self.ask(line, output).await?,
            }
        }

        tracing::info!(turns = self.history.len(), "Chat session ended");
        Ok(())
    }

    async fn run_command<W: AsyncWrite + Unpin>(
        &mut self,
        command: SlashCommand,
        output: &mut W,
    ) -> std::io::Result<()> {
        match command {
            SlashCommand::Clear => {
                self.history.clear();
                write_line(output, "Histórico limpo.").await
            }
            SlashCommand::Reload => match self.assistant.reload_sheets_context().await {
                Ok(count) => {
                    write_line(output, &format!("{} planilha(s) carregada(s).", count)).await
                }
                Err(e) => {
                    write_line(output, &format!("Erro ao recarregar planilhas: {}", e)).await
                }
            },
            SlashCommand::Convert => match self.assistant.convert_uploads().await {
                Ok(summary) => {
                    let text = format!(
                        "{} arquivo(s) convertido(s), {} ignorado(s).",
                        summary.converted, summary.skipped
                    );
                    write_line(output, &text).await
                }
                Err(e) => write_line(output, &format!("Erro ao converter arquivos: {}", e)).await,
            },
            SlashCommand::Diagnose => write_line(output, &self.diagnosis.to_string()).await,
            SlashCommand::Help => write_line(output, HELP).await,
            SlashCommand::Quit => Ok(()),
        }
    }

    /// Sends one prompt and records both turns in the history. Failures are
    /// shown and recorded as the assistant's turn.
    async fn ask<W: AsyncWrite + Unpin>(&mut self, prompt: &str, output: &mut W) -> std::io::Result<()> {
        let answer = match self.assistant.respond(prompt, &self.history).await {
            Ok(AssistantReply::Direct(text)) => {
                write_line(output, &text).await?;
                text
            }
            Ok(AssistantReply::Streamed(mut stream)) => {
                let mut full = String::new();
                let mut failure = None;
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(text) => {
                            output.write_all(text.as_bytes()).await?;
                            output.flush().await?;
                            full.push_str(&text);
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                output.write_all(b"\n").await?;

                match failure {
                    None => full,
                    Some(e) => {
                        tracing::error!("Chat stream failed: {}", e);
                        let message = format!("Erro ao processar sua mensagem: {}", e);
                        write_line(output, &message).await?;
                        message
                    }
                }
            }
            Err(e) => {
                tracing::error!("Chat request failed: {}", e);
                let message = format!("Erro ao processar sua mensagem: {}", e);
                write_line(output, &message).await?;
                message
            }
        };

        self.history.push(AiMessage::user(prompt));
        self.history.push(AiMessage::assistant(answer));
        Ok(())
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::{AiConfig, AiError, AiService, ChatStream};
    use crate::core::sheets::sheets_models::GOOGLE_SHEET_MIME;
    use crate::core::sheets::{SheetsService, SpreadsheetFile};
    use crate::infra::sheets::InMemorySheetsProvider;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::{Arc, Mutex};

    /// Streams a fixed answer in two chunks, optionally failing after the first.
    struct EchoProvider {
        fail_midway: bool,
        calls: Arc<Mutex<Vec<Vec<AiMessage>>>>,
    }

    #[async_trait]
    impl AiProvider for EchoProvider {
        async fn chat_stream(
            &self,
            messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<ChatStream, AiError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            let second = if self.fail_midway {
                Err(AiError::Stream("connection reset".to_string()))
            } else {
                Ok(" mundo".to_string())
            };
            Ok(stream::iter(vec![Ok("Olá".to_string()), second]).boxed())
        }
    }

    fn assistant(
        fail_midway: bool,
        sheets: Option<InMemorySheetsProvider>,
    ) -> (AssistantService<EchoProvider, InMemorySheetsProvider>, Arc<Mutex<Vec<Vec<AiMessage>>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let ai = AiService::new(
            EchoProvider {
                fail_midway,
                calls: Arc::clone(&calls),
            },
            AiConfig {
                model: "m".to_string(),
                temperature: 0.7,
            },
        );
        let sheets = sheets.map(|p| Arc::new(SheetsService::new(p)));
        (AssistantService::new(ai, sheets, 10), calls)
    }

    async fn run_script(
        repl: &mut Repl<'_, EchoProvider, InMemorySheetsProvider>,
        script: &str,
    ) -> String {
        let mut output = Vec::new();
        repl.run(script.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(SlashCommand::parse("/clear"), Some(SlashCommand::Clear));
        assert_eq!(SlashCommand::parse("  /RELOAD "), Some(SlashCommand::Reload));
        assert_eq!(SlashCommand::parse("/convert"), Some(SlashCommand::Convert));
        assert_eq!(SlashCommand::parse("/exit"), Some(SlashCommand::Quit));
        assert_eq!(SlashCommand::parse("/wat"), Some(SlashCommand::Help));
        assert_eq!(SlashCommand::parse("quanto vendemos?"), None);
    }

    #[tokio::test]
    async fn test_streamed_answer_is_printed_and_recorded() {
        let (assistant, calls) = assistant(false, None);
        let mut repl = Repl::new(&assistant, CredentialDiagnosis::Missing);

        let output = run_script(&mut repl, "oi\n/quit\n").await;
        assert!(output.contains("Olá mundo\n"));
        assert!(output.contains(SHEETS_DISABLED));
        assert_eq!(
            repl.history(),
            &[AiMessage::user("oi"), AiMessage::assistant("Olá mundo")]
        );
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_sent_with_next_prompt() {
        let (assistant, calls) = assistant(false, None);
        let mut repl = Repl::new(&assistant, CredentialDiagnosis::Missing);

        run_script(&mut repl, "primeira\nsegunda\n").await;

        let calls = calls.lock().unwrap();
        let second = &calls[1];
        assert_eq!(second[0].role, "system");
        assert_eq!(second[1], AiMessage::user("primeira"));
        assert_eq!(second[2], AiMessage::assistant("Olá mundo"));
        assert_eq!(second[3], AiMessage::user("segunda"));
    }

    #[tokio::test]
    async fn test_stream_failure_becomes_reply_text() {
        let (assistant, _) = assistant(true, None);
        let mut repl = Repl::new(&assistant, CredentialDiagnosis::Missing);

        let output = run_script(&mut repl, "oi\n").await;
        assert!(output.contains("Erro ao processar sua mensagem:"));
        assert!(repl.history()[1].content.starts_with("Erro ao processar sua mensagem:"));
    }

    #[tokio::test]
    async fn test_clear_and_diagnose() {
        let (assistant, _) = assistant(false, None);
        let mut repl = Repl::new(&assistant, CredentialDiagnosis::Missing);

        let output = run_script(&mut repl, "oi\n/clear\n/diagnose\n/convert\n").await;
        assert!(repl.history().is_empty());
        assert!(output.contains("Erro ao converter arquivos:"));
        assert!(output.contains("Histórico limpo."));
        assert!(output.contains(&CredentialDiagnosis::Missing.to_string()));
    }

    #[tokio::test]
    async fn test_help_lists_every_command() {
        let (assistant, calls) = assistant(false, None);
        let mut repl = Repl::new(&assistant, CredentialDiagnosis::Missing);

        let output = run_script(&mut repl, "/help\n").await;
        for name in ["/clear", "/reload", "/convert", "/diagnose", "/help", "/quit"] {
            assert!(output.contains(&format!("  {}", name)), "missing {}", name);
        }
        assert!(repl.history().is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keyword_command_and_reload_use_the_drive() {
        let drive = InMemorySheetsProvider::default();
        drive.add_file(SpreadsheetFile {
            id: "g1".to_string(),
            name: "Vendas".to_string(),
            mime_type: Some(GOOGLE_SHEET_MIME.to_string()),
            web_view_link: None,
            created_time: None,
            modified_time: None,
            parents: Vec::new(),
        });
        let (assistant, calls) = assistant(false, Some(drive));
        let mut repl = Repl::new(&assistant, CredentialDiagnosis::Missing);

        let output = run_script(&mut repl, "listar planilhas\n/reload\n").await;
        assert!(output.contains("1. **Vendas**"));
        assert!(output.contains("1 planilha(s) carregada(s)."));
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(repl.history().len(), 2);
    }
}
