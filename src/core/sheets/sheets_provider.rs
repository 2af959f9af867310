use super::sheets_models::{ListOptions, SpreadsheetFile, SpreadsheetInfo};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}. Share the file with the service account.")]
    PermissionDenied(String),
    #[error("Google API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
}

/// Everything the core needs from the drive/spreadsheet backend.
///
/// The Google REST client implements this in the infra layer; tests use an
/// in-memory implementation.
#[async_trait]
pub trait SheetsProvider: Send + Sync {
    /// Lists spreadsheet files, most recently modified first.
    async fn list_files(&self, options: &ListOptions) -> Result<Vec<SpreadsheetFile>, SheetsError>;

    async fn spreadsheet_info(&self, spreadsheet_id: &str) -> Result<SpreadsheetInfo, SheetsError>;

    /// Reads a range (A1 notation) as rows of formatted cell values.
    async fn read_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Copies a file into a new native Google Sheet, converting Excel/CSV.
    async fn copy_as_spreadsheet(
        &self,
        file_id: &str,
        title: Option<&str>,
        parent_folder_id: Option<&str>,
    ) -> Result<SpreadsheetFile, SheetsError>;
}
