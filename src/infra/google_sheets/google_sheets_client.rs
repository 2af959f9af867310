// =============================================================================
// GOOGLE DRIVE + SHEETS CLIENT
// =============================================================================
//
// Drive v3 lists and copies files, Sheets v4 reads spreadsheet metadata and
// cell values. Every request carries the service account's bearer token.

use super::service_account_auth::ServiceAccountAuth;
use crate::core::credentials::ServiceAccountKey;
use crate::core::sheets::sheets_models::{CSV_MIME, GOOGLE_SHEET_MIME, XLSX_MIME, XLS_MIME};
use crate::core::sheets::{
    ListOptions, SheetTab, SheetsError, SheetsProvider, SpreadsheetFile, SpreadsheetInfo,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Largest page Drive will hand out for `files.list`.
const MAX_PAGE_SIZE: usize = 200;

const FILE_FIELDS: &str = "id,name,mimeType,webViewLink,createdTime,modifiedTime,parents";

// =============================================================================
// API RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<SpreadsheetFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    grid_properties: Option<GridProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u64,
    #[serde(default)]
    column_count: u64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl From<Spreadsheet> for SpreadsheetInfo {
    fn from(spreadsheet: Spreadsheet) -> Self {
        let tabs = spreadsheet
            .sheets
            .into_iter()
            .map(|sheet| {
                let grid = sheet.properties.grid_properties.unwrap_or_default();
                SheetTab {
                    title: sheet.properties.title,
                    sheet_id: sheet.properties.sheet_id,
                    row_count: grid.row_count,
                    column_count: grid.column_count,
                }
            })
            .collect();

        SpreadsheetInfo {
            title: spreadsheet.properties.title,
            tabs,
        }
    }
}

// =============================================================================
// REQUEST HELPERS
// =============================================================================

/// Builds the Drive search expression for spreadsheet-like files.
pub fn build_drive_query(options: &ListOptions) -> String {
    let mut mimes = vec![GOOGLE_SHEET_MIME];
    if options.include_excel {
        mimes.extend([XLSX_MIME, XLS_MIME, CSV_MIME]);
    }

    let mime_clause = mimes
        .iter()
        .map(|m| format!("mimeType='{}'", m))
        .collect::<Vec<_>>()
        .join(" or ");

    let mut query = format!("({}) and trashed=false", mime_clause);
    if let Some(folder) = &options.folder_id {
        query.push_str(&format!(" and '{}' in parents", folder.replace('\'', "\\'")));
    }
    query
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Maps a non-success response onto the error the core understands.
fn status_error(status: StatusCode, resource: &str, body: String) -> SheetsError {
    match status {
        StatusCode::NOT_FOUND => SheetsError::NotFound(resource.to_string()),
        StatusCode::FORBIDDEN => SheetsError::PermissionDenied(resource.to_string()),
        StatusCode::UNAUTHORIZED => SheetsError::Auth(body),
        _ => SheetsError::Api {
            status: status.as_u16(),
            message: body,
        },
    }
}

async fn decode<T: DeserializeOwned>(response: Response, resource: &str) -> Result<T, SheetsError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, resource, body));
    }

    response.json().await.map_err(|e| SheetsError::Api {
        status: status.as_u16(),
        message: format!("unexpected response body: {}", e),
    })
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoogleSheetsClient {
    client: Client,
    auth: ServiceAccountAuth,
}

impl GoogleSheetsClient {
    pub fn new(key: ServiceAccountKey) -> Self {
        let client = Client::new();
        Self {
            auth: ServiceAccountAuth::new(key, client.clone()),
            client,
        }
    }

    pub fn service_account_email(&self) -> &str {
        self.auth.service_account_email()
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.auth.get_access_token().await?;
        request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SheetsError::Transport(e.to_string()))
    }
}

#[async_trait]
impl SheetsProvider for GoogleSheetsClient {
    async fn list_files(&self, options: &ListOptions) -> Result<Vec<SpreadsheetFile>, SheetsError> {
        let query = build_drive_query(options);
        let fields = format!("nextPageToken, files({})", FILE_FIELDS);
        let mut files: Vec<SpreadsheetFile> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_size = match options.max_results {
                0 => MAX_PAGE_SIZE,
                max => (max - files.len()).min(MAX_PAGE_SIZE),
            };

            let mut request = self.client.get(DRIVE_FILES_URL).query(&[
                ("q", query.as_str()),
                ("fields", fields.as_str()),
                ("orderBy", "modifiedTime desc"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);
            request = request.query(&[("pageSize", page_size)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = self.send(request).await?;
            if response.status() == StatusCode::NOT_FOUND {
                tracing::warn!(folder = ?options.folder_id, "Drive listing returned 404");
                return Ok(Vec::new());
            }

            let page: FileList = decode(response, "drive files").await?;
            files.extend(page.files);

            let reached_limit = options.max_results != 0 && files.len() >= options.max_results;
            match page.next_page_token {
                Some(token) if !reached_limit => page_token = Some(token),
                _ => break,
            }
        }

        if options.max_results != 0 {
            files.truncate(options.max_results);
        }
        tracing::info!(count = files.len(), "Listed spreadsheet files");
        Ok(files)
    }

    async fn spreadsheet_info(&self, spreadsheet_id: &str) -> Result<SpreadsheetInfo, SheetsError> {
        let url = format!("{}/{}", SHEETS_URL, spreadsheet_id);
        let request = self.client.get(&url).query(&[(
            "fields",
            "properties.title,sheets.properties(sheetId,title,gridProperties)",
        )]);

        let spreadsheet: Spreadsheet = decode(self.send(request).await?, spreadsheet_id).await?;
        Ok(spreadsheet.into())
    }

    async fn read_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        // The range is a path segment; build it through the URL API so quotes,
        // spaces and '!' are escaped.
        let mut url = reqwest::Url::parse(SHEETS_URL)
            .map_err(|e| SheetsError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Transport("invalid Sheets base URL".to_string()))?
            .extend([spreadsheet_id, "values", range]);

        let request = self.client.get(url);
        let values: ValueRange = decode(self.send(request).await?, spreadsheet_id).await?;

        tracing::debug!(rows = values.values.len(), range = %range, "Read sheet values");
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn copy_as_spreadsheet(
        &self,
        file_id: &str,
        title: Option<&str>,
        parent_folder_id: Option<&str>,
    ) -> Result<SpreadsheetFile, SheetsError> {
        let url = format!("{}/{}/copy", DRIVE_FILES_URL, file_id);

        let mut body = serde_json::json!({ "mimeType": GOOGLE_SHEET_MIME });
        if let Some(title) = title {
            body["name"] = serde_json::Value::from(title);
        }
        if let Some(parent) = parent_folder_id {
            body["parents"] = serde_json::json!([parent]);
        }

        let request = self
            .client
            .post(&url)
            .query(&[("fields", FILE_FIELDS), ("supportsAllDrives", "true")])
            .json(&body);

        let copied: SpreadsheetFile = decode(self.send(request).await?, file_id).await?;
        tracing::info!(source = %file_id, copy = %copied.id, "Converted file to Google Sheet");
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_for_native_sheets_only() {
        let query = build_drive_query(&ListOptions::default());
        assert_eq!(
            query,
            "(mimeType='application/vnd.google-apps.spreadsheet') and trashed=false"
        );
    }

    #[test]
    fn test_query_with_excel_and_folder() {
        let options = ListOptions {
            max_results: 10,
            folder_id: Some("folder123".to_string()),
            include_excel: true,
        };

        let query = build_drive_query(&options);
        assert!(query.contains(&format!("mimeType='{}'", XLSX_MIME)));
        assert!(query.contains(&format!("mimeType='{}'", XLS_MIME)));
        assert!(query.contains("mimeType='text/csv'"));
        assert!(query.contains(" or "));
        assert!(query.ends_with("and trashed=false and 'folder123' in parents"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "abc", String::new()),
            SheetsError::NotFound(id) if id == "abc"
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "abc", String::new()),
            SheetsError::PermissionDenied(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "abc", "boom".to_string()),
            SheetsError::Api { status: 500, message } if message == "boom"
        ));
    }

    #[test]
    fn test_spreadsheet_response_parsing() {
        let raw = serde_json::json!({
            "properties": { "title": "Pesquisa" },
            "sheets": [
                {
                    "properties": {
                        "sheetId": 0,
                        "title": "Respostas ao formulário 1",
                        "gridProperties": { "rowCount": 1000, "columnCount": 26 }
                    }
                },
                { "properties": { "sheetId": 42, "title": "Resumo" } }
            ]
        });

        let info: SpreadsheetInfo = serde_json::from_value::<Spreadsheet>(raw).unwrap().into();
        assert_eq!(info.title, "Pesquisa");
        assert_eq!(info.tabs.len(), 2);
        assert_eq!(info.tabs[0].row_count, 1000);
        assert_eq!(info.tabs[1].sheet_id, 42);
        assert_eq!(info.tabs[1].column_count, 0);
    }

    #[test]
    fn test_file_list_parsing() {
        let raw = serde_json::json!({
            "nextPageToken": "next",
            "files": [{
                "id": "f1",
                "name": "Vendas",
                "mimeType": GOOGLE_SHEET_MIME,
                "modifiedTime": "2024-10-19T14:20:00.000Z"
            }]
        });

        let page: FileList = serde_json::from_value(raw).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
        assert!(page.files[0].is_google_sheet());
        assert!(page.files[0].modified_time.is_some());
        assert!(page.files[0].parents.is_empty());
    }

    #[test]
    fn test_cells_become_strings() {
        assert_eq!(cell_to_string(serde_json::json!("Ana")), "Ana");
        assert_eq!(cell_to_string(serde_json::json!(42)), "42");
        assert_eq!(cell_to_string(serde_json::json!(true)), "true");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
    }
}
