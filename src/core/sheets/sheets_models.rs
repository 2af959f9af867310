use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const GOOGLE_SHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
pub const CSV_MIME: &str = "text/csv";

/// A spreadsheet-like file in the drive, as returned by the Drive `files` API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    GoogleSheet,
    Excel,
    Csv,
    Other,
}

impl SpreadsheetFile {
    pub fn kind(&self) -> FileKind {
        match self.mime_type.as_deref() {
            Some(GOOGLE_SHEET_MIME) => FileKind::GoogleSheet,
            Some(XLSX_MIME) | Some(XLS_MIME) => FileKind::Excel,
            Some(CSV_MIME) => FileKind::Csv,
            _ => FileKind::Other,
        }
    }

    /// Files without a mime type are assumed to be native sheets, which is
    /// what a Sheets-only listing returns.
    pub fn is_google_sheet(&self) -> bool {
        self.mime_type.is_none() || self.kind() == FileKind::GoogleSheet
    }
}

/// One tab ("sheet") inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTab {
    pub title: String,
    pub sheet_id: i64,
    pub row_count: u64,
    pub column_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetInfo {
    pub title: String,
    pub tabs: Vec<SheetTab>,
}

/// One data row keyed by the header row, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormResponse {
    pub fields: Vec<(String, String)>,
}

impl FormResponse {
    #[cfg(test)]
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Upper bound on files returned. `0` means no limit.
    pub max_results: usize,
    pub folder_id: Option<String>,
    /// Also list xlsx, xls and csv files, not just native sheets.
    pub include_excel: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            max_results: 100,
            folder_id: None,
            include_excel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoConvertOptions {
    pub parent_folder_id: Option<String>,
    pub include_csv: bool,
    pub include_xls: bool,
    /// Stop after this many conversions. `0` means no limit.
    pub max_conversions: usize,
}

impl Default for AutoConvertOptions {
    fn default() -> Self {
        Self {
            parent_folder_id: None,
            include_csv: true,
            include_xls: true,
            max_conversions: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionSummary {
    pub converted: usize,
    pub skipped: usize,
}
