// In-memory implementation of SheetsProvider.
//
// Behaves like a tiny drive: files, their tabs and cell values live in plain
// hash maps behind a mutex. Copying a file creates a new native sheet that
// shares the source's values.

use crate::core::sheets::sheets_models::{CSV_MIME, GOOGLE_SHEET_MIME, XLSX_MIME, XLS_MIME};
use crate::core::sheets::{
    ListOptions, SheetTab, SheetsError, SheetsProvider, SpreadsheetFile, SpreadsheetInfo,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Drive {
    files: Vec<SpreadsheetFile>,
    tabs: HashMap<String, Vec<SheetTab>>,
    /// (spreadsheet id, A1 range) -> rows
    values: HashMap<(String, String), Vec<Vec<String>>>,
}

#[derive(Clone, Default)]
pub struct InMemorySheetsProvider {
    drive: Arc<Mutex<Drive>>,
    copies: Arc<AtomicUsize>,
    /// Every call fails with this error when set.
    failure: Arc<Mutex<Option<String>>>,
}

impl InMemorySheetsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, file: SpreadsheetFile) {
        self.drive.lock().unwrap().files.push(file);
    }

    pub fn set_tabs(&self, spreadsheet_id: &str, tabs: Vec<SheetTab>) {
        self.drive
            .lock()
            .unwrap()
            .tabs
            .insert(spreadsheet_id.to_string(), tabs);
    }

    pub fn set_values(&self, spreadsheet_id: &str, range: &str, rows: Vec<Vec<String>>) {
        self.drive
            .lock()
            .unwrap()
            .values
            .insert((spreadsheet_id.to_string(), range.to_string()), rows);
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn copy_count(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), SheetsError> {
        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(SheetsError::Api {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SheetsProvider for InMemorySheetsProvider {
    async fn list_files(&self, options: &ListOptions) -> Result<Vec<SpreadsheetFile>, SheetsError> {
        self.check_failure()?;
        let drive = self.drive.lock().unwrap();

        let mut files: Vec<SpreadsheetFile> = drive
            .files
            .iter()
            .filter(|f| {
                let mime = f.mime_type.as_deref().unwrap_or(GOOGLE_SHEET_MIME);
                mime == GOOGLE_SHEET_MIME
                    || (options.include_excel && [XLSX_MIME, XLS_MIME, CSV_MIME].contains(&mime))
            })
            .filter(|f| match &options.folder_id {
                Some(folder) => f.parents.contains(folder),
                None => true,
            })
            .cloned()
            .collect();

        if options.max_results > 0 {
            files.truncate(options.max_results);
        }
        Ok(files)
    }

    async fn spreadsheet_info(&self, spreadsheet_id: &str) -> Result<SpreadsheetInfo, SheetsError> {
        self.check_failure()?;
        let drive = self.drive.lock().unwrap();

        let file = drive
            .files
            .iter()
            .find(|f| f.id == spreadsheet_id)
            .ok_or_else(|| SheetsError::NotFound(format!("spreadsheet {}", spreadsheet_id)))?;

        Ok(SpreadsheetInfo {
            title: file.name.clone(),
            tabs: drive.tabs.get(spreadsheet_id).cloned().unwrap_or_default(),
        })
    }

    async fn read_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        self.check_failure()?;
        let drive = self.drive.lock().unwrap();
        Ok(drive
            .values
            .get(&(spreadsheet_id.to_string(), range.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn copy_as_spreadsheet(
        &self,
        file_id: &str,
        title: Option<&str>,
        parent_folder_id: Option<&str>,
    ) -> Result<SpreadsheetFile, SheetsError> {
        self.check_failure()?;
        let mut drive = self.drive.lock().unwrap();

        let source = drive
            .files
            .iter()
            .find(|f| f.id == file_id)
            .cloned()
            .ok_or_else(|| SheetsError::NotFound(format!("file {}", file_id)))?;

        let n = self.copies.fetch_add(1, Ordering::SeqCst) + 1;
        let created = SpreadsheetFile {
            id: format!("{}-copy-{}", file_id, n),
            name: title.map(str::to_string).unwrap_or(source.name),
            mime_type: Some(GOOGLE_SHEET_MIME.to_string()),
            web_view_link: None,
            created_time: None,
            modified_time: None,
            parents: parent_folder_id
                .map(|p| vec![p.to_string()])
                .unwrap_or(source.parents),
        };

        if let Some(tabs) = drive.tabs.get(file_id).cloned() {
            drive.tabs.insert(created.id.clone(), tabs);
        }
        let copied: Vec<((String, String), Vec<Vec<String>>)> = drive
            .values
            .iter()
            .filter(|((id, _), _)| id == file_id)
            .map(|((_, range), rows)| ((created.id.clone(), range.clone()), rows.clone()))
            .collect();
        drive.values.extend(copied);

        drive.files.push(created.clone());
        Ok(created)
    }
}
