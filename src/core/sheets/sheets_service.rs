use super::sheets_models::{
    AutoConvertOptions, ConversionSummary, FileKind, FormResponse, ListOptions, SpreadsheetFile,
    SpreadsheetInfo,
};
use super::sheets_provider::{SheetsError, SheetsProvider};
use std::collections::HashSet;

/// Columns read when fetching form responses.
pub const DEFAULT_RESPONSE_RANGE: &str = "A:Z";

/// Spreadsheet operations on top of a [`SheetsProvider`].
///
/// Constructed once at startup from normalized credentials and shared by
/// reference; there is no global instance.
pub struct SheetsService<P: SheetsProvider> {
    provider: P,
}

impl<P: SheetsProvider> SheetsService<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn list_spreadsheets(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<SpreadsheetFile>, SheetsError> {
        tracing::info!(
            include_excel = options.include_excel,
            folder = options.folder_id.as_deref().unwrap_or("-"),
            "Listing spreadsheets"
        );
        let files = self.provider.list_files(options).await?;
        tracing::info!("Found {} spreadsheet(s)", files.len());
        Ok(files)
    }

    pub async fn spreadsheet_info(
        &self,
        spreadsheet_id: &str,
    ) -> Result<SpreadsheetInfo, SheetsError> {
        let info = self.provider.spreadsheet_info(spreadsheet_id).await?;
        tracing::info!("Spreadsheet '{}' has {} tab(s)", info.title, info.tabs.len());
        Ok(info)
    }

    /// Reads the rows of a sheet as records keyed by the header row.
    ///
    /// Without a sheet name the first tab is used.
    pub async fn get_form_responses(
        &self,
        spreadsheet_id: &str,
        sheet_name: Option<&str>,
    ) -> Result<Vec<FormResponse>, SheetsError> {
        self.get_form_responses_in_range(spreadsheet_id, sheet_name, DEFAULT_RESPONSE_RANGE)
            .await
    }

    pub async fn get_form_responses_in_range(
        &self,
        spreadsheet_id: &str,
        sheet_name: Option<&str>,
        range: &str,
    ) -> Result<Vec<FormResponse>, SheetsError> {
        let sheet_name = match sheet_name {
            Some(name) => name.to_string(),
            None => {
                let info = self.spreadsheet_info(spreadsheet_id).await?;
                match info.tabs.into_iter().next() {
                    Some(tab) => tab.title,
                    None => {
                        tracing::warn!("Spreadsheet {} has no tabs", spreadsheet_id);
                        return Ok(Vec::new());
                    }
                }
            }
        };

        let range = a1_range(&sheet_name, range);
        tracing::info!("Reading responses from {} ({})", spreadsheet_id, range);

        let rows = self.provider.read_values(spreadsheet_id, &range).await?;
        let responses = rows_to_responses(rows);
        tracing::info!("Loaded {} response(s)", responses.len());
        Ok(responses)
    }

    pub async fn convert_to_spreadsheet(
        &self,
        file_id: &str,
        new_title: Option<&str>,
        parent_folder_id: Option<&str>,
    ) -> Result<SpreadsheetFile, SheetsError> {
        let created = self
            .provider
            .copy_as_spreadsheet(file_id, new_title, parent_folder_id)
            .await?;
        tracing::info!(
            "Converted file to Google Sheets: {} ({})",
            created.name,
            created.id
        );
        Ok(created)
    }

    /// Converts CSV/XLS(X) files that do not yet have a native sheet with the
    /// same base name.
    pub async fn auto_convert_tabular_files(
        &self,
        options: &AutoConvertOptions,
    ) -> Result<ConversionSummary, SheetsError> {
        let files = self
            .list_spreadsheets(&ListOptions {
                max_results: 500,
                folder_id: options.parent_folder_id.clone(),
                include_excel: true,
            })
            .await?;

        let (sheets, others): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|f| f.kind() == FileKind::GoogleSheet);

        let mut existing: HashSet<String> =
            sheets.iter().map(|f| base_name(&f.name).to_lowercase()).collect();

        let mut summary = ConversionSummary::default();
        for file in others {
            let wanted = match file.kind() {
                FileKind::Csv => options.include_csv,
                FileKind::Excel => options.include_xls,
                _ => true,
            };
            if !wanted {
                summary.skipped += 1;
                continue;
            }

            let base = base_name(&file.name).to_string();
            if existing.contains(&base.to_lowercase()) {
                summary.skipped += 1;
                continue;
            }

            self.convert_to_spreadsheet(&file.id, Some(&base), options.parent_folder_id.as_deref())
                .await?;
            existing.insert(base.to_lowercase());
            summary.converted += 1;

            if options.max_conversions > 0 && summary.converted >= options.max_conversions {
                break;
            }
        }

        tracing::info!(
            converted = summary.converted,
            skipped = summary.skipped,
            "Automatic conversion finished"
        );
        Ok(summary)
    }
}

/// Builds `'<sheet>'!<range>`, doubling any quote in the sheet name.
fn a1_range(sheet_name: &str, range: &str) -> String {
    format!("'{}'!{}", sheet_name.replace('\'', "''"), range)
}

/// First row is the header; every other row becomes a record. Short rows are
/// padded with empty strings, cells beyond the header are dropped.
pub fn rows_to_responses(rows: Vec<Vec<String>>) -> Vec<FormResponse> {
    let mut rows = rows.into_iter();
    let Some(headers) = rows.next() else {
        return Vec::new();
    };

    rows.map(|row| FormResponse {
        fields: headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), row.get(i).cloned().unwrap_or_default()))
            .collect(),
    })
    .collect()
}

/// File name without a tabular extension, trimmed.
fn base_name(name: &str) -> &str {
    for ext in [".xlsx", ".xls", ".csv"] {
        let cut = name.len().saturating_sub(ext.len());
        if let Some(tail) = name.get(cut..) {
            if tail.eq_ignore_ascii_case(ext) {
                return name[..cut].trim();
            }
        }
    }
    name.trim()
}
