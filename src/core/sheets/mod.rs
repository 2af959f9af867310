pub mod sheets_models;
pub mod sheets_provider;
pub mod sheets_service;

pub use sheets_models::{
    AutoConvertOptions, ConversionSummary, FormResponse, ListOptions, SheetTab,
    SpreadsheetFile, SpreadsheetInfo,
};
pub use sheets_provider::{SheetsError, SheetsProvider};
pub use sheets_service::SheetsService;
