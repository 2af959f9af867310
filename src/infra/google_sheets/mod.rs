pub mod google_sheets_client;
pub mod service_account_auth;

pub use google_sheets_client::GoogleSheetsClient;
