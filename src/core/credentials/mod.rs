pub mod credentials_models;
pub mod credentials_normalizer;
pub mod diagnostics;

pub use credentials_models::ServiceAccountKey;
pub use credentials_normalizer::{normalize, CredentialError};
pub use diagnostics::{diagnose, CredentialDiagnosis};
