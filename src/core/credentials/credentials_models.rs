use super::credentials_normalizer::{CredentialError, CredentialMap};
use std::fmt;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The fields of a service-account credential the OAuth flow actually uses.
///
/// Built from a normalized [`CredentialMap`], so by the time one of these
/// exists the raw secret has already been decoded.
#[derive(Clone)]
pub struct ServiceAccountKey {
    /// The service account email (used as issuer in the JWT).
    pub client_email: String,

    /// The private key in PEM format.
    pub private_key: String,

    /// Where the signed JWT is exchanged for an access token.
    pub token_uri: String,

    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_map(map: &CredentialMap) -> Result<Self, CredentialError> {
        let field = |name: &'static str| -> Option<String> {
            map.get(name)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            client_email: field("client_email").ok_or(CredentialError::MissingField("client_email"))?,
            private_key: field("private_key").ok_or(CredentialError::MissingField("private_key"))?,
            token_uri: field("token_uri").unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            project_id: field("project_id"),
        })
    }
}

// Hand-written so the key never ends up in a log line via `{:?}`.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"***masked***")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}
