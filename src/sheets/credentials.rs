use serde::Deserialize;
use std::path::Path;

use crate::store::{StoreError, StoreResult};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The fields of a Google service-account key file that the client uses.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// Loads the key from inline JSON when given, else from `key_path`.
pub fn load_service_account(inline_json: Option<&str>, key_path: &Path) -> StoreResult<ServiceAccountKey> {
    if let Some(json) = inline_json {
        return serde_json::from_str(json).map_err(|e| {
            StoreError::Credentials(format!("Invalid GOOGLE_SERVICE_ACCOUNT_JSON contents: {}", e))
        });
    }

    if key_path.exists() {
        let contents = std::fs::read_to_string(key_path).map_err(|e| {
            StoreError::Credentials(format!("Failed to read {}: {}", key_path.display(), e))
        })?;
        return serde_json::from_str(&contents).map_err(|e| {
            StoreError::Credentials(format!("Invalid key file {}: {}", key_path.display(), e))
        });
    }

    Err(StoreError::Credentials(format!(
        "Google service account credentials not found. Set GOOGLE_SERVICE_ACCOUNT_JSON env var or place {} file.",
        key_path.display()
    )))
}
