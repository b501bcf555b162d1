use rand::RngCore;
use std::env;
use std::path::PathBuf;

use crate::store::StoreBackend;

const DEFAULT_CREDENTIALS_PATH: &str = "credentials/service_account.json";
const DEFAULT_SESSION_TTL_SECS: i64 = 86_400;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub sheet_id: Option<String>,
    pub service_account_json: Option<String>,
    pub credentials_path: PathBuf,
    pub export_worksheet: String,
    pub session_secret: String,
    pub session_ttl_secs: i64,
    pub cookie_secure: bool,
    pub seed_users_path: Option<PathBuf>,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let store_backend = match non_empty("STORE_BACKEND") {
            Some(value) => value.parse::<StoreBackend>()?,
            None => StoreBackend::Postgres,
        };

        let database_url = non_empty("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set".to_string());
        }

        let sheet_id = non_empty("SHEET_ID");
        if store_backend == StoreBackend::Sheets && sheet_id.is_none() {
            return Err("SHEET_ID must be set for the sheets backend".to_string());
        }

        let session_ttl_secs = match non_empty("SESSION_TTL_SECS") {
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| format!("SESSION_TTL_SECS must be a positive integer, got {}", value))?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let session_secret = non_empty("SESSION_SECRET").unwrap_or_else(|| {
            tracing::warn!("SESSION_SECRET not set, sessions will not survive a restart");
            random_secret()
        });

        Ok(Self {
            store_backend,
            database_url,
            sheet_id,
            service_account_json: non_empty("GOOGLE_SERVICE_ACCOUNT_JSON").or_else(|| non_empty("SERVICE_ACCOUNT_JSON")),
            credentials_path: non_empty("GOOGLE_CREDENTIALS_PATH")
                .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string())
                .into(),
            export_worksheet: non_empty("EXPORT_WORKSHEET").unwrap_or_else(|| "Sheet1".to_string()),
            session_secret,
            session_ttl_secs,
            cookie_secure: non_empty("COOKIE_SECURE").map(|v| parse_flag(&v)).unwrap_or(false),
            seed_users_path: non_empty("SEED_USERS_PATH").map(PathBuf::from),
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        })
    }

    /// In-memory configuration with a fixed secret, for tests and local runs.
    pub fn in_memory(session_secret: impl Into<String>) -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            database_url: None,
            sheet_id: None,
            service_account_json: None,
            credentials_path: DEFAULT_CREDENTIALS_PATH.into(),
            export_worksheet: "Sheet1".to_string(),
            session_secret: session_secret.into(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            cookie_secure: false,
            seed_users_path: None,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
