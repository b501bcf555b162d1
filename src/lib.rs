pub mod aggregation;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod seed;
pub mod sheets;
pub mod startup;
pub mod store;

use std::sync::Arc;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use handlers::MetricsState;

use sheets::{load_service_account, SheetsClient};
use store::{MoodStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MoodStore>,
    /// Export worksheet client, present when credentials loaded at startup.
    pub sheets: Option<Arc<SheetsClient>>,
    pub config: AppConfig,
    pub metrics: Arc<MetricsState>,
}

impl AppState {
    /// The client used for sheet sync. Falls back to loading credentials on
    /// demand so that a missing key surfaces as a request error.
    pub fn sheets_client(&self) -> StoreResult<Arc<SheetsClient>> {
        if let Some(client) = &self.sheets {
            return Ok(client.clone());
        }

        let sheet_id = self
            .config
            .sheet_id
            .as_deref()
            .ok_or_else(|| StoreError::Credentials("SHEET_ID is not set".to_string()))?;
        let key = load_service_account(self.config.service_account_json.as_deref(), &self.config.credentials_path)?;

        Ok(Arc::new(SheetsClient::new(key, sheet_id)))
    }
}
