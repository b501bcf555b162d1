use axum::{
    http::Request,
    middleware,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::{
    handlers::{self, export_handler, login_handler, student_handler, teacher_handler},
    middleware::{metrics_middleware, request_id_middleware},
    openapi::ApiDoc,
    sheets::{load_service_account, SheetsClient},
    store::{MemoryStore, MoodStore, PgStore, SheetsStore, StoreBackend, StoreError, StoreResult},
    AppConfig,
};

pub fn build_router(state: Arc<crate::AppState>) -> Router {
    let student_routes = Router::new()
        .route(
            "/checkin/",
            get(student_handler::checkin_page).post(student_handler::submit_checkin),
        )
        .route("/history/", get(student_handler::history));

    let teacher_routes = Router::new()
        .route("/dashboard/", get(teacher_handler::dashboard))
        .route("/results/", get(teacher_handler::results))
        .route("/students/", get(teacher_handler::students))
        .route(
            "/settings/",
            get(teacher_handler::settings_page).post(teacher_handler::update_settings),
        )
        .route("/download-csv/", get(export_handler::download_csv))
        .route("/sync-sheet/", get(export_handler::sync_sheet));

    Router::new()
        .route("/", get(login_handler::login_page).post(login_handler::login))
        .route("/logout/", get(login_handler::logout))
        .nest("/student", student_routes)
        .nest("/teacher", teacher_routes)
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Opens the configured storage backend. The sheets backend also hands back
/// its client so that sheet sync can share the token cache.
pub async fn build_store(config: &AppConfig) -> StoreResult<(Arc<dyn MoodStore>, Option<Arc<SheetsClient>>)> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Database(sqlx::Error::Configuration("DATABASE_URL must be set".into())))?;
            let pool = crate::db::create_pool(url).await?;
            crate::db::ensure_schema(&pool).await?;
            tracing::info!("Database pool created successfully");

            let store: Arc<dyn MoodStore> = Arc::new(PgStore::new(pool));
            Ok((store, export_client(config)))
        }
        StoreBackend::Sheets => {
            let sheet_id = config
                .sheet_id
                .as_deref()
                .ok_or_else(|| StoreError::Credentials("SHEET_ID is not set".to_string()))?;
            let key = load_service_account(config.service_account_json.as_deref(), &config.credentials_path)?;
            let client = Arc::new(SheetsClient::new(key, sheet_id));
            tracing::info!(sheet_id = %sheet_id, "Using Google Sheets store");

            let store: Arc<dyn MoodStore> = Arc::new(SheetsStore::new(client.clone()));
            Ok((store, Some(client)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            let store: Arc<dyn MoodStore> = Arc::new(MemoryStore::new());
            Ok((store, export_client(config)))
        }
    }
}

/// Sheet sync client for the non-sheets backends, when configured.
fn export_client(config: &AppConfig) -> Option<Arc<SheetsClient>> {
    let sheet_id = config.sheet_id.as_deref()?;
    match load_service_account(config.service_account_json.as_deref(), &config.credentials_path) {
        Ok(key) => Some(Arc::new(SheetsClient::new(key, sheet_id))),
        Err(e) => {
            tracing::warn!(error = %e, "Sheet sync unavailable until credentials are provided");
            None
        }
    }
}
