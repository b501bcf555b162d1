use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Days;
use std::sync::Arc;

use super::today;
use crate::{
    export::{export_rows, render_csv, EXPORT_STUDENT_HEADER},
    extractors::Teacher,
    models::EntryFilter,
    store::StoreResult,
    AppError, AppResult, AppState,
};

const CSV_WINDOW: Days = Days::new(30);
const CSV_FILENAME: &str = "mood_entries.csv";

/// GET /teacher/download-csv/
#[utoipa::path(
    get,
    path = "/teacher/download-csv/",
    responses(
        (status = 200, description = "Entries from the last 30 days as CSV"),
        (status = 303, description = "Not signed in as a teacher")
    ),
    tag = "teacher"
)]
pub async fn download_csv(teacher: Teacher, State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let since = today()
        .checked_sub_days(CSV_WINDOW)
        .ok_or_else(|| AppError::Internal("Date out of range".to_string()))?;

    let entries = state.store.list_entries(&EntryFilter::since(since)).await?;
    let users = state.store.list_users(None).await?;
    let rows = export_rows(state.store.backend().csv_student_header(), &entries, &users);

    tracing::info!(username = %teacher.username(), rows = entries.len(), "CSV export");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", CSV_FILENAME)),
        ],
        render_csv(&rows),
    )
        .into_response())
}

async fn push_to_sheet(state: &AppState) -> StoreResult<usize> {
    let client = state.sheets_client()?;

    let mut entries = state.store.list_entries(&EntryFilter::all()).await?;
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let users = state.store.list_users(None).await?;

    let rows = export_rows(EXPORT_STUDENT_HEADER, &entries, &users);
    tracing::debug!(
        sheet_id = %client.sheet_id(),
        worksheet = %state.config.export_worksheet,
        rows = rows.len(),
        "Replacing export worksheet"
    );
    client.replace_worksheet(&state.config.export_worksheet, rows).await?;

    Ok(entries.len())
}

/// GET /teacher/sync-sheet/
///
/// Overwrites the export worksheet with every entry, newest first.
#[utoipa::path(
    get,
    path = "/teacher/sync-sheet/",
    responses(
        (status = 200, description = "Worksheet replaced"),
        (status = 500, description = "Credentials or Google API failure"),
        (status = 303, description = "Not signed in as a teacher")
    ),
    tag = "teacher"
)]
pub async fn sync_sheet(teacher: Teacher, State(state): State<Arc<AppState>>) -> Response {
    match push_to_sheet(&state).await {
        Ok(rows) => {
            tracing::info!(username = %teacher.username(), rows, "Export worksheet updated");
            (StatusCode::OK, "Google Sheet updated successfully").into_response()
        }
        Err(e) => {
            tracing::error!(username = %teacher.username(), error = %e, "Sheet sync failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error updating sheet: {}", e)).into_response()
        }
    }
}
